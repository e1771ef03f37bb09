use std::fs::File;
use std::io::{self, BufReader};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::{mpsc, watch};
use tokio::time::{interval, sleep, Duration};

use angle_tracker::transport;
use angle_tracker::{AngleSample, TrackerConfig, TrackerState};

#[derive(Parser, Debug)]
#[command(name = "angle_tracker")]
#[command(about = "Replay raw angle readings through the tracking filter and publish angle/rate as JSON lines", long_about = None)]
struct Args {
    /// Sample file, one angle or JSON sample per line ("-" = stdin)
    #[arg(value_name = "INPUT", default_value = "-")]
    input: String,

    /// JSON config file; flags below override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Outlier correction window length
    #[arg(long)]
    window_size: Option<usize>,

    /// Flip detection threshold [deg]
    #[arg(long)]
    outlier_threshold: Option<f64>,

    /// Sample interval [s]; samples are replayed at this pace
    #[arg(long)]
    sample_interval: Option<f64>,

    /// Rate estimator process noise constant
    #[arg(long)]
    process_noise: Option<f64>,

    /// Low-pass cutoff [Hz]
    #[arg(long)]
    cutoff_hz: Option<f64>,

    /// Publish loop rate [Hz]
    #[arg(long)]
    publish_rate: Option<f64>,
}

impl Args {
    fn tracker_config(&self) -> Result<TrackerConfig> {
        let mut config = match &self.config {
            Some(path) => TrackerConfig::from_json_file(path)?,
            None => TrackerConfig::default(),
        };
        if let Some(v) = self.window_size {
            config.window_size = v;
        }
        if let Some(v) = self.outlier_threshold {
            config.outlier_threshold_deg = v;
        }
        if let Some(v) = self.sample_interval {
            config.sample_interval_s = v;
        }
        if let Some(v) = self.process_noise {
            config.process_noise = v;
        }
        if let Some(v) = self.cutoff_hz {
            config.cutoff_hz = v;
        }
        if let Some(v) = self.publish_rate {
            config.publish_rate_hz = v;
        }
        config.validate()?;
        Ok(config)
    }

    fn read_samples(&self) -> Result<Vec<AngleSample>> {
        if self.input == "-" {
            transport::read_angle_samples(io::stdin().lock())
        } else {
            let file = File::open(&self.input)
                .with_context(|| format!("opening sample file {}", self.input))?;
            transport::read_angle_samples(BufReader::new(file))
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let config = args.tracker_config()?;
    let samples = args.read_samples()?;
    log::info!(
        "replaying {} samples (window={}, threshold={}°, dt={:.4}s, a={}, fcut={} Hz, publish={} Hz)",
        samples.len(),
        config.window_size,
        config.outlier_threshold_deg,
        config.sample_interval_s,
        config.process_noise,
        config.cutoff_hz,
        config.publish_rate_hz
    );

    let tracker = Arc::new(TrackerState::new(config.clone())?);
    let (sample_tx, sample_rx) = mpsc::channel::<AngleSample>(64);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let sample_handle = tokio::spawn(transport::run_sample_loop(tracker.clone(), sample_rx));

    let publish_tracker = tracker.clone();
    let publish_rate = config.publish_rate_hz;
    // stdout writes block, so they happen on the blocking pool
    let (mut publisher, writer_handle) = transport::spawn_json_writer(io::stdout(), 256);
    let publish_handle = tokio::spawn(async move {
        let published =
            transport::run_publish_loop(publish_tracker, publish_rate, &mut publisher, shutdown_rx)
                .await;
        if publisher.dropped() > 0 {
            log::warn!("{} samples dropped by a slow writer", publisher.dropped());
        }
        published
    });

    let ctrl_c_tx = shutdown_tx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::info!("interrupt received, shutting down");
            let _ = ctrl_c_tx.send(true);
        }
    });

    // Pace the replay like a live sensor stream
    let mut ticker = interval(Duration::from_secs_f64(config.sample_interval_s));
    for sample in samples {
        if *shutdown_tx.borrow() {
            break;
        }
        ticker.tick().await;
        if sample_tx.send(sample).await.is_err() {
            log::warn!("sample loop exited early");
            break;
        }
    }
    drop(sample_tx);
    let accepted = sample_handle.await?;

    // Give the publish loop a couple of ticks to drain the final sample
    sleep(Duration::from_secs_f64(2.0 / publish_rate)).await;
    let _ = shutdown_tx.send(true);
    let published = publish_handle.await??;
    writer_handle.await??;

    log::info!(
        "done: {} samples accepted, {} published, {} flips corrected",
        accepted,
        published,
        tracker.corrections()?
    );
    Ok(())
}
