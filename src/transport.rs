use std::io::{BufRead, Write};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::mpsc::{self, error::TrySendError, Receiver, Sender};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};

use crate::tracker::TrackerState;
use crate::types::{AngleSample, PublishableSample};

/// Sink for filtered samples (topic publisher, socket, file)
pub trait SamplePublisher: Send {
    fn publish(&mut self, sample: &PublishableSample) -> Result<()>;
}

/// Writes one JSON object per published sample
pub struct JsonLinesPublisher<W: Write + Send> {
    writer: W,
}

impl<W: Write + Send> JsonLinesPublisher<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> SamplePublisher for JsonLinesPublisher<W> {
    fn publish(&mut self, sample: &PublishableSample) -> Result<()> {
        serde_json::to_writer(&mut self.writer, sample)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }
}

/// Hands samples to a writer task over a bounded channel.
///
/// Never blocks the publish loop: when the writer falls behind the sample is
/// dropped and counted, the same way sensor loops drop readings on a full channel.
pub struct ChannelPublisher {
    tx: Sender<PublishableSample>,
    dropped: u64,
}

impl ChannelPublisher {
    pub fn new(tx: Sender<PublishableSample>) -> Self {
        Self { tx, dropped: 0 }
    }

    /// Samples discarded because the writer was behind
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

impl SamplePublisher for ChannelPublisher {
    fn publish(&mut self, sample: &PublishableSample) -> Result<()> {
        match self.tx.try_send(*sample) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                self.dropped += 1;
                log::warn!(
                    "[publish] writer behind, dropped #{} ({} so far)",
                    sample.sequence,
                    self.dropped
                );
                Ok(())
            }
            Err(TrySendError::Closed(_)) => anyhow::bail!("writer task has stopped"),
        }
    }
}

/// Run a `JsonLinesPublisher` over `writer` on the blocking thread pool.
///
/// The returned publisher feeds it; once the publisher is dropped the task
/// drains what is queued and hands the writer back.
pub fn spawn_json_writer<W>(writer: W, capacity: usize) -> (ChannelPublisher, JoinHandle<Result<W>>)
where
    W: Write + Send + 'static,
{
    let (tx, mut rx) = mpsc::channel::<PublishableSample>(capacity.max(1));
    let handle = tokio::task::spawn_blocking(move || {
        let mut sink = JsonLinesPublisher::new(writer);
        let mut written = 0u64;
        while let Some(sample) = rx.blocking_recv() {
            sink.publish(&sample)
                .with_context(|| format!("writing sample #{}", sample.sequence))?;
            written += 1;
        }
        log::debug!("[writer] closed after {} samples", written);
        Ok(sink.into_inner())
    });
    (ChannelPublisher::new(tx), handle)
}

/// Keeps every published sample in memory
#[derive(Default)]
pub struct CollectingPublisher {
    pub samples: Vec<PublishableSample>,
}

impl SamplePublisher for CollectingPublisher {
    fn publish(&mut self, sample: &PublishableSample) -> Result<()> {
        self.samples.push(*sample);
        Ok(())
    }
}

/// Feed every received sample into the tracker until the channel closes.
///
/// Invalid samples are logged and skipped. Returns the number accepted.
pub async fn run_sample_loop(tracker: Arc<TrackerState>, mut rx: Receiver<AngleSample>) -> u64 {
    let mut accepted = 0u64;
    while let Some(sample) = rx.recv().await {
        match tracker.on_sample(sample) {
            Ok(()) => {
                accepted += 1;
                if accepted % 300 == 0 {
                    log::debug!("[samples] {} processed", accepted);
                }
            }
            Err(e) => log::warn!("[samples] dropped {:?}: {}", sample, e),
        }
    }
    log::info!("[samples] channel closed after {} samples", accepted);
    accepted
}

/// Publish at most one sample per tick until `shutdown` becomes true.
///
/// A sample still pending at shutdown is not flushed. Returns the number published.
pub async fn run_publish_loop<P: SamplePublisher>(
    tracker: Arc<TrackerState>,
    publish_rate_hz: f64,
    publisher: &mut P,
    mut shutdown: watch::Receiver<bool>,
) -> Result<u64> {
    anyhow::ensure!(
        publish_rate_hz.is_finite() && publish_rate_hz > 0.0,
        "publish rate must be positive, got {publish_rate_hz}"
    );
    let mut ticker = interval(Duration::from_secs_f64(1.0 / publish_rate_hz));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut published = 0u64;

    log::info!("[publish] loop started at {:.1} Hz", publish_rate_hz);
    loop {
        if *shutdown.borrow() {
            break;
        }
        tokio::select! {
            _ = ticker.tick() => {}
            changed = shutdown.changed() => {
                // Sender dropped counts as shutdown
                if changed.is_err() {
                    break;
                }
                continue;
            }
        }

        if let Some(sample) = tracker.drain_if_dirty()? {
            log::debug!(
                "[publish] #{} angle={:.3} rate={:.3}",
                sample.sequence,
                sample.angle,
                sample.rate
            );
            publisher
                .publish(&sample)
                .with_context(|| format!("publishing sample #{}", sample.sequence))?;
            published += 1;
        }
    }
    log::info!("[publish] loop stopped after {} samples", published);
    Ok(published)
}

/// Parse a replay source: one sample per line, either a bare angle or a JSON `AngleSample`.
///
/// Blank lines and `#` comments are skipped.
pub fn read_angle_samples<R: BufRead>(reader: R) -> Result<Vec<AngleSample>> {
    let mut samples = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line_no = idx + 1;
        let line = line.with_context(|| format!("reading line {line_no}"))?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let sample = if trimmed.starts_with('{') {
            serde_json::from_str::<AngleSample>(trimmed)
                .with_context(|| format!("line {line_no}: malformed sample"))?
        } else {
            let angle: f64 = trimmed
                .parse()
                .with_context(|| format!("line {line_no}: expected an angle, got {trimmed:?}"))?;
            AngleSample::new(angle)
        };
        samples.push(sample);
    }
    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TrackerConfig;
    use tokio::sync::mpsc;

    #[test]
    fn test_read_mixed_lines() {
        let input = "# replay\n359\n\n{\"angle\": 1.0, \"timestamp\": 12.5}\n  3.0  \n";
        let samples = read_angle_samples(input.as_bytes()).unwrap();
        assert_eq!(samples.len(), 3);
        assert_eq!(samples[0], AngleSample::new(359.0));
        assert_eq!(samples[1], AngleSample::new(1.0).with_timestamp(12.5));
        assert_eq!(samples[2].angle, 3.0);
    }

    #[test]
    fn test_read_reports_line_number() {
        let err = read_angle_samples("10\nabc\n".as_bytes()).unwrap_err();
        assert!(format!("{err:#}").contains("line 2"));
    }

    #[test]
    fn test_json_lines_publisher() {
        let mut publisher = JsonLinesPublisher::new(Vec::new());
        let sample = PublishableSample {
            timestamp: 1.5,
            angle: 10.0,
            rate: -2.0,
            sequence: 7,
        };
        publisher.publish(&sample).unwrap();
        publisher.publish(&sample).unwrap();
        let text = String::from_utf8(publisher.into_inner()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        let parsed: PublishableSample = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(parsed, sample);
    }

    fn sample(sequence: u64) -> PublishableSample {
        PublishableSample {
            timestamp: sequence as f64,
            angle: 2.0 * sequence as f64,
            rate: 60.0,
            sequence,
        }
    }

    #[tokio::test]
    async fn test_json_writer_runs_off_the_runtime() {
        let (mut publisher, handle) = spawn_json_writer(Vec::new(), 8);
        for seq in 1..=3 {
            publisher.publish(&sample(seq)).unwrap();
        }
        assert_eq!(publisher.dropped(), 0);
        drop(publisher);

        let buf = handle.await.unwrap().unwrap();
        let text = String::from_utf8(buf).unwrap();
        let parsed: Vec<PublishableSample> = text
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(parsed, vec![sample(1), sample(2), sample(3)]);
    }

    #[test]
    fn test_channel_publisher_drops_when_full() {
        let (tx, mut rx) = mpsc::channel(1);
        let mut publisher = ChannelPublisher::new(tx);
        publisher.publish(&sample(1)).unwrap();
        publisher.publish(&sample(2)).unwrap();
        assert_eq!(publisher.dropped(), 1);
        assert_eq!(rx.try_recv().unwrap(), sample(1));

        drop(rx);
        assert!(publisher.publish(&sample(3)).is_err());
    }

    #[tokio::test]
    async fn test_sample_loop_skips_invalid() {
        let tracker = Arc::new(TrackerState::new(TrackerConfig::default()).unwrap());
        let (tx, rx) = mpsc::channel(8);
        for angle in [10.0, f64::NAN, 12.0] {
            tx.send(AngleSample::new(angle)).await.unwrap();
        }
        drop(tx);
        let accepted = run_sample_loop(tracker.clone(), rx).await;
        assert_eq!(accepted, 2);
        assert_eq!(tracker.samples_processed().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_publish_loop_stops_on_shutdown() {
        let tracker = Arc::new(TrackerState::new(TrackerConfig::default()).unwrap());
        tracker.on_sample(AngleSample::new(5.0)).unwrap();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let loop_tracker = tracker.clone();
        let handle = tokio::spawn(async move {
            let mut publisher = CollectingPublisher::default();
            let count = run_publish_loop(loop_tracker, 200.0, &mut publisher, shutdown_rx).await;
            (count, publisher.samples)
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        shutdown_tx.send(true).unwrap();
        let (count, samples) = handle.await.unwrap();
        assert_eq!(count.unwrap(), 1);
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].angle, 5.0);
    }

    #[tokio::test]
    async fn test_publish_loop_rejects_bad_rate() {
        let tracker = Arc::new(TrackerState::new(TrackerConfig::default()).unwrap());
        let (_tx, rx) = watch::channel(false);
        let mut publisher = CollectingPublisher::default();
        assert!(run_publish_loop(tracker, 0.0, &mut publisher, rx).await.is_err());
    }
}
