use std::sync::{Mutex, MutexGuard};

use chrono::Utc;

use crate::config::TrackerConfig;
use crate::error::{ensure_finite, Result, TrackerError};
use crate::filters::{AngleUnwrapper, OutlierCorrector, RateEstimate, RateEstimator, Smoother};
use crate::types::{AngleSample, PublishableSample};

/// Time source for publish timestamps
pub trait Clock: Send + Sync {
    /// Seconds since the Unix epoch
    fn now(&self) -> f64;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> f64 {
        current_timestamp()
    }
}

pub fn current_timestamp() -> f64 {
    Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

/// Everything the lock protects
struct Pipeline {
    unwrapper: AngleUnwrapper,
    corrector: OutlierCorrector,
    estimator: RateEstimator,
    smoother: Smoother,
    angle: f64,
    rate: f64,
    sequence: u64,
    dirty: bool,
}

impl Pipeline {
    fn new(config: &TrackerConfig) -> Result<Self> {
        Ok(Self {
            unwrapper: AngleUnwrapper::new(),
            corrector: OutlierCorrector::new(config.window_size, config.outlier_threshold_deg),
            estimator: RateEstimator::new(config.sample_interval_s, config.process_noise)?,
            smoother: Smoother::new(config.cutoff_hz)?,
            angle: 0.0,
            rate: 0.0,
            sequence: 0,
            dirty: false,
        })
    }

    fn process(&mut self, raw: f64, dt: f64) -> Result<()> {
        // Fallible steps run before any component state is committed
        let mut unwrapper = self.unwrapper.clone();
        let unwrapped = unwrapper.update(raw);
        ensure_finite("unwrapped angle", unwrapped)?;
        let rate = self.estimator.update(unwrapped)?;

        self.unwrapper = unwrapper;
        let fixed = self.corrector.fix(unwrapped);
        self.smoother.update(fixed, dt)?;

        self.angle = self.smoother.value();
        self.rate = rate;
        self.sequence += 1;
        self.dirty = true;
        Ok(())
    }
}

/// Shared tracker state between the sample callback and the publish loop.
///
/// Both operations take the same lock for their whole duration, so a
/// drained sample always comes from one complete pipeline pass. If several
/// samples arrive between drains only the latest is kept.
pub struct TrackerState {
    config: TrackerConfig,
    clock: Box<dyn Clock>,
    inner: Mutex<Pipeline>,
}

impl TrackerState {
    pub fn new(config: TrackerConfig) -> Result<Self> {
        Self::with_clock(config, SystemClock)
    }

    pub fn with_clock(config: TrackerConfig, clock: impl Clock + 'static) -> Result<Self> {
        config.validate()?;
        let pipeline = Pipeline::new(&config)?;
        Ok(Self {
            config,
            clock: Box::new(clock),
            inner: Mutex::new(pipeline),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Pipeline>> {
        self.inner.lock().map_err(|_| TrackerError::LockPoisoned)
    }

    /// Run one raw sample through unwrap → outlier fix → {rate estimator, smoother}
    ///
    /// Non-finite readings and readings outside `input_range_deg` are rejected
    /// before the lock is taken and leave the pipeline untouched.
    pub fn on_sample(&self, sample: AngleSample) -> Result<()> {
        ensure_finite("angle", sample.angle)?;
        self.config.check_input_range(sample.angle)?;
        let mut pipeline = self.lock()?;
        pipeline.process(sample.angle, self.config.sample_interval_s)
    }

    /// Take the latest sample if one was produced since the last drain
    pub fn drain_if_dirty(&self) -> Result<Option<PublishableSample>> {
        let mut pipeline = self.lock()?;
        if !pipeline.dirty {
            return Ok(None);
        }
        pipeline.dirty = false;
        Ok(Some(PublishableSample {
            timestamp: self.clock.now(),
            angle: pipeline.angle,
            rate: pipeline.rate,
            sequence: pipeline.sequence,
        }))
    }

    /// Restart unwrapping, outlier history and smoothing; the rate estimator starts fresh
    pub fn reset(&self) -> Result<()> {
        let fresh = Pipeline::new(&self.config)?;
        let mut pipeline = self.lock()?;
        *pipeline = fresh;
        log::info!("tracker state reset");
        Ok(())
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Number of samples run through the pipeline since construction or reset
    pub fn samples_processed(&self) -> Result<u64> {
        Ok(self.lock()?.sequence)
    }

    pub fn corrections(&self) -> Result<u64> {
        Ok(self.lock()?.corrector.corrections())
    }

    pub fn estimate(&self) -> Result<RateEstimate> {
        Ok(self.lock()?.estimator.get_state())
    }
}
