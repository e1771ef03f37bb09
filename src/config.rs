use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TrackerError};
use crate::filters::lowpass::DEFAULT_CUTOFF_HZ;
use crate::filters::outlier::{DEFAULT_THRESHOLD_DEG, DEFAULT_WINDOW_SIZE};
use crate::filters::rate_kf::{DEFAULT_PROCESS_NOISE, DEFAULT_SAMPLE_INTERVAL_S};

pub const DEFAULT_PUBLISH_RATE_HZ: f64 = 30.0;
/// Covers both [0, 360) and (-180, 180] sensor conventions
pub const DEFAULT_INPUT_RANGE_DEG: [f64; 2] = [-360.0, 360.0];

/// Tuning for the filter pipeline and the publish loop
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Outlier correction window length N
    pub window_size: usize,
    /// Deviation from the window mean that counts as a flip [deg]
    pub outlier_threshold_deg: f64,
    /// Fixed sample interval used by the estimator and smoother [s]
    pub sample_interval_s: f64,
    /// Process noise constant `a` for the rate estimator
    pub process_noise: f64,
    /// Low-pass cutoff frequency [Hz]
    pub cutoff_hz: f64,
    /// Publish loop rate [Hz]
    pub publish_rate_hz: f64,
    /// Inclusive [min, max] accepted raw reading [deg]; `null` disables the check
    pub input_range_deg: Option<[f64; 2]>,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_WINDOW_SIZE,
            outlier_threshold_deg: DEFAULT_THRESHOLD_DEG,
            sample_interval_s: DEFAULT_SAMPLE_INTERVAL_S,
            process_noise: DEFAULT_PROCESS_NOISE,
            cutoff_hz: DEFAULT_CUTOFF_HZ,
            publish_rate_hz: DEFAULT_PUBLISH_RATE_HZ,
            input_range_deg: Some(DEFAULT_INPUT_RANGE_DEG),
        }
    }
}

impl TrackerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.window_size == 0 {
            return Err(TrackerError::InvalidConfig(
                "window_size must be at least 1".to_string(),
            ));
        }
        let positive = [
            ("outlier_threshold_deg", self.outlier_threshold_deg),
            ("sample_interval_s", self.sample_interval_s),
            ("process_noise", self.process_noise),
            ("cutoff_hz", self.cutoff_hz),
            ("publish_rate_hz", self.publish_rate_hz),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(TrackerError::InvalidConfig(format!(
                    "{name} must be positive and finite, got {value}"
                )));
            }
        }
        if let Some([min, max]) = self.input_range_deg {
            if !(min.is_finite() && max.is_finite() && min < max) {
                return Err(TrackerError::InvalidConfig(format!(
                    "input_range_deg must be finite with min < max, got [{min}, {max}]"
                )));
            }
        }
        Ok(())
    }

    /// Reject raw readings outside the configured device range
    pub fn check_input_range(&self, angle: f64) -> Result<()> {
        match self.input_range_deg {
            Some([min, max]) if !(min..=max).contains(&angle) => Err(TrackerError::InvalidInput(
                format!("angle {angle} outside device range [{min}, {max}]"),
            )),
            _ => Ok(()),
        }
    }

    /// Parse a JSON config; missing fields take their defaults
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: TrackerConfig = serde_json::from_str(json)
            .map_err(|e| TrackerError::InvalidConfig(format!("malformed config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|e| {
            TrackerError::InvalidConfig(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_json_str(&json)
    }
}
