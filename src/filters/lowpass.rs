use std::f64::consts::PI;

use crate::error::{ensure_finite, ensure_positive, Result, TrackerError};

pub const DEFAULT_CUTOFF_HZ: f64 = 10.0;

/// Single-pole exponential low-pass filter.
///
/// The blend coefficient is recomputed from `dt` on every call, so samples
/// may arrive at irregular intervals.
#[derive(Clone, Debug)]
pub struct Smoother {
    cutoff_hz: f64,
    value: f64,
    initialized: bool,
}

impl Smoother {
    pub fn new(cutoff_hz: f64) -> Result<Self> {
        if !(cutoff_hz.is_finite() && cutoff_hz > 0.0) {
            return Err(TrackerError::InvalidConfig(format!(
                "cutoff_hz must be positive and finite, got {cutoff_hz}"
            )));
        }
        Ok(Self {
            cutoff_hz,
            value: 0.0,
            initialized: false,
        })
    }

    /// RC time constant [s]: 1 / (2π fcut)
    pub fn time_constant(&self) -> f64 {
        1.0 / (2.0 * PI * self.cutoff_hz)
    }

    /// Blend `x` into the filtered value over an interval of `dt` seconds
    pub fn update(&mut self, x: f64, dt: f64) -> Result<()> {
        ensure_finite("smoother input", x)?;
        ensure_positive("dt", dt)?;

        if !self.initialized {
            self.value = x;
            self.initialized = true;
            return Ok(());
        }

        let c0 = dt / (self.time_constant() + dt);
        self.value = c0 * x + (1.0 - c0) * self.value;
        Ok(())
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn cutoff_hz(&self) -> f64 {
        self.cutoff_hz
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn reset(&mut self) {
        self.initialized = false;
    }
}
