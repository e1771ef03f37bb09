use std::collections::VecDeque;

pub const DEFAULT_WINDOW_SIZE: usize = 30;
pub const DEFAULT_THRESHOLD_DEG: f64 = 130.0;

/// Size of the flip the sensor produces when it resolves the wrong half-turn
const FLIP_DEG: f64 = 180.0;

/// Sliding-window repair of ±180° ambiguity flips
///
/// A sample that lands at least `threshold_deg` away from the mean of the
/// recent window is shifted back by half a turn. The repaired value replaces
/// the raw one inside the window, so later means are computed over the
/// corrected history.
#[derive(Clone, Debug)]
pub struct OutlierCorrector {
    window: VecDeque<f64>,
    window_size: usize,
    threshold_deg: f64,
    corrections: u64,
}

impl Default for OutlierCorrector {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_SIZE, DEFAULT_THRESHOLD_DEG)
    }
}

impl OutlierCorrector {
    /// Create a corrector over the last `window_size` angles
    pub fn new(window_size: usize, threshold_deg: f64) -> Self {
        OutlierCorrector {
            // One extra slot: the mean is taken before eviction
            window: VecDeque::with_capacity(window_size + 1),
            window_size,
            threshold_deg,
            corrections: 0,
        }
    }

    /// Push an unwrapped angle and return it, flip-corrected once the window is full
    pub fn fix(&mut self, angle: f64) -> f64 {
        self.window.push_back(angle);

        // Warm-up: not enough history to judge
        if self.window.len() <= self.window_size {
            return angle;
        }

        let mean = self.window.iter().sum::<f64>() / self.window.len() as f64;
        self.window.pop_front();

        let Some(last) = self.window.back_mut() else {
            // window_size == 0 leaves nothing to compare against
            return angle;
        };

        let deviation = *last - mean;
        if deviation >= self.threshold_deg {
            *last -= FLIP_DEG;
        } else if deviation <= -self.threshold_deg {
            *last += FLIP_DEG;
        } else {
            return *last;
        }

        self.corrections += 1;
        log::warn!(
            "angle flip corrected: {:.2} -> {:.2} (window mean {:.2})",
            angle,
            *last,
            mean
        );
        *last
    }

    /// Drop all history; the next `window_size` samples pass through unchanged
    pub fn reset(&mut self) {
        self.window.clear();
    }

    /// Number of corrections applied since construction
    pub fn corrections(&self) -> u64 {
        self.corrections
    }

    /// Get current window length (actual, not max)
    pub fn len(&self) -> usize {
        self.window.len()
    }

    /// Check if window is empty
    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    /// Mean of the stored window, `None` while empty
    pub fn window_mean(&self) -> Option<f64> {
        if self.window.is_empty() {
            None
        } else {
            Some(self.window.iter().sum::<f64>() / self.window.len() as f64)
        }
    }
}
