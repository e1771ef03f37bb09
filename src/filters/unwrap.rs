/// Accumulates bounded angle readings into a continuous angle.
///
/// Each sample contributes the shortest signed delta from the running value,
/// so a reading that crosses the 0/360 seam continues past it instead of
/// jumping back. Inputs must be finite; callers validate before `update`.
#[derive(Clone, Debug, Default)]
pub struct AngleUnwrapper {
    last_unwrapped: Option<f64>,
}

impl AngleUnwrapper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one bounded reading [deg], returns the continuous angle [deg]
    pub fn update(&mut self, angle: f64) -> f64 {
        let value = match self.last_unwrapped {
            None => angle,
            Some(prev) => prev + smallest_signed_angle_between(prev, angle),
        };
        self.last_unwrapped = Some(value);
        value
    }

    /// Next `update` stores its input verbatim
    pub fn reset(&mut self) {
        self.last_unwrapped = None;
    }

    pub fn value(&self) -> Option<f64> {
        self.last_unwrapped
    }

    pub fn is_initialized(&self) -> bool {
        self.last_unwrapped.is_some()
    }
}

/// Signed difference `to - from` mapped into (-180, 180] degrees
pub fn smallest_signed_angle_between(from_deg: f64, to_deg: f64) -> f64 {
    let d = (to_deg - from_deg).to_radians();
    d.sin().atan2(d.cos()).to_degrees()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_first_sample_verbatim() {
        let mut unwrapper = AngleUnwrapper::new();
        assert!(!unwrapper.is_initialized());
        assert_eq!(unwrapper.update(359.0), 359.0);
        assert_eq!(unwrapper.value(), Some(359.0));
    }

    #[test]
    fn test_wrap_forward() {
        let mut unwrapper = AngleUnwrapper::new();
        unwrapper.update(350.0);
        let value = unwrapper.update(10.0);
        assert_abs_diff_eq!(value, 370.0, epsilon = 1e-9);
    }

    #[test]
    fn test_wrap_backward() {
        let mut unwrapper = AngleUnwrapper::new();
        unwrapper.update(5.0);
        let value = unwrapper.update(355.0);
        assert_abs_diff_eq!(value, -5.0, epsilon = 1e-9);
    }

    #[test]
    fn test_wrap_sequence() {
        let mut unwrapper = AngleUnwrapper::new();
        let out: Vec<f64> = [359.0, 1.0, 3.0]
            .iter()
            .map(|&a| unwrapper.update(a))
            .collect();
        assert_abs_diff_eq!(out[0], 359.0, epsilon = 1e-9);
        assert_abs_diff_eq!(out[1], 361.0, epsilon = 1e-9);
        assert_abs_diff_eq!(out[2], 363.0, epsilon = 1e-9);
    }

    #[test]
    fn test_successive_outputs_bounded() {
        let mut unwrapper = AngleUnwrapper::new();
        // Deterministic scramble over [0, 360)
        let mut prev = unwrapper.update(0.0);
        for i in 1..500u64 {
            let raw = ((i * 7919 + i * i * 104_729) % 36_000) as f64 / 100.0;
            let next = unwrapper.update(raw);
            assert!((next - prev).abs() <= 180.0 + 1e-9);
            prev = next;
        }
    }

    #[test]
    fn test_multiple_revolutions() {
        let mut unwrapper = AngleUnwrapper::new();
        let mut value = 0.0;
        for step in 0..=720 {
            value = unwrapper.update((step as f64 * 10.0) % 360.0);
        }
        assert_abs_diff_eq!(value, 7200.0, epsilon = 1e-6);
    }

    #[test]
    fn test_reset() {
        let mut unwrapper = AngleUnwrapper::new();
        unwrapper.update(350.0);
        unwrapper.update(10.0);
        unwrapper.reset();
        assert!(!unwrapper.is_initialized());
        assert_eq!(unwrapper.update(42.0), 42.0);
    }

    #[test]
    fn test_smallest_signed_angle() {
        assert_abs_diff_eq!(smallest_signed_angle_between(10.0, 350.0), -20.0, epsilon = 1e-9);
        assert_abs_diff_eq!(smallest_signed_angle_between(350.0, 10.0), 20.0, epsilon = 1e-9);
        assert_abs_diff_eq!(smallest_signed_angle_between(0.0, 720.0), 0.0, epsilon = 1e-9);
    }
}
