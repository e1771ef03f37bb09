//! Constant-acceleration Kalman filter for angular rate
//!
//! State Vector (3D):
//! [0]: Angle [deg]
//! [1]: Rate [deg/s]
//! [2]: Rate-of-rate [deg/s²]
//!
//! Only the angle channel is observed. Rate and rate-of-rate are inferred
//! from the process model.

use nalgebra::linalg::Cholesky;
use crate::error::{ensure_finite, Result, TrackerError};
use crate::types::{
    KalmanGain, ObservationMatrix, ObservationNoise, ObservationVec, StateMat3, StateVec3,
};

pub const DEFAULT_SAMPLE_INTERVAL_S: f64 = 1.0 / 30.0;
pub const DEFAULT_PROCESS_NOISE: f64 = 0.1;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RateEstimate {
    pub angle: f64,
    pub rate: f64,
    pub rate_of_rate: f64,
    /// Covariance trace for uncertainty
    pub covariance_trace: f64,
    pub updates: u64,
}

#[derive(Clone, Debug)]
pub struct RateEstimator {
    /// Time step [seconds]
    dt: f64,

    /// State vector [3D]
    state: StateVec3,

    /// Covariance matrix [3x3]
    covariance: StateMat3,

    /// Process noise matrix [3x3]
    process_noise: StateMat3,

    /// State transition for interval dt
    transition: StateMat3,

    /// Angle-only observation [1x3]
    observation: ObservationMatrix,

    /// Observation noise [1x1]
    observation_noise: ObservationNoise,

    updates: u64,
}

impl Default for RateEstimator {
    fn default() -> Self {
        Self {
            dt: DEFAULT_SAMPLE_INTERVAL_S,
            state: StateVec3::zeros(),
            covariance: StateMat3::identity(),
            process_noise: Self::build_process_noise(
                DEFAULT_SAMPLE_INTERVAL_S,
                DEFAULT_PROCESS_NOISE,
            ),
            transition: Self::build_transition(DEFAULT_SAMPLE_INTERVAL_S),
            observation: ObservationMatrix::new(1.0, 0.0, 0.0),
            observation_noise: ObservationNoise::identity(),
            updates: 0,
        }
    }
}

impl RateEstimator {
    /// Create an estimator for a fixed sample interval `dt` [s] and process noise constant `a`
    pub fn new(dt: f64, process_noise: f64) -> Result<Self> {
        if !(dt.is_finite() && dt > 0.0) {
            return Err(TrackerError::InvalidConfig(format!(
                "sample interval must be positive and finite, got {dt}"
            )));
        }
        if !(process_noise.is_finite() && process_noise > 0.0) {
            return Err(TrackerError::InvalidConfig(format!(
                "process noise must be positive and finite, got {process_noise}"
            )));
        }

        Ok(Self {
            dt,
            process_noise: Self::build_process_noise(dt, process_noise),
            transition: Self::build_transition(dt),
            ..Self::default()
        })
    }

    /// Q = diag(a, a/dt, a/dt²)
    fn build_process_noise(dt: f64, a: f64) -> StateMat3 {
        StateMat3::from_diagonal(&StateVec3::new(a, a / dt, a / (dt * dt)))
    }

    fn build_transition(dt: f64) -> StateMat3 {
        StateMat3::new(
            1.0, dt, 0.5 * dt * dt, //
            0.0, 1.0, dt, //
            0.0, 0.0, 1.0,
        )
    }

    fn predict(&mut self) {
        let f = &self.transition;
        self.state = f * self.state;
        self.covariance = f * self.covariance * f.transpose() + self.process_noise;
    }

    /// K = P Hᵀ S⁻¹, via a Cholesky solve of S Kᵀ = H P
    fn kalman_gain(&self) -> Result<KalmanGain> {
        let h = &self.observation;
        let p = &self.covariance;
        let s = h * p * h.transpose() + self.observation_noise;
        let chol = Cholesky::new(s).ok_or(TrackerError::SingularInnovation)?;
        // P is symmetric, so (H P)ᵀ = P Hᵀ
        let gain_t = chol.solve(&(h * p));
        Ok(gain_t.transpose())
    }

    /// Run one predict/observe cycle on `angle` [deg], returns the updated rate [deg/s]
    pub fn update(&mut self, angle: f64) -> Result<f64> {
        ensure_finite("angle", angle)?;

        // Work on a copy so a failed gain solve leaves the filter untouched
        let mut next = self.clone();
        next.predict();
        let k = next.kalman_gain()?;

        let h = next.observation;
        let residual = ObservationVec::new(angle) - h * next.state;
        next.state += k * residual;

        // Joseph form: (I - KH) P (I - KH)ᵀ + K R Kᵀ, equal to (I - KH) P for the optimal gain
        let i_kh = StateMat3::identity() - k * h;
        next.covariance = i_kh * next.covariance * i_kh.transpose()
            + k * next.observation_noise * k.transpose();
        next.updates += 1;

        *self = next;
        Ok(self.rate())
    }

    pub fn angle(&self) -> f64 {
        self.state[0]
    }

    pub fn rate(&self) -> f64 {
        self.state[1]
    }

    pub fn rate_of_rate(&self) -> f64 {
        self.state[2]
    }

    pub fn state(&self) -> &StateVec3 {
        &self.state
    }

    pub fn covariance(&self) -> &StateMat3 {
        &self.covariance
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }

    #[cfg(test)]
    pub(crate) fn set_observation_noise(&mut self, variance: f64) {
        self.observation_noise = ObservationNoise::new(variance);
    }

    pub fn get_state(&self) -> RateEstimate {
        RateEstimate {
            angle: self.angle(),
            rate: self.rate(),
            rate_of_rate: self.rate_of_rate(),
            covariance_trace: self.covariance.trace(),
            updates: self.updates,
        }
    }
}
