//! Linear algebra type system for the rate estimator
//!
//! Fixed-size aliases give compile-time dimension checking for the
//! single-observation Kalman filter.

use nalgebra::{SMatrix, SVector};

// ===== State Dimensions =====
pub const STATE_DIM: usize = 3; // (angle, rate, rate-of-rate)

// ===== Measurement Dimensions =====
pub const MEASURE_DIM_ANGLE: usize = 1; // angle only

pub type StateVec3 = SVector<f64, STATE_DIM>;
pub type StateMat3 = SMatrix<f64, STATE_DIM, STATE_DIM>;

// Observation types
pub type ObservationVec = SVector<f64, MEASURE_DIM_ANGLE>;
pub type ObservationMatrix = SMatrix<f64, MEASURE_DIM_ANGLE, STATE_DIM>; // 1×3
pub type ObservationNoise = SMatrix<f64, MEASURE_DIM_ANGLE, MEASURE_DIM_ANGLE>; // 1×1

// Kalman gain type
pub type KalmanGain = SMatrix<f64, STATE_DIM, MEASURE_DIM_ANGLE>; // 3×1
