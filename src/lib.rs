//! Rotational angle tracking core.
//!
//! Raw, wrapped angle readings go through unwrapping, ±180° flip repair, a
//! constant-acceleration Kalman rate estimator and a single-pole low-pass
//! smoother. [`TrackerState`] runs that pipeline under one lock and hands the
//! latest (angle, rate) pair to a periodic publisher at most once.

pub mod config;
pub mod error;
pub mod filters;
pub mod tracker;
pub mod transport;
pub mod types;

pub use config::TrackerConfig;
pub use error::{Result, TrackerError};
pub use tracker::{Clock, SystemClock, TrackerState};
pub use types::{AngleSample, PublishableSample};
