pub mod linalg;

pub use linalg::*;

use serde::{Deserialize, Serialize};

/// Raw angle reading delivered by the transport, in device degrees
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AngleSample {
    pub angle: f64,
    /// Source timestamp in seconds, when the transport provides one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<f64>,
}

impl AngleSample {
    pub fn new(angle: f64) -> Self {
        Self {
            angle,
            timestamp: None,
        }
    }

    pub fn with_timestamp(mut self, timestamp: f64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }
}

/// Filtered output handed to the transport's publish operation
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PublishableSample {
    pub timestamp: f64,
    /// Smoothed, unwrapped angle [deg]
    pub angle: f64,
    /// Estimated angular rate [deg/s]
    pub rate: f64,
    /// Pipeline pass that produced this sample (1-based)
    pub sequence: u64,
}
