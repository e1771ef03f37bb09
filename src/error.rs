use thiserror::Error;

/// Angle tracker error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TrackerError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Innovation covariance is not positive definite")]
    SingularInnovation,

    #[error("Tracker lock poisoned")]
    LockPoisoned,
}

/// Result type for tracker operations
pub type Result<T> = std::result::Result<T, TrackerError>;

/// Reject NaN and infinite values before they reach filter state
pub fn ensure_finite(name: &str, value: f64) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(TrackerError::InvalidInput(format!(
            "{name} must be finite, got {value}"
        )))
    }
}

/// Reject zero, negative and non-finite values
pub fn ensure_positive(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(TrackerError::InvalidInput(format!(
            "{name} must be positive and finite, got {value}"
        )))
    }
}
