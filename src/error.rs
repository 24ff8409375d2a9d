//! Error types shared by every simulation component

use thiserror::Error;

/// Simulation errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimError {
    #[error("Dimension mismatch: expected length {expected}, found {found}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("Timestep must be positive and finite, got {0}")]
    InvalidTimestep(f64),

    #[error("Invalid parameter `{name}` = {value}: {reason}")]
    InvalidParameter {
        name: &'static str,
        value: f64,
        reason: &'static str,
    },

    #[error("Non-finite value computed for {quantity}")]
    NonFinite { quantity: &'static str },

    #[error("Plant timestep {plant} differs from controller timestep {controller}")]
    TimestepMismatch { plant: f64, controller: f64 },
}

/// Convenience alias used throughout the crate
pub type Result<T> = std::result::Result<T, SimError>;

/// Reject zero, negative and non-finite timesteps
pub(crate) fn check_timestep(dt: f64) -> Result<()> {
    if dt.is_finite() && dt > 0.0 {
        Ok(())
    } else {
        Err(SimError::InvalidTimestep(dt))
    }
}

/// Reject a value that turned NaN or infinite
pub(crate) fn check_finite(value: f64, quantity: &'static str) -> Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(SimError::NonFinite { quantity })
    }
}

/// Reject vectors of different lengths before element-wise arithmetic
pub(crate) fn check_same_len(expected: usize, found: usize) -> Result<()> {
    if expected == found {
        Ok(())
    } else {
        Err(SimError::DimensionMismatch { expected, found })
    }
}
