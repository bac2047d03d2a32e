//! Domain-specific error types following panic-free policy.

use thiserror::Error;

/// Errors that can occur in domain operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    /// A frame did not carry the full body topology
    #[error("Invalid landmark count: {got} (expected {expected})")]
    InvalidLandmarkCount { got: usize, expected: usize },

    /// A landmark coordinate was NaN or infinite
    #[error("Non-finite coordinate for landmark {index}")]
    NonFiniteCoordinate { index: usize },

    /// Frame dimensions must be positive
    #[error("Invalid frame size: {width}x{height}")]
    InvalidFrameSize { width: u32, height: u32 },

    /// Exercise key outside the fixed enumeration
    #[error("Unknown exercise type: {0}")]
    UnknownExercise(String),
}

/// Result type for domain operations.
pub type CoreResult<T> = Result<T, CoreError>;
