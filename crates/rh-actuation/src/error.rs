//! Error types for actuation components.

use thiserror::Error;

/// Result type for actuation operations.
pub type ActuationResult<T> = Result<T, ActuationError>;

/// Errors that can occur when building actuation components.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ActuationError {
    /// Invalid argument provided to an actuation constructor.
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    /// No heaters configured.
    #[error("At least one heater must be configured")]
    NoHeaters,
}
