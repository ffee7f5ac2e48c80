//! Error types for zone construction and persistence.

use rh_actuation::ActuationError;
use rh_controls::ControlError;
use thiserror::Error;

/// Result type for zone operations.
pub type ZoneResult<T> = Result<T, ZoneError>;

/// Errors that can occur constructing or persisting a zone.
#[derive(Debug, Error)]
pub enum ZoneError {
    /// Rejected configuration. Fatal at construction time; a zone never
    /// activates with an invalid configuration.
    #[error("Configuration error: {what}")]
    Configuration { what: String },

    #[error(transparent)]
    Control(#[from] ControlError),

    #[error(transparent)]
    Actuation(#[from] ActuationError),

    /// Persisted-state snapshot could not be encoded or decoded.
    #[error("Persistence error: {0}")]
    Persistence(#[from] serde_json::Error),

    /// Zone configuration file could not be read.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Zone configuration file could not be parsed.
    #[error("Config parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
}

impl ZoneError {
    pub(crate) fn config(what: impl Into<String>) -> Self {
        Self::Configuration { what: what.into() }
    }
}
