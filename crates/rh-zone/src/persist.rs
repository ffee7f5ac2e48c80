//! Minimal state that survives restarts.
//!
//! Only the user's setpoint, the operating mode and the cumulative relay
//! toggle counter are worth keeping. Fusion, PID, veto and cycle state all
//! re-initialize from defaults on restart: they re-converge within a few
//! ticks and stale values would be worse than none.

use serde::{Deserialize, Serialize};

use crate::control_loop::Mode;
use crate::error::ZoneResult;

/// Snapshot persisted across restarts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PersistedState {
    pub target_temp: Option<f64>,
    pub mode: Mode,
    pub relay_toggle_count: u64,
}

impl PersistedState {
    /// Encode as JSON for the host's storage.
    pub fn to_json(&self) -> ZoneResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode a snapshot written by [`to_json`](Self::to_json).
    pub fn from_json(json: &str) -> ZoneResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
