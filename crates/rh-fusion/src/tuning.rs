//! Tuning parameters for the fusion estimator.

use serde::{Deserialize, Serialize};

/// Tuning for a slow, stable response.
///
/// Lower gain = slower reaction to power. Lower process noise = smoother
/// state transitions. Higher measurement noise = more immunity to sensor
/// noise (floor probes sit in the screed and read noisier than room air
/// sensors, so they carry a larger variance).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionTuning {
    /// Power-input gain on the floor axis. The floor reacts first and fastest.
    pub floor_gain: f64,
    /// Power-input gain on the room axis, an order of magnitude below the floor.
    pub room_gain: f64,
    /// Process noise variance, floor axis.
    pub q_var_floor: f64,
    /// Process noise variance, room axis.
    pub q_var_room: f64,
    /// Measurement noise variance for floor sensors.
    pub r_var_floor: f64,
    /// Measurement noise variance for room sensors.
    pub r_var_room: f64,
    /// Velocity damping factor in the transition matrix, <= 1. Values below
    /// one bleed off accumulated velocity so sustained power input cannot
    /// launch the estimate.
    pub velocity_damping: f64,
}

impl Default for FusionTuning {
    fn default() -> Self {
        Self {
            floor_gain: 1e-5,
            room_gain: 1e-6,
            q_var_floor: 1e-4,
            q_var_room: 1e-5,
            r_var_floor: 0.5,
            r_var_room: 0.2,
            velocity_damping: 0.98,
        }
    }
}
