//! Zone-level fusion estimator: floor axis + room axis + gating.

use rh_core::Reading;
use tracing::trace;

use crate::axis::AxisFilter;
use crate::tuning::FusionTuning;

/// Default initial temperature for both axes before any measurement arrives.
const INITIAL_TEMP: f64 = 20.0;

/// Snapshot of the fused state vector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FusionState {
    pub floor_temp: f64,
    pub floor_velocity: f64,
    pub room_temp: f64,
    pub room_velocity: f64,
}

/// Fuses floor/room temperature readings and heater power into continuous
/// floor and room temperature estimates.
///
/// Call [`predict`](Self::predict) once per tick with the elapsed time and
/// current heater power, then [`update`](Self::update) with whatever readings
/// are valid this tick. A tick with zero valid readings is predict-only.
#[derive(Debug, Clone)]
pub struct FusionEstimator {
    floor: AxisFilter,
    room: AxisFilter,
    tuning: FusionTuning,
}

impl FusionEstimator {
    pub fn new(tuning: FusionTuning) -> Self {
        Self {
            floor: AxisFilter::new(
                INITIAL_TEMP,
                tuning.floor_gain,
                tuning.q_var_floor,
                tuning.velocity_damping,
            ),
            room: AxisFilter::new(
                INITIAL_TEMP,
                tuning.room_gain,
                tuning.q_var_room,
                tuning.velocity_damping,
            ),
            tuning,
        }
    }

    /// Propagate both axes by `dt` seconds with heater power `power` (W) as
    /// the control input. The floor axis carries the larger gain: the floor
    /// reacts first and faster than the room.
    pub fn predict(&mut self, dt: f64, power: f64) {
        self.floor.predict(dt, power);
        self.room.predict(dt, power);
    }

    /// Fold in this tick's valid readings. Each present floor reading is one
    /// scalar update on the floor axis, each present room reading one on the
    /// room axis; absent readings are skipped. Returns the number of
    /// measurements applied.
    pub fn update(&mut self, floor_readings: &[Reading], room_readings: &[Reading]) -> usize {
        let mut applied = 0;
        for reading in floor_readings {
            if let Some(z) = reading.value() {
                self.floor.update(z, self.tuning.r_var_floor);
                applied += 1;
            }
        }
        for reading in room_readings {
            if let Some(z) = reading.value() {
                self.room.update(z, self.tuning.r_var_room);
                applied += 1;
            }
        }
        trace!(
            applied,
            floor_temp = self.floor.position(),
            room_temp = self.room.position(),
            "fusion update"
        );
        applied
    }

    /// Fused floor temperature.
    pub fn floor_temp(&self) -> f64 {
        self.floor.position()
    }

    /// Fused room temperature.
    pub fn room_temp(&self) -> f64 {
        self.room.position()
    }

    /// Full state snapshot.
    pub fn state(&self) -> FusionState {
        FusionState {
            floor_temp: self.floor.position(),
            floor_velocity: self.floor.velocity(),
            room_temp: self.room.position(),
            room_velocity: self.room.velocity(),
        }
    }
}
