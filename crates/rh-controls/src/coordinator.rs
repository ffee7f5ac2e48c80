//! Dual-PID min-selector coordination.
//!
//! A room-comfort loop and a floor-limiter loop run side by side; the floor
//! loop tracks a dynamic floor target derived from the room state, and the
//! smaller of the two demands wins. When comfort maintenance is active and
//! the room has reached its setpoint, the floor loop takes over outright so
//! the floor stays pleasantly warm without overshooting the room.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::pid::PidController;

/// Immutable per-tick configuration snapshot for demand calculation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControlConfig {
    /// Absolute floor temperature ceiling (material safety).
    pub max_floor_temp: f64,
    /// Target floor-over-room differential.
    pub comfort_offset: f64,
    /// Keep the floor at the comfort offset even once the room is satisfied.
    pub maintain_comfort: bool,
    /// Margin kept below `max_floor_temp` so the dynamic target never sits
    /// on the hard veto limit.
    pub safety_hysteresis: f64,
    /// Allow a temporarily hotter floor on large setpoint changes.
    pub boost_mode: bool,
    /// Room error that arms the boost relaxation.
    pub boost_temp_diff: f64,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            max_floor_temp: 28.0,
            comfort_offset: 5.0,
            maintain_comfort: false,
            safety_hysteresis: 0.25,
            boost_mode: false,
            boost_temp_diff: 1.5,
        }
    }
}

/// Result of one dual-PID calculation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DemandResult {
    pub room_demand: f64,
    pub floor_demand: f64,
    pub final_demand: f64,
    pub floor_target: f64,
}

/// Owns the room and floor-limiter PID loops and combines their outputs.
#[derive(Debug, Clone)]
pub struct DualPidCoordinator {
    room_pid: PidController,
    floor_pid: PidController,
}

impl DualPidCoordinator {
    pub fn new(room_pid: PidController, floor_pid: PidController) -> Self {
        Self {
            room_pid,
            floor_pid,
        }
    }

    /// Dynamic floor-temperature setpoint for the limiter loop.
    pub fn floor_target(&self, room_temp: f64, target_room: f64, config: &ControlConfig) -> f64 {
        let floor_target = if config.maintain_comfort {
            // Heating up: hold the offset above the room setpoint. Once the
            // room is satisfied, track the current room temperature instead
            // so the floor is allowed to relax.
            config.comfort_offset + target_room.max(room_temp)
        } else {
            let mut offset = config.comfort_offset;
            if config.boost_mode {
                let temp_error = target_room - room_temp;
                if temp_error >= config.boost_temp_diff {
                    // Relax the differential, capped at 2.5x the normal offset.
                    offset = (config.comfort_offset + temp_error)
                        .min(config.comfort_offset * 2.5);
                }
            }
            room_temp + offset
        };

        // Absolute guard: stay clear of the hard veto limit.
        if floor_target >= config.max_floor_temp {
            config.max_floor_temp - config.safety_hysteresis
        } else {
            floor_target
        }
    }

    /// Run both loops and combine their demands.
    ///
    /// Anti-windup goes to whichever loop is currently suppressed, never to
    /// the one in control.
    pub fn calculate(
        &mut self,
        room_temp: f64,
        target_room: f64,
        floor_temp: f64,
        config: &ControlConfig,
        dt: f64,
    ) -> DemandResult {
        let floor_target = self.floor_target(room_temp, target_room, config);

        let room_demand = self.room_pid.calculate(target_room, room_temp, dt);
        let floor_demand = self.floor_pid.calculate(floor_target, floor_temp, dt);

        let final_demand = if config.maintain_comfort && room_temp >= target_room {
            // Room satisfied: the floor loop is the demand generator and the
            // room loop's output is ignored entirely.
            self.room_pid.pause_integration();
            floor_demand
        } else {
            let final_demand = room_demand.min(floor_demand);
            if final_demand < room_demand {
                // Floor limit is the binding constraint.
                debug!(
                    room_demand,
                    floor_demand, final_demand, "room loop restricted by floor limit"
                );
                self.room_pid.pause_integration();
            }
            final_demand
        };

        DemandResult {
            room_demand,
            floor_demand,
            final_demand,
            floor_target,
        }
    }

    /// Room-loop integral error, for diagnostics.
    pub fn room_integral_error(&self) -> f64 {
        self.room_pid.integral_error()
    }

    /// Floor-loop integral error, for diagnostics.
    pub fn floor_integral_error(&self) -> f64 {
        self.floor_pid.integral_error()
    }

    /// Reset both loops (mode OFF -> HEAT transition).
    pub fn reset(&mut self) {
        self.room_pid.reset();
        self.floor_pid.reset();
    }
}
