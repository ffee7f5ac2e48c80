//! Time-proportional actuation with latched cycles.
//!
//! A fixed-length cycle converts the demand into an on-window at the front
//! of the cycle. The window is **latched** when the cycle starts: demand
//! changes between cycle boundaries do not move the window, which turns a
//! noisy demand signal into a stable average duty and keeps the relay from
//! chattering. The minimum-duration clamp rounds windows shorter than the
//! relay-protection threshold down to "off all cycle" and windows within
//! the threshold of a full cycle up to "on all cycle".

use crate::error::{ActuationError, ActuationResult};
use rh_core::clamp_demand;
use tracing::debug;

/// Diagnostic snapshot of the current cycle position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CycleInfo {
    /// Seconds into the current cycle (0 when no cycle has started).
    pub time_in_cycle: f64,
    /// Cycle length in seconds.
    pub cycle_period: f64,
}

/// Time-proportional relay actuator for a single heater circuit.
#[derive(Debug, Clone)]
pub struct TpiActuator {
    cycle_period: f64,
    min_cycle_duration: f64,
    cycle_start: Option<f64>,
    latched_on_duration: f64,
}

impl TpiActuator {
    /// Create an actuator. The cycle period must be positive and longer
    /// than the minimum on/off duration.
    pub fn new(cycle_period: f64, min_cycle_duration: f64) -> ActuationResult<Self> {
        if !cycle_period.is_finite() || cycle_period <= 0.0 {
            return Err(ActuationError::InvalidArg {
                what: "cycle_period must be positive",
            });
        }
        if !min_cycle_duration.is_finite() || min_cycle_duration < 0.0 {
            return Err(ActuationError::InvalidArg {
                what: "min_cycle_duration must be non-negative",
            });
        }
        if min_cycle_duration >= cycle_period {
            return Err(ActuationError::InvalidArg {
                what: "min_cycle_duration must be shorter than cycle_period",
            });
        }
        Ok(Self {
            cycle_period,
            min_cycle_duration,
            cycle_start: None,
            latched_on_duration: 0.0,
        })
    }

    /// Desired relay state at time `now` for the given demand.
    ///
    /// The demand only takes effect at latch points (first call, cycle
    /// rollover, or after [`reset_cycle`](Self::reset_cycle)); between them
    /// the previously latched window decides.
    pub fn relay_state(&mut self, demand_percent: f64, now: f64) -> bool {
        let demand = clamp_demand(demand_percent);
        if demand != demand_percent {
            debug!(demand_percent, "demand outside 0-100, clamped");
        }

        let start = match self.cycle_start {
            Some(start) if now - start < self.cycle_period => start,
            _ => {
                // Latch point: start a new cycle and freeze its on-window.
                self.latched_on_duration = self.clamp_on_duration(demand);
                self.cycle_start = Some(now);
                now
            }
        };

        now - start < self.latched_on_duration
    }

    /// Force a relatch on the next evaluation (forced recompute). Calling
    /// this with no cycle pending is a no-op.
    pub fn reset_cycle(&mut self) {
        self.cycle_start = None;
    }

    /// The on-window latched for the current cycle, in seconds.
    pub fn latched_on_duration(&self) -> f64 {
        self.latched_on_duration
    }

    /// Diagnostic cycle position at time `now`.
    pub fn cycle_info(&self, now: f64) -> CycleInfo {
        let time_in_cycle = match self.cycle_start {
            Some(start) => (now - start).max(0.0) % self.cycle_period,
            None => 0.0,
        };
        CycleInfo {
            time_in_cycle,
            cycle_period: self.cycle_period,
        }
    }

    /// On-window for a demand, with relay-protection clamping applied.
    fn clamp_on_duration(&self, demand: f64) -> f64 {
        let on_duration = demand / 100.0 * self.cycle_period;
        if on_duration < self.min_cycle_duration {
            0.0
        } else if on_duration > self.cycle_period - self.min_cycle_duration {
            self.cycle_period
        } else {
            on_duration
        }
    }
}
