//! Hard safety interlock on absolute floor temperature.
//!
//! Independent of the comfort-driven floor target: the gate compares the
//! fused floor temperature against the fixed `max_floor_temp` ceiling.
//! A hysteresis band below the ceiling prevents chatter, and a token bucket
//! limits how often the veto may release so a temperature hovering at the
//! limit cannot wear out the relays. Engaging is always permitted.

use tracing::{debug, info, warn};

use crate::bucket::TokenBucket;

/// Binary veto state machine: while vetoed, all demand upstream is forced
/// to zero regardless of the PID result.
#[derive(Debug, Clone)]
pub struct SafetyVetoGate {
    max_floor_temp: f64,
    hysteresis: f64,
    budget: TokenBucket,
    active: bool,
}

impl SafetyVetoGate {
    pub fn new(
        max_floor_temp: f64,
        hysteresis: f64,
        budget_capacity: f64,
        budget_refill_rate: f64,
        now: f64,
    ) -> Self {
        Self {
            max_floor_temp,
            hysteresis,
            budget: TokenBucket::new(budget_capacity, budget_refill_rate, now),
            active: false,
        }
    }

    /// Evaluate the gate for this tick and return whether the veto is active.
    ///
    /// `bypass_hysteresis` is set only on forced recomputation (e.g. a user
    /// setpoint change) so the gate decides immediately instead of holding
    /// inside the hysteresis band.
    pub fn evaluate(
        &mut self,
        floor_temp: Option<f64>,
        room_temp: Option<f64>,
        bypass_hysteresis: bool,
        now: f64,
    ) -> bool {
        // Fail safe: no readings, no heating.
        let (Some(floor_temp), Some(_room_temp)) = (floor_temp, room_temp) else {
            if !self.active {
                warn!("safety veto engaged: missing sensor data, heating disabled");
            }
            self.active = true;
            return true;
        };

        let limit = self.max_floor_temp;
        let should_veto = if floor_temp >= limit {
            true
        } else if !bypass_hysteresis && floor_temp > limit - self.hysteresis {
            // Hysteresis band: hold the previous decision.
            self.active
        } else {
            false
        };

        if should_veto != self.active {
            if should_veto {
                // Engaging protects the hardware and is always allowed, but
                // still counts against the toggle budget.
                self.budget.consume(1.0, now, true);
                warn!(
                    floor_temp,
                    limit, "safety veto engaged: floor at or above hard limit"
                );
                self.active = true;
            } else if self.budget.consume(1.0, now, false) {
                info!(
                    floor_temp,
                    limit, "safety veto released: floor below hysteresis band"
                );
                self.active = false;
            } else {
                // Thermally safe, but the relay-wear budget is exhausted:
                // keep the veto until tokens recover.
                debug!(floor_temp, "safety veto release delayed by toggle budget");
            }
        }

        self.active
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Current budget level, for diagnostics.
    pub fn budget_tokens(&mut self, now: f64) -> f64 {
        self.budget.tokens_at(now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gate() -> SafetyVetoGate {
        // max 28, hysteresis 1, capacity 2 tokens, 1 token per 300 s.
        SafetyVetoGate::new(28.0, 1.0, 2.0, 1.0 / 300.0, 0.0)
    }

    #[test]
    fn missing_readings_force_veto() {
        let mut g = gate();
        assert!(g.evaluate(None, Some(20.0), false, 0.0));
        assert!(g.evaluate(Some(25.0), None, false, 1.0));
        // Bypass does not override the fail-safe.
        assert!(g.evaluate(None, None, true, 2.0));
    }

    #[test]
    fn engages_at_limit_and_holds_in_hysteresis_band() {
        let mut g = gate();
        assert!(!g.evaluate(Some(26.0), Some(20.0), false, 0.0));
        // At the limit: engage.
        assert!(g.evaluate(Some(28.0), Some(20.0), false, 1.0));
        // In the band (27..28): hold the veto.
        assert!(g.evaluate(Some(27.5), Some(20.0), false, 2.0));
        // Below the band: release.
        assert!(!g.evaluate(Some(26.5), Some(20.0), false, 3.0));
        // Back in the band from below: hold the release.
        assert!(!g.evaluate(Some(27.5), Some(20.0), false, 4.0));
    }

    #[test]
    fn bypass_hysteresis_decides_immediately() {
        let mut g = gate();
        assert!(g.evaluate(Some(29.0), Some(20.0), false, 0.0));
        // Inside the band but bypassing: released immediately.
        assert!(!g.evaluate(Some(27.5), Some(20.0), true, 1.0));
    }

    #[test]
    fn budget_sequence_delays_release() {
        let mut g = gate();

        // Engage at 29: forced consume, 2 -> 1.
        assert!(g.evaluate(Some(29.0), Some(20.0), false, 0.0));
        assert_eq!(g.budget_tokens(0.0), 1.0);

        // Release at 26: 1 -> 0.
        assert!(!g.evaluate(Some(26.0), Some(20.0), false, 0.0));
        assert_eq!(g.budget_tokens(0.0), 0.0);

        // Re-engage at 29: forced, 0 -> -1.
        assert!(g.evaluate(Some(29.0), Some(20.0), false, 0.0));
        assert_eq!(g.budget_tokens(0.0), -1.0);

        // Thermally safe but broke: release denied.
        assert!(g.evaluate(Some(26.0), Some(20.0), false, 0.0));
        assert!(g.is_active());

        // 600 s later the bucket is back to +1: release succeeds.
        assert!(!g.evaluate(Some(26.0), Some(20.0), false, 600.0));
        assert_eq!(g.budget_tokens(600.0), 0.0);
    }
}
