//! PID loop with heating-only integral clamping.
//!
//! Two details matter for floor heating:
//! - The integral is clamped to `[0, 100/ki]`: the loop can saturate fully
//!   on but never accumulates "cooling debt" (a heater cannot cool).
//! - The derivative acts on the **measurement**, not the error, so a
//!   setpoint step does not kick the output.

use crate::error::{ControlError, ControlResult};
use rh_core::clamp_demand;

/// Proportional-integral-derivative controller producing a 0-100% demand.
#[derive(Debug, Clone)]
pub struct PidController {
    kp: f64,
    ki: f64,
    kd: f64,
    integral_error: f64,
    last_process_variable: Option<f64>,
}

impl PidController {
    /// Create a controller. Gains must be finite and non-negative.
    pub fn new(kp: f64, ki: f64, kd: f64) -> ControlResult<Self> {
        for gain in [kp, ki, kd] {
            if !gain.is_finite() || gain < 0.0 {
                return Err(ControlError::InvalidArg {
                    what: "PID gains must be finite and non-negative",
                });
            }
        }
        Ok(Self {
            kp,
            ki,
            kd,
            integral_error: 0.0,
            last_process_variable: None,
        })
    }

    /// Compute the demand for one sample.
    ///
    /// `dt` is the elapsed time in seconds since the previous sample; a zero
    /// `dt` suppresses the derivative term.
    pub fn calculate(&mut self, setpoint: f64, process_variable: f64, dt: f64) -> f64 {
        let error = setpoint - process_variable;

        let p_term = self.kp * error;

        // Integral with anti-windup clamp. ki == 0 pins the integral at zero
        // rather than dividing by it.
        self.integral_error += error * dt;
        let max_integral = if self.ki > 0.0 { 100.0 / self.ki } else { 0.0 };
        self.integral_error = self.integral_error.clamp(0.0, max_integral);
        let i_term = self.ki * self.integral_error;

        // Derivative on the measurement to avoid setpoint kick.
        let d_term = match self.last_process_variable {
            Some(last_pv) if dt > 0.0 => -self.kd * (process_variable - last_pv) / dt,
            _ => 0.0,
        };
        self.last_process_variable = Some(process_variable);

        clamp_demand(p_term + i_term + d_term)
    }

    /// Zero the integral. Called by the coordinator when this loop's output
    /// is not the binding constraint, so it cannot wind up.
    pub fn pause_integration(&mut self) {
        self.integral_error = 0.0;
    }

    /// Current integral error, for diagnostics.
    pub fn integral_error(&self) -> f64 {
        self.integral_error
    }

    /// Clear all state (mode OFF -> HEAT transition).
    pub fn reset(&mut self) {
        self.integral_error = 0.0;
        self.last_process_variable = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn rejects_negative_gains() {
        assert!(PidController::new(-1.0, 0.0, 0.0).is_err());
        assert!(PidController::new(1.0, f64::NAN, 0.0).is_err());
        assert!(PidController::new(80.0, 2.0, 15.0).is_ok());
    }

    #[test]
    fn proportional_only_response() {
        let mut pid = PidController::new(10.0, 0.0, 0.0).unwrap();
        let demand = pid.calculate(22.0, 20.0, 1.0);
        // P = 10 * 2 = 20, no I (ki = 0), no D (first sample).
        assert_eq!(demand, 20.0);
    }

    #[test]
    fn integral_clamps_at_saturation() {
        // kp=0, ki=1, saturating error: integral is bounded at 100/ki = 100
        // and output pins at exactly 100 thereafter.
        let mut pid = PidController::new(0.0, 1.0, 0.0).unwrap();
        let mut demand = 0.0;
        for _ in 0..150 {
            demand = pid.calculate(100.0, 0.0, 1.0);
        }
        assert_eq!(demand, 100.0);
        assert_eq!(pid.integral_error(), 100.0);

        // Still exactly 100 on the next tick, not growing.
        assert_eq!(pid.calculate(100.0, 0.0, 1.0), 100.0);
        assert_eq!(pid.integral_error(), 100.0);
    }

    #[test]
    fn integral_never_goes_negative() {
        let mut pid = PidController::new(0.0, 2.0, 0.0).unwrap();
        // Sustained negative error (room above setpoint).
        for _ in 0..20 {
            pid.calculate(20.0, 25.0, 1.0);
        }
        assert_eq!(pid.integral_error(), 0.0);
    }

    #[test]
    fn derivative_acts_on_measurement() {
        let mut pid = PidController::new(0.0, 0.0, 10.0).unwrap();
        pid.calculate(22.0, 20.0, 1.0);
        // Setpoint jump with a steady measurement: no derivative kick.
        assert_eq!(pid.calculate(30.0, 20.0, 1.0), 0.0);
        // Rising measurement produces a negative (braking) term, clamped at 0.
        assert_eq!(pid.calculate(30.0, 21.0, 1.0), 0.0);
        // Falling measurement produces a positive term.
        let demand = pid.calculate(30.0, 20.0, 1.0);
        assert_eq!(demand, 10.0);
    }

    #[test]
    fn zero_dt_suppresses_derivative() {
        let mut pid = PidController::new(0.0, 0.0, 10.0).unwrap();
        pid.calculate(22.0, 20.0, 1.0);
        assert_eq!(pid.calculate(22.0, 25.0, 0.0), 0.0);
    }

    #[test]
    fn pause_integration_is_idempotent() {
        let mut pid = PidController::new(0.0, 1.0, 0.0).unwrap();
        for _ in 0..10 {
            pid.calculate(30.0, 20.0, 1.0);
        }
        assert!(pid.integral_error() > 0.0);
        pid.pause_integration();
        assert_eq!(pid.integral_error(), 0.0);
        pid.pause_integration();
        assert_eq!(pid.integral_error(), 0.0);
    }

    #[test]
    fn reset_clears_all_state() {
        let mut pid = PidController::new(5.0, 1.0, 10.0).unwrap();
        pid.calculate(25.0, 20.0, 1.0);
        pid.reset();
        assert_eq!(pid.integral_error(), 0.0);
        // First sample after reset has no derivative contribution.
        let mut probe = PidController::new(5.0, 1.0, 10.0).unwrap();
        assert_eq!(
            pid.calculate(25.0, 20.0, 1.0),
            probe.calculate(25.0, 20.0, 1.0)
        );
    }

    proptest! {
        #[test]
        fn output_always_within_demand_range(
            kp in 0.0_f64..200.0,
            ki in 0.0_f64..10.0,
            kd in 0.0_f64..50.0,
            setpoint in -10.0_f64..40.0,
            pv in -10.0_f64..40.0,
            dt in 0.0_f64..120.0,
            steps in 1_usize..50,
        ) {
            let mut pid = PidController::new(kp, ki, kd).unwrap();
            for _ in 0..steps {
                let demand = pid.calculate(setpoint, pv, dt);
                prop_assert!((0.0..=100.0).contains(&demand));
                prop_assert!(pid.integral_error() >= 0.0);
            }
        }
    }
}
