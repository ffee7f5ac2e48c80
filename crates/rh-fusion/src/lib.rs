//! Multi-sensor fusion for a single heating zone.
//!
//! Fuses N floor and M room temperature readings plus aggregate heater power
//! into stabilized floor/room temperature and rate-of-change estimates.
//!
//! # Architecture
//!
//! The floor and room axes are decoupled in the state-transition model, so
//! instead of one dense 4x4 filter the estimator runs two independent
//! 2-state (temperature, velocity) linear-Gaussian blocks and applies one
//! closed-form scalar measurement update per valid sensor reading:
//! - Duplicate sensors per axis are fused, not pre-averaged, so each
//!   sensor's noise class is respected
//! - Absent readings contribute nothing (gating), they are never zero-filled
//! - With zero valid readings a tick is predict-only; the estimate is never
//!   fabricated

pub mod axis;
pub mod estimator;
pub mod tuning;

pub use axis::AxisFilter;
pub use estimator::{FusionEstimator, FusionState};
pub use tuning::FusionTuning;
