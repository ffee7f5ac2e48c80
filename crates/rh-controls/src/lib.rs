//! Demand-side control for a single heating zone.
//!
//! This crate turns fused temperature estimates into a bounded 0-100%
//! heating demand:
//! - **PidController**: single PID loop with integral clamping, measurement
//!   derivative and externally coordinated anti-windup
//! - **DualPidCoordinator**: room-comfort loop + floor-limiter loop combined
//!   through a min-selector with a comfort-maintenance override
//! - **SafetyVetoGate**: independent hard interlock on absolute floor
//!   temperature with hysteresis and a token-bucket toggle-rate budget
//!
//! All loops are sampled: callers pass the elapsed `dt` (and, for the veto
//! budget, the current time in seconds) explicitly. Nothing here reads a
//! clock.

pub mod bucket;
pub mod coordinator;
pub mod error;
pub mod pid;
pub mod veto;

pub use bucket::TokenBucket;
pub use coordinator::{ControlConfig, DemandResult, DualPidCoordinator};
pub use error::{ControlError, ControlResult};
pub use pid::PidController;
pub use veto::SafetyVetoGate;
