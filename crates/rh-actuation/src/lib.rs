//! Relay actuation for heating demand.
//!
//! Converts a 0-100% demand into binary relay schedules:
//! - **TpiActuator**: time-proportional actuation over fixed-length cycles
//!   with latched, minimum-duration-protected on/off windows
//! - **HeaterShuffler**: cascading power bucket across N heaters of
//!   heterogeneous rating, with priority rotation for wear balancing and
//!   idempotent command planning
//!
//! Time is passed in explicitly as seconds on the host's monotonic clock;
//! nothing here reads a wall clock.

pub mod error;
pub mod shuffler;
pub mod tpi;

pub use error::{ActuationError, ActuationResult};
pub use shuffler::{Heater, HeaterShuffler, HeaterState, RelayCommand, RotationInfo};
pub use tpi::{CycleInfo, TpiActuator};
