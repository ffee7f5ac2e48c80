//! Zone-level control loop for radiant floor heating.
//!
//! Ties the fusion estimator, the dual-PID coordinator, the safety veto
//! gate and the heater shuffler together behind one free-standing
//! [`ControlLoop`] with a pure `step(inputs) -> outputs` operation. The
//! host adapter owns scheduling, persistence and presentation; this crate
//! owns the control semantics.
//!
//! Per tick: readings + power -> fusion -> (floor_temp, room_temp) ->
//! dual-PID -> demand -> safety veto (may zero it) -> shuffler -> relay
//! commands.

pub mod config;
pub mod control_loop;
pub mod error;
pub mod persist;
pub mod service;

pub use config::{load_zone_config, PidGains, ZoneConfig};
pub use control_loop::{ControlLoop, Mode, TickInputs, TickOutputs, ZoneStatus};
pub use error::{ZoneError, ZoneResult};
pub use persist::PersistedState;
pub use service::{RelayPort, ZoneService};
