//! Zone configuration with construction-time validation.

use std::path::Path;

use rh_actuation::Heater;
use rh_core::SensorId;
use rh_fusion::FusionTuning;
use serde::{Deserialize, Serialize};

use crate::error::{ZoneError, ZoneResult};

/// Load and validate a zone configuration from a YAML file.
pub fn load_zone_config(path: &Path) -> ZoneResult<ZoneConfig> {
    let text = std::fs::read_to_string(path)?;
    let config: ZoneConfig = serde_yaml::from_str(&text)?;
    config.validate()?;
    Ok(config)
}

/// PID gain triple.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PidGains {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
}

impl PidGains {
    /// Room-comfort loop defaults, tuned for floor heating.
    pub fn room_defaults() -> Self {
        Self {
            kp: 80.0,
            ki: 2.0,
            kd: 15.0,
        }
    }

    /// Floor-limiter loop defaults.
    pub fn floor_defaults() -> Self {
        Self {
            kp: 20.0,
            ki: 0.5,
            kd: 10.0,
        }
    }
}

/// Static configuration of one heating zone.
///
/// Loaded from YAML by the host/CLI; [`validate`](Self::validate) runs at
/// construction and rejects anything a safe zone cannot run with.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoneConfig {
    pub name: String,
    /// Floor temperature probes (at least one).
    pub floor_sensors: Vec<SensorId>,
    /// Room air sensors (at least one).
    pub room_sensors: Vec<SensorId>,
    /// Heater power sensors (optional; power defaults to 0 without them).
    pub power_sensors: Vec<SensorId>,
    /// Heater circuits (at least one).
    pub heaters: Vec<Heater>,
    /// Initial room setpoint, if known at configuration time.
    pub target_temp: Option<f64>,
    /// Absolute floor temperature ceiling.
    pub max_floor_temp: f64,
    /// Target floor-over-room differential.
    pub comfort_offset: f64,
    /// Actuation cycle length (seconds).
    pub cycle_period: f64,
    /// Minimum relay on/off time (seconds).
    pub min_cycle_duration: f64,
    /// Optional periodic full-recompute interval for the host scheduler.
    pub keep_alive: Option<f64>,
    pub boost_mode: bool,
    pub boost_temp_diff: f64,
    pub safety_hysteresis: f64,
    /// Veto-release budget: bucket capacity in tokens.
    pub safety_budget_capacity: f64,
    /// Veto-release budget: seconds per token.
    pub safety_budget_interval: f64,
    pub maintain_comfort_limit: bool,
    pub room_pid: PidGains,
    pub floor_pid: PidGains,
    pub fusion: FusionTuning,
}

impl Default for ZoneConfig {
    fn default() -> Self {
        Self {
            name: "floor-heating".to_string(),
            floor_sensors: Vec::new(),
            room_sensors: Vec::new(),
            power_sensors: Vec::new(),
            heaters: Vec::new(),
            target_temp: None,
            max_floor_temp: 28.0,
            comfort_offset: 5.0,
            cycle_period: 900.0,
            min_cycle_duration: 60.0,
            keep_alive: None,
            boost_mode: true,
            boost_temp_diff: 1.5,
            safety_hysteresis: 0.25,
            safety_budget_capacity: 2.0,
            safety_budget_interval: 300.0,
            maintain_comfort_limit: false,
            room_pid: PidGains::room_defaults(),
            floor_pid: PidGains::floor_defaults(),
            fusion: FusionTuning::default(),
        }
    }
}

impl ZoneConfig {
    /// Validate the configuration. Any failure here is fatal: the zone is
    /// rejected before activation.
    pub fn validate(&self) -> ZoneResult<()> {
        if self.heaters.is_empty() {
            return Err(ZoneError::config("at least one heater must be configured"));
        }
        if self.floor_sensors.is_empty() {
            return Err(ZoneError::config(
                "at least one floor sensor must be configured",
            ));
        }
        if self.room_sensors.is_empty() {
            return Err(ZoneError::config(
                "at least one room sensor must be configured",
            ));
        }
        if !self.max_floor_temp.is_finite() || self.max_floor_temp <= 0.0 {
            return Err(ZoneError::config("max_floor_temp must be positive"));
        }
        if !self.comfort_offset.is_finite() || self.comfort_offset < 0.0 {
            return Err(ZoneError::config("comfort_offset must be non-negative"));
        }
        if !self.safety_hysteresis.is_finite()
            || self.safety_hysteresis < 0.0
            || self.safety_hysteresis >= self.max_floor_temp
        {
            return Err(ZoneError::config(
                "safety_hysteresis must be non-negative and below max_floor_temp",
            ));
        }
        if self.safety_budget_capacity <= 0.0 || self.safety_budget_interval <= 0.0 {
            return Err(ZoneError::config(
                "safety budget capacity and interval must be positive",
            ));
        }
        if let Some(keep_alive) = self.keep_alive {
            if !keep_alive.is_finite() || keep_alive <= 0.0 {
                return Err(ZoneError::config("keep_alive must be positive"));
            }
        }
        // Cycle and heater constraints are re-checked by the actuation
        // constructors; surfacing them here gives one configuration error
        // channel.
        if !self.cycle_period.is_finite() || self.cycle_period <= 0.0 {
            return Err(ZoneError::config("cycle_period must be positive"));
        }
        if self.min_cycle_duration < 0.0 || self.min_cycle_duration >= self.cycle_period {
            return Err(ZoneError::config(
                "min_cycle_duration must be non-negative and shorter than cycle_period",
            ));
        }
        if self
            .heaters
            .iter()
            .any(|h| !h.power.is_finite() || h.power <= 0.0)
        {
            return Err(ZoneError::config("heater power ratings must be positive"));
        }
        Ok(())
    }
}
