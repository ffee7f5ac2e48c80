//! The free-standing control loop: pure `step(inputs) -> outputs`.

use std::collections::HashMap;

use rh_actuation::{HeaterShuffler, HeaterState, RelayCommand};
use rh_controls::{ControlConfig, DualPidCoordinator, PidController, SafetyVetoGate};
use rh_core::{reading::sum_present, round_tenths, Reading, RelayId};
use rh_fusion::FusionEstimator;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::ZoneConfig;
use crate::error::ZoneResult;
use crate::persist::PersistedState;

/// Operating mode of the zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Off,
    Heat,
}

/// Everything the host hands the core for one tick.
#[derive(Debug, Clone, Default)]
pub struct TickInputs {
    /// Current time in seconds on the host's monotonic clock.
    pub now: f64,
    /// One reading per configured floor sensor, in configuration order.
    pub floor_readings: Vec<Reading>,
    /// One reading per configured room sensor.
    pub room_readings: Vec<Reading>,
    /// One reading per configured power sensor.
    pub power_readings: Vec<Reading>,
    /// Host's last known relay states; relays missing here are treated as
    /// unknown and fall back to the last commanded state.
    pub observed_relays: HashMap<RelayId, bool>,
    /// Forced recompute (setpoint/mode/config change): bypass the veto
    /// hysteresis band and relatch the actuation cycle immediately.
    pub force: bool,
}

/// Diagnostics exposed to the host after every tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ZoneStatus {
    pub active: bool,
    pub mode: Mode,
    pub target_temp: Option<f64>,
    /// Fused floor temperature.
    pub floor_temp: f64,
    /// Fused room temperature.
    pub room_temp: f64,
    /// Room-loop demand, rounded to 0.1.
    pub room_demand: f64,
    /// Floor-loop demand, rounded to 0.1.
    pub floor_demand: f64,
    /// Final demand after min-selection and veto, rounded to 0.1.
    pub final_demand: f64,
    pub room_integral_error: f64,
    pub floor_integral_error: f64,
    /// Dynamic floor target currently limiting the floor loop.
    pub effective_floor_limit: f64,
    pub safety_veto_active: bool,
    pub safety_budget_tokens: f64,
    /// Cumulative relay toggles, including restored history. Never decreases.
    pub relay_toggle_count: u64,
}

/// Result of one tick.
#[derive(Debug, Clone)]
pub struct TickOutputs {
    /// Relay switch commands for the host to carry out, already reduced to
    /// actual state changes.
    pub commands: Vec<RelayCommand>,
    /// Desired per-heater states (diagnostic).
    pub heater_states: Vec<HeaterState>,
    pub status: ZoneStatus,
}

/// Control core for one heating zone.
///
/// All shared mutable state (fusion, PID, veto, cycle position) lives here;
/// callers must serialize `step` invocations (see
/// [`ZoneService`](crate::service::ZoneService)). `step` never blocks,
/// never reads a clock and never panics on degraded input: ambiguity always
/// resolves toward heating off.
#[derive(Debug)]
pub struct ControlLoop {
    config: ZoneConfig,
    estimator: FusionEstimator,
    coordinator: DualPidCoordinator,
    veto: SafetyVetoGate,
    shuffler: HeaterShuffler,
    mode: Mode,
    target_temp: Option<f64>,
    maintain_comfort: bool,
    active: bool,
    last_tick: Option<f64>,
    force_pending: bool,
    /// Toggle count carried over from a previous run.
    restored_toggles: u64,
}

impl ControlLoop {
    /// Build a control loop from a validated configuration. `now` seeds the
    /// veto budget clock.
    pub fn new(config: ZoneConfig, now: f64) -> ZoneResult<Self> {
        config.validate()?;

        let room_pid = PidController::new(
            config.room_pid.kp,
            config.room_pid.ki,
            config.room_pid.kd,
        )?;
        let floor_pid = PidController::new(
            config.floor_pid.kp,
            config.floor_pid.ki,
            config.floor_pid.kd,
        )?;
        let shuffler = HeaterShuffler::new(
            config.heaters.clone(),
            config.cycle_period,
            config.min_cycle_duration,
        )?;
        let veto = SafetyVetoGate::new(
            config.max_floor_temp,
            config.safety_hysteresis,
            config.safety_budget_capacity,
            1.0 / config.safety_budget_interval,
            now,
        );

        info!(
            zone = %config.name,
            heaters = config.heaters.len(),
            total_capacity = shuffler.total_capacity(),
            max_floor_temp = config.max_floor_temp,
            cycle_period = config.cycle_period,
            "control loop initialized"
        );

        Ok(Self {
            estimator: FusionEstimator::new(config.fusion),
            coordinator: DualPidCoordinator::new(room_pid, floor_pid),
            veto,
            shuffler,
            mode: Mode::Off,
            target_temp: config.target_temp,
            maintain_comfort: config.maintain_comfort_limit,
            active: false,
            last_tick: None,
            force_pending: false,
            restored_toggles: 0,
            config,
        })
    }

    /// Run one control tick.
    pub fn step(&mut self, inputs: &TickInputs) -> TickOutputs {
        let now = inputs.now;
        let force = inputs.force || std::mem::take(&mut self.force_pending);

        let dt = match self.last_tick {
            Some(last) => (now - last).max(0.0),
            None => 0.0,
        };
        self.last_tick = Some(now);

        // 1. Fuse this tick's readings. Absent/invalid readings were already
        // collapsed by the host boundary; a tick with no valid readings is
        // predict-only.
        let power = sum_present(&inputs.power_readings);
        self.estimator.predict(dt, power);
        let applied = self
            .estimator
            .update(&inputs.floor_readings, &inputs.room_readings);
        if applied == 0 && self.active {
            warn!("no valid sensor readings this tick, running on prediction only");
        }

        let floor_seen = inputs.floor_readings.iter().any(|r| !r.is_absent());
        let room_seen = inputs.room_readings.iter().any(|r| !r.is_absent());
        let floor_temp = self.estimator.floor_temp();
        let room_temp = self.estimator.room_temp();

        // 2. Activation: first tick with both temperatures and a target.
        if !self.active && floor_seen && room_seen && self.target_temp.is_some() {
            self.active = true;
            self.shuffler.reset_cycle();
            info!(
                floor_temp,
                room_temp,
                target = self.target_temp.unwrap_or_default(),
                "zone active"
            );
        }

        if !self.active || self.mode == Mode::Off {
            return self.idle_tick(inputs, now);
        }

        // 3. Safety veto. A tick without a floor or room reading is treated
        // as flying blind: fail safe.
        let veto_active = self.veto.evaluate(
            floor_seen.then_some(floor_temp),
            room_seen.then_some(room_temp),
            force,
            now,
        );

        // 4. Demand.
        let control_config = self.control_config();
        let target_room = self.target_or(room_temp);
        let (room_demand, floor_demand, final_demand, floor_target) = if veto_active {
            debug!("safety veto active, demand forced to zero");
            let floor_target = self
                .coordinator
                .floor_target(room_temp, target_room, &control_config);
            (0.0, 0.0, 0.0, floor_target)
        } else {
            let result = self.coordinator.calculate(
                room_temp,
                target_room,
                floor_temp,
                &control_config,
                dt,
            );
            (
                result.room_demand,
                result.floor_demand,
                result.final_demand,
                result.floor_target,
            )
        };

        // 5. Actuation. A forced recompute relatches the cycle so the new
        // demand takes effect now rather than at the natural boundary.
        if force {
            self.shuffler.reset_cycle();
        }
        let heater_states = self.shuffler.apply_demand(final_demand, now);
        let commands = self
            .shuffler
            .plan_commands(&heater_states, &inputs.observed_relays);

        let status = ZoneStatus {
            active: self.active,
            mode: self.mode,
            target_temp: self.target_temp,
            floor_temp,
            room_temp,
            room_demand: round_tenths(room_demand),
            floor_demand: round_tenths(floor_demand),
            final_demand: round_tenths(final_demand),
            room_integral_error: round_tenths(self.coordinator.room_integral_error()),
            floor_integral_error: round_tenths(self.coordinator.floor_integral_error()),
            effective_floor_limit: round_tenths(floor_target),
            safety_veto_active: veto_active,
            safety_budget_tokens: self.veto.budget_tokens(now),
            relay_toggle_count: self.relay_toggle_count(),
        };

        TickOutputs {
            commands,
            heater_states,
            status,
        }
    }

    /// Tick while inactive or OFF: demand is zero and any relay the host
    /// reports as on is commanded off (reconciliation after restarts or
    /// external meddling).
    fn idle_tick(&mut self, inputs: &TickInputs, now: f64) -> TickOutputs {
        let heater_states: Vec<HeaterState> = self
            .shuffler
            .heaters()
            .iter()
            .map(|h| HeaterState {
                id: h.id.clone(),
                should_be_on: false,
                duty_cycle: 0.0,
            })
            .collect();
        let commands = self
            .shuffler
            .plan_commands(&heater_states, &inputs.observed_relays);
        if !commands.is_empty() {
            warn!(
                count = commands.len(),
                "zone idle but relays observed on, turning them off"
            );
        }

        let floor_temp = self.estimator.floor_temp();
        let room_temp = self.estimator.room_temp();
        let control_config = self.control_config();
        let target_room = self.target_or(room_temp);
        let floor_target = self
            .coordinator
            .floor_target(room_temp, target_room, &control_config);

        let status = ZoneStatus {
            active: self.active,
            mode: self.mode,
            target_temp: self.target_temp,
            floor_temp,
            room_temp,
            room_demand: 0.0,
            floor_demand: 0.0,
            final_demand: 0.0,
            room_integral_error: round_tenths(self.coordinator.room_integral_error()),
            floor_integral_error: round_tenths(self.coordinator.floor_integral_error()),
            effective_floor_limit: round_tenths(floor_target),
            safety_veto_active: self.veto.is_active(),
            safety_budget_tokens: self.veto.budget_tokens(now),
            relay_toggle_count: self.relay_toggle_count(),
        };

        TickOutputs {
            commands,
            heater_states,
            status,
        }
    }

    /// Change operating mode. OFF -> HEAT clears controller state and
    /// forces a recompute on the next tick.
    pub fn set_mode(&mut self, mode: Mode) {
        if mode == self.mode {
            return;
        }
        if mode == Mode::Heat {
            self.coordinator.reset();
            self.shuffler.reset_cycle();
        }
        info!(?mode, "mode changed");
        self.mode = mode;
        self.force_pending = true;
    }

    /// Change the room setpoint; takes effect with a forced recompute.
    pub fn set_target_temp(&mut self, target: f64) {
        if target.is_finite() {
            self.target_temp = Some(target);
            self.force_pending = true;
        } else {
            warn!(target, "ignoring non-finite target temperature");
        }
    }

    /// Runtime toggle for maintain-comfort-limit mode.
    pub fn set_maintain_comfort(&mut self, enabled: bool) {
        info!(enabled, "maintain comfort limit mode");
        self.maintain_comfort = enabled;
        self.force_pending = true;
    }

    /// Mark the next tick as a forced recompute. Idempotent.
    pub fn force_recompute(&mut self) {
        self.force_pending = true;
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn target_temp(&self) -> Option<f64> {
        self.target_temp
    }

    pub fn maintain_comfort(&self) -> bool {
        self.maintain_comfort
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Cumulative relay toggles including restored history.
    pub fn relay_toggle_count(&self) -> u64 {
        self.restored_toggles + self.shuffler.total_toggle_count()
    }

    /// Actuation cycle position at time `now`, for diagnostics.
    pub fn cycle_info(&self, now: f64) -> rh_actuation::CycleInfo {
        self.shuffler.cycle_info(now)
    }

    /// Heater priority rotation state, for diagnostics.
    pub fn rotation_info(&self) -> rh_actuation::RotationInfo {
        self.shuffler.rotation_info()
    }

    /// Snapshot the minimal state that survives restarts.
    pub fn snapshot(&self) -> PersistedState {
        PersistedState {
            target_temp: self.target_temp,
            mode: self.mode,
            relay_toggle_count: self.relay_toggle_count(),
        }
    }

    /// Restore a snapshot taken by a previous run. Fusion, PID, veto and
    /// cycle state deliberately re-initialize from defaults.
    pub fn restore(&mut self, state: &PersistedState) {
        if let Some(target) = state.target_temp {
            self.target_temp = Some(target);
        }
        self.mode = state.mode;
        self.restored_toggles = state.relay_toggle_count;
        self.force_pending = true;
    }

    fn control_config(&self) -> ControlConfig {
        ControlConfig {
            max_floor_temp: self.config.max_floor_temp,
            comfort_offset: self.config.comfort_offset,
            maintain_comfort: self.maintain_comfort,
            safety_hysteresis: self.config.safety_hysteresis,
            boost_mode: self.config.boost_mode,
            boost_temp_diff: self.config.boost_temp_diff,
        }
    }

    fn target_or(&self, fallback: f64) -> f64 {
        self.target_temp.unwrap_or(fallback)
    }
}
