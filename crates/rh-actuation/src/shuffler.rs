//! Multi-relay load distribution: the cascading power bucket.
//!
//! One aggregate demand is spread over N heater circuits of heterogeneous
//! rating. Heaters are processed in a priority order that rotates by one
//! position at every cycle boundary (wear balancing): heaters whose full
//! rating fits inside the required power run flat out, the first heater the
//! remainder only partially covers becomes the cycle's single
//! time-proportioned heater, and everything after it stays off. At most one
//! relay per cycle switches mid-cycle; the rest hold a binary state, which
//! keeps aggregate relay toggling at its minimum.

use std::collections::HashMap;

use rh_core::{clamp_demand, RelayId};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{ActuationError, ActuationResult};

/// A single heater circuit with its relay and power rating.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Heater {
    pub id: RelayId,
    /// Rated power. Any unit works as long as all heaters share it.
    pub power: f64,
    #[serde(default)]
    pub name: String,
}

impl Heater {
    pub fn new(id: impl Into<RelayId>, power: f64) -> Self {
        let id = id.into();
        // Default the display name to the tail of the relay id.
        let name = id
            .as_str()
            .rsplit('.')
            .next()
            .unwrap_or_default()
            .to_string();
        Self { id, power, name }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

/// Desired state for one heater after applying a demand. Recomputed on
/// every application, never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct HeaterState {
    pub id: RelayId,
    pub should_be_on: bool,
    /// 0-100. Full-on heaters report 100, the time-proportioned heater its
    /// fractional duty, everything else 0.
    pub duty_cycle: f64,
}

/// A relay switch command for the host to carry out.
#[derive(Debug, Clone, PartialEq)]
pub struct RelayCommand {
    pub id: RelayId,
    pub on: bool,
}

/// Diagnostic view of the rotation state.
#[derive(Debug, Clone, PartialEq)]
pub struct RotationInfo {
    pub rotation_index: u64,
    pub priority_order: Vec<RelayId>,
}

/// Distributes one aggregate demand over several heater relays.
#[derive(Debug, Clone)]
pub struct HeaterShuffler {
    heaters: Vec<Heater>,
    cycle_period: f64,
    min_cycle_duration: f64,
    total_capacity: f64,
    rotation_index: u64,
    cycle_start: Option<f64>,
    latched_on_duration: f64,
    last_commanded: HashMap<RelayId, bool>,
    toggle_counts: HashMap<RelayId, u64>,
}

impl HeaterShuffler {
    /// Create a shuffler. Rejects an empty heater list, non-positive power
    /// ratings and inconsistent cycle durations.
    pub fn new(
        heaters: Vec<Heater>,
        cycle_period: f64,
        min_cycle_duration: f64,
    ) -> ActuationResult<Self> {
        if heaters.is_empty() {
            return Err(ActuationError::NoHeaters);
        }
        if heaters.iter().any(|h| !h.power.is_finite() || h.power <= 0.0) {
            return Err(ActuationError::InvalidArg {
                what: "heater power ratings must be positive",
            });
        }
        if !cycle_period.is_finite() || cycle_period <= 0.0 {
            return Err(ActuationError::InvalidArg {
                what: "cycle_period must be positive",
            });
        }
        if !(0.0..cycle_period).contains(&min_cycle_duration) {
            return Err(ActuationError::InvalidArg {
                what: "min_cycle_duration must be non-negative and shorter than cycle_period",
            });
        }

        let total_capacity = heaters.iter().map(|h| h.power).sum();
        let last_commanded = heaters.iter().map(|h| (h.id.clone(), false)).collect();
        let toggle_counts = heaters.iter().map(|h| (h.id.clone(), 0)).collect();
        Ok(Self {
            heaters,
            cycle_period,
            min_cycle_duration,
            total_capacity,
            rotation_index: 0,
            cycle_start: None,
            latched_on_duration: 0.0,
            last_commanded,
            toggle_counts,
        })
    }

    /// Apply a heating demand at time `now`, returning the desired state of
    /// every heater.
    pub fn apply_demand(&mut self, demand_percent: f64, now: f64) -> Vec<HeaterState> {
        let demand = clamp_demand(demand_percent);
        if demand != demand_percent {
            warn!(demand_percent, "invalid demand percentage, clamped");
        }

        let relatch = self.roll_cycle(now);
        let required_power = self.total_capacity * demand / 100.0;
        let (mut states, tpi_heater) = self.cascade(required_power);

        if let Some((tpi_idx, duty)) = tpi_heater {
            if relatch {
                self.latched_on_duration = self.clamp_on_duration(duty);
            }
            let time_in_cycle = now - self.cycle_start.unwrap_or(now);
            states[tpi_idx].should_be_on = time_in_cycle < self.latched_on_duration;
        } else if relatch {
            // No fractional heater this cycle: nothing to time-proportion.
            self.latched_on_duration = 0.0;
        }

        states
    }

    /// Plan the relay commands needed to reach `states`.
    ///
    /// `observed` carries the host's last known on/off state per relay;
    /// relays missing from it fall back to the last commanded state. A
    /// command is only issued when the desired state differs (idempotent
    /// actuation), and each issued command bumps that heater's toggle
    /// counter.
    pub fn plan_commands(
        &mut self,
        states: &[HeaterState],
        observed: &HashMap<RelayId, bool>,
    ) -> Vec<RelayCommand> {
        let mut commands = Vec::new();
        for state in states {
            let current = observed
                .get(&state.id)
                .copied()
                .or_else(|| self.last_commanded.get(&state.id).copied())
                .unwrap_or(false);
            if state.should_be_on != current {
                debug!(relay = %state.id, on = state.should_be_on, "relay command");
                self.last_commanded
                    .insert(state.id.clone(), state.should_be_on);
                *self.toggle_counts.entry(state.id.clone()).or_insert(0) += 1;
                commands.push(RelayCommand {
                    id: state.id.clone(),
                    on: state.should_be_on,
                });
            }
        }
        commands
    }

    /// Force a relatch on the next application (forced recompute).
    pub fn reset_cycle(&mut self) {
        self.cycle_start = None;
    }

    /// Configured heaters, in configuration order.
    pub fn heaters(&self) -> &[Heater] {
        &self.heaters
    }

    /// Sum of all heater ratings.
    pub fn total_capacity(&self) -> f64 {
        self.total_capacity
    }

    /// Toggle count for one heater.
    pub fn toggle_count(&self, id: &RelayId) -> u64 {
        self.toggle_counts.get(id).copied().unwrap_or(0)
    }

    /// Total toggles across all heaters. Monotonically increasing.
    pub fn total_toggle_count(&self) -> u64 {
        self.toggle_counts.values().sum()
    }

    /// Diagnostic cycle position at time `now`.
    pub fn cycle_info(&self, now: f64) -> crate::tpi::CycleInfo {
        let time_in_cycle = match self.cycle_start {
            Some(start) => (now - start).max(0.0) % self.cycle_period,
            None => 0.0,
        };
        crate::tpi::CycleInfo {
            time_in_cycle,
            cycle_period: self.cycle_period,
        }
    }

    /// Diagnostic rotation state.
    pub fn rotation_info(&self) -> RotationInfo {
        RotationInfo {
            rotation_index: self.rotation_index,
            priority_order: self
                .prioritized()
                .map(|h| h.id.clone())
                .collect(),
        }
    }

    /// Start a new cycle if none is pending or the period elapsed. Returns
    /// whether this call is a latch point.
    fn roll_cycle(&mut self, now: f64) -> bool {
        match self.cycle_start {
            None => {
                self.cycle_start = Some(now);
                true
            }
            Some(start) if now - start >= self.cycle_period => {
                // Rotate priority once per cycle boundary.
                self.rotation_index += 1;
                self.cycle_start = Some(now);
                true
            }
            _ => false,
        }
    }

    /// Heaters in rotated priority order.
    fn prioritized(&self) -> impl Iterator<Item = &Heater> {
        let len = self.heaters.len();
        let offset = (self.rotation_index % len as u64) as usize;
        self.heaters[offset..].iter().chain(self.heaters[..offset].iter())
    }

    /// Cascading power bucket: returns per-heater states in configuration
    /// order plus the index and duty of the time-proportioned heater, if any.
    fn cascade(&self, required_power: f64) -> (Vec<HeaterState>, Option<(usize, f64)>) {
        let len = self.heaters.len();
        let offset = (self.rotation_index % len as u64) as usize;

        let mut states: Vec<HeaterState> = self
            .heaters
            .iter()
            .map(|h| HeaterState {
                id: h.id.clone(),
                should_be_on: false,
                duty_cycle: 0.0,
            })
            .collect();

        let mut tpi_index = None;
        let mut remaining = required_power;
        for step in 0..len {
            let idx = (offset + step) % len;
            let heater = &self.heaters[idx];
            if remaining >= heater.power {
                remaining -= heater.power;
                states[idx].should_be_on = true;
                states[idx].duty_cycle = 100.0;
            } else if remaining > 0.0 {
                // The should_be_on decision is made by the TPI window.
                let duty = remaining / heater.power * 100.0;
                remaining = 0.0;
                states[idx].duty_cycle = duty;
                tpi_index = Some((idx, duty));
            }
        }

        (states, tpi_index)
    }

    /// On-window for a duty cycle, with relay-protection clamping applied.
    fn clamp_on_duration(&self, duty: f64) -> f64 {
        let on_duration = duty / 100.0 * self.cycle_period;
        if on_duration < self.min_cycle_duration {
            0.0
        } else if on_duration > self.cycle_period - self.min_cycle_duration {
            self.cycle_period
        } else {
            on_duration
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn unequal_heaters() -> Vec<Heater> {
        vec![
            Heater::new("switch.heater_1", 2000.0).with_name("Large"),
            Heater::new("switch.heater_2", 1000.0).with_name("Small"),
            Heater::new("switch.heater_3", 500.0).with_name("Tiny"),
        ]
    }

    fn shuffler() -> HeaterShuffler {
        HeaterShuffler::new(unequal_heaters(), 900.0, 60.0).unwrap()
    }

    #[test]
    fn rejects_invalid_configuration() {
        let err = HeaterShuffler::new(vec![], 900.0, 60.0).unwrap_err();
        assert_eq!(err, ActuationError::NoHeaters);
        assert!(HeaterShuffler::new(
            vec![Heater::new("switch.h", 0.0)],
            900.0,
            60.0
        )
        .is_err());
        assert!(HeaterShuffler::new(unequal_heaters(), 0.0, 0.0).is_err());
        assert!(HeaterShuffler::new(unequal_heaters(), 900.0, 900.0).is_err());
    }

    #[test]
    fn total_capacity_is_summed() {
        assert_eq!(shuffler().total_capacity(), 3500.0);
    }

    #[test]
    fn cascading_bucket_at_80_percent() {
        let mut s = shuffler();
        // 80% of 3500 W = 2800 W: large heater full on, small heater carries
        // the 800 W remainder at 80% duty, tiny heater off.
        let states = s.apply_demand(80.0, 0.0);

        assert!(states[0].should_be_on);
        assert_eq!(states[0].duty_cycle, 100.0);

        assert_eq!(states[1].duty_cycle, 80.0);
        // At cycle start the latched window (720 s) has not elapsed.
        assert!(states[1].should_be_on);

        assert!(!states[2].should_be_on);
        assert_eq!(states[2].duty_cycle, 0.0);
    }

    #[test]
    fn full_demand_turns_everything_on() {
        let mut s = shuffler();
        let states = s.apply_demand(100.0, 0.0);
        for state in &states {
            assert!(state.should_be_on);
            assert_eq!(state.duty_cycle, 100.0);
        }
    }

    #[test]
    fn zero_demand_turns_everything_off() {
        let mut s = shuffler();
        let states = s.apply_demand(0.0, 0.0);
        for state in &states {
            assert!(!state.should_be_on);
            assert_eq!(state.duty_cycle, 0.0);
        }
    }

    #[test]
    fn out_of_range_demand_is_clamped() {
        let mut s = shuffler();
        let states = s.apply_demand(150.0, 0.0);
        assert!(states.iter().all(|st| st.should_be_on));
        let states = s.apply_demand(-20.0, 1.0);
        assert!(states.iter().all(|st| !st.should_be_on));
    }

    #[test]
    fn tpi_window_is_latched_per_cycle() {
        let mut s = shuffler();
        // 80% demand latches a 720 s window for the small heater.
        let states = s.apply_demand(80.0, 0.0);
        assert!(states[1].should_be_on);

        // Mid-cycle demand drop to 75% (duty 62.5%): the 720 s window holds.
        let states = s.apply_demand(75.0, 100.0);
        assert_eq!(states[1].duty_cycle, 62.5);
        assert!(states[1].should_be_on);

        // Past the window: off until the next boundary.
        let states = s.apply_demand(80.0, 750.0);
        assert!(!states[1].should_be_on);

        // The boundary relatches from the demand of that call.
        let states = s.apply_demand(80.0, 900.0);
        assert!(states.iter().any(|st| st.duty_cycle > 0.0 && st.duty_cycle < 100.0));
    }

    #[test]
    fn rotation_increments_once_per_cycle_boundary() {
        let mut s = shuffler();
        assert_eq!(s.rotation_info().rotation_index, 0);

        s.apply_demand(50.0, 0.0);
        assert_eq!(s.rotation_info().rotation_index, 0);

        // Repeated calls inside the cycle do not rotate.
        s.apply_demand(50.0, 400.0);
        assert_eq!(s.rotation_info().rotation_index, 0);

        // One boundary, one increment.
        s.apply_demand(50.0, 900.0);
        assert_eq!(s.rotation_info().rotation_index, 1);

        s.apply_demand(50.0, 1800.0);
        assert_eq!(s.rotation_info().rotation_index, 2);
    }

    #[test]
    fn rotation_returns_to_original_order_after_full_lap() {
        let mut s = shuffler();
        let original = s.rotation_info().priority_order;

        s.apply_demand(50.0, 0.0);
        for cycle in 1..=3 {
            s.apply_demand(50.0, 900.0 * f64::from(cycle));
        }
        // Three boundaries on three heaters: back to the original order.
        assert_eq!(s.rotation_info().rotation_index, 3);
        assert_eq!(s.rotation_info().priority_order, original);
    }

    #[test]
    fn rotation_changes_which_heater_runs_first() {
        let mut s = shuffler();
        s.apply_demand(50.0, 0.0);
        let first = s.rotation_info().priority_order[0].clone();
        s.apply_demand(50.0, 900.0);
        let second = s.rotation_info().priority_order[0].clone();
        assert_ne!(first, second);
    }

    #[test]
    fn plan_commands_is_idempotent() {
        let mut s = shuffler();
        let states = s.apply_demand(100.0, 0.0);
        let observed = HashMap::new();

        let commands = s.plan_commands(&states, &observed);
        assert_eq!(commands.len(), 3);
        assert!(commands.iter().all(|c| c.on));
        assert_eq!(s.total_toggle_count(), 3);

        // Same desired state again: nothing to do, counters untouched.
        let commands = s.plan_commands(&states, &observed);
        assert!(commands.is_empty());
        assert_eq!(s.total_toggle_count(), 3);
    }

    #[test]
    fn plan_commands_uses_observed_state_when_available() {
        let mut s = shuffler();
        let states = s.apply_demand(0.0, 0.0);

        // The host reports one relay stuck on: it gets an off command even
        // though we never commanded it on.
        let mut observed = HashMap::new();
        observed.insert(RelayId::from("switch.heater_2"), true);

        let commands = s.plan_commands(&states, &observed);
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].id.as_str(), "switch.heater_2");
        assert!(!commands[0].on);
    }

    #[test]
    fn toggle_counts_are_per_heater() {
        let mut s = shuffler();
        let observed = HashMap::new();

        let states = s.apply_demand(100.0, 0.0);
        s.plan_commands(&states, &observed);
        let states = s.apply_demand(0.0, 1.0);
        s.plan_commands(&states, &observed);

        for heater in unequal_heaters() {
            assert_eq!(s.toggle_count(&heater.id), 2);
        }
        assert_eq!(s.total_toggle_count(), 6);
    }

    proptest! {
        #[test]
        fn full_on_power_never_exceeds_required(demand in 0.0_f64..=100.0) {
            let mut s = shuffler();
            let states = s.apply_demand(demand, 0.0);
            let required = s.total_capacity() * demand / 100.0;
            let committed: f64 = states
                .iter()
                .zip(unequal_heaters())
                .filter(|(st, _)| st.duty_cycle == 100.0)
                .map(|(_, h)| h.power)
                .sum();
            prop_assert!(committed <= required + 1e-9);
        }

        #[test]
        fn duty_cycles_account_for_demand(demand in 0.0_f64..=100.0) {
            let mut s = shuffler();
            let states = s.apply_demand(demand, 0.0);
            let delivered: f64 = states
                .iter()
                .zip(unequal_heaters())
                .map(|(st, h)| st.duty_cycle / 100.0 * h.power)
                .sum();
            let required = s.total_capacity() * demand / 100.0;
            prop_assert!((delivered - required).abs() < 1e-6);
        }

        #[test]
        fn at_most_one_fractional_heater(demand in 0.0_f64..=100.0) {
            let mut s = shuffler();
            let states = s.apply_demand(demand, 0.0);
            let fractional = states
                .iter()
                .filter(|st| st.duty_cycle > 0.0 && st.duty_cycle < 100.0)
                .count();
            prop_assert!(fractional <= 1);
        }
    }
}
