//! First-order thermal plant used by `rh-cli simulate`.
//!
//! Crude but sufficient to exercise the control loop end to end: the floor
//! slab integrates heater power and leaks to ambient, the room follows the
//! floor and leaks to ambient.

use std::collections::HashMap;

use rh_core::{Reading, RelayId};
use rh_zone::TickInputs;

pub struct ThermalPlant {
    pub floor_temp: f64,
    pub room_temp: f64,
    pub ambient: f64,
    relay_states: HashMap<RelayId, bool>,
    heater_powers: HashMap<RelayId, f64>,
}

impl ThermalPlant {
    pub fn new(initial: f64, ambient: f64, heaters: &[(RelayId, f64)]) -> Self {
        Self {
            floor_temp: initial,
            room_temp: initial,
            ambient,
            relay_states: heaters.iter().map(|(id, _)| (id.clone(), false)).collect(),
            heater_powers: heaters.iter().cloned().collect(),
        }
    }

    /// Total power currently flowing into the slab.
    pub fn active_power(&self) -> f64 {
        self.relay_states
            .iter()
            .filter(|(_, on)| **on)
            .filter_map(|(id, _)| self.heater_powers.get(id))
            .sum()
    }

    pub fn set_relay(&mut self, id: &RelayId, on: bool) {
        if let Some(state) = self.relay_states.get_mut(id) {
            *state = on;
        }
    }

    /// Advance the plant by `dt` seconds.
    pub fn advance(&mut self, dt: f64) {
        let power = self.active_power();
        self.floor_temp +=
            dt * (power * 2e-6 - (self.floor_temp - self.ambient) * 1.5e-4);
        self.room_temp += dt * ((self.floor_temp - self.room_temp) * 1.2e-4
            - (self.room_temp - self.ambient) * 4e-5);
    }

    /// Tick inputs as the host would assemble them, with a little sensor
    /// noise folded in deterministically.
    pub fn inputs(&self, now: f64, num_floor: usize, num_room: usize, num_power: usize) -> TickInputs {
        // Cheap deterministic pseudo-noise so repeated runs are comparable.
        let noise = |seed: f64| ((now * 0.37 + seed * 12.9898).sin()) * 0.05;

        TickInputs {
            now,
            floor_readings: (0..num_floor)
                .map(|i| Reading::Value(self.floor_temp + noise(i as f64)))
                .collect(),
            room_readings: (0..num_room)
                .map(|i| Reading::Value(self.room_temp + noise(10.0 + i as f64)))
                .collect(),
            power_readings: (0..num_power)
                .map(|_| Reading::Value(self.active_power() / num_power.max(1) as f64))
                .collect(),
            observed_relays: self.relay_states.clone(),
            force: false,
        }
    }
}
