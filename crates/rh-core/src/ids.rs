//! Opaque host-facing identifiers.
//!
//! Sensors and relays are addressed by identifiers the host platform owns;
//! the core never interprets their contents.

use core::fmt;
use serde::{Deserialize, Serialize};

/// Identifier of a temperature or power sensor on the host side.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SensorId(pub String);

impl SensorId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SensorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SensorId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Identifier of a heater relay on the host side.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RelayId(pub String);

impl RelayId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RelayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for RelayId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_round_trip_display() {
        let s = SensorId::new("sensor.floor_1");
        assert_eq!(s.as_str(), "sensor.floor_1");
        assert_eq!(format!("{s}"), "sensor.floor_1");

        let r = RelayId::from("switch.heater_a");
        assert_eq!(r.as_str(), "switch.heater_a");
    }
}
