//! Explicit optional sensor samples.
//!
//! A host reading is either a finite number or nothing. "Unavailable",
//! "unknown", non-numeric and non-finite host states all collapse to
//! [`Reading::Absent`] so downstream gating is exhaustive and can never
//! mistake a missing sample for zero.

use serde::{Deserialize, Serialize};

/// One sample from a temperature or power sensor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Reading {
    /// A valid, finite sample.
    Value(f64),
    /// No usable sample this tick.
    Absent,
}

impl Reading {
    /// Build a reading from a raw host value, rejecting non-finite numbers.
    pub fn from_host(value: Option<f64>) -> Self {
        match value {
            Some(v) if v.is_finite() => Self::Value(v),
            _ => Self::Absent,
        }
    }

    /// Parse a host state string ("21.4", "unavailable", ...) into a reading.
    pub fn parse(state: &str) -> Self {
        Self::from_host(state.trim().parse::<f64>().ok())
    }

    /// The sample, if present.
    pub fn value(&self) -> Option<f64> {
        match self {
            Self::Value(v) => Some(*v),
            Self::Absent => None,
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }
}

impl From<Option<f64>> for Reading {
    fn from(value: Option<f64>) -> Self {
        Self::from_host(value)
    }
}

/// Sum the present values in a slice of readings (absent entries contribute
/// nothing). Used for aggregate heater power.
pub fn sum_present(readings: &[Reading]) -> f64 {
    readings.iter().filter_map(Reading::value).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_host_rejects_non_finite() {
        assert_eq!(Reading::from_host(Some(21.5)), Reading::Value(21.5));
        assert_eq!(Reading::from_host(Some(f64::NAN)), Reading::Absent);
        assert_eq!(Reading::from_host(Some(f64::INFINITY)), Reading::Absent);
        assert_eq!(Reading::from_host(None), Reading::Absent);
    }

    #[test]
    fn parse_host_states() {
        assert_eq!(Reading::parse("19.75"), Reading::Value(19.75));
        assert_eq!(Reading::parse(" 20 "), Reading::Value(20.0));
        assert_eq!(Reading::parse("unavailable"), Reading::Absent);
        assert_eq!(Reading::parse("unknown"), Reading::Absent);
        assert_eq!(Reading::parse(""), Reading::Absent);
    }

    #[test]
    fn sum_present_skips_absent() {
        let readings = [
            Reading::Value(100.5),
            Reading::Absent,
            Reading::Value(50.5),
        ];
        assert_eq!(sum_present(&readings), 151.0);
    }

    #[test]
    fn sum_present_empty_is_zero() {
        assert_eq!(sum_present(&[]), 0.0);
        assert_eq!(sum_present(&[Reading::Absent, Reading::Absent]), 0.0);
    }
}
