//! Display conversions for activity statistics.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnitSystem {
    #[default]
    Metric,
    Imperial,
}

impl UnitSystem {
    /// Distance in km or miles, with the unit label.
    pub fn distance(self, meters: f64) -> (f64, &'static str) {
        match self {
            UnitSystem::Metric => (meters_to_km(meters), "km"),
            UnitSystem::Imperial => (meters_to_miles(meters), "mi"),
        }
    }

    /// Elevation in meters or feet, with the unit label.
    pub fn elevation(self, meters: f64) -> (f64, &'static str) {
        match self {
            UnitSystem::Metric => (meters, "m"),
            UnitSystem::Imperial => (meters_to_feet(meters), "ft"),
        }
    }

    pub fn speed(self, kmh: f64) -> (f64, &'static str) {
        match self {
            UnitSystem::Metric => (kmh, "km/h"),
            UnitSystem::Imperial => (kmh_to_mph(kmh), "mph"),
        }
    }
}

pub fn meters_to_km(meters: f64) -> f64 {
    meters / 1000.0
}

pub fn meters_to_miles(meters: f64) -> f64 {
    meters * 0.000621371
}

pub fn meters_to_feet(meters: f64) -> f64 {
    meters * 3.28084
}

pub fn kmh_to_mph(kmh: f64) -> f64 {
    kmh * 0.621371
}

/// `H:MM:SS` once the duration reaches an hour, `M:SS` below that.
pub fn format_duration(seconds: i64) -> String {
    let seconds = seconds.max(0);
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;

    if hours > 0 {
        format!("{hours}:{minutes:02}:{:02}", seconds % 60)
    } else {
        format!("{minutes}:{:02}", seconds % 60)
    }
}
