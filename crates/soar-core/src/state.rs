//! Per-fix aircraft snapshot and waypoint reference data.

use crate::geo::GeoPoint;
use serde::{Deserialize, Serialize};

/// Wind vector; `from_deg` is the direction the wind blows from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Wind {
    pub speed_mps: f64,
    pub from_deg: f64,
}

impl Wind {
    pub const fn calm() -> Self {
        Self {
            speed_mps: 0.0,
            from_deg: 0.0,
        }
    }

    pub fn is_calm(&self) -> bool {
        self.speed_mps <= f64::EPSILON
    }
}

/// Immutable aircraft snapshot fed into every per-fix computation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AircraftState {
    pub location: GeoPoint,
    /// Altitude above mean sea level in metres
    pub altitude_m: f64,
    #[serde(default)]
    pub ground_speed_mps: f64,
    #[serde(default)]
    pub track_deg: f64,
    #[serde(default)]
    pub wind: Wind,
    /// Seconds on a monotonic flight clock
    pub time_s: f64,
}

impl AircraftState {
    /// Create a state with only required fields.
    pub fn new(location: GeoPoint, altitude_m: f64, time_s: f64) -> Self {
        Self {
            location,
            altitude_m,
            ground_speed_mps: 0.0,
            track_deg: 0.0,
            wind: Wind::calm(),
            time_s,
        }
    }

    /// Set ground speed and track.
    pub fn with_velocity(mut self, ground_speed_mps: f64, track_deg: f64) -> Self {
        self.ground_speed_mps = ground_speed_mps;
        self.track_deg = track_deg;
        self
    }

    pub fn with_wind(mut self, wind: Wind) -> Self {
        self.wind = wind;
        self
    }
}

/// Named turnpoint location. Shared read-only by the task point built on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub name: String,
    pub location: GeoPoint,
    #[serde(default)]
    pub elevation_m: f64,
}

impl Waypoint {
    pub fn new(name: impl Into<String>, location: GeoPoint, elevation_m: f64) -> Self {
        Self {
            name: name.into(),
            location,
            elevation_m,
        }
    }
}
