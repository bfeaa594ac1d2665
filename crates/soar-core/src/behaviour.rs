//! Task policy knobs and per-task rule settings.

use crate::factory::TaskFactoryType;
use crate::glide::PolarCoefficients;
use serde::{Deserialize, Serialize};

/// Height lost between start and finish that FAI rules tolerate.
pub const FAI_MAX_HEIGHT_LOSS_M: f64 = 1_000.0;

/// Policy configuration owned by the surrounding application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskBehaviour {
    /// Minimum arrival height above each turnpoint's elevation
    pub safety_height_arrival_m: f64,
    /// Tolerance added to the start height limit
    pub start_max_height_margin_m: f64,
    /// Tolerance added to the start speed limit
    pub start_max_speed_margin_mps: f64,
    /// Ruleset used when a task does not name one
    pub contest_ruleset: TaskFactoryType,
    /// Extra time aimed for beyond the AAT minimum time
    pub aat_time_margin_s: f64,
    /// Run the AAT target optimiser automatically
    pub optimise_targets: bool,
    /// MacCready setting (expected climb rate)
    pub mc_mps: f64,
    pub polar: PolarCoefficients,
}

impl Default for TaskBehaviour {
    fn default() -> Self {
        Self {
            safety_height_arrival_m: 300.0,
            start_max_height_margin_m: 0.0,
            start_max_speed_margin_mps: 0.0,
            contest_ruleset: TaskFactoryType::FaiGeneral,
            aat_time_margin_s: 300.0,
            optimise_targets: true,
            mc_mps: 1.5,
            polar: PolarCoefficients::default(),
        }
    }
}

/// Whether a height limit is measured above sea level or above the point.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeightReference {
    #[default]
    Msl,
    Agl,
}

impl HeightReference {
    /// Height of `altitude_m` measured against this reference.
    pub fn height(self, altitude_m: f64, elevation_m: f64) -> f64 {
        match self {
            HeightReference::Msl => altitude_m,
            HeightReference::Agl => altitude_m - elevation_m,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StartConstraints {
    pub max_height_m: Option<f64>,
    pub max_height_ref: HeightReference,
    pub max_speed_mps: Option<f64>,
}

impl StartConstraints {
    pub fn check_height(&self, altitude_m: f64, elevation_m: f64, margin_m: f64) -> bool {
        match self.max_height_m {
            Some(max) => self.max_height_ref.height(altitude_m, elevation_m) <= max + margin_m,
            None => true,
        }
    }

    pub fn check_speed(&self, ground_speed_mps: f64, margin_mps: f64) -> bool {
        match self.max_speed_mps {
            Some(max) => ground_speed_mps <= max + margin_mps,
            None => true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FinishConstraints {
    /// Minimum finish height; zero disables the check
    pub min_height_m: f64,
    pub min_height_ref: HeightReference,
    /// Finish no lower than the start height less the FAI allowance
    pub fai_finish: bool,
}

/// Rules attached to one task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderedTaskSettings {
    pub start: StartConstraints,
    pub finish: FinishConstraints,
    /// AAT minimum task time in seconds
    pub aat_min_time_s: f64,
}
