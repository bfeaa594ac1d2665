//! Per-fix task statistics.

use crate::glide::GlideResult;
use serde::{Deserialize, Serialize};

/// Distances, times and speeds for one task element (a leg or the whole task).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ElementStat {
    /// Glide solution over the remaining part of the element
    pub solution_remaining: GlideResult,
    pub distance_remaining_m: f64,
    pub distance_travelled_m: f64,
    pub distance_planned_m: f64,
    pub time_elapsed_s: f64,
    pub time_remaining_s: f64,
    pub time_planned_s: f64,
    pub speed_remaining_mps: f64,
    pub speed_travelled_mps: f64,
    pub speed_planned_mps: f64,
}

impl ElementStat {
    /// Fill in the derived times and speeds.
    pub fn finish_timing(&mut self) {
        self.time_remaining_s = if self.solution_remaining.is_defined() {
            self.solution_remaining.time_elapsed_s
        } else {
            0.0
        };
        self.time_planned_s = self.time_elapsed_s + self.time_remaining_s;
        self.speed_remaining_mps = ratio(self.distance_remaining_m, self.time_remaining_s);
        self.speed_travelled_mps = ratio(self.distance_travelled_m, self.time_elapsed_s);
        self.speed_planned_mps = ratio(self.distance_planned_m, self.time_planned_s);
    }
}

fn ratio(distance: f64, time: f64) -> f64 {
    if time > 0.0 {
        distance / time
    } else {
        0.0
    }
}

/// Scored task distances.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DistanceStat {
    /// Through every point's reference location
    pub nominal_m: f64,
    /// Shortest path through the zone boundaries
    pub min_m: f64,
    /// Longest path through the zone boundaries
    pub max_m: f64,
    /// Through the current targets
    pub planned_m: f64,
    /// Best scored distance achieved so far
    pub scored_m: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskStats {
    pub active_index: usize,
    pub task_started: bool,
    pub task_finished: bool,
    pub start_time_s: Option<f64>,
    pub finish_time_s: Option<f64>,
    pub total: ElementStat,
    pub current_leg: ElementStat,
    pub distances: DistanceStat,
    pub final_glide: bool,
    /// AAT minimum time still to fly, if the task has one
    pub aat_time_remaining_s: Option<f64>,
}
