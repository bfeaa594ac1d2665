//! AAT target placement: isoline optimisation and minimum-time range
//! adjustment.

use crate::behaviour::TaskBehaviour;
use crate::error::{OptimiseFailure, TaskError};
use crate::geo::GeoPoint;
use crate::glide::GlidePolar;
use crate::optimise::{
    find_zero, minimise, MAX_ISOLINE_PARAMETER, MIN_ISOLINE_PARAMETER, TOLERANCE_OPT_TARGET,
};
use crate::state::AircraftState;
use crate::task::OrderedTask;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Objective value standing in for an infeasible remaining task.
const INFEASIBLE_TIME_S: f64 = 1.0e12;
const RANGE_TOLERANCE: f64 = 1.0e-3;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OptimisedTarget {
    pub index: usize,
    /// Isoline parameter in [0.02, 0.98]
    pub parameter: f64,
    pub location: GeoPoint,
    pub time_remaining_s: f64,
}

fn remaining_time(
    task: &OrderedTask,
    state: &AircraftState,
    polar: &GlidePolar,
    behaviour: &TaskBehaviour,
) -> f64 {
    match task.solve_remaining(state, polar, behaviour) {
        Some(solution) if solution.is_defined() => solution.time_elapsed_s,
        _ => INFEASIBLE_TIME_S,
    }
}

/// Slide the target of area point `index` along its isoline to minimise the
/// time to finish.
///
/// On failure the previous target is restored.
pub fn optimise_target(
    task: &mut OrderedTask,
    index: usize,
    state: &AircraftState,
    polar: &GlidePolar,
    behaviour: &TaskBehaviour,
) -> Result<OptimisedTarget, OptimiseFailure> {
    let point = task.point(index).ok_or(OptimiseFailure::NotAreaPoint(index))?;
    let target = *point
        .area_target()
        .ok_or(OptimiseFailure::NotAreaPoint(index))?;
    if target.locked {
        return Err(OptimiseFailure::TargetLocked(index));
    }
    let isoline = task
        .isoline(index, state)
        .ok_or(OptimiseFailure::InvalidIsoline(index))?;

    let minimum = minimise(
        |p| {
            task.set_target_unchecked(index, isoline.parametric(p));
            remaining_time(task, state, polar, behaviour)
        },
        MIN_ISOLINE_PARAMETER,
        MAX_ISOLINE_PARAMETER,
        TOLERANCE_OPT_TARGET,
    );

    let failure = if !minimum.converged {
        Some(OptimiseFailure::NotConverged)
    } else if minimum.value >= INFEASIBLE_TIME_S {
        Some(OptimiseFailure::NoSolution)
    } else {
        None
    };
    if let Some(failure) = failure {
        task.set_target_unchecked(index, target.location);
        return Err(failure);
    }

    let location = isoline.parametric(minimum.x);
    task.set_target_unchecked(index, location);
    debug!(
        index,
        parameter = minimum.x,
        iterations = minimum.iterations,
        time_remaining_s = minimum.value,
        "area target optimised"
    );
    Ok(OptimisedTarget {
        index,
        parameter: minimum.x,
        location,
        time_remaining_s: minimum.value,
    })
}

/// Optimise every unlocked area target that has not been reached yet.
pub fn optimise_targets(
    task: &mut OrderedTask,
    state: &AircraftState,
    polar: &GlidePolar,
    behaviour: &TaskBehaviour,
) -> Vec<Result<OptimisedTarget, OptimiseFailure>> {
    let candidates: Vec<usize> = task
        .points()
        .iter()
        .enumerate()
        .skip(task.active_index())
        .filter(|(_, point)| point.is_area() && !point.is_target_locked() && !point.has_entered())
        .map(|(index, _)| index)
        .collect();

    candidates
        .into_iter()
        .map(|index| {
            let result = optimise_target(task, index, state, polar, behaviour);
            if let Err(failure) = &result {
                warn!(index, %failure, "target optimisation failed, prior target kept");
            }
            result
        })
        .collect()
}

/// Move every free area target to a common range so the planned task time
/// matches the AAT minimum time plus the behaviour's margin.
///
/// Returns the chosen range, or `None` when the task has no minimum time, no
/// free area targets or no glide solution. Errors come from target placement.
pub fn adjust_aat_range(
    task: &mut OrderedTask,
    state: &AircraftState,
    polar: &GlidePolar,
    behaviour: &TaskBehaviour,
) -> Result<Option<f64>, TaskError> {
    let min_time = task.settings().aat_min_time_s;
    if min_time <= 0.0 {
        return Ok(None);
    }
    let free: Vec<(usize, GeoPoint)> = task
        .points()
        .iter()
        .enumerate()
        .skip(task.active_index())
        .filter(|(_, point)| point.is_area() && !point.is_target_locked() && !point.has_entered())
        .map(|(index, point)| (index, point.target_location()))
        .collect();
    if free.is_empty() {
        return Ok(None);
    }
    for (index, _) in &free {
        task.set_target_range(*index, 0.0)?;
    }

    let elapsed = task
        .start_time()
        .map_or(0.0, |start| (state.time_s - start).max(0.0));
    let goal = min_time + behaviour.aat_time_margin_s;

    let mut placement: Result<(), TaskError> = Ok(());
    let mut planned_excess = |range: f64| {
        for (index, _) in &free {
            if let Err(err) = task.set_target_range(*index, range) {
                placement = Err(err);
                return f64::NAN;
            }
        }
        elapsed + remaining_time(task, state, polar, behaviour) - goal
    };

    let shortest = planned_excess(0.0);
    let range = if shortest + goal >= INFEASIBLE_TIME_S {
        None
    } else if shortest >= 0.0 {
        Some(0.0)
    } else if planned_excess(1.0) <= 0.0 {
        Some(1.0)
    } else {
        Some(find_zero(&mut planned_excess, 0.0, 1.0, RANGE_TOLERANCE).unwrap_or(0.5))
    };
    if let Some(range) = range {
        planned_excess(range);
    }
    placement?;

    match range {
        Some(range) => debug!(range, goal_s = goal, "aat range adjusted"),
        None => {
            for (index, location) in &free {
                task.set_target_unchecked(*index, *location);
            }
        }
    }
    Ok(range)
}
