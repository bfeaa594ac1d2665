//! Engine error types.

use crate::factory::{PointPosition, TaskFactoryType, TaskPointFactoryType, ValidationError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TaskError {
    #[error("task point index {index} out of range (task has {len} points)")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("task has no points")]
    EmptyTask,

    #[error("{point_type:?} is not a legal {position:?} point for {ruleset:?} tasks")]
    IllegalPointType {
        ruleset: TaskFactoryType,
        point_type: TaskPointFactoryType,
        position: PointPosition,
    },

    #[error("target is outside the observation zone of point {0}")]
    TargetOutsideZone(usize),

    #[error("task point {0} is not an area point")]
    NotAreaPoint(usize),

    #[error("observation zone of point {0} has non-finite or empty dimensions")]
    InvalidZone(usize),

    #[error("observation zone of point {0} has no boundary")]
    DegenerateZone(usize),

    #[error("task failed validation: {0:?}")]
    Invalid(Vec<ValidationError>),

    #[error("invalid task definition: {0}")]
    Definition(#[from] serde_json::Error),
}

/// Reasons the AAT target optimiser gave up. The prior target is always
/// restored before one of these is returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum OptimiseFailure {
    #[error("task point {0} is not an area point")]
    NotAreaPoint(usize),

    #[error("target of point {0} is locked")]
    TargetLocked(usize),

    #[error("isoline of point {0} is degenerate or the point was already entered")]
    InvalidIsoline(usize),

    #[error("optimiser did not converge")]
    NotConverged,

    #[error("remaining task has no glide solution")]
    NoSolution,
}
