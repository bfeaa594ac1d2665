//! REST API routes.

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::api::error::ApiError;
use crate::api::fixes;
use crate::state::{AppState, TimedEvent};
use soar_core::{has_blocking_errors, OptimisedTarget, TaskDefinition, TaskStats, ValidationError};

/// Create the API router.
pub fn create_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/v1/task", get(get_task).put(put_task))
        .route("/v1/task/reset", post(reset_task))
        .route("/v1/task/optimise", post(optimise_targets))
        .route("/v1/task/aat-range", post(adjust_aat_range))
        .route("/v1/stats", get(get_stats))
        .route("/v1/events", get(list_events))
        .route("/v1/fixes", post(fixes::receive_fixes))
        .route("/v1/mc", put(set_mc))
        .route("/v1/validate", post(validate_task))
}

#[derive(Debug, Serialize)]
struct TaskResponse {
    #[serde(flatten)]
    definition: TaskDefinition,
    active_index: usize,
    started: bool,
    finished: bool,
}

async fn get_task(State(state): State<Arc<AppState>>) -> Json<TaskResponse> {
    let task = state.task().await;
    Json(TaskResponse {
        definition: TaskDefinition::from_task(&task),
        active_index: task.active_index(),
        started: task.is_started(),
        finished: task.is_finished(),
    })
}

async fn put_task(
    State(state): State<Arc<AppState>>,
    Json(definition): Json<TaskDefinition>,
) -> Result<Json<Value>, ApiError> {
    let task = definition.build()?;
    let points = task.len();
    let warnings = state.set_task(task).await?;
    Ok(Json(json!({ "points": points, "warnings": warnings })))
}

async fn reset_task(State(state): State<Arc<AppState>>) -> StatusCode {
    state.reset().await;
    StatusCode::NO_CONTENT
}

async fn get_stats(State(state): State<Arc<AppState>>) -> Json<TaskStats> {
    Json(state.stats().await)
}

async fn list_events(State(state): State<Arc<AppState>>) -> Json<Vec<TimedEvent>> {
    Json(state.recent_events())
}

#[derive(Debug, Serialize)]
struct OptimiseResponse {
    optimised: Vec<OptimisedTarget>,
    failures: Vec<String>,
}

async fn optimise_targets(State(state): State<Arc<AppState>>) -> Json<OptimiseResponse> {
    let mut response = OptimiseResponse {
        optimised: Vec::new(),
        failures: Vec::new(),
    };
    for result in state.optimise_targets().await {
        match result {
            Ok(target) => response.optimised.push(target),
            Err(failure) => response.failures.push(failure.to_string()),
        }
    }
    Json(response)
}

async fn adjust_aat_range(State(state): State<Arc<AppState>>) -> Result<Json<Value>, ApiError> {
    let range = state.adjust_aat_range().await?;
    Ok(Json(json!({ "range": range })))
}

#[derive(Debug, Deserialize)]
struct McRequest {
    mc_mps: f64,
}

async fn set_mc(
    State(state): State<Arc<AppState>>,
    Json(req): Json<McRequest>,
) -> Result<Json<Value>, ApiError> {
    if !req.mc_mps.is_finite() || req.mc_mps < 0.0 {
        return Err(ApiError::BadRequest(format!(
            "MacCready value must be a non-negative number, got {}",
            req.mc_mps
        )));
    }
    let mc_mps = state.set_mc(req.mc_mps).await;
    tracing::info!(mc_mps, "MacCready updated");
    Ok(Json(json!({ "mc_mps": mc_mps })))
}

#[derive(Debug, Serialize)]
struct ValidateResponse {
    valid: bool,
    errors: Vec<ValidationError>,
    warnings: Vec<ValidationError>,
}

/// Dry-run validation of a task definition against its ruleset.
async fn validate_task(
    Json(definition): Json<TaskDefinition>,
) -> Result<Json<ValidateResponse>, ApiError> {
    let task = definition.build()?;
    let problems = definition.ruleset.factory().validate(&task);
    let valid = !has_blocking_errors(&problems);
    let (warnings, errors): (Vec<_>, Vec<_>) = problems
        .into_iter()
        .partition(ValidationError::is_warning);
    Ok(Json(ValidateResponse {
        valid,
        errors,
        warnings,
    }))
}
