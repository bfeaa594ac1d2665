//! Fix ingestion endpoint.

use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};
use soar_core::AircraftState;
use std::sync::Arc;

use crate::api::error::ApiError;
use crate::state::AppState;

/// Queue a batch of fixes for the calculation loop.
pub async fn receive_fixes(
    State(state): State<Arc<AppState>>,
    Json(fixes): Json<Vec<AircraftState>>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    for (index, fix) in fixes.iter().enumerate() {
        validate_fix(fix).map_err(|reason| ApiError::BadRequest(format!("fix {index}: {reason}")))?;
    }
    for fix in &fixes {
        state.submit_fix(*fix)?;
    }
    Ok((StatusCode::ACCEPTED, Json(json!({ "queued": fixes.len() }))))
}

fn validate_fix(fix: &AircraftState) -> Result<(), &'static str> {
    if !fix.location.is_valid() {
        return Err("location out of range");
    }
    if !fix.altitude_m.is_finite() {
        return Err("altitude is not a number");
    }
    if !fix.time_s.is_finite() {
        return Err("time is not a number");
    }
    if !fix.ground_speed_mps.is_finite() || fix.ground_speed_mps < 0.0 {
        return Err("ground speed must be a non-negative number");
    }
    if !fix.wind.speed_mps.is_finite() || fix.wind.speed_mps < 0.0 {
        return Err("wind speed must be a non-negative number");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use soar_core::GeoPoint;

    #[test]
    fn rejects_out_of_range_location() {
        let fix = AircraftState::new(GeoPoint::new(95.0, 7.0), 1_000.0, 0.0);
        assert_eq!(validate_fix(&fix), Err("location out of range"));
    }

    #[test]
    fn rejects_negative_ground_speed() {
        let fix =
            AircraftState::new(GeoPoint::new(46.0, 7.0), 1_000.0, 0.0).with_velocity(-1.0, 0.0);
        assert!(validate_fix(&fix).is_err());
    }

    #[test]
    fn accepts_plain_fix() {
        let fix = AircraftState::new(GeoPoint::new(46.0, 7.0), 1_000.0, 0.0);
        assert_eq!(validate_fix(&fix), Ok(()));
    }
}
