use super::ApiError;
use crate::state::AppState;
use axum::{Json, extract::State};
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{error, info};

/// Downloads and imports the feed now, ignoring validators.
pub async fn refresh(State(state): State<Arc<AppState>>) -> Result<Json<Value>, ApiError> {
    let summary = state.scheduler.force_refresh().await.map_err(|err| {
        error!("Forced refresh failed: {err}");
        ApiError::Upstream(format!("Refresh failed: {err}"))
    })?;
    info!("Forced refresh imported {} stop times", summary.stop_times);
    Ok(Json(json!({
        "agencies": summary.agencies,
        "routes": summary.routes,
        "stops": summary.stops,
        "trips": summary.trips,
        "calendar": summary.calendar,
        "calendar_dates": summary.calendar_dates,
        "stop_times": summary.stop_times,
        "shapes": summary.shapes,
    })))
}
