use super::{ApiError, bounded, param, require_data, required};
use crate::{
    dto::NearbyDto,
    nearby::{DEFAULT_PAGE_SIZE, View},
    state::AppState,
};
use axum::{
    Json,
    extract::{Query, State},
};
use headway::prelude::*;
use std::{collections::HashMap, sync::Arc};

const MAX_PAGE_SIZE: usize = 50;

pub async fn nearby(
    Query(params): Query<HashMap<String, String>>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<NearbyDto>, ApiError> {
    require_data(&state).await?;
    let lat: f64 = required(&params, "lat")?;
    let lon: f64 = required(&params, "lon")?;
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
        return Err(ApiError::BadRequest(format!("Coordinate {lat}, {lon} is out of range")));
    }
    let view: View = param(&params, "view")?.unwrap_or_default();
    let offset: usize = param(&params, "offset")?.unwrap_or(0);
    let limit = param(&params, "limit")?
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);
    let tier = param::<f64>(&params, "radius")?
        .map(RadiusTier::from_meters)
        .unwrap_or_default();

    let now = state.now();
    let page = bounded(&state, async {
        Ok(state
            .nearby
            .search(Coordinate::new(lat, lon), view, offset, limit, tier, &now)
            .await?)
    })
    .await?;
    Ok(Json(NearbyDto::from(view, &page)))
}
