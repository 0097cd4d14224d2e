use super::{ApiError, blocking, param, require_data, required};
use crate::{dto::PlaceDto, state::AppState};
use axum::{
    Json,
    extract::{Query, State},
};
use headway::engine::search::{CLUSTER_RADIUS, cluster_matches};
use std::{collections::HashMap, sync::Arc};

pub async fn search(
    Query(params): Query<HashMap<String, String>>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<PlaceDto>>, ApiError> {
    require_data(&state).await?;
    let query: String = required(&params, "q")?;
    let count: usize = param(&params, "count")?.unwrap_or(10);

    let matches = blocking(&state, move |repository| repository.search_stops(&query)).await?;
    let places: Vec<_> = cluster_matches(matches, CLUSTER_RADIUS)
        .iter()
        .take(count)
        .map(PlaceDto::from)
        .collect();
    Ok(Json(places))
}
