use super::{ApiError, blocking, require_data};
use crate::{
    dto::{RouteDetailDto, RouteDto, RouteStopsDto},
    state::AppState,
};
use axum::{
    Json,
    extract::{Path, State},
};
use headway::prelude::*;
use std::sync::Arc;

pub async fn routes(State(state): State<Arc<AppState>>) -> Result<Json<Vec<RouteDto>>, ApiError> {
    require_data(&state).await?;
    let routes = blocking(&state, |repository| repository.routes()).await?;
    Ok(Json(routes.iter().map(RouteDto::from).collect()))
}

/// The route and its stops in each direction running today.
pub async fn route(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<RouteDetailDto>, ApiError> {
    require_data(&state).await?;
    let today = state.now().date_naive();
    let route_id = id.clone();
    let (route, directions) = blocking(&state, move |repository| {
        let Some(route) = repository.route(&route_id)? else {
            return Ok((None, Vec::new()));
        };
        let mut directions = Vec::new();
        for direction in [Some(Direction::Outbound), Some(Direction::Inbound)] {
            if let Some(stops) = repository.stops_for_route(&route_id, direction, today)? {
                directions.push((direction, stops));
            }
        }
        // Feeds without direction ids still get one sequence.
        if directions.is_empty() {
            if let Some(stops) = repository.stops_for_route(&route_id, None, today)? {
                directions.push((None, stops));
            }
        }
        Ok((Some(route), directions))
    })
    .await?;

    let route = route.ok_or_else(|| ApiError::NotFound(format!("Route {id}")))?;
    Ok(Json(RouteDetailDto {
        route: RouteDto::from(&route),
        directions: directions
            .iter()
            .map(|(direction, stops)| RouteStopsDto::from(*direction, stops))
            .collect(),
    }))
}
