use super::{ApiError, blocking, bounded, param, require_data, required};
use crate::{
    departures::STOP_LIMIT,
    dto::{DepartureDto, GroupDto, LaterDto, StopDeparturesDto, StopDto},
    state::AppState,
};
use axum::{
    Json,
    extract::{Path, Query, State},
};
use headway::prelude::*;
use std::{collections::HashMap, sync::Arc};

const MAX_LIMIT: usize = 100;

async fn find_stop(state: &AppState, id: &str) -> Result<Stop, ApiError> {
    let stop_id = id.to_string();
    blocking(state, move |repository| repository.stop(&stop_id))
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Stop {id}")))
}

pub async fn stop(
    Path(id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<StopDeparturesDto>, ApiError> {
    require_data(&state).await?;
    let limit = param(&params, "limit")?
        .unwrap_or(STOP_LIMIT)
        .clamp(1, MAX_LIMIT);
    let stop = find_stop(&state, &id).await?;

    let now = state.now();
    let dto = bounded(&state, async {
        let found = state.departures.for_stop(&id, &now, limit).await?;
        let groups = state
            .departures
            .grouped(&id, found.departures.clone(), &now, usize::MAX)
            .await;
        Ok(StopDeparturesDto {
            stop: StopDto::from(&stop),
            realtime: found.realtime,
            alerts: found.alerts,
            departures: found.departures.iter().map(DepartureDto::from).collect(),
            groups: groups.iter().map(GroupDto::with_headway).collect(),
        })
    })
    .await?;
    Ok(Json(dto))
}

/// Later departures of one route and direction at a stop.
pub async fn later(
    Path(id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<LaterDto>, ApiError> {
    require_data(&state).await?;
    let route_id: String = required(&params, "route")?;
    let direction = match param::<u8>(&params, "direction")? {
        Some(id) => Some(
            Direction::from_id(id)
                .ok_or_else(|| ApiError::BadRequest(format!("Invalid direction '{id}'")))?,
        ),
        None => None,
    };
    let stop = find_stop(&state, &id).await?;

    let now = state.now();
    let dto = bounded(&state, async {
        let found = state
            .departures
            .later(&id, &route_id, direction, &now)
            .await?;
        let headway = state
            .departures
            .headways(vec![(id.clone(), route_id.clone(), direction)], &now)
            .await
            .into_values()
            .next()
            .flatten();
        Ok(LaterDto {
            stop: StopDto::from(&stop),
            route_id: route_id.clone(),
            direction,
            headway: headway.map(|headway| headway.to_string()),
            departures: found.departures.iter().map(DepartureDto::from).collect(),
        })
    })
    .await?;
    Ok(Json(dto))
}
