use super::{DepartureDto, GroupDto};
use crate::realtime::Alert;
use headway::prelude::*;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct StopDto {
    pub id: String,
    pub code: Option<String>,
    pub name: String,
    pub desc: Option<String>,
    pub coordinate: Coordinate,
}

impl StopDto {
    pub fn from(stop: &Stop) -> Self {
        Self {
            id: stop.id.clone(),
            code: stop.code.clone(),
            name: stop.name.clone(),
            desc: stop.desc.clone(),
            coordinate: stop.coordinate,
        }
    }
}

/// A searchable place: one stop name at the centroid of its stops.
#[derive(Debug, Clone, Serialize)]
pub struct PlaceDto {
    pub name: String,
    pub coordinate: Coordinate,
}

impl PlaceDto {
    pub fn from(place: &StopMatch) -> Self {
        Self {
            name: place.name.clone(),
            coordinate: place.coordinate,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StopDeparturesDto {
    pub stop: StopDto,
    pub realtime: bool,
    pub alerts: Vec<Alert>,
    pub departures: Vec<DepartureDto>,
    pub groups: Vec<GroupDto>,
}

/// Every departure of one route and direction in the next hours.
#[derive(Debug, Clone, Serialize)]
pub struct LaterDto {
    pub stop: StopDto,
    pub route_id: String,
    pub direction: Option<Direction>,
    pub headway: Option<String>,
    pub departures: Vec<DepartureDto>,
}
