use super::StopDto;
use headway::prelude::*;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct RouteDto {
    pub id: String,
    pub label: String,
    pub long_name: Option<String>,
    pub route_type: i32,
    pub color: Option<String>,
    pub text_color: Option<String>,
}

impl RouteDto {
    pub fn from(route: &Route) -> Self {
        Self {
            id: route.id.clone(),
            label: route.label().to_string(),
            long_name: route.long_name.clone(),
            route_type: route.route_type,
            color: route.color.clone(),
            text_color: route.text_color.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RouteStopsDto {
    pub direction: Option<Direction>,
    pub headsign: Option<String>,
    pub stops: Vec<StopDto>,
}

impl RouteStopsDto {
    pub fn from(direction: Option<Direction>, route_stops: &RouteStops) -> Self {
        Self {
            direction,
            headsign: route_stops.headsign.clone(),
            stops: route_stops.stops.iter().map(StopDto::from).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RouteDetailDto {
    pub route: RouteDto,
    pub directions: Vec<RouteStopsDto>,
}
