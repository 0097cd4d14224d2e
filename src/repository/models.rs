use crate::{
    gtfs::Direction,
    shared::{geo::Coordinate, time::Time},
};
use chrono::NaiveDate;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stop {
    pub id: String,
    pub code: Option<String>,
    pub name: String,
    pub desc: Option<String>,
    pub coordinate: Coordinate,
    pub location_type: u8,
    pub parent_station: Option<String>,
    pub wheelchair_boarding: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Route {
    pub id: String,
    pub agency_id: String,
    pub short_name: Option<String>,
    pub long_name: Option<String>,
    pub route_type: i32,
    pub color: Option<String>,
    pub text_color: Option<String>,
    pub sort_order: Option<i64>,
}

impl Route {
    /// Short name, falling back to the long name and then the id.
    pub fn label(&self) -> &str {
        route_label(&self.id, self.short_name.as_deref(), self.long_name.as_deref())
    }
}

pub(crate) fn route_label<'a>(id: &'a str, short: Option<&'a str>, long: Option<&'a str>) -> &'a str {
    short
        .filter(|name| !name.is_empty())
        .or(long.filter(|name| !name.is_empty()))
        .unwrap_or(id)
}

/// One scheduled call at a stop, on a specific service date.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledDeparture {
    pub trip_id: String,
    pub stop_id: String,
    pub route_id: String,
    pub route_short_name: Option<String>,
    pub route_long_name: Option<String>,
    pub route_color: Option<String>,
    pub route_text_color: Option<String>,
    pub headsign: Option<String>,
    pub direction: Option<Direction>,
    pub departure_time: Time,
    pub service_date: NaiveDate,
}

impl ScheduledDeparture {
    pub fn route_label(&self) -> &str {
        route_label(
            &self.route_id,
            self.route_short_name.as_deref(),
            self.route_long_name.as_deref(),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteStops {
    pub trip_id: String,
    pub headsign: Option<String>,
    pub stops: Vec<Stop>,
}

/// A stop name with the centroid of every physical stop carrying it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StopMatch {
    pub name: String,
    pub coordinate: Coordinate,
}

/// Conditional fetch validators as last seen from the feed server.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Validators {
    pub last_modified: Option<String>,
    pub etag: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub agencies: usize,
    pub routes: usize,
    pub stops: usize,
    pub trips: usize,
    pub calendar: usize,
    pub calendar_dates: usize,
    pub stop_times: usize,
    pub shapes: usize,
}
