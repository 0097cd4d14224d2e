use crate::departures::GroupWithHeadway;
use headway::prelude::*;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct DepartureDto {
    pub trip_id: String,
    pub route: String,
    pub headsign: Option<String>,
    pub direction_text: Option<String>,
    /// What to show: realtime when known, otherwise the timetable.
    pub time: String,
    pub scheduled: Option<String>,
    pub realtime: Option<String>,
    pub minutes_away: u32,
    pub is_realtime: bool,
    pub is_late: bool,
}

impl DepartureDto {
    pub fn from(departure: &Departure) -> Self {
        Self {
            trip_id: departure.trip_id.clone(),
            route: departure.route_label.clone(),
            headsign: departure.headsign.clone(),
            direction_text: departure.direction_text.clone(),
            time: departure.display_time().to_string(),
            scheduled: departure.scheduled.clone(),
            realtime: departure.realtime.clone(),
            minutes_away: departure.minutes_away,
            is_realtime: departure.is_realtime,
            is_late: departure.is_late,
        }
    }
}

/// One route and direction: the next departure first, then the later ones.
#[derive(Debug, Clone, Serialize)]
pub struct GroupDto {
    pub route_id: String,
    pub route: String,
    pub color: Option<String>,
    pub text_color: Option<String>,
    pub direction: Option<Direction>,
    pub direction_text: Option<String>,
    pub headsign: Option<String>,
    pub headway: Option<String>,
    pub departures: Vec<DepartureDto>,
}

impl GroupDto {
    pub fn from(group: &DepartureGroup, headway: Option<&Headway>) -> Self {
        Self {
            route_id: group.route_id.clone(),
            route: group.route_label.clone(),
            color: group.route_color.clone(),
            text_color: group.route_text_color.clone(),
            direction: group.direction,
            direction_text: group.direction_text.clone(),
            headsign: group.headsign.clone(),
            headway: headway.map(Headway::to_string),
            departures: group.departures.iter().map(DepartureDto::from).collect(),
        }
    }

    pub fn with_headway(grouped: &GroupWithHeadway) -> Self {
        Self::from(&grouped.group, grouped.headway.as_ref())
    }
}
