use super::{Config, FieldError, Row};
use crate::shared::Time;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A record type that can be decoded from one row of a feed file.
pub trait Record: Sized {
    fn file_name(config: &Config) -> &str;
    fn decode(row: &Row<'_>) -> Result<Self, FieldError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Outbound,
    Inbound,
}

impl Direction {
    pub const fn from_id(id: u8) -> Option<Self> {
        match id {
            0 => Some(Self::Outbound),
            1 => Some(Self::Inbound),
            _ => None,
        }
    }

    pub const fn id(&self) -> u8 {
        match self {
            Self::Outbound => 0,
            Self::Inbound => 1,
        }
    }

    pub const fn label(&self) -> &'static str {
        match self {
            Self::Outbound => "Outbound",
            Self::Inbound => "Inbound",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExceptionType {
    Added,
    Removed,
}

impl ExceptionType {
    pub const fn id(&self) -> u8 {
        match self {
            Self::Added => 1,
            Self::Removed => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GtfsAgency {
    pub agency_id: String,
    pub agency_name: String,
    pub agency_url: String,
    pub agency_timezone: String,
}

impl Record for GtfsAgency {
    fn file_name(config: &Config) -> &str {
        &config.agency_file_name
    }

    fn decode(row: &Row<'_>) -> Result<Self, FieldError> {
        Ok(Self {
            agency_id: row.optional_string("agency_id").unwrap_or_default(),
            agency_name: row.string("agency_name")?,
            agency_url: row.string("agency_url")?,
            agency_timezone: row.string("agency_timezone")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GtfsRoute {
    pub route_id: String,
    pub agency_id: String,
    pub route_short_name: Option<String>,
    pub route_long_name: Option<String>,
    pub route_type: i32,
    pub route_color: Option<String>,
    pub route_text_color: Option<String>,
    pub route_sort_order: Option<i64>,
}

impl Record for GtfsRoute {
    fn file_name(config: &Config) -> &str {
        &config.routes_file_name
    }

    fn decode(row: &Row<'_>) -> Result<Self, FieldError> {
        Ok(Self {
            route_id: row.string("route_id")?,
            agency_id: row.optional_string("agency_id").unwrap_or_default(),
            route_short_name: row.optional_string("route_short_name"),
            route_long_name: row.optional_string("route_long_name"),
            route_type: row.parse_required("route_type")?,
            route_color: row.optional_string("route_color"),
            route_text_color: row.optional_string("route_text_color"),
            route_sort_order: row.parse_optional("route_sort_order")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GtfsStop {
    pub stop_id: String,
    pub stop_code: Option<String>,
    pub stop_name: String,
    pub stop_desc: Option<String>,
    pub stop_lat: f64,
    pub stop_lon: f64,
    pub zone_id: Option<String>,
    pub location_type: u8,
    pub parent_station: Option<String>,
    pub wheelchair_boarding: u8,
}

impl Record for GtfsStop {
    fn file_name(config: &Config) -> &str {
        &config.stops_file_name
    }

    fn decode(row: &Row<'_>) -> Result<Self, FieldError> {
        Ok(Self {
            stop_id: row.string("stop_id")?,
            stop_code: row.optional_string("stop_code"),
            stop_name: row.optional_string("stop_name").unwrap_or_default(),
            stop_desc: row.optional_string("stop_desc"),
            stop_lat: row.parse_required("stop_lat")?,
            stop_lon: row.parse_required("stop_lon")?,
            zone_id: row.optional_string("zone_id"),
            location_type: row.parse_optional("location_type")?.unwrap_or(0),
            parent_station: row.optional_string("parent_station"),
            wheelchair_boarding: row.parse_optional("wheelchair_boarding")?.unwrap_or(0),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GtfsTrip {
    pub trip_id: String,
    pub route_id: String,
    pub service_id: String,
    pub trip_headsign: Option<String>,
    pub direction: Option<Direction>,
    pub block_id: Option<String>,
    pub shape_id: Option<String>,
}

impl Record for GtfsTrip {
    fn file_name(config: &Config) -> &str {
        &config.trips_file_name
    }

    fn decode(row: &Row<'_>) -> Result<Self, FieldError> {
        let direction = match row.parse_optional::<u8>("direction_id")? {
            Some(id) => Some(Direction::from_id(id).ok_or_else(|| FieldError::Invalid {
                column: "direction_id",
                value: id.to_string(),
            })?),
            None => None,
        };
        Ok(Self {
            trip_id: row.string("trip_id")?,
            route_id: row.string("route_id")?,
            service_id: row.string("service_id")?,
            trip_headsign: row.optional_string("trip_headsign"),
            direction,
            block_id: row.optional_string("block_id"),
            shape_id: row.optional_string("shape_id"),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GtfsStopTime {
    pub trip_id: String,
    pub arrival_time: Option<Time>,
    pub departure_time: Option<Time>,
    pub stop_id: String,
    pub stop_sequence: u32,
    pub pickup_type: u8,
    pub drop_off_type: u8,
    pub timepoint: Option<u8>,
}

impl Record for GtfsStopTime {
    fn file_name(config: &Config) -> &str {
        &config.stop_times_file_name
    }

    fn decode(row: &Row<'_>) -> Result<Self, FieldError> {
        let arrival_time = row.time("arrival_time")?;
        let departure_time = row.time("departure_time")?;
        Ok(Self {
            trip_id: row.string("trip_id")?,
            arrival_time: arrival_time.or(departure_time),
            departure_time: departure_time.or(arrival_time),
            stop_id: row.string("stop_id")?,
            stop_sequence: row.parse_required("stop_sequence")?,
            pickup_type: row.parse_optional("pickup_type")?.unwrap_or(0),
            drop_off_type: row.parse_optional("drop_off_type")?.unwrap_or(0),
            timepoint: row.parse_optional("timepoint")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GtfsCalendar {
    pub service_id: String,
    /// Monday first.
    pub days: [bool; 7],
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl Record for GtfsCalendar {
    fn file_name(config: &Config) -> &str {
        &config.calendar_file_name
    }

    fn decode(row: &Row<'_>) -> Result<Self, FieldError> {
        Ok(Self {
            service_id: row.string("service_id")?,
            days: [
                row.flag("monday")?,
                row.flag("tuesday")?,
                row.flag("wednesday")?,
                row.flag("thursday")?,
                row.flag("friday")?,
                row.flag("saturday")?,
                row.flag("sunday")?,
            ],
            start_date: row.date("start_date")?,
            end_date: row.date("end_date")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GtfsCalendarDate {
    pub service_id: String,
    pub date: NaiveDate,
    pub exception_type: ExceptionType,
}

impl Record for GtfsCalendarDate {
    fn file_name(config: &Config) -> &str {
        &config.calendar_dates_file_name
    }

    fn decode(row: &Row<'_>) -> Result<Self, FieldError> {
        let exception_type = match row.parse_required::<u8>("exception_type")? {
            1 => ExceptionType::Added,
            2 => ExceptionType::Removed,
            other => {
                return Err(FieldError::Invalid {
                    column: "exception_type",
                    value: other.to_string(),
                });
            }
        };
        Ok(Self {
            service_id: row.string("service_id")?,
            date: row.date("date")?,
            exception_type,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GtfsShapePoint {
    pub shape_id: String,
    pub shape_pt_lat: f64,
    pub shape_pt_lon: f64,
    pub shape_pt_sequence: u32,
    pub shape_dist_traveled: Option<f64>,
}

impl Record for GtfsShapePoint {
    fn file_name(config: &Config) -> &str {
        &config.shapes_file_name
    }

    fn decode(row: &Row<'_>) -> Result<Self, FieldError> {
        Ok(Self {
            shape_id: row.string("shape_id")?,
            shape_pt_lat: row.parse_required("shape_pt_lat")?,
            shape_pt_lon: row.parse_required("shape_pt_lon")?,
            shape_pt_sequence: row.parse_required("shape_pt_sequence")?,
            shape_dist_traveled: row.parse_optional("shape_dist_traveled")?,
        })
    }
}
