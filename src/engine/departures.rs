use crate::{
    gtfs::Direction,
    repository::ScheduledDeparture,
    shared::time::Time,
};
use chrono::{DateTime, Duration, NaiveDate, TimeZone};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// Realtime may run this far behind schedule before a departure counts as late.
pub const LATE_TOLERANCE: Duration = Duration::minutes(2);

/// A realtime departure prediction for one stop.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Prediction {
    pub trip_id: String,
    pub route_id: String,
    pub route_short_name: Option<String>,
    pub direction: Option<Direction>,
    pub direction_text: Option<String>,
    pub description: Option<String>,
    /// Unix seconds.
    pub departure_epoch: i64,
    /// False when the source is only echoing the timetable.
    pub is_actual: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Departure {
    pub trip_id: String,
    pub stop_id: String,
    pub route_id: String,
    pub route_label: String,
    pub route_color: Option<String>,
    pub route_text_color: Option<String>,
    pub headsign: Option<String>,
    pub direction: Option<Direction>,
    pub direction_text: Option<String>,
    /// `None` for actual predictions the timetable does not know about.
    pub scheduled: Option<String>,
    pub realtime: Option<String>,
    /// Unix seconds of the best known departure.
    pub departs_at: i64,
    pub minutes_away: u32,
    pub is_realtime: bool,
    pub is_late: bool,
}

impl Departure {
    /// Realtime time when there is one, otherwise the timetable.
    pub fn display_time(&self) -> &str {
        self.realtime
            .as_deref()
            .or(self.scheduled.as_deref())
            .unwrap_or_default()
    }
}

/// Expands the realtime feed's compass abbreviations.
pub fn expand_direction(text: &str) -> String {
    match text.trim() {
        "NB" => "Northbound".to_string(),
        "SB" => "Southbound".to_string(),
        "EB" => "Eastbound".to_string(),
        "WB" => "Westbound".to_string(),
        other => other.to_string(),
    }
}

/// The instant a service time falls on. Feed times count from noon minus
/// twelve hours, which differs from midnight on DST change days.
pub fn service_instant<Tz: TimeZone>(tz: &Tz, date: NaiveDate, time: Time) -> Option<DateTime<Tz>> {
    let noon = tz.from_local_datetime(&date.and_hms_opt(12, 0, 0)?).earliest()?;
    Some(noon - Duration::hours(12) + Duration::seconds(i64::from(time.as_seconds())))
}

/// `3:04 PM` in the operating timezone.
pub fn clock_label<Tz: TimeZone>(tz: &Tz, epoch: i64) -> Option<String> {
    let local = tz.timestamp_opt(epoch, 0).earliest()?;
    Some(local.naive_local().format("%-I:%M %p").to_string())
}

fn minutes_between(now: i64, at: i64) -> u32 {
    u32::try_from((at - now).max(0) / 60).unwrap_or(u32::MAX)
}

/// Overlays realtime predictions on scheduled departures.
///
/// Scheduled rows are matched to predictions by trip id. An actual
/// prediction replaces the displayed time and flags the row late once it
/// trails the timetable by more than [`LATE_TOLERANCE`]. Predictions with no
/// scheduled row are appended while they are still in the future. The
/// result is ordered by departure and cut to `limit`.
pub fn merge_departures<Tz: TimeZone>(
    scheduled: &[ScheduledDeparture],
    predictions: Option<&[Prediction]>,
    now: &DateTime<Tz>,
    limit: usize,
) -> Vec<Departure> {
    let tz = now.timezone();
    let now_epoch = now.timestamp();
    let predictions = predictions.unwrap_or_default();

    let by_trip: HashMap<&str, &Prediction> = predictions
        .iter()
        .filter(|prediction| !prediction.trip_id.is_empty())
        .map(|prediction| (prediction.trip_id.as_str(), prediction))
        .collect();
    let direction_text: HashMap<(&str, Option<Direction>), String> = predictions
        .iter()
        .filter_map(|prediction| {
            let text = prediction.direction_text.as_deref()?.trim();
            (!text.is_empty()).then(|| {
                (
                    (prediction.route_id.as_str(), prediction.direction),
                    expand_direction(text),
                )
            })
        })
        .collect();

    let mut matched: HashSet<&str> = HashSet::new();
    let mut departures = Vec::with_capacity(scheduled.len() + predictions.len());
    for row in scheduled {
        let Some(scheduled_at) = service_instant(&tz, row.service_date, row.departure_time) else {
            continue;
        };
        let scheduled_epoch = scheduled_at.timestamp();
        let mut departure = Departure {
            trip_id: row.trip_id.clone(),
            stop_id: row.stop_id.clone(),
            route_id: row.route_id.clone(),
            route_label: row.route_label().to_string(),
            route_color: row.route_color.clone(),
            route_text_color: row.route_text_color.clone(),
            headsign: row.headsign.clone(),
            direction: row.direction,
            direction_text: direction_text
                .get(&(row.route_id.as_str(), row.direction))
                .cloned(),
            scheduled: Some(row.departure_time.to_clock_string()),
            realtime: None,
            departs_at: scheduled_epoch,
            minutes_away: minutes_between(now_epoch, scheduled_epoch),
            is_realtime: false,
            is_late: false,
        };

        if let Some(prediction) = by_trip.get(row.trip_id.as_str()) {
            matched.insert(row.trip_id.as_str());
            departure.is_realtime = prediction.is_actual;
            if let Some(text) = prediction.direction_text.as_deref().filter(|t| !t.trim().is_empty()) {
                departure.direction_text = Some(expand_direction(text));
            }
            if prediction.is_actual {
                departure.realtime = clock_label(&tz, prediction.departure_epoch);
                departure.departs_at = prediction.departure_epoch;
                departure.minutes_away = minutes_between(now_epoch, prediction.departure_epoch);
                departure.is_late =
                    prediction.departure_epoch - scheduled_epoch > LATE_TOLERANCE.num_seconds();
            }
        }
        departures.push(departure);
    }

    for prediction in predictions {
        if matched.contains(prediction.trip_id.as_str()) || prediction.departure_epoch < now_epoch {
            continue;
        }
        let label = clock_label(&tz, prediction.departure_epoch);
        let (scheduled, realtime) = if prediction.is_actual {
            (None, label)
        } else {
            (label, None)
        };
        departures.push(Departure {
            trip_id: prediction.trip_id.clone(),
            stop_id: String::new(),
            route_id: prediction.route_id.clone(),
            route_label: prediction
                .route_short_name
                .clone()
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| prediction.route_id.clone()),
            route_color: None,
            route_text_color: None,
            headsign: prediction.description.clone(),
            direction: prediction.direction,
            direction_text: prediction.direction_text.as_deref().map(expand_direction),
            scheduled,
            realtime,
            departs_at: prediction.departure_epoch,
            minutes_away: minutes_between(now_epoch, prediction.departure_epoch),
            is_realtime: prediction.is_actual,
            is_late: false,
        });
    }

    departures.sort_by_key(|departure| departure.departs_at);
    departures.truncate(limit);
    departures
}
