use crate::realtime::{Alert, Predictions, StopPredictions};
use chrono::{DateTime, Duration as ChronoDuration, NaiveDate};
use chrono_tz::Tz;
use headway::{
    engine::nearby::group_departures,
    prelude::*,
    repository,
    shared::Duration as ServiceDuration,
};
use std::{collections::HashMap, sync::Arc, time::Duration};
use thiserror::Error;
use tokio::task::spawn_blocking;
use tracing::warn;

/// Departures shown for a single stop.
pub const STOP_LIMIT: usize = 15;
/// Departures fetched per stop for the nearby views.
pub const NEARBY_LIMIT: usize = 30;
/// How far ahead the later-departures view looks.
pub const LATER_WINDOW: ChronoDuration = ChronoDuration::hours(18);
const LATER_LIMIT: usize = 200;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Repository error: {0}")]
    Repository(#[from] repository::Error),
    #[error("Store task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StopDepartures {
    pub departures: Vec<Departure>,
    pub alerts: Vec<Alert>,
    /// False when realtime was unavailable and only the timetable is shown.
    pub realtime: bool,
}

/// A route and direction at one stop, with its regular interval if it has one.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupWithHeadway {
    pub group: DepartureGroup,
    pub headway: Option<Headway>,
}

/// Merges the timetable with realtime predictions for one stop at a time.
pub struct DepartureService<P> {
    repository: Arc<Repository>,
    predictions: P,
    tz: Tz,
    realtime_timeout: Duration,
}

impl<P: Predictions> DepartureService<P> {
    pub fn new(repository: Arc<Repository>, predictions: P, tz: Tz, realtime_timeout: Duration) -> Self {
        Self {
            repository,
            predictions,
            tz,
            realtime_timeout,
        }
    }

    pub fn tz(&self) -> Tz {
        self.tz
    }

    pub fn repository(&self) -> &Arc<Repository> {
        &self.repository
    }

    /// Up to `limit` merged departures from `stop_id` after `now`.
    pub async fn for_stop(
        &self,
        stop_id: &str,
        now: &DateTime<Tz>,
        limit: usize,
    ) -> Result<StopDepartures, Error> {
        let scheduled = self.scheduled(stop_id, now, limit.saturating_mul(2)).await?;
        let realtime = self.realtime(stop_id).await;
        let departures = merge_departures(
            &scheduled,
            realtime.as_ref().map(|found| found.departures.as_slice()),
            now,
            limit,
        );
        Ok(StopDepartures {
            departures,
            realtime: realtime.is_some(),
            alerts: realtime.map(|found| found.alerts).unwrap_or_default(),
        })
    }

    /// Departures of one route and direction within [`LATER_WINDOW`].
    pub async fn later(
        &self,
        stop_id: &str,
        route_id: &str,
        direction: Option<Direction>,
        now: &DateTime<Tz>,
    ) -> Result<StopDepartures, Error> {
        let mut found = self.for_stop(stop_id, now, LATER_LIMIT).await?;
        let horizon = (*now + LATER_WINDOW).timestamp();
        found.departures.retain(|departure| {
            departure.route_id == route_id
                && departure.direction == direction
                && departure.departs_at <= horizon
        });
        Ok(found)
    }

    /// Groups a stop's departures by route and direction, each with its
    /// headway at that stop.
    pub async fn grouped(
        &self,
        stop_id: &str,
        departures: Vec<Departure>,
        now: &DateTime<Tz>,
        per_group: usize,
    ) -> Vec<GroupWithHeadway> {
        let groups = group_departures(departures, per_group);
        let keys: Vec<(String, String, Option<Direction>)> = groups
            .iter()
            .map(|group| (stop_id.to_string(), group.route_id.clone(), group.direction))
            .collect();
        let mut headways = self.headways(keys, now).await;
        groups
            .into_iter()
            .map(|group| {
                let key = (stop_id.to_string(), group.route_id.clone(), group.direction);
                GroupWithHeadway {
                    headway: headways.remove(&key).flatten(),
                    group,
                }
            })
            .collect()
    }

    /// Headways for (stop, route, direction) keys, from the previous service
    /// day's overnight tail when it has one, otherwise from today's service.
    ///
    /// A store failure only costs the headway, so it is logged and skipped.
    pub async fn headways(
        &self,
        keys: Vec<(String, String, Option<Direction>)>,
        now: &DateTime<Tz>,
    ) -> HashMap<(String, String, Option<Direction>), Option<Headway>> {
        let repository = self.repository.clone();
        let date = now.date_naive();
        let time = Time::of_day(now);
        let result = spawn_blocking(move || {
            keys.into_iter()
                .map(|(stop_id, route_id, direction)| {
                    let headway =
                        headway_at(&repository, &stop_id, &route_id, direction, date, time);
                    ((stop_id, route_id, direction), headway)
                })
                .collect::<Vec<_>>()
        })
        .await;
        let Ok(found) = result else {
            warn!("Headway task failed");
            return HashMap::new();
        };
        found
            .into_iter()
            .map(|(key, headway)| {
                let headway = headway.unwrap_or_else(|err| {
                    warn!("Failed to load departure times for {}: {err}", key.0);
                    None
                });
                (key, headway)
            })
            .collect()
    }

    /// Today's departures after `now`, plus the previous service day's
    /// trips that run past midnight.
    async fn scheduled(
        &self,
        stop_id: &str,
        now: &DateTime<Tz>,
        limit: usize,
    ) -> Result<Vec<ScheduledDeparture>, Error> {
        let repository = self.repository.clone();
        let stop_id = stop_id.to_string();
        let today = now.date_naive();
        let time = Time::of_day(now);
        let rows = spawn_blocking(move || {
            let mut rows = repository.departures_for_stop(&stop_id, today, time, limit)?;
            if let Some(yesterday) = today.pred_opt() {
                let overnight = time + ServiceDuration::from_hours(24);
                rows.extend(repository.departures_for_stop(&stop_id, yesterday, overnight, limit)?);
            }
            Ok::<_, repository::Error>(rows)
        })
        .await??;
        Ok(rows)
    }

    /// Best effort: a slow or failing realtime service leaves the timetable.
    async fn realtime(&self, stop_id: &str) -> Option<StopPredictions> {
        match tokio::time::timeout(
            self.realtime_timeout,
            self.predictions.departures_for_stop(stop_id),
        )
        .await
        {
            Ok(Ok(found)) => Some(found),
            Ok(Err(err)) => {
                warn!("Realtime unavailable for stop {stop_id}, using schedule only: {err}");
                None
            }
            Err(_) => {
                warn!("Realtime timed out for stop {stop_id}, using schedule only");
                None
            }
        }
    }
}

/// The overnight tail runs first, so it wins when it holds a pattern.
fn headway_at(
    repository: &Repository,
    stop_id: &str,
    route_id: &str,
    direction: Option<Direction>,
    date: NaiveDate,
    time: Time,
) -> Result<Option<Headway>, repository::Error> {
    if let Some(yesterday) = date.pred_opt() {
        let times = repository.departure_times(stop_id, route_id, direction, yesterday)?;
        let overnight = time + ServiceDuration::from_hours(24);
        if let Some(headway) = detect_headway(&times, overnight) {
            return Ok(Some(headway));
        }
    }
    let times = repository.departure_times(stop_id, route_id, direction, date)?;
    Ok(detect_headway(&times, time))
}
