use crate::{
    departures::DepartureService,
    feed::{HttpFeedSource, Scheduler},
    nearby::NearbyService,
    realtime::{CachedPredictions, RealtimeClient},
};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use headway::repository::Repository;
use std::{sync::Arc, time::Duration};

pub type LivePredictions = CachedPredictions<RealtimeClient>;

pub struct AppState {
    pub repository: Arc<Repository>,
    pub departures: Arc<DepartureService<LivePredictions>>,
    pub nearby: NearbyService<LivePredictions>,
    pub scheduler: Arc<Scheduler<HttpFeedSource>>,
    pub request_timeout: Duration,
}

impl AppState {
    pub fn new(
        departures: Arc<DepartureService<LivePredictions>>,
        scheduler: Arc<Scheduler<HttpFeedSource>>,
        request_timeout: Duration,
    ) -> Self {
        Self {
            repository: departures.repository().clone(),
            nearby: NearbyService::new(departures.clone()),
            departures,
            scheduler,
            request_timeout,
        }
    }

    /// The current instant in the feed's timezone.
    pub fn now(&self) -> DateTime<Tz> {
        Utc::now().with_timezone(&self.departures.tz())
    }
}
