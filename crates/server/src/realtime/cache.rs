use super::{Error, Predictions, StopPredictions};
use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::RwLock;
use tracing::debug;

pub const DEFAULT_TTL: Duration = Duration::from_secs(60);

/// Recent predictions per stop.
pub struct PredictionCache {
    ttl: Duration,
    entries: RwLock<HashMap<String, (Instant, StopPredictions)>>,
}

impl Default for PredictionCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl PredictionCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub async fn get(&self, stop_id: &str) -> Option<StopPredictions> {
        let entries = self.entries.read().await;
        entries
            .get(stop_id)
            .filter(|(stored, _)| stored.elapsed() < self.ttl)
            .map(|(_, predictions)| predictions.clone())
    }

    pub async fn insert(&self, stop_id: &str, predictions: StopPredictions) {
        self.entries
            .write()
            .await
            .insert(stop_id.to_string(), (Instant::now(), predictions));
    }

    /// Drops expired entries and returns how many went.
    pub async fn purge_expired(&self) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, (stored, _)| stored.elapsed() < self.ttl);
        let purged = before - entries.len();
        if purged > 0 {
            debug!("Purged {purged} cached prediction sets");
        }
        purged
    }
}

/// Serves predictions from the cache, going to `inner` on a miss.
/// Failures are never cached.
pub struct CachedPredictions<P> {
    inner: P,
    cache: Arc<PredictionCache>,
}

impl<P: Predictions> CachedPredictions<P> {
    pub fn new(inner: P, cache: Arc<PredictionCache>) -> Self {
        Self { inner, cache }
    }
}

impl<P: Predictions> Predictions for CachedPredictions<P> {
    async fn departures_for_stop(&self, stop_id: &str) -> Result<StopPredictions, Error> {
        if let Some(predictions) = self.cache.get(stop_id).await {
            return Ok(predictions);
        }
        let predictions = self.inner.departures_for_stop(stop_id).await?;
        self.cache.insert(stop_id, predictions.clone()).await;
        Ok(predictions)
    }
}
