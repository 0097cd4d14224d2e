use headway::prelude::Prediction;
use reqwest::StatusCode;
use serde::Serialize;
use std::future::Future;
use thiserror::Error;

mod cache;
mod client;

pub use cache::{CachedPredictions, PredictionCache};
pub use client::RealtimeClient;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Realtime server answered {0}")]
    Status(StatusCode),
    #[error("Realtime request timed out")]
    Timeout,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Alert {
    pub stop_closed: bool,
    pub text: String,
}

/// Everything the realtime service knows about one stop right now.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StopPredictions {
    pub departures: Vec<Prediction>,
    pub alerts: Vec<Alert>,
}

pub trait Predictions: Send + Sync {
    fn departures_for_stop(
        &self,
        stop_id: &str,
    ) -> impl Future<Output = Result<StopPredictions, Error>> + Send;
}
