use super::{Alert, Error, Predictions, StopPredictions};
use headway::prelude::{Direction, Prediction};
use reqwest::{Client, header::ACCEPT};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct StopResponse {
    departures: Vec<DepartureJson>,
    alerts: Vec<AlertJson>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DepartureJson {
    actual: bool,
    trip_id: String,
    departure_time: i64,
    description: Option<String>,
    route_id: String,
    route_short_name: Option<String>,
    direction_id: Option<u8>,
    direction_text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AlertJson {
    stop_closed: bool,
    alert_text: String,
}

impl From<DepartureJson> for Prediction {
    fn from(value: DepartureJson) -> Self {
        Self {
            trip_id: value.trip_id,
            route_id: value.route_id,
            route_short_name: value.route_short_name,
            direction: value.direction_id.and_then(Direction::from_id),
            direction_text: value.direction_text,
            description: value.description,
            departure_epoch: value.departure_time,
            is_actual: value.actual,
        }
    }
}

impl From<StopResponse> for StopPredictions {
    fn from(value: StopResponse) -> Self {
        Self {
            departures: value.departures.into_iter().map(Prediction::from).collect(),
            alerts: value
                .alerts
                .into_iter()
                .map(|alert| Alert {
                    stop_closed: alert.stop_closed,
                    text: alert.alert_text,
                })
                .collect(),
        }
    }
}

/// Per-stop departure predictions over HTTP.
pub struct RealtimeClient {
    client: Client,
    base_url: String,
}

impl RealtimeClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

impl Predictions for RealtimeClient {
    async fn departures_for_stop(&self, stop_id: &str) -> Result<StopPredictions, Error> {
        let url = format!("{}/{stop_id}", self.base_url);
        let response = self
            .client
            .get(&url)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|err| if err.is_timeout() { Error::Timeout } else { err.into() })?;
        if !response.status().is_success() {
            return Err(Error::Status(response.status()));
        }
        let body: StopResponse = response.json().await?;
        debug!(
            "{} predictions for stop {stop_id}",
            body.departures.len()
        );
        Ok(body.into())
    }
}
