mod admin;
mod nearby;
mod routes;
mod search;
mod stops;

use crate::{departures, state::AppState};
use axum::{
    Json, Router,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use headway::repository;
use serde_json::json;
use std::{collections::HashMap, future::Future, str::FromStr, sync::Arc};
use thiserror::Error;
use tokio::task::spawn_blocking;
use tracing::error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Feed not loaded yet")]
    Unavailable,
    #[error("{0}")]
    BadRequest(String),
    #[error("{0} not found")]
    NotFound(String),
    #[error("{0}")]
    Upstream(String),
    #[error("{0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

impl From<repository::Error> for ApiError {
    fn from(value: repository::Error) -> Self {
        error!("Repository error: {value}");
        Self::Internal("Repository error".to_string())
    }
}

impl From<departures::Error> for ApiError {
    fn from(value: departures::Error) -> Self {
        error!("Departure lookup failed: {value}");
        Self::Internal("Departure lookup failed".to_string())
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(value: tokio::task::JoinError) -> Self {
        error!("Store task failed: {value}");
        Self::Internal("Store task failed".to_string())
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/nearby", get(nearby::nearby))
        .route("/stops/{id}", get(stops::stop))
        .route("/stops/{id}/later", get(stops::later))
        .route("/search", get(search::search))
        .route("/routes", get(routes::routes))
        .route("/routes/{id}", get(routes::route))
        .route("/admin/refresh", post(admin::refresh))
        .with_state(state)
}

/// Runs a store call off the async workers.
async fn blocking<T, F>(state: &AppState, f: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&repository::Repository) -> Result<T, repository::Error> + Send + 'static,
{
    let repository = state.repository.clone();
    Ok(spawn_blocking(move || f(&repository)).await??)
}

/// Read handlers answer 503 until the first import has landed.
async fn require_data(state: &AppState) -> Result<(), ApiError> {
    if blocking(state, |repository| repository.has_data()).await? {
        Ok(())
    } else {
        Err(ApiError::Unavailable)
    }
}

/// Bounds request-time work by the configured request timeout.
async fn bounded<T>(
    state: &AppState,
    work: impl Future<Output = Result<T, ApiError>>,
) -> Result<T, ApiError> {
    tokio::time::timeout(state.request_timeout, work)
        .await
        .unwrap_or_else(|_| {
            error!("Request timed out after {:?}", state.request_timeout);
            Err(ApiError::Unavailable)
        })
}

/// Parses an optional query parameter.
fn param<T: FromStr>(params: &HashMap<String, String>, name: &str) -> Result<Option<T>, ApiError> {
    match params.get(name).map(|value| value.trim()) {
        None | Some("") => Ok(None),
        Some(value) => value
            .parse()
            .map(Some)
            .map_err(|_| ApiError::BadRequest(format!("Invalid {name} '{value}'"))),
    }
}

fn required<T: FromStr>(params: &HashMap<String, String>, name: &str) -> Result<T, ApiError> {
    param(params, name)?.ok_or_else(|| ApiError::BadRequest(format!("Missing {name}")))
}
