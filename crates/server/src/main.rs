mod api;
mod config;
mod departures;
mod dto;
mod feed;
mod nearby;
mod realtime;
mod state;
#[cfg(test)]
mod testing;

use crate::{
    config::Config,
    departures::DepartureService,
    feed::{HttpFeedSource, Scheduler},
    realtime::{CachedPredictions, PredictionCache, RealtimeClient},
    state::AppState,
};
use clap::Parser;
use headway::repository::Repository;
use std::{process::exit, sync::Arc, time::Duration};
use tokio::sync::watch;
use tracing::{error, info};

const CACHE_PURGE_INTERVAL: Duration = Duration::from_secs(5 * 60);

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().init();
    let config = Config::parse();

    info!("Starting server...");
    let repository = match Repository::open(&config.db_path) {
        Ok(repository) => Arc::new(repository),
        Err(err) => {
            error!("Failed to open feed store {}: {err}", config.db_path.display());
            exit(1);
        }
    };

    let client = match reqwest::Client::builder().build() {
        Ok(client) => client,
        Err(err) => {
            error!("Failed to build http client: {err}");
            exit(1);
        }
    };
    let source = HttpFeedSource::new(client, config.feed_url.clone(), config.data_dir.clone());
    let scheduler = Arc::new(Scheduler::new(source, repository.clone(), config.timezone));

    if config.import_only {
        match scheduler.force_refresh().await {
            Ok(summary) => {
                info!("Imported {} stop times, exiting", summary.stop_times);
                return;
            }
            Err(err) => {
                error!("Import failed: {err}");
                exit(1);
            }
        }
    }

    if let Err(err) = scheduler.ensure_data().await {
        // Keep serving; read handlers answer 503 until an import lands.
        error!("Initial import failed: {err}");
    }

    let realtime = match RealtimeClient::new(&config.realtime_url, config.realtime_timeout()) {
        Ok(realtime) => realtime,
        Err(err) => {
            error!("Failed to build realtime client: {err}");
            exit(1);
        }
    };
    let cache = Arc::new(PredictionCache::default());
    let departures = Arc::new(DepartureService::new(
        repository,
        CachedPredictions::new(realtime, cache.clone()),
        config.timezone,
        config.realtime_timeout(),
    ));
    let state = Arc::new(AppState::new(
        departures,
        scheduler.clone(),
        config.request_timeout(),
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let background = {
        let scheduler = scheduler.clone();
        tokio::spawn(async move { scheduler.run_background(shutdown_rx).await })
    };
    let purge = tokio::spawn(async move {
        let mut interval = tokio::time::interval(CACHE_PURGE_INTERVAL);
        loop {
            interval.tick().await;
            cache.purge_expired().await;
        }
    });

    let listener = match tokio::net::TcpListener::bind(config.address()).await {
        Ok(listener) => listener,
        Err(err) => {
            error!("Failed to bind {}: {err}", config.address());
            exit(1);
        }
    };
    info!("Listening to port {}", config.port);
    let served = axum::serve(listener, api::router(state))
        .with_graceful_shutdown(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for shutdown: {err}");
            }
            info!("Shutting down...");
        })
        .await;
    if let Err(err) = served {
        error!("Server error: {err}");
    }

    let _ = shutdown_tx.send(true);
    purge.abort();
    if let Err(err) = background.await {
        error!("Feed scheduler task failed: {err}");
    }
}
