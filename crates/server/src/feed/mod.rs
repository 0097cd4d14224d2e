use headway::repository::{self, Validators};
use reqwest::StatusCode;
use std::{future::Future, path::PathBuf};
use thiserror::Error;

mod downloader;
mod scheduler;

pub use downloader::HttpFeedSource;
pub use scheduler::Scheduler;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Feed server answered {0}")]
    Status(StatusCode),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Import failed: {0}")]
    Import(#[from] repository::Error),
    #[error("Import task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CheckOutcome {
    pub needs_update: bool,
    pub validators: Validators,
}

/// An archive written to local disk, owned by the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadedFeed {
    pub path: PathBuf,
    pub validators: Validators,
}

/// Where feed archives come from. Retries are left to the caller.
pub trait FeedSource: Send + Sync {
    /// Conditional check against the validators of the stored feed.
    fn check(
        &self,
        validators: &Validators,
    ) -> impl Future<Output = Result<CheckOutcome, Error>> + Send;

    fn download(&self) -> impl Future<Output = Result<DownloadedFeed, Error>> + Send;
}
