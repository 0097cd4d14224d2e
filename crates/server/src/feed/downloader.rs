use super::{CheckOutcome, DownloadedFeed, Error, FeedSource};
use futures_util::StreamExt;
use headway::repository::Validators;
use reqwest::{
    Client, Response, StatusCode,
    header::{ETAG, HeaderMap, HeaderName, IF_MODIFIED_SINCE, IF_NONE_MATCH, LAST_MODIFIED},
};
use std::{
    path::{Path, PathBuf},
    time::{SystemTime, UNIX_EPOCH},
};
use tokio::{fs::File, io::AsyncWriteExt};
use tracing::{info, warn};

/// Fetches the feed archive over HTTP.
pub struct HttpFeedSource {
    client: Client,
    url: String,
    dir: PathBuf,
}

impl HttpFeedSource {
    pub fn new(client: Client, url: impl Into<String>, dir: impl Into<PathBuf>) -> Self {
        Self {
            client,
            url: url.into(),
            dir: dir.into(),
        }
    }

    fn temp_path(&self) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default();
        self.dir.join(format!("feed-{nanos}.zip"))
    }
}

impl FeedSource for HttpFeedSource {
    async fn check(&self, validators: &Validators) -> Result<CheckOutcome, Error> {
        let mut request = self.client.head(&self.url);
        if let Some(last_modified) = &validators.last_modified {
            request = request.header(IF_MODIFIED_SINCE, last_modified);
        }
        if let Some(etag) = &validators.etag {
            request = request.header(IF_NONE_MATCH, etag);
        }
        let response = request.send().await?;
        let status = response.status();
        if status == StatusCode::NOT_MODIFIED {
            info!("Feed not modified since last import");
            return Ok(CheckOutcome {
                needs_update: false,
                validators: validators.clone(),
            });
        }
        if !status.is_success() {
            return Err(Error::Status(status));
        }
        Ok(CheckOutcome {
            needs_update: true,
            validators: validators_from(response.headers()),
        })
    }

    async fn download(&self) -> Result<DownloadedFeed, Error> {
        tokio::fs::create_dir_all(&self.dir).await?;
        info!("Downloading feed from {}...", self.url);
        let response = self.client.get(&self.url).send().await?;
        if response.status() != StatusCode::OK {
            return Err(Error::Status(response.status()));
        }
        let validators = validators_from(response.headers());
        let path = self.temp_path();
        match write_body(response, &path).await {
            Ok(bytes) => {
                info!("Downloaded feed ({:.1} MB)", bytes as f64 / 1_048_576.0);
                Ok(DownloadedFeed { path, validators })
            }
            Err(err) => {
                if let Err(remove) = tokio::fs::remove_file(&path).await {
                    warn!("Failed to remove partial download {}: {remove}", path.display());
                }
                Err(err)
            }
        }
    }
}

async fn write_body(response: Response, path: &Path) -> Result<u64, Error> {
    let mut file = File::create(path).await?;
    let mut stream = response.bytes_stream();
    let mut written = 0;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;
    Ok(written)
}

fn validators_from(headers: &HeaderMap) -> Validators {
    Validators {
        last_modified: header_value(headers, LAST_MODIFIED),
        etag: header_value(headers, ETAG),
    }
}

fn header_value(headers: &HeaderMap, name: HeaderName) -> Option<String> {
    headers
        .get(name)?
        .to_str()
        .ok()
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        Router,
        http::{HeaderMap as AxumHeaders, StatusCode as AxumStatus, header},
        response::IntoResponse,
        routing::get,
    };

    const BODY: &[u8] = b"PK not really a zip but bytes are bytes";
    const TAG: &str = "\"v1\"";

    async fn feed(headers: AxumHeaders) -> impl IntoResponse {
        let unchanged = headers
            .get(header::IF_NONE_MATCH)
            .is_some_and(|value| value == TAG);
        if unchanged {
            return AxumStatus::NOT_MODIFIED.into_response();
        }
        (
            [
                (header::ETAG, TAG),
                (header::LAST_MODIFIED, "Mon, 01 Jul 2024 06:00:00 GMT"),
            ],
            BODY,
        )
            .into_response()
    }

    async fn serve() -> String {
        let app = Router::new().route("/gtfs.zip", get(feed));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{address}")
    }

    fn scratch_dir() -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!("headway-download-{}-{nanos}", std::process::id()))
    }

    #[tokio::test]
    async fn check_without_validators_needs_update() {
        let base = serve().await;
        let source = HttpFeedSource::new(Client::new(), format!("{base}/gtfs.zip"), scratch_dir());
        let outcome = source.check(&Validators::default()).await.unwrap();
        assert!(outcome.needs_update);
        assert_eq!(outcome.validators.etag.as_deref(), Some(TAG));
        assert!(outcome.validators.last_modified.is_some());
    }

    #[tokio::test]
    async fn matching_etag_is_not_modified() {
        let base = serve().await;
        let source = HttpFeedSource::new(Client::new(), format!("{base}/gtfs.zip"), scratch_dir());
        let validators = Validators {
            last_modified: None,
            etag: Some(TAG.to_string()),
        };
        let outcome = source.check(&validators).await.unwrap();
        assert!(!outcome.needs_update);
        assert_eq!(outcome.validators, validators);
    }

    #[tokio::test]
    async fn download_streams_to_a_new_file() {
        let base = serve().await;
        let dir = scratch_dir();
        let source = HttpFeedSource::new(Client::new(), format!("{base}/gtfs.zip"), &dir);
        let feed = source.download().await.unwrap();
        assert!(feed.path.starts_with(&dir));
        assert_eq!(std::fs::read(&feed.path).unwrap(), BODY);
        assert_eq!(feed.validators.etag.as_deref(), Some(TAG));
    }

    #[tokio::test]
    async fn missing_feed_is_a_status_error() {
        let base = serve().await;
        let source = HttpFeedSource::new(Client::new(), format!("{base}/missing.zip"), scratch_dir());
        let err = source.download().await.unwrap_err();
        assert!(matches!(err, Error::Status(StatusCode::NOT_FOUND)));
        let err = source.check(&Validators::default()).await.unwrap_err();
        assert!(matches!(err, Error::Status(StatusCode::NOT_FOUND)));
    }
}
