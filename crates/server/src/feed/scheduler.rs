use super::{Error, FeedSource};
use chrono::{DateTime, Duration, LocalResult, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;
use headway::repository::{ImportSummary, Repository};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::{sync::watch, task::spawn_blocking};
use tracing::{debug, error, info, warn};

/// Local hour of the nightly feed check.
const CHECK_HOUR: u32 = 3;

/// Decides when the feed is refreshed and runs the refresh.
pub struct Scheduler<S> {
    source: S,
    repository: Arc<Repository>,
    tz: Tz,
    last_check: Mutex<Option<NaiveDate>>,
    // Held for a whole download and import so only one cycle writes.
    update_lock: tokio::sync::Mutex<()>,
}

impl<S: FeedSource> Scheduler<S> {
    pub fn new(source: S, repository: Arc<Repository>, tz: Tz) -> Self {
        Self {
            source,
            repository,
            tz,
            last_check: Mutex::new(None),
            update_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Imports a feed if the store has none.
    pub async fn ensure_data(&self) -> Result<(), Error> {
        let repository = self.repository.clone();
        if spawn_blocking(move || repository.has_data()).await?? {
            info!("Feed store already has data");
            return Ok(());
        }
        info!("Feed store is empty, running first import");
        self.update().await.map(|_| ())
    }

    /// Checks for a new feed at most once per local calendar day.
    ///
    /// Returns whether a new feed was imported.
    pub async fn check_and_update(&self) -> Result<bool, Error> {
        let today = Utc::now().with_timezone(&self.tz).date_naive();
        self.check_and_update_on(today).await
    }

    pub(crate) async fn check_and_update_on(&self, today: NaiveDate) -> Result<bool, Error> {
        if !self.claim_day(today) {
            debug!("Feed already checked on {today}");
            return Ok(false);
        }
        let repository = self.repository.clone();
        let validators = spawn_blocking(move || repository.validators()).await??;
        let outcome = self.source.check(&validators).await?;
        if !outcome.needs_update {
            return Ok(false);
        }
        self.update().await?;
        Ok(true)
    }

    /// Downloads and imports regardless of validators or the day guard.
    pub async fn force_refresh(&self) -> Result<ImportSummary, Error> {
        info!("Forced feed refresh");
        self.update().await
    }

    /// Checks for a new feed every night at the local check hour until
    /// `shutdown` flips or its sender goes away.
    pub async fn run_background(&self, mut shutdown: watch::Receiver<bool>) {
        loop {
            if *shutdown.borrow() {
                break;
            }
            let now = Utc::now().with_timezone(&self.tz);
            let next = next_boundary(&now);
            let wait = (next - now).to_std().unwrap_or_default();
            info!("Next feed check at {next}");
            tokio::select! {
                _ = tokio::time::sleep(wait) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    continue;
                }
            }
            if let Err(err) = self.check_and_update().await {
                error!("Feed update failed, keeping current data: {err}");
            }
        }
        info!("Feed scheduler stopped");
    }

    /// Marks `today` as checked. False if it already was.
    fn claim_day(&self, today: NaiveDate) -> bool {
        let mut last_check = self
            .last_check
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if *last_check == Some(today) {
            return false;
        }
        *last_check = Some(today);
        true
    }

    async fn update(&self) -> Result<ImportSummary, Error> {
        let _guard = self.update_lock.lock().await;
        let feed = self.source.download().await?;

        let repository = self.repository.clone();
        let path = feed.path.clone();
        let validators = feed.validators.clone();
        let result = spawn_blocking(move || repository.import_archive(&path, &validators)).await;

        if let Err(err) = tokio::fs::remove_file(&feed.path).await {
            warn!("Failed to remove {}: {err}", feed.path.display());
        }
        Ok(result??)
    }
}

/// The next local check hour strictly after `now`.
///
/// An ambiguous local time takes its first occurrence, and a local time
/// skipped by a DST jump moves forward an hour.
pub fn next_boundary(now: &DateTime<Tz>) -> DateTime<Tz> {
    let tz = now.timezone();
    let mut date = now.date_naive();
    for _ in 0..3 {
        if let Some(candidate) = local_hour(&tz, date, CHECK_HOUR) {
            if candidate > *now {
                return candidate;
            }
        }
        match date.succ_opt() {
            Some(next) => date = next,
            None => break,
        }
    }
    *now + Duration::days(1)
}

fn local_hour(tz: &Tz, date: NaiveDate, hour: u32) -> Option<DateTime<Tz>> {
    let naive = date.and_hms_opt(hour, 0, 0)?;
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(time) => Some(time),
        LocalResult::Ambiguous(earliest, _) => Some(earliest),
        LocalResult::None => tz
            .from_local_datetime(&(naive + Duration::hours(1)))
            .earliest(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        feed::{CheckOutcome, DownloadedFeed},
        testing,
    };
    use chrono_tz::{America::Chicago, Europe::Helsinki};
    use headway::repository::Validators;
    use reqwest::StatusCode;
    use std::{
        path::PathBuf,
        sync::atomic::{AtomicUsize, Ordering},
    };

    struct FakeSource {
        checks: AtomicUsize,
        downloads: AtomicUsize,
        needs_update: bool,
        archive: Option<PathBuf>,
    }

    impl FakeSource {
        fn new(needs_update: bool, archive: Option<PathBuf>) -> Self {
            Self {
                checks: AtomicUsize::new(0),
                downloads: AtomicUsize::new(0),
                needs_update,
                archive,
            }
        }
    }

    impl FeedSource for FakeSource {
        async fn check(&self, validators: &Validators) -> Result<CheckOutcome, Error> {
            self.checks.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            Ok(CheckOutcome {
                needs_update: self.needs_update,
                validators: validators.clone(),
            })
        }

        async fn download(&self) -> Result<DownloadedFeed, Error> {
            self.downloads.fetch_add(1, Ordering::SeqCst);
            let source = self
                .archive
                .as_ref()
                .ok_or(Error::Status(StatusCode::SERVICE_UNAVAILABLE))?;
            // The scheduler deletes what it imports, so hand over a copy.
            let copy = source.with_extension(format!("{}.zip", self.downloads.load(Ordering::SeqCst)));
            std::fs::copy(source, &copy)?;
            Ok(DownloadedFeed {
                path: copy,
                validators: Validators {
                    last_modified: None,
                    etag: Some("\"fake\"".to_string()),
                },
            })
        }
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 7, d).unwrap()
    }

    #[tokio::test]
    async fn checks_once_per_day() {
        let scheduler = Scheduler::new(
            FakeSource::new(false, None),
            Arc::new(testing::empty_store("sched-day")),
            Chicago,
        );
        assert!(!scheduler.check_and_update_on(day(1)).await.unwrap());
        assert!(!scheduler.check_and_update_on(day(1)).await.unwrap());
        assert_eq!(scheduler.source.checks.load(Ordering::SeqCst), 1);

        scheduler.check_and_update_on(day(2)).await.unwrap();
        assert_eq!(scheduler.source.checks.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn concurrent_checks_share_the_day() {
        let scheduler = Scheduler::new(
            FakeSource::new(false, None),
            Arc::new(testing::empty_store("sched-concurrent")),
            Chicago,
        );
        let (a, b, c) = tokio::join!(
            scheduler.check_and_update_on(day(3)),
            scheduler.check_and_update_on(day(3)),
            scheduler.check_and_update_on(day(3)),
        );
        assert!(a.is_ok() && b.is_ok() && c.is_ok());
        assert_eq!(scheduler.source.checks.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn ensure_data_imports_into_an_empty_store() {
        let archive = testing::write_feed_archive("sched-ensure");
        let repository = Arc::new(testing::empty_store("sched-ensure"));
        let scheduler = Scheduler::new(FakeSource::new(true, Some(archive)), repository.clone(), Chicago);

        scheduler.ensure_data().await.unwrap();
        assert!(repository.has_data().unwrap());
        assert_eq!(repository.validators().unwrap().etag.as_deref(), Some("\"fake\""));

        scheduler.ensure_data().await.unwrap();
        assert_eq!(scheduler.source.downloads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn changed_feed_is_imported_and_the_download_removed() {
        let archive = testing::write_feed_archive("sched-changed");
        let repository = Arc::new(testing::empty_store("sched-changed"));
        let scheduler = Scheduler::new(
            FakeSource::new(true, Some(archive.clone())),
            repository.clone(),
            Chicago,
        );
        assert!(scheduler.check_and_update_on(day(5)).await.unwrap());
        assert!(repository.has_data().unwrap());
        assert!(!archive.with_extension("1.zip").exists());
    }

    #[tokio::test]
    async fn failed_download_keeps_current_data() {
        let repository = Arc::new(testing::loaded_store("sched-fail"));
        let before = repository.validators().unwrap();
        let scheduler = Scheduler::new(FakeSource::new(true, None), repository.clone(), Chicago);

        assert!(scheduler.check_and_update_on(day(6)).await.is_err());
        assert!(scheduler.force_refresh().await.is_err());
        assert!(repository.has_data().unwrap());
        assert_eq!(repository.validators().unwrap(), before);
    }

    #[tokio::test]
    async fn background_loop_stops_on_shutdown() {
        let scheduler = Scheduler::new(
            FakeSource::new(false, None),
            Arc::new(testing::empty_store("sched-shutdown")),
            Chicago,
        );
        let (tx, rx) = watch::channel(false);
        let run = scheduler.run_background(rx);
        let stop = async {
            tokio::task::yield_now().await;
            tx.send(true).unwrap();
        };
        tokio::time::timeout(std::time::Duration::from_secs(5), async {
            tokio::join!(run, stop);
        })
        .await
        .unwrap();
        assert_eq!(scheduler.source.checks.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn background_loop_stops_when_sender_is_dropped() {
        let scheduler = Scheduler::new(
            FakeSource::new(false, None),
            Arc::new(testing::empty_store("sched-dropped")),
            Chicago,
        );
        let (tx, rx) = watch::channel(false);
        drop(tx);
        tokio::time::timeout(
            std::time::Duration::from_secs(2),
            scheduler.run_background(rx),
        )
        .await
        .unwrap();
        assert_eq!(scheduler.source.checks.load(Ordering::SeqCst), 0);
    }

    fn local(tz: Tz, y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Tz> {
        tz.with_ymd_and_hms(y, m, d, h, min, 0).single().unwrap()
    }

    #[test]
    fn boundary_is_later_today_or_tomorrow() {
        let early = local(Chicago, 2024, 7, 1, 2, 59);
        assert_eq!(next_boundary(&early), local(Chicago, 2024, 7, 1, 3, 0));

        let exactly = local(Chicago, 2024, 7, 1, 3, 0);
        assert_eq!(next_boundary(&exactly), local(Chicago, 2024, 7, 2, 3, 0));

        let afternoon = local(Chicago, 2024, 7, 1, 14, 0);
        assert_eq!(next_boundary(&afternoon), local(Chicago, 2024, 7, 2, 3, 0));

        let new_years_eve = local(Chicago, 2024, 12, 31, 23, 0);
        assert_eq!(next_boundary(&new_years_eve), local(Chicago, 2025, 1, 1, 3, 0));
    }

    #[test]
    fn skipped_hour_moves_forward() {
        // Helsinki jumps from 03:00 to 04:00 on the last Sunday of March.
        let now = local(Helsinki, 2024, 3, 31, 0, 30);
        let next = next_boundary(&now);
        assert_eq!(
            next.with_timezone(&Utc),
            Utc.with_ymd_and_hms(2024, 3, 31, 1, 0, 0).unwrap()
        );
    }

    #[test]
    fn repeated_hour_takes_the_first() {
        // Helsinki repeats 03:00 on the last Sunday of October.
        let now = local(Helsinki, 2024, 10, 27, 0, 30);
        let next = next_boundary(&now);
        assert_eq!(
            next.with_timezone(&Utc),
            Utc.with_ymd_and_hms(2024, 10, 27, 0, 0, 0).unwrap()
        );
    }
}
