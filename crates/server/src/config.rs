use chrono_tz::Tz;
use clap::Parser;
use std::{path::PathBuf, time::Duration};

/// serves nearby departures for a single GTFS feed
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// port to listen on
    #[arg(long, env = "PORT", default_value_t = 8080)]
    pub port: u16,
    /// sqlite file holding the imported feed
    #[arg(long, env = "DB_PATH", default_value = "./headway.db")]
    pub db_path: PathBuf,
    /// directory feed downloads are written to
    #[arg(long, env = "GTFS_DIR", default_value = "./data")]
    pub data_dir: PathBuf,
    /// where the static feed archive is published
    #[arg(
        long,
        env = "GTFS_URL",
        default_value = "https://svc.metrotransit.org/mtgtfs/gtfs.zip"
    )]
    pub feed_url: String,
    /// base url of the realtime departures api
    #[arg(
        long,
        env = "REALTIME_URL",
        default_value = "https://svc.metrotransit.org/nextrip"
    )]
    pub realtime_url: String,
    /// timezone the feed operates in, used for service days and the
    /// nightly update check
    #[arg(long, env = "FEED_TIMEZONE", value_parser = parse_timezone, default_value = "America/Chicago")]
    pub timezone: Tz,
    #[arg(long, default_value_t = 10)]
    pub realtime_timeout_secs: u64,
    #[arg(long, default_value_t = 15)]
    pub request_timeout_secs: u64,
    /// run one full feed update and exit
    #[arg(long)]
    pub import_only: bool,
}

impl Config {
    pub fn realtime_timeout(&self) -> Duration {
        Duration::from_secs(self.realtime_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn address(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }
}

fn parse_timezone(s: &str) -> Result<Tz, String> {
    s.parse::<Tz>()
        .map_err(|e| format!("Invalid timezone {s}: {e}"))
}
