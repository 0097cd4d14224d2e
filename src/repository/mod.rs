use crossbeam_queue::SegQueue;
use rusqlite::Connection;
use std::{
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard},
    time::Duration,
};
use thiserror::Error;
use tracing::{debug, info};

use crate::gtfs;

mod models;
mod queries;
mod schema;
pub mod source;
mod sql;

pub use models::*;
pub use queries::split_cross_street;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Error, Debug)]
pub enum Error {
    #[error("Sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Gtfs error: {0}")]
    Gtfs(#[from] gtfs::Error),
    #[error("Sqlite was built without the R*Tree module")]
    MissingRtree,
    #[error("Integrity violation in {table} at row {row}: {source}")]
    Integrity {
        table: &'static str,
        row: usize,
        source: rusqlite::Error,
    },
    #[error("Writer connection is poisoned")]
    Poisoned,
}

/// The persistent feed store.
///
/// One writer connection, used only by imports, plus a pool of reader
/// connections. WAL mode lets readers keep querying the last committed feed
/// while an import is running.
pub struct Repository {
    path: PathBuf,
    writer: Mutex<Connection>,
    readers: SegQueue<Connection>,
}

impl Repository {
    /// Opens (creating if needed) and migrates the store at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, self::Error> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut writer = open_connection(&path)?;
        let journal_mode: String =
            writer.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
        debug!("Journal mode is {journal_mode}");
        if !has_compile_option(&writer, "ENABLE_RTREE")? {
            return Err(self::Error::MissingRtree);
        }
        schema::migrate(&mut writer)?;
        info!("Opened feed store at {}", path.display());

        Ok(Self {
            path,
            writer: Mutex::new(writer),
            readers: SegQueue::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Runs `f` on a pooled reader connection.
    pub(crate) fn read<T, F>(&self, f: F) -> Result<T, self::Error>
    where
        F: FnOnce(&Connection) -> Result<T, rusqlite::Error>,
    {
        let conn = match self.readers.pop() {
            Some(conn) => conn,
            None => open_connection(&self.path)?,
        };
        let result = f(&conn);
        self.readers.push(conn);
        Ok(result?)
    }

    pub(crate) fn writer(&self) -> Result<MutexGuard<'_, Connection>, self::Error> {
        self.writer.lock().map_err(|_| self::Error::Poisoned)
    }
}

fn open_connection(path: &Path) -> Result<Connection, rusqlite::Error> {
    let conn = Connection::open(path)?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    Ok(conn)
}

fn has_compile_option(conn: &Connection, option: &str) -> Result<bool, rusqlite::Error> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM pragma_compile_options WHERE compile_options = ?1)",
        [option],
        |row| row.get(0),
    )
}
