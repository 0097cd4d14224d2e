use std::{
    fs::File,
    io::{self},
    path::{Path, PathBuf},
    time::Instant,
};
use thiserror::Error;
use tracing::debug;
use zip::{ZipArchive, read::ZipFile};

mod columns;
mod config;
mod data;
pub mod models;
mod stream;

pub use columns::*;
pub use config::*;
pub use data::*;
pub use models::*;
pub use stream::*;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("Csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Csv error in {file} at row {row}: {source}")]
    Read {
        file: String,
        row: usize,
        source: csv::Error,
    },
    #[error("Bad record in {file} at row {row}: {source}")]
    Record {
        file: String,
        row: usize,
        source: FieldError,
    },
    #[error("Csv file {0} is missing header")]
    MissingHeader(String),
    #[error("Could not find file with name: {0}")]
    FileNotFound(String),
    #[error("Feed has neither {0} nor {1}")]
    MissingCalendar(String, String),
}

/// A feed archive on disk.
pub struct GtfsArchive {
    config: Config,
    path: PathBuf,
    archive: ZipArchive<File>,
}

impl GtfsArchive {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, self::Error> {
        Self::with_config(path, Config::default())
    }

    pub fn with_config<P: AsRef<Path>>(path: P, config: Config) -> Result<Self, self::Error> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)?;
        let archive = ZipArchive::new(file)?;
        Ok(Self {
            config,
            path,
            archive,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn contains(&self, name: &str) -> bool {
        self.archive.index_for_name(name).is_some()
    }

    /// Checks that every required file is present before anything is read.
    pub fn validate(&self) -> Result<(), self::Error> {
        let required = [
            &self.config.agency_file_name,
            &self.config.routes_file_name,
            &self.config.stops_file_name,
            &self.config.trips_file_name,
            &self.config.stop_times_file_name,
        ];
        if let Some(missing) = required.into_iter().find(|name| !self.contains(name)) {
            return Err(self::Error::FileNotFound(missing.clone()));
        }
        if !self.contains(&self.config.calendar_file_name)
            && !self.contains(&self.config.calendar_dates_file_name)
        {
            return Err(self::Error::MissingCalendar(
                self.config.calendar_file_name.clone(),
                self.config.calendar_dates_file_name.clone(),
            ));
        }
        Ok(())
    }

    /// Materializes the reference tables.
    pub fn read_tables(&mut self) -> Result<FeedTables, self::Error> {
        self.validate()?;
        Ok(FeedTables {
            agencies: self.read_table()?,
            routes: self.read_table()?,
            stops: self.read_table()?,
            trips: self.read_table()?,
            calendar: self.read_optional_table()?,
            calendar_dates: self.read_optional_table()?,
        })
    }

    pub fn stop_times(&mut self) -> Result<RecordStream<'_, GtfsStopTime>, self::Error> {
        RecordStream::open(&mut self.archive, &self.config.stop_times_file_name)
    }

    /// `None` when the feed ships without geometry.
    pub fn shapes(&mut self) -> Result<Option<RecordStream<'_, GtfsShapePoint>>, self::Error> {
        if !self.contains(&self.config.shapes_file_name) {
            return Ok(None);
        }
        RecordStream::open(&mut self.archive, &self.config.shapes_file_name).map(Some)
    }

    fn read_table<T: Record>(&mut self) -> Result<Vec<T>, self::Error> {
        let name = T::file_name(&self.config).to_string();
        debug!("Reading {name}...");
        let now = Instant::now();
        let records = RecordStream::<T>::open(&mut self.archive, &name)?
            .collect::<Result<Vec<_>, _>>()?;
        debug!("Reading {name} took {:?}", now.elapsed());
        Ok(records)
    }

    fn read_optional_table<T: Record>(&mut self) -> Result<Vec<T>, self::Error> {
        if self.contains(T::file_name(&self.config)) {
            self.read_table()
        } else {
            Ok(Vec::new())
        }
    }
}

fn get_file<'a>(
    archive: &'a mut ZipArchive<File>,
    name: &str,
) -> Result<ZipFile<'a, File>, self::Error> {
    let index = archive
        .index_for_name(name)
        .ok_or(self::Error::FileNotFound(name.to_string()))?;
    let file = archive.by_index(index)?;
    Ok(file)
}
