use crate::{
    gtfs::{
        self, FeedTables, GtfsAgency, GtfsArchive, GtfsCalendar, GtfsCalendarDate, GtfsRoute,
        GtfsShapePoint, GtfsStop, GtfsStopTime, GtfsTrip,
    },
    repository::{
        Error, ImportSummary, Repository, Validators,
        queries::{ETAG, IMPORTED_AT, LAST_MODIFIED},
        schema::FEED_TABLES,
        sql::date_key,
    },
};
use chrono::{SecondsFormat, Utc};
use rusqlite::{ErrorCode, Transaction, params};
use std::{path::Path, time::Instant};
use tracing::{debug, info};

/// Stop time rows between progress log lines.
const PROGRESS_INTERVAL: usize = 500_000;

impl Repository {
    /// Replaces the stored feed with the archive at `path`.
    pub fn import_archive<P: AsRef<Path>>(
        &self,
        path: P,
        validators: &Validators,
    ) -> Result<ImportSummary, Error> {
        let path = path.as_ref();
        let mut archive = GtfsArchive::open(path)?;
        let tables = archive.read_tables()?;
        // Stop times and shapes each stream from their own handle.
        let mut shapes_archive = GtfsArchive::open(path)?;
        let shapes = shapes_archive.shapes()?;
        let stop_times = archive.stop_times()?;
        self.import(&tables, stop_times, shapes.into_iter().flatten(), validators)
    }

    /// Replaces the stored feed in a single transaction.
    ///
    /// The large tables are drained row by row from their iterators. If any
    /// step fails the transaction rolls back and the previously committed
    /// feed stays in place.
    pub fn import<S, P>(
        &self,
        tables: &FeedTables,
        stop_times: S,
        shapes: P,
        validators: &Validators,
    ) -> Result<ImportSummary, Error>
    where
        S: IntoIterator<Item = Result<GtfsStopTime, gtfs::Error>>,
        P: IntoIterator<Item = Result<GtfsShapePoint, gtfs::Error>>,
    {
        info!("Importing feed...");
        let now = Instant::now();
        let mut conn = self.writer()?;
        let tx = conn.transaction()?;

        clear_tables(&tx)?;
        let summary = ImportSummary {
            agencies: load_agencies(&tx, &tables.agencies)?,
            routes: load_routes(&tx, &tables.routes, &tables.agencies)?,
            stops: load_stops(&tx, &tables.stops)?,
            calendar: load_calendar(&tx, &tables.calendar)?,
            calendar_dates: load_calendar_dates(&tx, &tables.calendar_dates)?,
            trips: load_trips(&tx, &tables.trips)?,
            stop_times: load_stop_times(&tx, stop_times)?,
            shapes: load_shapes(&tx, shapes)?,
        };
        rebuild_spatial_index(&tx)?;
        stamp_metadata(&tx, validators)?;
        tx.commit()?;

        info!(
            "Imported {} routes, {} stops, {} trips and {} stop times in {:?}",
            summary.routes,
            summary.stops,
            summary.trips,
            summary.stop_times,
            now.elapsed()
        );
        Ok(summary)
    }
}

fn clear_tables(tx: &Transaction<'_>) -> Result<(), Error> {
    debug!("Clearing feed tables...");
    let now = Instant::now();
    for table in FEED_TABLES {
        tx.execute(&format!("DELETE FROM {table}"), [])?;
    }
    debug!("Clearing feed tables took {:?}", now.elapsed());
    Ok(())
}

/// Constraint failures become integrity errors naming the offending row.
fn insert_error(table: &'static str, row: usize) -> impl Fn(rusqlite::Error) -> Error {
    move |err| match err.sqlite_error_code() {
        Some(ErrorCode::ConstraintViolation) => Error::Integrity {
            table,
            row,
            source: err,
        },
        _ => Error::Sqlite(err),
    }
}

fn load_agencies(tx: &Transaction<'_>, agencies: &[GtfsAgency]) -> Result<usize, Error> {
    debug!("Loading agencies...");
    let now = Instant::now();
    let mut stmt = tx.prepare_cached(
        "INSERT INTO agency (agency_id, agency_name, agency_url, agency_timezone)
         VALUES (?1, ?2, ?3, ?4)",
    )?;
    for (i, agency) in agencies.iter().enumerate() {
        stmt.execute(params![
            agency.agency_id,
            agency.agency_name,
            agency.agency_url,
            agency.agency_timezone,
        ])
        .map_err(insert_error("agency", i + 1))?;
    }
    debug!("Loading agencies took {:?}", now.elapsed());
    Ok(agencies.len())
}

fn load_routes(
    tx: &Transaction<'_>,
    routes: &[GtfsRoute],
    agencies: &[GtfsAgency],
) -> Result<usize, Error> {
    debug!("Loading routes...");
    let now = Instant::now();
    // A single-agency feed may leave route.agency_id blank.
    let sole_agency = match agencies {
        [agency] => Some(agency.agency_id.as_str()),
        _ => None,
    };
    let mut stmt = tx.prepare_cached(
        "INSERT INTO routes (route_id, agency_id, route_short_name, route_long_name,
                             route_type, route_color, route_text_color, route_sort_order)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
    )?;
    for (i, route) in routes.iter().enumerate() {
        let agency_id = match (route.agency_id.as_str(), sole_agency) {
            ("", Some(agency_id)) => agency_id,
            (agency_id, _) => agency_id,
        };
        stmt.execute(params![
            route.route_id,
            agency_id,
            route.route_short_name,
            route.route_long_name,
            route.route_type,
            route.route_color,
            route.route_text_color,
            route.route_sort_order,
        ])
        .map_err(insert_error("routes", i + 1))?;
    }
    debug!("Loading routes took {:?}", now.elapsed());
    Ok(routes.len())
}

fn load_stops(tx: &Transaction<'_>, stops: &[GtfsStop]) -> Result<usize, Error> {
    debug!("Loading stops...");
    let now = Instant::now();
    let mut stmt = tx.prepare_cached(
        "INSERT INTO stops (stop_id, stop_code, stop_name, stop_desc, stop_lat, stop_lon,
                            zone_id, location_type, parent_station, wheelchair_boarding)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
    )?;
    for (i, stop) in stops.iter().enumerate() {
        stmt.execute(params![
            stop.stop_id,
            stop.stop_code,
            stop.stop_name,
            stop.stop_desc,
            stop.stop_lat,
            stop.stop_lon,
            stop.zone_id,
            stop.location_type,
            stop.parent_station,
            stop.wheelchair_boarding,
        ])
        .map_err(insert_error("stops", i + 1))?;
    }
    debug!("Loading stops took {:?}", now.elapsed());
    Ok(stops.len())
}

fn load_calendar(tx: &Transaction<'_>, calendar: &[GtfsCalendar]) -> Result<usize, Error> {
    debug!("Loading calendar...");
    let now = Instant::now();
    let mut stmt = tx.prepare_cached(
        "INSERT INTO calendar (service_id, monday, tuesday, wednesday, thursday, friday,
                               saturday, sunday, start_date, end_date)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
    )?;
    for (i, entry) in calendar.iter().enumerate() {
        let [mon, tue, wed, thu, fri, sat, sun] = entry.days;
        stmt.execute(params![
            entry.service_id,
            mon,
            tue,
            wed,
            thu,
            fri,
            sat,
            sun,
            date_key(entry.start_date),
            date_key(entry.end_date),
        ])
        .map_err(insert_error("calendar", i + 1))?;
    }
    debug!("Loading calendar took {:?}", now.elapsed());
    Ok(calendar.len())
}

fn load_calendar_dates(
    tx: &Transaction<'_>,
    calendar_dates: &[GtfsCalendarDate],
) -> Result<usize, Error> {
    debug!("Loading calendar dates...");
    let now = Instant::now();
    let mut stmt = tx.prepare_cached(
        "INSERT INTO calendar_dates (service_id, date, exception_type) VALUES (?1, ?2, ?3)",
    )?;
    for (i, exception) in calendar_dates.iter().enumerate() {
        stmt.execute(params![
            exception.service_id,
            date_key(exception.date),
            exception.exception_type.id(),
        ])
        .map_err(insert_error("calendar_dates", i + 1))?;
    }
    debug!("Loading calendar dates took {:?}", now.elapsed());
    Ok(calendar_dates.len())
}

fn load_trips(tx: &Transaction<'_>, trips: &[GtfsTrip]) -> Result<usize, Error> {
    debug!("Loading trips...");
    let now = Instant::now();
    let mut stmt = tx.prepare_cached(
        "INSERT INTO trips (trip_id, route_id, service_id, trip_headsign, direction_id,
                            block_id, shape_id)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    )?;
    for (i, trip) in trips.iter().enumerate() {
        stmt.execute(params![
            trip.trip_id,
            trip.route_id,
            trip.service_id,
            trip.trip_headsign,
            trip.direction,
            trip.block_id,
            trip.shape_id,
        ])
        .map_err(insert_error("trips", i + 1))?;
    }
    debug!("Loading trips took {:?}", now.elapsed());
    Ok(trips.len())
}

fn load_stop_times<S>(tx: &Transaction<'_>, stop_times: S) -> Result<usize, Error>
where
    S: IntoIterator<Item = Result<GtfsStopTime, gtfs::Error>>,
{
    debug!("Loading stop times...");
    let now = Instant::now();
    let mut stmt = tx.prepare_cached(
        "INSERT INTO stop_times (trip_id, arrival_time, departure_time, stop_id, stop_sequence,
                                 pickup_type, drop_off_type, timepoint)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
    )?;
    let mut count = 0;
    for stop_time in stop_times {
        let stop_time = stop_time?;
        count += 1;
        stmt.execute(params![
            stop_time.trip_id,
            stop_time.arrival_time,
            stop_time.departure_time,
            stop_time.stop_id,
            stop_time.stop_sequence,
            stop_time.pickup_type,
            stop_time.drop_off_type,
            stop_time.timepoint,
        ])
        .map_err(insert_error("stop_times", count))?;
        if count % PROGRESS_INTERVAL == 0 {
            info!("Imported {count} stop times...");
        }
    }
    debug!("Loading {count} stop times took {:?}", now.elapsed());
    Ok(count)
}

fn load_shapes<P>(tx: &Transaction<'_>, shapes: P) -> Result<usize, Error>
where
    P: IntoIterator<Item = Result<GtfsShapePoint, gtfs::Error>>,
{
    debug!("Loading shapes...");
    let now = Instant::now();
    let mut stmt = tx.prepare_cached(
        "INSERT INTO shapes (shape_id, shape_pt_lat, shape_pt_lon, shape_pt_sequence,
                             shape_dist_traveled)
         VALUES (?1, ?2, ?3, ?4, ?5)",
    )?;
    let mut count = 0;
    for point in shapes {
        let point = point?;
        count += 1;
        stmt.execute(params![
            point.shape_id,
            point.shape_pt_lat,
            point.shape_pt_lon,
            point.shape_pt_sequence,
            point.shape_dist_traveled,
        ])
        .map_err(insert_error("shapes", count))?;
    }
    debug!("Loading {count} shape points took {:?}", now.elapsed());
    Ok(count)
}

/// Point boxes keyed by `stops.rowid`, rebuilt from scratch.
fn rebuild_spatial_index(tx: &Transaction<'_>) -> Result<(), Error> {
    debug!("Rebuilding spatial index...");
    let now = Instant::now();
    tx.execute(
        "INSERT INTO stops_rtree (id, min_lat, max_lat, min_lon, max_lon)
         SELECT rowid, stop_lat, stop_lat, stop_lon, stop_lon FROM stops",
        [],
    )?;
    debug!("Rebuilding spatial index took {:?}", now.elapsed());
    Ok(())
}

fn stamp_metadata(tx: &Transaction<'_>, validators: &Validators) -> Result<(), Error> {
    let mut stmt =
        tx.prepare_cached("INSERT OR REPLACE INTO feed_metadata (key, value) VALUES (?1, ?2)")?;
    let imported_at = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
    stmt.execute(params![IMPORTED_AT, imported_at])?;
    let optional = [
        (LAST_MODIFIED, &validators.last_modified),
        (ETAG, &validators.etag),
    ];
    for (key, value) in optional {
        if let Some(value) = value.as_deref().filter(|value| !value.is_empty()) {
            stmt.execute(params![key, value])?;
        }
    }
    Ok(())
}
