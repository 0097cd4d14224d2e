use rusqlite::Connection;
use tracing::info;

/// Applied in order; `user_version` records how many have run.
const MIGRATIONS: &[&str] = &[r#"
CREATE TABLE IF NOT EXISTS agency (
    agency_id       TEXT PRIMARY KEY,
    agency_name     TEXT NOT NULL,
    agency_url      TEXT NOT NULL,
    agency_timezone TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS routes (
    route_id         TEXT PRIMARY KEY,
    agency_id        TEXT NOT NULL REFERENCES agency(agency_id),
    route_short_name TEXT,
    route_long_name  TEXT,
    route_type       INTEGER NOT NULL,
    route_color      TEXT,
    route_text_color TEXT,
    route_sort_order INTEGER
);

CREATE TABLE IF NOT EXISTS stops (
    stop_id             TEXT PRIMARY KEY,
    stop_code           TEXT,
    stop_name           TEXT NOT NULL,
    stop_desc           TEXT,
    stop_lat            REAL NOT NULL,
    stop_lon            REAL NOT NULL,
    zone_id             TEXT,
    location_type       INTEGER NOT NULL DEFAULT 0,
    parent_station      TEXT,
    wheelchair_boarding INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS calendar (
    service_id TEXT PRIMARY KEY,
    monday     INTEGER NOT NULL,
    tuesday    INTEGER NOT NULL,
    wednesday  INTEGER NOT NULL,
    thursday   INTEGER NOT NULL,
    friday     INTEGER NOT NULL,
    saturday   INTEGER NOT NULL,
    sunday     INTEGER NOT NULL,
    start_date TEXT NOT NULL,
    end_date   TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS calendar_dates (
    service_id     TEXT NOT NULL,
    date           TEXT NOT NULL,
    exception_type INTEGER NOT NULL,
    PRIMARY KEY (service_id, date)
);

CREATE TABLE IF NOT EXISTS trips (
    trip_id       TEXT PRIMARY KEY,
    route_id      TEXT NOT NULL REFERENCES routes(route_id),
    service_id    TEXT NOT NULL,
    trip_headsign TEXT,
    direction_id  INTEGER,
    block_id      TEXT,
    shape_id      TEXT
);

CREATE TABLE IF NOT EXISTS stop_times (
    trip_id        TEXT NOT NULL REFERENCES trips(trip_id),
    arrival_time   TEXT,
    departure_time TEXT,
    stop_id        TEXT NOT NULL REFERENCES stops(stop_id),
    stop_sequence  INTEGER NOT NULL,
    pickup_type    INTEGER NOT NULL DEFAULT 0,
    drop_off_type  INTEGER NOT NULL DEFAULT 0,
    timepoint      INTEGER,
    PRIMARY KEY (trip_id, stop_sequence)
);

CREATE TABLE IF NOT EXISTS shapes (
    shape_id            TEXT NOT NULL,
    shape_pt_lat        REAL NOT NULL,
    shape_pt_lon        REAL NOT NULL,
    shape_pt_sequence   INTEGER NOT NULL,
    shape_dist_traveled REAL,
    PRIMARY KEY (shape_id, shape_pt_sequence)
);

CREATE TABLE IF NOT EXISTS feed_metadata (
    key   TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

CREATE VIRTUAL TABLE IF NOT EXISTS stops_rtree USING rtree(
    id,
    min_lat, max_lat,
    min_lon, max_lon
);

CREATE INDEX IF NOT EXISTS idx_stop_times_stop ON stop_times(stop_id);
CREATE INDEX IF NOT EXISTS idx_stop_times_trip ON stop_times(trip_id);
CREATE INDEX IF NOT EXISTS idx_stop_times_stop_departure ON stop_times(stop_id, departure_time);
CREATE INDEX IF NOT EXISTS idx_trips_route ON trips(route_id);
CREATE INDEX IF NOT EXISTS idx_trips_service ON trips(service_id);
CREATE INDEX IF NOT EXISTS idx_trips_route_direction ON trips(route_id, direction_id);
CREATE INDEX IF NOT EXISTS idx_calendar_dates_date ON calendar_dates(date);
"#];

pub(crate) fn migrate(conn: &mut Connection) -> Result<(), rusqlite::Error> {
    let version: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
    let version = version.max(0) as usize;
    if version >= MIGRATIONS.len() {
        return Ok(());
    }
    let tx = conn.transaction()?;
    for (i, migration) in MIGRATIONS.iter().enumerate().skip(version) {
        info!("Applying schema migration {}", i + 1);
        tx.execute_batch(migration)?;
    }
    tx.execute_batch(&format!("PRAGMA user_version = {}", MIGRATIONS.len()))?;
    tx.commit()
}

/// Child tables first so foreign keys never dangle mid-delete.
pub(crate) const FEED_TABLES: &[&str] = &[
    "stop_times",
    "shapes",
    "trips",
    "calendar_dates",
    "calendar",
    "stops",
    "routes",
    "agency",
    "stops_rtree",
    "feed_metadata",
];
