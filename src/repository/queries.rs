use super::{
    Error, Repository, Route, RouteStops, ScheduledDeparture, Stop, StopMatch, Validators,
    sql::{active_services, date_key},
};
use crate::{
    gtfs::Direction,
    shared::{
        fuzzy,
        geo::{BoundingBox, Coordinate},
        time::Time,
    },
};
use chrono::{Datelike, NaiveDate};
use rusqlite::{OptionalExtension, Row, named_params};
use std::cmp::Ordering;

pub const IMPORTED_AT: &str = "imported_at";
pub const LAST_MODIFIED: &str = "last_modified";
pub const ETAG: &str = "etag";

const SEARCH_LIMIT: i64 = 20;
const CROSS_STREET_SEPARATORS: [&str; 6] = [" and ", " & ", " at ", "/", " n ", " near "];

const STOP_COLUMNS: &str = "s.stop_id, s.stop_code, s.stop_name, s.stop_desc, s.stop_lat, \
    s.stop_lon, s.location_type, s.parent_station, s.wheelchair_boarding";

const ROUTE_COLUMNS: &str = "route_id, agency_id, route_short_name, route_long_name, \
    route_type, route_color, route_text_color, route_sort_order";

fn stop_from_row(row: &Row<'_>) -> rusqlite::Result<Stop> {
    Ok(Stop {
        id: row.get(0)?,
        code: row.get(1)?,
        name: row.get(2)?,
        desc: row.get(3)?,
        coordinate: Coordinate::new(row.get(4)?, row.get(5)?),
        location_type: row.get(6)?,
        parent_station: row.get(7)?,
        wheelchair_boarding: row.get(8)?,
    })
}

fn route_from_row(row: &Row<'_>) -> rusqlite::Result<Route> {
    Ok(Route {
        id: row.get(0)?,
        agency_id: row.get(1)?,
        short_name: row.get(2)?,
        long_name: row.get(3)?,
        route_type: row.get(4)?,
        color: row.get(5)?,
        text_color: row.get(6)?,
        sort_order: row.get(7)?,
    })
}

impl Repository {
    /// True once a feed with at least one route has been committed.
    pub fn has_data(&self) -> Result<bool, Error> {
        self.read(|conn| conn.query_row("SELECT EXISTS(SELECT 1 FROM routes)", [], |row| row.get(0)))
    }

    pub fn metadata(&self, key: &str) -> Result<Option<String>, Error> {
        self.read(|conn| {
            conn.query_row(
                "SELECT value FROM feed_metadata WHERE key = ?1",
                [key],
                |row| row.get(0),
            )
            .optional()
        })
    }

    pub fn validators(&self) -> Result<Validators, Error> {
        Ok(Validators {
            last_modified: self.metadata(LAST_MODIFIED)?,
            etag: self.metadata(ETAG)?,
        })
    }

    /// First agency's timezone, if a feed is loaded.
    pub fn feed_timezone(&self) -> Result<Option<String>, Error> {
        self.read(|conn| {
            conn.query_row(
                "SELECT agency_timezone FROM agency ORDER BY agency_id LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()
        })
    }

    pub fn stop(&self, stop_id: &str) -> Result<Option<Stop>, Error> {
        self.read(|conn| {
            conn.prepare_cached(&format!("SELECT {STOP_COLUMNS} FROM stops s WHERE s.stop_id = ?1"))?
                .query_row([stop_id], stop_from_row)
                .optional()
        })
    }

    pub fn route(&self, route_id: &str) -> Result<Option<Route>, Error> {
        self.read(|conn| {
            conn.prepare_cached(&format!("SELECT {ROUTE_COLUMNS} FROM routes WHERE route_id = ?1"))?
                .query_row([route_id], route_from_row)
                .optional()
        })
    }

    pub fn routes(&self) -> Result<Vec<Route>, Error> {
        self.read(|conn| {
            let mut stmt = conn.prepare_cached(&format!(
                "SELECT {ROUTE_COLUMNS} FROM routes
                 ORDER BY route_sort_order IS NULL, route_sort_order, route_short_name, route_id"
            ))?;
            stmt.query_map([], route_from_row)?.collect()
        })
    }

    /// Physical stops inside `bbox`, roughly nearest first.
    ///
    /// The order is a flat-earth approximation; callers rank the result by
    /// great-circle distance.
    pub fn nearby_stops(
        &self,
        origin: &Coordinate,
        bbox: &BoundingBox,
        limit: usize,
    ) -> Result<Vec<Stop>, Error> {
        let lon_scale = f64::cos(origin.latitude.to_radians()).powi(2);
        self.read(|conn| {
            let mut stmt = conn.prepare_cached(&format!(
                "SELECT {STOP_COLUMNS}
                 FROM stops_rtree r
                 JOIN stops s ON s.rowid = r.id
                 WHERE r.min_lat >= :min_lat AND r.max_lat <= :max_lat
                   AND r.min_lon >= :min_lon AND r.max_lon <= :max_lon
                   AND s.location_type = 0
                 ORDER BY (s.stop_lat - :lat) * (s.stop_lat - :lat)
                        + (s.stop_lon - :lon) * (s.stop_lon - :lon) * :lon_scale
                 LIMIT :limit"
            ))?;
            stmt.query_map(
                named_params! {
                    ":min_lat": bbox.min_lat,
                    ":max_lat": bbox.max_lat,
                    ":min_lon": bbox.min_lon,
                    ":max_lon": bbox.max_lon,
                    ":lat": origin.latitude,
                    ":lon": origin.longitude,
                    ":lon_scale": lon_scale,
                    ":limit": limit as i64,
                },
                stop_from_row,
            )?
            .collect()
        })
    }

    /// Departures from `stop_id` at or after `after` on service date `date`,
    /// in departure order.
    pub fn departures_for_stop(
        &self,
        stop_id: &str,
        date: NaiveDate,
        after: Time,
        limit: usize,
    ) -> Result<Vec<ScheduledDeparture>, Error> {
        let sql = format!(
            "{active}
             SELECT st.trip_id, st.stop_id, t.route_id, r.route_short_name, r.route_long_name,
                    r.route_color, r.route_text_color, t.trip_headsign, t.direction_id,
                    st.departure_time
             FROM stop_times st
             JOIN trips t ON t.trip_id = st.trip_id
             JOIN routes r ON r.route_id = t.route_id
             WHERE st.stop_id = :stop_id
               AND st.departure_time >= :after
               AND t.service_id IN (SELECT service_id FROM active)
             ORDER BY st.departure_time, t.route_id
             LIMIT :limit",
            active = active_services(date.weekday())
        );
        let key = date_key(date);
        self.read(|conn| {
            let mut stmt = conn.prepare_cached(&sql)?;
            stmt.query_map(
                named_params! {
                    ":date": key,
                    ":stop_id": stop_id,
                    ":after": after,
                    ":limit": limit as i64,
                },
                |row| {
                    Ok(ScheduledDeparture {
                        trip_id: row.get(0)?,
                        stop_id: row.get(1)?,
                        route_id: row.get(2)?,
                        route_short_name: row.get(3)?,
                        route_long_name: row.get(4)?,
                        route_color: row.get(5)?,
                        route_text_color: row.get(6)?,
                        headsign: row.get(7)?,
                        direction: row.get(8)?,
                        departure_time: row.get(9)?,
                        service_date: date,
                    })
                },
            )?
            .collect()
        })
    }

    /// Every departure time of one route and direction at a stop on `date`.
    pub fn departure_times(
        &self,
        stop_id: &str,
        route_id: &str,
        direction: Option<Direction>,
        date: NaiveDate,
    ) -> Result<Vec<Time>, Error> {
        let sql = format!(
            "{active}
             SELECT st.departure_time
             FROM stop_times st
             JOIN trips t ON t.trip_id = st.trip_id
             WHERE st.stop_id = :stop_id
               AND t.route_id = :route_id
               AND t.direction_id IS :direction
               AND st.departure_time IS NOT NULL
               AND t.service_id IN (SELECT service_id FROM active)
             ORDER BY st.departure_time",
            active = active_services(date.weekday())
        );
        let key = date_key(date);
        self.read(|conn| {
            let mut stmt = conn.prepare_cached(&sql)?;
            stmt.query_map(
                named_params! {
                    ":date": key,
                    ":stop_id": stop_id,
                    ":route_id": route_id,
                    ":direction": direction,
                },
                |row| row.get(0),
            )?
            .collect()
        })
    }

    /// The stop sequence of a representative trip: the active trip with the
    /// most stops, ties broken by trip id.
    pub fn stops_for_route(
        &self,
        route_id: &str,
        direction: Option<Direction>,
        date: NaiveDate,
    ) -> Result<Option<RouteStops>, Error> {
        let sql = format!(
            "{active}
             SELECT t.trip_id, t.trip_headsign
             FROM trips t
             WHERE t.route_id = :route_id
               AND t.direction_id IS :direction
               AND t.service_id IN (SELECT service_id FROM active)
             ORDER BY (SELECT COUNT(*) FROM stop_times x WHERE x.trip_id = t.trip_id) DESC,
                      t.trip_id
             LIMIT 1",
            active = active_services(date.weekday())
        );
        let key = date_key(date);
        self.read(|conn| {
            let trip: Option<(String, Option<String>)> = conn
                .prepare_cached(&sql)?
                .query_row(
                    named_params! {
                        ":date": key,
                        ":route_id": route_id,
                        ":direction": direction,
                    },
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;
            let Some((trip_id, headsign)) = trip else {
                return Ok(None);
            };
            let stops = conn
                .prepare_cached(&format!(
                    "SELECT {STOP_COLUMNS}
                     FROM stop_times st
                     JOIN stops s ON s.stop_id = st.stop_id
                     WHERE st.trip_id = ?1
                     ORDER BY st.stop_sequence"
                ))?
                .query_map([&trip_id], stop_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Some(RouteStops {
                trip_id,
                headsign,
                stops,
            }))
        })
    }

    /// Stop names matching a free-text query, grouped by name.
    ///
    /// A cross-street query such as "lake & hiawatha" must match both sides.
    /// Results are ordered by how well the name matches, then by name.
    pub fn search_stops(&self, query: &str) -> Result<Vec<StopMatch>, Error> {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return Ok(Vec::new());
        }
        let parts = split_cross_street(&query);
        let first = like_pattern(parts.0);
        let second = like_pattern(parts.1.unwrap_or(""));
        let mut matches = self.read(|conn| {
            let mut stmt = conn.prepare_cached(
                "SELECT stop_name, AVG(stop_lat), AVG(stop_lon)
                 FROM stops
                 WHERE location_type = 0
                   AND LOWER(stop_name) LIKE :first ESCAPE '\\'
                   AND LOWER(stop_name) LIKE :second ESCAPE '\\'
                 GROUP BY stop_name
                 ORDER BY stop_name
                 LIMIT :limit",
            )?;
            stmt.query_map(
                named_params! {
                    ":first": first,
                    ":second": second,
                    ":limit": SEARCH_LIMIT,
                },
                |row| {
                    Ok(StopMatch {
                        name: row.get(0)?,
                        coordinate: Coordinate::new(row.get(1)?, row.get(2)?),
                    })
                },
            )?
            .collect::<Result<Vec<_>, _>>()
        })?;

        let needle = match parts.1 {
            Some(second) => format!("{} {}", parts.0, second),
            None => parts.0.to_string(),
        };
        matches.sort_by(|a, b| {
            fuzzy::score(&needle, &b.name)
                .partial_cmp(&fuzzy::score(&needle, &a.name))
                .unwrap_or(Ordering::Equal)
        });
        Ok(matches)
    }
}

/// Splits "lake st & hiawatha" into its two street names, on the first
/// separator (in priority order) that appears in the query.
pub fn split_cross_street(query: &str) -> (&str, Option<&str>) {
    for separator in CROSS_STREET_SEPARATORS {
        if let Some((left, right)) = query.split_once(separator) {
            let (left, right) = (left.trim(), right.trim());
            if !left.is_empty() && !right.is_empty() {
                return (left, Some(right));
            }
        }
    }
    (query.trim(), None)
}

fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}
