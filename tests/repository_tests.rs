mod common;

use chrono::NaiveDate;
use headway::{
    gtfs::Direction,
    repository::Repository,
    shared::{Coordinate, Distance, Time},
};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn hms(value: &str) -> Time {
    Time::from_hms(value).unwrap()
}

fn trips_at(repository: &Repository, stop_id: &str, day: NaiveDate, after: &str) -> Vec<String> {
    repository
        .departures_for_stop(stop_id, day, hms(after), 50)
        .unwrap()
        .into_iter()
        .map(|departure| departure.trip_id)
        .collect()
}

#[test]
fn weekday_pattern_selects_services() {
    let repository = common::loaded_store("repo-weekday");
    assert_eq!(
        trips_at(&repository, "s1", date(2024, 7, 1), "00:00:00"),
        ["b1", "b2", "c1", "owl"]
    );
    assert_eq!(
        trips_at(&repository, "s1", date(2024, 7, 6), "00:00:00"),
        ["c2"]
    );
    assert!(trips_at(&repository, "s1", date(2024, 7, 7), "00:00:00").is_empty());
}

#[test]
fn exceptions_override_the_weekly_pattern() {
    let repository = common::loaded_store("repo-exceptions");
    // A Thursday: weekday service removed, Saturday service added.
    assert_eq!(
        trips_at(&repository, "s1", date(2024, 7, 4), "00:00:00"),
        ["c2"]
    );
    assert_eq!(
        trips_at(&repository, "s1", date(2024, 7, 3), "00:00:00"),
        ["b1", "b2", "c1", "owl"]
    );
}

#[test]
fn dates_outside_the_calendar_range_have_no_service() {
    let repository = common::loaded_store("repo-range");
    assert!(trips_at(&repository, "s1", date(2025, 1, 6), "00:00:00").is_empty());
}

#[test]
fn departures_respect_the_time_floor_past_midnight() {
    let repository = common::loaded_store("repo-floor");
    assert_eq!(
        trips_at(&repository, "s1", date(2024, 7, 1), "08:15:00"),
        ["b2", "c1", "owl"]
    );
    // 01:00 the next morning, still Monday's service day
    assert_eq!(
        trips_at(&repository, "s1", date(2024, 7, 1), "25:00:00"),
        ["owl"]
    );
}

#[test]
fn departures_carry_route_and_service_date() {
    let repository = common::loaded_store("repo-rows");
    let rows = repository
        .departures_for_stop("s1", date(2024, 7, 1), hms("09:00:00"), 1)
        .unwrap();
    assert_eq!(rows.len(), 1);
    let row = &rows[0];
    assert_eq!(row.trip_id, "c1");
    assert_eq!(row.route_label(), "10");
    assert_eq!(row.route_color.as_deref(), Some("FF0000"));
    assert_eq!(row.direction, Some(Direction::Inbound));
    assert_eq!(row.headsign.as_deref(), Some("Downtown"));
    assert_eq!(row.departure_time, hms("09:00:00"));
    assert_eq!(row.service_date, date(2024, 7, 1));
}

#[test]
fn departure_times_cover_the_whole_day() {
    let repository = common::loaded_store("repo-times");
    let times = repository
        .departure_times("s1", "901", Some(Direction::Outbound), date(2024, 7, 1))
        .unwrap();
    assert_eq!(times, [hms("08:10:00"), hms("08:30:00"), hms("25:10:00")]);

    let times = repository
        .departure_times("s1", "901", Some(Direction::Inbound), date(2024, 7, 1))
        .unwrap();
    assert!(times.is_empty());
}

#[test]
fn route_stops_follow_the_longest_trip() {
    let repository = common::loaded_store("repo-route-stops");
    let outbound = repository
        .stops_for_route("901", Some(Direction::Outbound), date(2024, 7, 1))
        .unwrap()
        .unwrap();
    assert_eq!(outbound.trip_id, "b1");
    assert_eq!(outbound.headsign.as_deref(), Some("Mall of America"));
    let ids: Vec<_> = outbound.stops.iter().map(|stop| stop.id.as_str()).collect();
    assert_eq!(ids, ["s3", "s1", "mall"]);

    let inbound = repository
        .stops_for_route("901", Some(Direction::Inbound), date(2024, 7, 1))
        .unwrap()
        .unwrap();
    let ids: Vec<_> = inbound.stops.iter().map(|stop| stop.id.as_str()).collect();
    assert_eq!(ids, ["s2", "s3"]);

    assert!(
        repository
            .stops_for_route("901", Some(Direction::Outbound), date(2024, 7, 4))
            .unwrap()
            .is_none()
    );
}

#[test]
fn nearby_stops_skip_stations_and_far_stops() {
    let repository = common::loaded_store("repo-nearby");
    let origin = Coordinate::new(44.9480, -93.2390);
    let stops = repository
        .nearby_stops(&origin, &origin.bounding_box(Distance::from_meters(3600.0)), 15)
        .unwrap();
    let ids: Vec<_> = stops.iter().map(|stop| stop.id.as_str()).collect();
    assert_eq!(ids, ["s1", "s2", "s3"]);

    let stops = repository
        .nearby_stops(&origin, &origin.bounding_box(Distance::from_meters(3600.0)), 1)
        .unwrap();
    assert_eq!(stops.len(), 1);
}

#[test]
fn cross_street_search_groups_by_name() {
    let repository = common::loaded_store("repo-search");
    let matches = repository.search_stops("Lake & Hiawatha").unwrap();
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].name, "Lake St & Hiawatha Ave");
    assert!((matches[0].coordinate.latitude - 44.948125).abs() < 1e-9);

    let matches = repository.search_stops("hiawatha and lake").unwrap();
    assert_eq!(matches.len(), 1);
}

#[test]
fn search_ignores_wildcards_and_blank_queries() {
    let repository = common::loaded_store("repo-search-edge");
    assert!(repository.search_stops("   ").unwrap().is_empty());
    assert!(repository.search_stops("100%").unwrap().is_empty());
    assert!(repository.search_stops("_").unwrap().is_empty());

    let matches = repository.search_stops("station").unwrap();
    let names: Vec<_> = matches.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, ["Mall of America Station"]);
}

#[test]
fn lookups_by_id() {
    let repository = common::loaded_store("repo-lookup");
    let stop = repository.stop("s1").unwrap().unwrap();
    assert_eq!(stop.code.as_deref(), Some("1001"));
    assert_eq!(stop.desc.as_deref(), Some("Lake St & Hiawatha Ave NB"));
    assert!(repository.stop("nope").unwrap().is_none());

    let route = repository.route("10").unwrap().unwrap();
    assert_eq!(route.long_name.as_deref(), Some("Central Av"));
    assert_eq!(repository.routes().unwrap().len(), 2);
}

#[test]
fn reopening_keeps_the_committed_feed() {
    let dir = common::temp_dir("repo-reopen");
    let path = dir.join("feed.db");
    {
        let repository = Repository::open(&path).unwrap();
        let feed = common::write_feed("repo-reopen", &common::standard_feed());
        repository
            .import_archive(&feed, &common::validators())
            .unwrap();
    }
    let repository = Repository::open(&path).unwrap();
    assert!(repository.has_data().unwrap());
    assert_eq!(repository.validators().unwrap(), common::validators());
}
