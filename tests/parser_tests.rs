mod common;

use headway::{
    gtfs::{Direction, Error, FieldError, GtfsArchive},
    shared::Time,
};

#[test]
fn reads_reference_tables() {
    let path = common::write_feed("parse-tables", &common::standard_feed());
    let mut archive = GtfsArchive::open(&path).unwrap();
    let tables = archive.read_tables().unwrap();

    // The first header cell carries a byte order mark.
    assert_eq!(tables.agencies[0].agency_id, "mt");
    assert_eq!(tables.routes.len(), 2);
    assert_eq!(tables.routes[1].route_short_name, None);
    assert_eq!(tables.stops.len(), 5);
    assert_eq!(tables.stops[4].location_type, 1);
    assert_eq!(tables.trips[2].direction, Some(Direction::Inbound));
    assert_eq!(tables.calendar[0].days, [true, true, true, true, true, false, false]);
    assert_eq!(tables.calendar_dates.len(), 2);
}

#[test]
fn column_order_and_extra_columns_do_not_matter() {
    let routes = "route_type,route_long_name,comment,route_id,agency_id
3,Central Av,ignored,10,mt
0,Blue Line,,901,mt
";
    let path = common::write_feed(
        "parse-columns",
        &common::feed_with("routes.txt", Some(routes)),
    );
    let tables = GtfsArchive::open(&path).unwrap().read_tables().unwrap();
    assert_eq!(tables.routes[0].route_id, "10");
    assert_eq!(tables.routes[0].route_long_name.as_deref(), Some("Central Av"));
    assert_eq!(tables.routes[1].route_type, 0);
}

#[test]
fn stop_times_stream_in_file_order() {
    let path = common::write_feed("parse-stream", &common::standard_feed());
    let mut archive = GtfsArchive::open(&path).unwrap();
    let stop_times: Vec<_> = archive
        .stop_times()
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(stop_times.len(), 11);
    assert_eq!(stop_times[0].trip_id, "b1");

    // Missing departure falls back to the arrival.
    let c1 = stop_times.iter().find(|st| st.trip_id == "c1").unwrap();
    assert_eq!(c1.departure_time, Time::from_hms("09:00:00"));

    let owl = stop_times.iter().find(|st| st.trip_id == "owl").unwrap();
    assert_eq!(owl.departure_time.unwrap().to_hms_string(), "25:10:00");
}

#[test]
fn shapes_are_optional() {
    let path = common::write_feed("parse-no-shapes", &common::feed_with("shapes.txt", None));
    let mut archive = GtfsArchive::open(&path).unwrap();
    assert!(archive.shapes().unwrap().is_none());

    let path = common::write_feed("parse-shapes", &common::standard_feed());
    let mut archive = GtfsArchive::open(&path).unwrap();
    assert_eq!(archive.shapes().unwrap().unwrap().count(), 2);
}

#[test]
fn missing_required_file_is_reported() {
    let path = common::write_feed("parse-missing", &common::feed_with("stops.txt", None));
    let err = GtfsArchive::open(&path).unwrap().read_tables().unwrap_err();
    assert!(matches!(err, Error::FileNotFound(name) if name == "stops.txt"));
}

#[test]
fn either_calendar_file_is_enough() {
    let path = common::write_feed("parse-dates-only", &common::feed_with("calendar.txt", None));
    let tables = GtfsArchive::open(&path).unwrap().read_tables().unwrap();
    assert!(tables.calendar.is_empty());
    assert_eq!(tables.calendar_dates.len(), 2);

    let files: Vec<_> = common::feed_with("calendar.txt", None)
        .into_iter()
        .filter(|(name, _)| *name != "calendar_dates.txt")
        .collect();
    let path = common::write_feed("parse-no-calendar", &files);
    let err = GtfsArchive::open(&path).unwrap().read_tables().unwrap_err();
    assert!(matches!(err, Error::MissingCalendar(..)));
}

#[test]
fn malformed_row_names_file_and_row() {
    let stops = "stop_id,stop_name,stop_lat,stop_lon
s1,Lake St & Hiawatha Ave,44.948,-93.239
s2,Lake St & Hiawatha Ave,north,-93.239
";
    let path = common::write_feed("parse-malformed", &common::feed_with("stops.txt", Some(stops)));
    let err = GtfsArchive::open(&path).unwrap().read_tables().unwrap_err();
    match err {
        Error::Record { file, row, source } => {
            assert_eq!(file, "stops.txt");
            assert_eq!(row, 2);
            assert_eq!(
                source,
                FieldError::Invalid {
                    column: "stop_lat",
                    value: "north".to_string()
                }
            );
        }
        other => panic!("unexpected error {other}"),
    }
}

#[test]
fn malformed_stop_time_ends_the_stream() {
    let stop_times = "trip_id,arrival_time,departure_time,stop_id,stop_sequence
b1,08:00:00,08:00:00,s3,1
b1,8 o'clock,,s1,2
b1,08:40:00,08:40:00,mall,3
";
    let path = common::write_feed(
        "parse-bad-time",
        &common::feed_with("stop_times.txt", Some(stop_times)),
    );
    let mut archive = GtfsArchive::open(&path).unwrap();
    let results: Vec<_> = archive.stop_times().unwrap().collect();
    assert_eq!(results.len(), 2);
    assert!(results[0].is_ok());
    assert!(matches!(&results[1], Err(Error::Record { row: 2, .. })));
}

#[test]
fn oversized_hours_are_a_bad_record() {
    let stop_times = "trip_id,arrival_time,departure_time,stop_id,stop_sequence
b1,2000000:00:00,2000000:00:00,s3,1
";
    let path = common::write_feed(
        "parse-huge-time",
        &common::feed_with("stop_times.txt", Some(stop_times)),
    );
    let mut archive = GtfsArchive::open(&path).unwrap();
    let results: Vec<_> = archive.stop_times().unwrap().collect();
    assert_eq!(results.len(), 1);
    match &results[0] {
        Err(Error::Record { file, row, source }) => {
            assert_eq!(file, "stop_times.txt");
            assert_eq!(*row, 1);
            assert!(matches!(source, FieldError::Invalid { column: "arrival_time", .. }));
        }
        other => panic!("expected a bad record, got {other:?}"),
    }
}
