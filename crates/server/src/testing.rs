//! Fixture feeds for the server's unit tests.

use chrono::{DateTime, NaiveDate, TimeZone};
use chrono_tz::{America::Chicago, Tz};
use headway::repository::{Repository, Validators};
use std::{
    io::Write,
    path::PathBuf,
    sync::atomic::{AtomicUsize, Ordering},
};
use zip::{ZipWriter, write::SimpleFileOptions};

pub const LAKE_HIAWATHA: (f64, f64) = (44.9480, -93.2390);
pub const FRANKLIN: (f64, f64) = (44.9625, -93.2470);

const AGENCY: &str = "agency_id,agency_name,agency_url,agency_timezone
mt,Metro Transit,https://metrotransit.org,America/Chicago
";

const ROUTES: &str = "route_id,agency_id,route_short_name,route_long_name,route_type,route_color,route_text_color
21,mt,21,Lake St,3,0053A0,FFFFFF
901,mt,,Blue Line,0,0053A0,FFFFFF
";

const STOPS: &str = "stop_id,stop_name,stop_desc,stop_lat,stop_lon,location_type
a1,Lake St & Hiawatha Ave,Lake St & Hiawatha Ave WB,44.9480,-93.2390,0
a2,Lake St & Hiawatha Ave,Lake St & Hiawatha Ave EB,44.94825,-93.2390,0
f1,Franklin Ave Station,,44.9625,-93.2470,0
mall,Mall of America Station,,44.8548,-93.2390,0
";

const CALENDAR: &str = "service_id,monday,tuesday,wednesday,thursday,friday,saturday,sunday,start_date,end_date
ALL,1,1,1,1,1,1,1,20240101,20351231
MON,1,0,0,0,0,0,0,20240101,20351231
";

const CALENDAR_DATES: &str = "service_id,date,exception_type
ALL,20241225,2
";

/// Route 21 runs every 15 minutes both ways through Lake & Hiawatha from
/// 06:00 to 09:00, plus one owl trip at 25:10. The Blue Line stops at
/// Franklin at irregular times, and on Monday nights only it shuttles back
/// from the mall every 20 minutes from 24:10 to 25:30.
fn trips_and_stop_times() -> (String, String) {
    let mut trips = String::from("route_id,service_id,trip_id,trip_headsign,direction_id\n");
    let mut stop_times =
        String::from("trip_id,arrival_time,departure_time,stop_id,stop_sequence\n");
    let mut push = |service: &str,
                    route: &str,
                    trip: &str,
                    headsign: &str,
                    direction: u8,
                    calls: &[(&str, u32)]| {
        trips.push_str(&format!("{route},{service},{trip},{headsign},{direction}\n"));
        for (sequence, (stop, minutes)) in calls.iter().enumerate() {
            let time = format!("{:02}:{:02}:00", minutes / 60, minutes % 60);
            stop_times.push_str(&format!("{trip},{time},{time},{stop},{}\n", sequence + 1));
        }
    };
    for k in 0..13 {
        let west = 6 * 60 + 15 * k;
        push("ALL", "21", &format!("w{k}"), "Uptown", 0, &[("a1", west), ("mall", west + 20)]);
        let east = west + 5;
        push("ALL", "21", &format!("e{k}"), "Downtown", 1, &[("a2", east), ("f1", east + 10)]);
    }
    push("ALL", "21", "owl", "Uptown", 0, &[("a1", 25 * 60 + 10), ("mall", 25 * 60 + 30)]);
    for (i, minutes) in [7 * 60, 7 * 60 + 30, 8 * 60 + 10, 9 * 60].into_iter().enumerate() {
        push("ALL", "901", &format!("b{i}"), "Mall of America", 0, &[("f1", minutes), ("mall", minutes + 25)]);
    }
    for i in 0..5 {
        let minutes = 24 * 60 + 10 + 20 * i;
        push("MON", "901", &format!("n{i}"), "Franklin Ave", 1, &[("mall", minutes)]);
    }
    (trips, stop_times)
}

fn unique_dir(label: &str) -> PathBuf {
    static COUNTER: AtomicUsize = AtomicUsize::new(0);
    let dir = std::env::temp_dir().join(format!(
        "headway-server-{label}-{}-{}",
        std::process::id(),
        COUNTER.fetch_add(1, Ordering::SeqCst)
    ));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

pub fn write_feed_archive(label: &str) -> PathBuf {
    let (trips, stop_times) = trips_and_stop_times();
    let path = unique_dir(label).join("feed.zip");
    let mut zip = ZipWriter::new(std::fs::File::create(&path).unwrap());
    let files = [
        ("agency.txt", AGENCY),
        ("routes.txt", ROUTES),
        ("stops.txt", STOPS),
        ("calendar.txt", CALENDAR),
        ("calendar_dates.txt", CALENDAR_DATES),
        ("trips.txt", trips.as_str()),
        ("stop_times.txt", stop_times.as_str()),
    ];
    for (name, contents) in files {
        zip.start_file(name, SimpleFileOptions::default()).unwrap();
        zip.write_all(contents.as_bytes()).unwrap();
    }
    zip.finish().unwrap();
    path
}

pub fn empty_store(label: &str) -> Repository {
    Repository::open(unique_dir(label).join("feed.db")).unwrap()
}

pub fn loaded_store(label: &str) -> Repository {
    let repository = empty_store(label);
    repository
        .import_archive(
            write_feed_archive(label),
            &Validators {
                last_modified: Some("Mon, 01 Jul 2024 03:00:00 GMT".to_string()),
                etag: Some("\"fixture\"".to_string()),
            },
        )
        .unwrap();
    repository
}

/// Monday 2024-07-01 at `hour:minute` in the fixture's timezone.
pub fn monday_at(hour: u32, minute: u32) -> DateTime<Tz> {
    let date = NaiveDate::from_ymd_opt(2024, 7, 1).unwrap();
    Chicago
        .from_local_datetime(&date.and_hms_opt(hour, minute, 0).unwrap())
        .single()
        .unwrap()
}
