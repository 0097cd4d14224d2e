#![allow(dead_code)]

use headway::repository::{Repository, Validators};
use std::{
    fs::File,
    io::Write,
    path::PathBuf,
    sync::atomic::{AtomicUsize, Ordering},
    time::{SystemTime, UNIX_EPOCH},
};
use zip::{ZipWriter, write::SimpleFileOptions};

static COUNTER: AtomicUsize = AtomicUsize::new(0);

pub const AGENCY: &str = "\u{feff}agency_id,agency_name,agency_url,agency_timezone
mt,Metro Transit,https://www.metrotransit.org,America/Chicago
";

pub const ROUTES: &str = "route_id,agency_id,route_short_name,route_long_name,route_type,route_color,route_text_color
10,mt,10,Central Av,3,FF0000,FFFFFF
901,mt,,Blue Line,0,0055A5,FFFFFF
";

// s1 and s2 face each other across Lake St, Franklin is ~1.7 km north and
// the mall ~10 km south. The station row is not a boarding point.
pub const STOPS: &str = "stop_id,stop_code,stop_name,stop_desc,stop_lat,stop_lon,location_type,parent_station
s1,1001,Lake St & Hiawatha Ave,Lake St & Hiawatha Ave NB,44.94800,-93.23900,0,
s2,1002,Lake St & Hiawatha Ave,Lake St & Hiawatha Ave SB,44.94825,-93.23900,0,
s3,1003,Franklin Ave & Cedar Ave,,44.96270,-93.24750,0,
mall,1004,Mall of America Station,,44.85490,-93.24220,0,
lake,,Lake St Station,,44.94810,-93.23910,1,
";

pub const CALENDAR: &str = "service_id,monday,tuesday,wednesday,thursday,friday,saturday,sunday,start_date,end_date
WK,1,1,1,1,1,0,0,20240101,20241231
SAT,0,0,0,0,0,1,0,20240101,20241231
";

// Independence Day runs the Saturday schedule.
pub const CALENDAR_DATES: &str = "service_id,date,exception_type
WK,20240704,2
SAT,20240704,1
";

pub const TRIPS: &str = "route_id,service_id,trip_id,trip_headsign,direction_id,shape_id
901,WK,b1,Mall of America,0,sh1
901,WK,b2,Mall of America,0,sh1
901,WK,b3,Target Field,1,
10,WK,c1,Downtown,1,
10,SAT,c2,Downtown,1,
901,WK,owl,Mall of America,0,sh1
";

pub const STOP_TIMES: &str = "trip_id,arrival_time,departure_time,stop_id,stop_sequence
b1,08:00:00,08:00:00,s3,1
b1,08:10:00,08:10:00,s1,2
b1,08:40:00,08:40:00,mall,3
b2,08:20:00,08:20:00,s3,1
b2,08:30:00,08:30:00,s1,2
b3,08:15:00,08:15:00,s2,1
b3,08:25:00,08:25:00,s3,2
c1,9:00:00,,s1,1
c2,10:00:00,10:00:00,s1,1
owl,25:10:00,25:10:00,s1,1
owl,25:40:00,25:40:00,mall,2
";

pub const SHAPES: &str = "shape_id,shape_pt_lat,shape_pt_lon,shape_pt_sequence
sh1,44.96270,-93.24750,1
sh1,44.94800,-93.23900,2
";

/// Every file of the fixture feed.
pub fn standard_feed() -> Vec<(&'static str, String)> {
    vec![
        ("agency.txt", AGENCY.to_string()),
        ("routes.txt", ROUTES.to_string()),
        ("stops.txt", STOPS.to_string()),
        ("calendar.txt", CALENDAR.to_string()),
        ("calendar_dates.txt", CALENDAR_DATES.to_string()),
        ("trips.txt", TRIPS.to_string()),
        ("stop_times.txt", STOP_TIMES.to_string()),
        ("shapes.txt", SHAPES.to_string()),
    ]
}

/// A fresh directory under the system temp dir.
pub fn temp_dir(label: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    let n = COUNTER.fetch_add(1, Ordering::SeqCst);
    let dir = std::env::temp_dir().join(format!(
        "headway-{label}-{}-{nanos}-{n}",
        std::process::id()
    ));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

pub fn write_feed(label: &str, files: &[(&str, String)]) -> PathBuf {
    let path = temp_dir(label).join("feed.zip");
    let mut zip = ZipWriter::new(File::create(&path).unwrap());
    for (name, content) in files {
        zip.start_file(*name, SimpleFileOptions::default()).unwrap();
        zip.write_all(content.as_bytes()).unwrap();
    }
    zip.finish().unwrap();
    path
}

/// The fixture feed with one file replaced, or dropped when `content` is
/// `None`.
pub fn feed_with(name: &str, content: Option<&str>) -> Vec<(&'static str, String)> {
    standard_feed()
        .into_iter()
        .filter_map(|(file, body)| {
            if file != name {
                Some((file, body))
            } else {
                content.map(|content| (file, content.to_string()))
            }
        })
        .collect()
}

pub fn open_store(label: &str) -> Repository {
    Repository::open(temp_dir(label).join("feed.db")).unwrap()
}

pub fn validators() -> Validators {
    Validators {
        last_modified: Some("Mon, 01 Jul 2024 06:00:00 GMT".to_string()),
        etag: Some("\"abc123\"".to_string()),
    }
}

/// A store with the fixture feed committed.
pub fn loaded_store(label: &str) -> Repository {
    let repository = open_store(label);
    let feed = write_feed(label, &standard_feed());
    repository.import_archive(&feed, &validators()).unwrap();
    repository
}
