/// File names inside a feed archive.
#[derive(Debug, Clone)]
pub struct Config {
    pub agency_file_name: String,
    pub routes_file_name: String,
    pub stops_file_name: String,
    pub trips_file_name: String,
    pub calendar_file_name: String,
    pub calendar_dates_file_name: String,
    pub stop_times_file_name: String,
    pub shapes_file_name: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            agency_file_name: "agency.txt".into(),
            routes_file_name: "routes.txt".into(),
            stops_file_name: "stops.txt".into(),
            trips_file_name: "trips.txt".into(),
            calendar_file_name: "calendar.txt".into(),
            calendar_dates_file_name: "calendar_dates.txt".into(),
            stop_times_file_name: "stop_times.txt".into(),
            shapes_file_name: "shapes.txt".into(),
        }
    }
}
