use crate::gtfs::{GtfsAgency, GtfsCalendar, GtfsCalendarDate, GtfsRoute, GtfsStop, GtfsTrip};

/// The reference tables of a feed, small enough to hold in memory.
#[derive(Default, Debug, Clone)]
pub struct FeedTables {
    pub agencies: Vec<GtfsAgency>,
    pub routes: Vec<GtfsRoute>,
    pub stops: Vec<GtfsStop>,
    pub trips: Vec<GtfsTrip>,
    pub calendar: Vec<GtfsCalendar>,
    pub calendar_dates: Vec<GtfsCalendarDate>,
}
