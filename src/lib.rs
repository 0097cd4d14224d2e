pub mod engine;
pub mod gtfs;
pub mod repository;
pub mod shared;

pub mod prelude {
    pub use crate::engine::{
        Departure, DepartureGroup, Headway, Page, Prediction, RadiusTier, RankedStop, RouteRow,
        StopView, detect_headway, merge_departures,
    };
    pub use crate::gtfs::{Direction, GtfsArchive};
    pub use crate::repository::{
        Repository, Route, RouteStops, ScheduledDeparture, Stop, StopMatch, Validators,
    };
    pub use crate::shared::{
        geo::{BoundingBox, Coordinate, Distance},
        time::{Duration, Time},
    };
}
