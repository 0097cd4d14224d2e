//! Request-time computations over store results: merging realtime into the
//! timetable, spotting headways, and shaping nearby stops into pages.

pub mod departures;
pub mod headway;
pub mod nearby;
pub mod search;

pub use departures::{Departure, Prediction, merge_departures};
pub use headway::{Headway, detect_headway};
pub use nearby::{DepartureGroup, Page, RadiusTier, RankedStop, RouteRow, StopView};
