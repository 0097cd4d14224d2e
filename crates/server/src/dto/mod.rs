mod departure;
mod nearby;
mod route;
mod stop;

pub use departure::{DepartureDto, GroupDto};
pub use nearby::NearbyDto;
pub use route::{RouteDetailDto, RouteDto, RouteStopsDto};
pub use stop::{LaterDto, PlaceDto, StopDeparturesDto, StopDto};
