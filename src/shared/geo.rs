use std::{
    cmp,
    fmt::Display,
    iter::Sum,
    ops::{Add, Sub},
};

use serde::{Deserialize, Serialize};

pub(crate) const EARTH_RADIUS: Distance = Distance::from_meters(6_371_000.0);
const METERS_PER_MILE: f64 = 1609.344;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Distance(f64);

impl PartialEq for Distance {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl PartialOrd for Distance {
    fn partial_cmp(&self, other: &Self) -> Option<cmp::Ordering> {
        self.0.partial_cmp(&other.0)
    }
}

impl Add for Distance {
    type Output = Self;
    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Distance {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl Distance {
    pub const fn from_meters(distance: f64) -> Self {
        Self(distance)
    }

    pub const fn from_kilometers(distance: f64) -> Self {
        Self(distance * 1000.0)
    }

    pub const fn as_meters(&self) -> f64 {
        self.0
    }

    pub const fn as_kilometers(&self) -> f64 {
        self.0 / 1000.0
    }

    pub const fn as_miles(&self) -> f64 {
        self.0 / METERS_PER_MILE
    }

    /// Total ordering for sorting, NaN sorts last.
    pub fn total_cmp(&self, other: &Self) -> cmp::Ordering {
        self.0.total_cmp(&other.0)
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!("{}, {}", self.latitude, self.longitude))
    }
}

/// Averages the coordinates, i.e. the centroid of a small cluster.
impl Sum for Coordinate {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        let mut count: usize = 0;
        let mut lat: f64 = 0.0;
        let mut lon: f64 = 0.0;
        iter.for_each(|coordinate| {
            count += 1;
            lat += coordinate.latitude;
            lon += coordinate.longitude;
        });
        if count == 0 {
            return Self::default();
        }
        let count = count as f64;
        Self {
            latitude: lat / count,
            longitude: lon / count,
        }
    }
}

impl From<Coordinate> for (f64, f64) {
    fn from(value: Coordinate) -> Self {
        (value.latitude, value.longitude)
    }
}

impl Coordinate {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Haversine distance.
    pub fn great_circle_distance(&self, coord: &Self) -> Distance {
        let dist_lat = f64::to_radians(coord.latitude - self.latitude);
        let dist_lon = f64::to_radians(coord.longitude - self.longitude);
        let a = f64::powi(f64::sin(dist_lat / 2.0), 2)
            + f64::cos(f64::to_radians(self.latitude))
                * f64::cos(f64::to_radians(coord.latitude))
                * f64::powi(f64::sin(dist_lon / 2.0), 2);
        let c = 2.0 * f64::atan2(f64::sqrt(a), f64::sqrt(1.0 - a));
        Distance::from_meters(EARTH_RADIUS.as_meters() * c)
    }

    /// Walking distance on a street grid, approximated as a north-south leg
    /// followed by an east-west leg.
    pub fn grid_distance(&self, coord: &Self) -> Distance {
        let corner = Coordinate::new(coord.latitude, self.longitude);
        let north_south = self.great_circle_distance(&corner);
        // The east-west leg runs along the mean latitude so the result stays symmetric.
        let mean_lat = (self.latitude + coord.latitude) / 2.0;
        let east_west = Coordinate::new(mean_lat, self.longitude)
            .great_circle_distance(&Coordinate::new(mean_lat, coord.longitude));
        north_south + east_west
    }

    pub fn bounding_box(&self, half_width: Distance) -> BoundingBox {
        let lat_delta = f64::to_degrees(half_width.as_meters() / EARTH_RADIUS.as_meters());
        let cos_lat = f64::cos(f64::to_radians(self.latitude)).abs().max(1e-6);
        let lon_delta = lat_delta / cos_lat;
        BoundingBox {
            min_lat: self.latitude - lat_delta,
            max_lat: self.latitude + lat_delta,
            min_lon: self.longitude - lon_delta,
            max_lon: self.longitude + lon_delta,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl BoundingBox {
    pub fn contains(&self, coord: &Coordinate) -> bool {
        (self.min_lat..=self.max_lat).contains(&coord.latitude)
            && (self.min_lon..=self.max_lon).contains(&coord.longitude)
    }

    pub fn lat_span(&self) -> f64 {
        self.max_lat - self.min_lat
    }

    pub fn lon_span(&self) -> f64 {
        self.max_lon - self.min_lon
    }
}

#[test]
fn distance_test() {
    let minneapolis = Coordinate::new(44.9778, -93.2650);
    let st_paul = Coordinate::new(44.9537, -93.0900);
    let d = minneapolis.great_circle_distance(&st_paul);
    assert!((d.as_meters() - 14_026.0).abs() < 50.0, "got {d:?}");
}

#[test]
fn distance_eq_test() {
    let dist_a = Distance::from_meters(1000.0);
    let dist_b = Distance::from_kilometers(1.0);
    assert_eq!(dist_a, dist_b)
}

#[test]
fn distance_cmp_test() {
    let dist_a = Distance::from_meters(1000.0);
    let dist_b = Distance::from_kilometers(0.5);
    assert!(dist_a > dist_b)
}

#[test]
fn miles_test() {
    let mile = Distance::from_meters(1609.344);
    assert!((mile.as_miles() - 1.0).abs() < 1e-9);
}

#[test]
fn centroid_of_nothing_is_origin() {
    let centroid: Coordinate = Vec::<Coordinate>::new().into_iter().sum();
    assert_eq!(centroid, Coordinate::default());
}
