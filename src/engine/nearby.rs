use crate::{
    engine::{departures::Departure, headway::Headway},
    gtfs::Direction,
    repository::Stop,
    shared::geo::{Coordinate, Distance},
};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// Stops this close to a displayed stop are shown with it, usually the
/// opposite corner of the same intersection.
pub const COMPANION_RADIUS: Distance = Distance::from_meters(50.0);
/// Departures shown per route and direction.
pub const DEPARTURES_PER_GROUP: usize = 3;

// (half width in meters, store fan-out, display limit)
const TIERS: [(f64, usize, usize); 6] = [
    (450.0, 15, 10),
    (900.0, 40, 25),
    (1800.0, 80, 50),
    (3600.0, 150, 100),
    (7200.0, 300, 200),
    (14400.0, 500, 300),
];

/// One step in the widening sequence of search boxes. Wider boxes fan out to
/// more candidates because stops get sparser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RadiusTier(usize);

impl Default for RadiusTier {
    fn default() -> Self {
        Self::first()
    }
}

impl RadiusTier {
    pub const fn first() -> Self {
        Self(0)
    }

    /// The narrowest tier at least `meters` wide. Anything wider than the
    /// last tier snaps to it.
    pub fn from_meters(meters: f64) -> Self {
        let index = TIERS
            .iter()
            .position(|(half_width, _, _)| *half_width >= meters)
            .unwrap_or(TIERS.len() - 1);
        Self(index)
    }

    pub fn next(self) -> Option<Self> {
        (self.0 + 1 < TIERS.len()).then_some(Self(self.0 + 1))
    }

    pub fn half_width(self) -> Distance {
        Distance::from_meters(TIERS[self.0].0)
    }

    pub fn fan_out(self) -> usize {
        TIERS[self.0].1
    }

    pub fn display_limit(self) -> usize {
        TIERS[self.0].2
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedStop {
    pub stop: Stop,
    pub distance: Distance,
    pub walk_distance: Distance,
}

/// Orders store candidates by true distance from `origin`.
pub fn rank(origin: &Coordinate, candidates: Vec<Stop>) -> Vec<RankedStop> {
    let mut ranked: Vec<RankedStop> = candidates
        .into_par_iter()
        .map(|stop| RankedStop {
            distance: origin.great_circle_distance(&stop.coordinate),
            walk_distance: origin.grid_distance(&stop.coordinate),
            stop,
        })
        .collect();
    ranked.par_sort_by(|a, b| {
        a.distance
            .total_cmp(&b.distance)
            .then_with(|| a.stop.id.cmp(&b.stop.id))
    });
    ranked
}

/// The first `display_limit` stops, followed by any other candidate within
/// `radius` of one of them.
pub fn with_companions(
    ranked: Vec<RankedStop>,
    display_limit: usize,
    radius: Distance,
) -> Vec<RankedStop> {
    let split = display_limit.min(ranked.len());
    let mut ranked = ranked;
    let rest = ranked.split_off(split);
    let companions: Vec<RankedStop> = rest
        .into_iter()
        .filter(|candidate| {
            ranked.iter().any(|primary| {
                primary
                    .stop
                    .coordinate
                    .great_circle_distance(&candidate.stop.coordinate)
                    <= radius
            })
        })
        .collect();
    ranked.extend(companions);
    ranked
}

/// Departures of one route in one direction from a single stop.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DepartureGroup {
    pub route_id: String,
    pub route_label: String,
    pub route_color: Option<String>,
    pub route_text_color: Option<String>,
    pub direction: Option<Direction>,
    pub direction_text: Option<String>,
    pub headsign: Option<String>,
    pub departures: Vec<Departure>,
}

impl DepartureGroup {
    fn start(departure: Departure) -> Self {
        Self {
            route_id: departure.route_id.clone(),
            route_label: departure.route_label.clone(),
            route_color: departure.route_color.clone(),
            route_text_color: departure.route_text_color.clone(),
            direction: departure.direction,
            direction_text: departure.direction_text.clone(),
            headsign: departure.headsign.clone(),
            departures: vec![departure],
        }
    }

    pub fn key(&self) -> (&str, Option<Direction>) {
        (&self.route_id, self.direction)
    }

    pub fn next(&self) -> Option<&Departure> {
        self.departures.first()
    }

    /// Minutes until the next departure; groups are never empty.
    pub fn minutes_away(&self) -> u32 {
        self.next().map_or(u32::MAX, |departure| departure.minutes_away)
    }
}

/// Groups by (route, direction) in order of first appearance, keeping at
/// most `per_group` departures each.
pub fn group_departures(departures: Vec<Departure>, per_group: usize) -> Vec<DepartureGroup> {
    let mut index: HashMap<(String, Option<Direction>), usize> = HashMap::new();
    let mut groups: Vec<DepartureGroup> = Vec::new();
    for departure in departures {
        let key = (departure.route_id.clone(), departure.direction);
        match index.get(&key) {
            Some(&i) => {
                if groups[i].departures.len() < per_group {
                    groups[i].departures.push(departure);
                }
            }
            None => {
                index.insert(key, groups.len());
                groups.push(DepartureGroup::start(departure));
            }
        }
    }
    groups
}

/// A route and direction as seen from the nearest stop serving it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteRow {
    pub stop: RankedStop,
    pub group: DepartureGroup,
    pub headway: Option<Headway>,
    /// The opposite direction, usually across the street.
    pub alternate: Option<Box<RouteRow>>,
}

/// Builds one row per (route, direction). Stops are visited in the order
/// given, so each row belongs to the first stop with a departure for it.
pub fn group_by_route(stops: Vec<(RankedStop, Vec<Departure>)>, per_group: usize) -> Vec<RouteRow> {
    let mut seen: HashSet<(String, Option<Direction>)> = HashSet::new();
    let mut rows = Vec::new();
    for (stop, departures) in stops {
        for group in group_departures(departures, per_group) {
            if seen.insert((group.route_id.clone(), group.direction)) {
                rows.push(RouteRow {
                    stop: stop.clone(),
                    group,
                    headway: None,
                    alternate: None,
                });
            }
        }
    }
    rows
}

/// Folds each row's opposite direction into it as an alternate.
///
/// Rows are paired first match wins: the first unpaired row with the same
/// route and a different direction. The sooner departure stays primary and
/// the other row leaves the list. A loop route with more than two
/// directions at one place keeps its extra rows unpaired.
pub fn pair_opposite_directions(rows: Vec<RouteRow>) -> Vec<RouteRow> {
    let mut slots: Vec<Option<RouteRow>> = rows.into_iter().map(Some).collect();
    let mut paired = vec![false; slots.len()];

    for i in 0..slots.len() {
        if paired[i] {
            continue;
        }
        let Some(row) = slots[i].as_ref() else {
            continue;
        };
        let (route_id, direction) = (row.group.route_id.clone(), row.group.direction);
        let partner = (0..slots.len()).find(|&j| {
            j != i
                && !paired[j]
                && slots[j].as_ref().is_some_and(|other| {
                    other.group.route_id == route_id && other.group.direction != direction
                })
        });
        let Some(j) = partner else {
            continue;
        };

        let minutes = |k: usize| slots[k].as_ref().map_or(u32::MAX, |row| row.group.minutes_away());
        let (primary, alternate) = if minutes(j) < minutes(i) { (j, i) } else { (i, j) };
        let alternate_row = slots[alternate].take();
        if let Some(row) = slots[primary].as_mut() {
            row.alternate = alternate_row.map(Box::new);
        }
        paired[primary] = true;
        paired[alternate] = true;
    }

    slots.into_iter().flatten().collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub has_more: bool,
}

pub fn paginate<T>(items: Vec<T>, offset: usize, limit: usize) -> Page<T> {
    if offset >= items.len() {
        return Page {
            items: Vec::new(),
            has_more: false,
        };
    }
    let has_more = offset.saturating_add(limit) < items.len();
    Page {
        items: items.into_iter().skip(offset).take(limit).collect(),
        has_more,
    }
}

/// A stop with everything departing from it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StopView {
    pub stop: RankedStop,
    /// Which side of the street, only set when the name alone is ambiguous.
    pub side: Option<String>,
    pub groups: Vec<DepartureGroup>,
}

impl StopView {
    pub fn new(stop: RankedStop, departures: Vec<Departure>) -> Self {
        Self {
            stop,
            side: None,
            groups: group_departures(departures, DEPARTURES_PER_GROUP),
        }
    }
}

/// Adds a side description to stops whose names repeat in `views`.
pub fn label_duplicate_names(views: &mut [StopView]) {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for view in views.iter() {
        *counts.entry(view.stop.stop.name.clone()).or_default() += 1;
    }
    for view in views.iter_mut() {
        if counts.get(&view.stop.stop.name).is_some_and(|count| *count > 1) {
            view.side = view.stop.stop.desc.as_deref().and_then(describe_side);
        }
    }
}

/// "Main St & 5th Ave NB" → "Northbound side". Descriptions without a
/// trailing compass token are returned as is.
pub fn describe_side(desc: &str) -> Option<String> {
    let desc = desc.trim();
    let side = match desc.split_whitespace().last()? {
        "N" | "NB" => "Northbound side",
        "S" | "SB" => "Southbound side",
        "E" | "EB" => "Eastbound side",
        "W" | "WB" => "Westbound side",
        _ => return Some(desc.to_string()),
    };
    Some(side.to_string())
}
