use crate::{
    departures::{self, DepartureService, NEARBY_LIMIT},
    realtime::Predictions,
};
use chrono::DateTime;
use chrono_tz::Tz;
use futures_util::{StreamExt, stream};
use headway::{
    engine::nearby::{
        COMPANION_RADIUS, DEPARTURES_PER_GROUP, group_by_route, label_duplicate_names, paginate,
        pair_opposite_directions, rank, with_companions,
    },
    prelude::*,
};
use serde::Deserialize;
use std::{str::FromStr, sync::Arc};
use tokio::task::spawn_blocking;
use tracing::debug;

/// Per-stop departure fetches in flight at once.
const CONCURRENT_STOPS: usize = 8;
pub const DEFAULT_PAGE_SIZE: usize = 5;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum View {
    #[default]
    Routes,
    Stops,
}

impl FromStr for View {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "routes" => Ok(Self::Routes),
            "stops" => Ok(Self::Stops),
            other => Err(format!("Unknown view '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NearbyItems {
    Routes(Vec<RouteRow>),
    Stops(Vec<StopView>),
}

impl NearbyItems {
    pub fn len(&self) -> usize {
        match self {
            Self::Routes(rows) => rows.len(),
            Self::Stops(views) => views.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Where the next page starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Continuation {
    pub offset: usize,
    pub tier: RadiusTier,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NearbyPage {
    pub items: NearbyItems,
    pub has_more: bool,
    /// The tier the items came from, after any escalation.
    pub tier: RadiusTier,
    pub next: Option<Continuation>,
}

pub struct NearbyService<P> {
    departures: Arc<DepartureService<P>>,
}

impl<P: Predictions> NearbyService<P> {
    pub fn new(departures: Arc<DepartureService<P>>) -> Self {
        Self { departures }
    }

    /// One page of nearby results, widening the search box until something
    /// turns up or the widest tier has been tried.
    ///
    /// `offset` counts items already shown across every tier; a wider box
    /// ranks the nearer stops first, so it carries over unchanged.
    pub async fn search(
        &self,
        point: Coordinate,
        view: View,
        offset: usize,
        limit: usize,
        tier: RadiusTier,
        now: &DateTime<Tz>,
    ) -> Result<NearbyPage, departures::Error> {
        let mut tier = tier;
        let (items, has_more) = loop {
            let (items, has_more) = self.page(&point, view, offset, limit, tier, now).await?;
            if items.is_empty() && !has_more {
                if let Some(wider) = tier.next() {
                    debug!("Nothing within {:?}, widening", tier.half_width());
                    tier = wider;
                    continue;
                }
            }
            break (items, has_more);
        };

        let shown = offset + items.len();
        let next = if has_more {
            Some(Continuation {
                offset: shown,
                tier,
            })
        } else if shown > 0 {
            tier.next().map(|wider| Continuation {
                offset: shown,
                tier: wider,
            })
        } else {
            None
        };
        Ok(NearbyPage {
            items,
            has_more,
            tier,
            next,
        })
    }

    async fn page(
        &self,
        point: &Coordinate,
        view: View,
        offset: usize,
        limit: usize,
        tier: RadiusTier,
        now: &DateTime<Tz>,
    ) -> Result<(NearbyItems, bool), departures::Error> {
        let candidates = self.candidates(point, tier).await?;
        match view {
            View::Routes => {
                let stops = with_companions(candidates, tier.display_limit(), COMPANION_RADIUS);
                let with_departures = self.fetch_all(stops, now).await?;
                let mut rows = group_by_route(with_departures, DEPARTURES_PER_GROUP);
                self.attach_headways(&mut rows, now).await;
                let page = paginate(pair_opposite_directions(rows), offset, limit);
                Ok((NearbyItems::Routes(page.items), page.has_more))
            }
            View::Stops => {
                let page = paginate(candidates, offset, limit);
                let with_departures = self.fetch_all(page.items, now).await?;
                let mut views: Vec<StopView> = with_departures
                    .into_iter()
                    .map(|(stop, departures)| StopView::new(stop, departures))
                    .collect();
                label_duplicate_names(&mut views);
                Ok((NearbyItems::Stops(views), page.has_more))
            }
        }
    }

    async fn candidates(
        &self,
        point: &Coordinate,
        tier: RadiusTier,
    ) -> Result<Vec<RankedStop>, departures::Error> {
        let repository = self.departures.repository().clone();
        let origin = *point;
        let stops = spawn_blocking(move || {
            repository.nearby_stops(&origin, &origin.bounding_box(tier.half_width()), tier.fan_out())
        })
        .await??;
        Ok(rank(point, stops))
    }

    /// Merged departures for every stop, in the order given.
    async fn fetch_all(
        &self,
        stops: Vec<RankedStop>,
        now: &DateTime<Tz>,
    ) -> Result<Vec<(RankedStop, Vec<Departure>)>, departures::Error> {
        let fetched: Vec<_> = stream::iter(stops.into_iter().enumerate())
            .map(|(index, stop)| async move {
                let found = self
                    .departures
                    .for_stop(&stop.stop.id, now, NEARBY_LIMIT)
                    .await;
                (index, stop, found)
            })
            .buffer_unordered(CONCURRENT_STOPS)
            .collect()
            .await;

        let mut ordered = Vec::with_capacity(fetched.len());
        for (index, stop, found) in fetched {
            ordered.push((index, stop, found?.departures));
        }
        ordered.sort_by_key(|(index, _, _)| *index);
        Ok(ordered
            .into_iter()
            .map(|(_, stop, departures)| (stop, departures))
            .collect())
    }

    async fn attach_headways(&self, rows: &mut [RouteRow], now: &DateTime<Tz>) {
        let keys = rows
            .iter()
            .map(|row| {
                (
                    row.stop.stop.id.clone(),
                    row.group.route_id.clone(),
                    row.group.direction,
                )
            })
            .collect();
        let mut headways = self.departures.headways(keys, now).await;
        for row in rows.iter_mut() {
            let key = (
                row.stop.stop.id.clone(),
                row.group.route_id.clone(),
                row.group.direction,
            );
            row.headway = headways.remove(&key).flatten();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        departures::tests::{FakePredictions, service},
        testing::{self, FRANKLIN, LAKE_HIAWATHA},
    };

    fn nearby(label: &str) -> NearbyService<FakePredictions> {
        NearbyService::new(Arc::new(service(label, FakePredictions::default())))
    }

    fn point((latitude, longitude): (f64, f64)) -> Coordinate {
        Coordinate::new(latitude, longitude)
    }

    fn routes(page: &NearbyPage) -> &[RouteRow] {
        match &page.items {
            NearbyItems::Routes(rows) => rows,
            NearbyItems::Stops(_) => panic!("expected routes"),
        }
    }

    #[tokio::test]
    async fn opposite_corners_pair_into_one_row() {
        let service = nearby("nearby-pair");
        let page = service
            .search(
                point(LAKE_HIAWATHA),
                View::Routes,
                0,
                DEFAULT_PAGE_SIZE,
                RadiusTier::first(),
                &testing::monday_at(7, 0),
            )
            .await
            .unwrap();
        assert_eq!(page.tier, RadiusTier::first());
        assert!(!page.has_more);

        let rows = routes(&page);
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.stop.stop.id, "a1");
        assert_eq!(row.group.direction, Some(Direction::Outbound));
        assert_eq!(row.group.departures.len(), 3);
        assert_eq!(row.headway.map(|headway| headway.minutes), Some(15));

        let alternate = row.alternate.as_ref().unwrap();
        assert_eq!(alternate.stop.stop.id, "a2");
        assert_eq!(alternate.group.direction, Some(Direction::Inbound));
        assert_eq!(alternate.group.minutes_away(), 5);

        // Something was shown, so the caller may widen next.
        assert_eq!(
            page.next,
            Some(Continuation {
                offset: 1,
                tier: RadiusTier::first().next().unwrap()
            })
        );
    }

    #[tokio::test]
    async fn empty_tier_escalates() {
        let service = nearby("nearby-escalate");
        // About 900 m north of Lake & Hiawatha, nothing within the first tier.
        let page = service
            .search(
                point((44.9560, -93.2390)),
                View::Routes,
                0,
                DEFAULT_PAGE_SIZE,
                RadiusTier::first(),
                &testing::monday_at(7, 0),
            )
            .await
            .unwrap();
        assert_eq!(page.tier, RadiusTier::from_meters(900.0));
        assert!(!page.items.is_empty());
    }

    #[tokio::test]
    async fn more_rows_continue_in_the_same_tier() {
        let service = nearby("nearby-more");
        let tier = RadiusTier::from_meters(1800.0);
        let now = testing::monday_at(7, 0);
        let page = service
            .search(point(FRANKLIN), View::Routes, 0, 1, tier, &now)
            .await
            .unwrap();
        assert!(page.has_more);
        // Route 21 eastbound at Franklin, paired with westbound at Lake St.
        let first = &routes(&page)[0];
        assert_eq!(first.group.route_id, "21");
        assert_eq!(first.stop.stop.id, "f1");
        assert_eq!(first.alternate.as_ref().unwrap().stop.stop.id, "a1");
        assert_eq!(page.next, Some(Continuation { offset: 1, tier }));

        let page = service
            .search(point(FRANKLIN), View::Routes, 1, 1, tier, &now)
            .await
            .unwrap();
        assert!(!page.has_more);
        assert_eq!(routes(&page)[0].group.route_id, "901");
    }

    #[tokio::test]
    async fn stops_view_names_the_side_of_the_street() {
        let service = nearby("nearby-stops");
        let page = service
            .search(
                point(LAKE_HIAWATHA),
                View::Stops,
                0,
                DEFAULT_PAGE_SIZE,
                RadiusTier::first(),
                &testing::monday_at(7, 0),
            )
            .await
            .unwrap();
        let NearbyItems::Stops(views) = &page.items else {
            panic!("expected stops");
        };
        let sides: Vec<_> = views
            .iter()
            .map(|view| (view.stop.stop.id.as_str(), view.side.as_deref()))
            .collect();
        assert_eq!(
            sides,
            [("a1", Some("Westbound side")), ("a2", Some("Eastbound side"))]
        );
        assert_eq!(views[0].groups[0].departures.len(), 3);
    }

    #[test]
    fn view_parses_from_query_text() {
        assert_eq!("stops".parse::<View>(), Ok(View::Stops));
        assert_eq!("routes".parse::<View>(), Ok(View::Routes));
        assert!("map".parse::<View>().is_err());
    }
}
