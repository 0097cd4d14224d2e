use super::{GroupDto, StopDto};
use crate::nearby::{NearbyItems, NearbyPage, View};
use headway::prelude::*;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct RouteRowDto {
    pub stop: StopDto,
    pub distance_m: f64,
    pub walk_distance_m: f64,
    #[serde(flatten)]
    pub group: GroupDto,
    pub alternate: Option<Box<RouteRowDto>>,
}

impl RouteRowDto {
    pub fn from(row: &RouteRow) -> Self {
        Self {
            stop: StopDto::from(&row.stop.stop),
            distance_m: row.stop.distance.as_meters(),
            walk_distance_m: row.stop.walk_distance.as_meters(),
            group: GroupDto::from(&row.group, row.headway.as_ref()),
            alternate: row.alternate.as_deref().map(|alternate| Box::new(Self::from(alternate))),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StopViewDto {
    pub stop: StopDto,
    pub distance_m: f64,
    pub walk_distance_m: f64,
    pub side: Option<String>,
    pub groups: Vec<GroupDto>,
}

impl StopViewDto {
    pub fn from(view: &StopView) -> Self {
        Self {
            stop: StopDto::from(&view.stop.stop),
            distance_m: view.stop.distance.as_meters(),
            walk_distance_m: view.stop.walk_distance.as_meters(),
            side: view.side.clone(),
            groups: view.groups.iter().map(|group| GroupDto::from(group, None)).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum NearbyItemsDto {
    Routes(Vec<RouteRowDto>),
    Stops(Vec<StopViewDto>),
}

#[derive(Debug, Clone, Serialize)]
pub struct NextPageDto {
    pub offset: usize,
    pub radius: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct NearbyDto {
    pub view: &'static str,
    pub radius: f64,
    pub has_more: bool,
    pub next: Option<NextPageDto>,
    pub items: NearbyItemsDto,
}

impl NearbyDto {
    pub fn from(view: View, page: &NearbyPage) -> Self {
        let items = match &page.items {
            NearbyItems::Routes(rows) => {
                NearbyItemsDto::Routes(rows.iter().map(RouteRowDto::from).collect())
            }
            NearbyItems::Stops(views) => {
                NearbyItemsDto::Stops(views.iter().map(StopViewDto::from).collect())
            }
        };
        Self {
            view: match view {
                View::Routes => "routes",
                View::Stops => "stops",
            },
            radius: page.tier.half_width().as_meters(),
            has_more: page.has_more,
            next: page.next.map(|next| NextPageDto {
                offset: next.offset,
                radius: next.tier.half_width().as_meters(),
            }),
            items,
        }
    }
}
