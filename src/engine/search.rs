use crate::{repository::StopMatch, shared::geo::Distance};

/// Matches closer than this are one place to a rider.
pub const CLUSTER_RADIUS: Distance = Distance::from_meters(500.0);

/// Merges matches within `radius` of an existing cluster.
///
/// Clusters keep the name of their first match and move to the running
/// centroid of their members, so input order decides both.
pub fn cluster_matches(matches: Vec<StopMatch>, radius: Distance) -> Vec<StopMatch> {
    let mut clusters: Vec<(StopMatch, usize)> = Vec::new();
    for candidate in matches {
        let existing = clusters.iter_mut().find(|(cluster, _)| {
            cluster
                .coordinate
                .great_circle_distance(&candidate.coordinate)
                <= radius
        });
        match existing {
            Some((cluster, members)) => {
                let n = *members as f64;
                let centroid = &mut cluster.coordinate;
                centroid.latitude = (centroid.latitude * n + candidate.coordinate.latitude) / (n + 1.0);
                centroid.longitude =
                    (centroid.longitude * n + candidate.coordinate.longitude) / (n + 1.0);
                *members += 1;
            }
            None => clusters.push((candidate, 1)),
        }
    }
    clusters.into_iter().map(|(cluster, _)| cluster).collect()
}
