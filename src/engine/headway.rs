use crate::shared::time::Time;
use serde::Serialize;
use std::fmt::Display;

/// Gaps within this many minutes of each other belong to the same pattern.
pub const GAP_TOLERANCE: u32 = 2;
const MIN_DEPARTURES: usize = 3;
const MIN_GAPS: usize = 3;

/// A regular service interval, e.g. "Every 20 min until 8:00 PM".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Headway {
    pub minutes: u32,
    pub until: Time,
}

impl Display for Headway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Every {} min until {}",
            self.minutes,
            self.until.to_clock_string()
        )
    }
}

/// Finds the longest run of consistent gaps among the departures at or after
/// `now`. Only the current regime is reported, so a rush hour pattern is not
/// averaged into the midday one.
///
/// `times` must be ascending, as the store returns them.
pub fn detect_headway(times: &[Time], now: Time) -> Option<Headway> {
    let upcoming: Vec<Time> = times.iter().copied().filter(|time| *time >= now).collect();
    if upcoming.len() < MIN_DEPARTURES {
        return None;
    }

    // (gap in minutes, departure the gap starts from); duplicates are dropped
    let gaps: Vec<(u32, Time)> = upcoming
        .windows(2)
        .filter_map(|pair| {
            let minutes = (pair[1] - pair[0]).as_minutes();
            (minutes > 0).then_some((minutes, pair[0]))
        })
        .collect();

    let mut best = 0..0;
    let mut start = 0;
    while start < gaps.len() {
        let (mut low, mut high) = (gaps[start].0, gaps[start].0);
        let mut end = start + 1;
        while end < gaps.len() {
            let gap = gaps[end].0;
            if gap.max(high) - gap.min(low) > GAP_TOLERANCE {
                break;
            }
            low = low.min(gap);
            high = high.max(gap);
            end += 1;
        }
        if end - start > best.len() {
            best = start..end;
        }
        start += 1;
    }

    if best.len() < MIN_GAPS {
        return None;
    }
    let run = &gaps[best];
    let average = run.iter().map(|(minutes, _)| minutes).sum::<u32>() / run.len() as u32;
    let minutes = match (average + 2) / 5 * 5 {
        0 => average,
        rounded => rounded,
    };
    let until = run.last().map(|(_, from)| *from)?;
    Some(Headway { minutes, until })
}
