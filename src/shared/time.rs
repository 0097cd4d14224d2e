use std::{
    fmt::Display,
    ops::{Add, AddAssign, Sub},
};

use chrono::Timelike;
use serde::{Deserialize, Serialize};

const HOUR_TO_SEC: u32 = 60 * 60;
const MINUTE_TO_SEC: u32 = 60;

/// Seconds since the start of a service day. Trips running past midnight
/// keep counting, so `25:30:00` is half past one on the following morning.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Time(u32);

impl From<u32> for Time {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl Sub<Time> for Time {
    type Output = Duration;

    fn sub(self, rhs: Self) -> Self::Output {
        Duration(self.0.saturating_sub(rhs.0))
    }
}

impl Add<Duration> for Time {
    type Output = Self;

    fn add(self, rhs: Duration) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl AddAssign<Duration> for Time {
    fn add_assign(&mut self, rhs: Duration) {
        self.0 += rhs.0
    }
}

impl Display for Time {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hms_string())
    }
}

impl Time {
    /// Wall-clock time of day as a service time on the same day.
    pub fn of_day<T: Timelike>(time: &T) -> Self {
        Self(time.num_seconds_from_midnight())
    }

    pub const fn from_seconds(secs: u32) -> Self {
        Self(secs)
    }

    pub const fn as_seconds(&self) -> u32 {
        self.0
    }

    pub const fn hours(&self) -> u32 {
        self.0 / HOUR_TO_SEC
    }

    pub const fn minutes(&self) -> u32 {
        (self.0 % HOUR_TO_SEC) / MINUTE_TO_SEC
    }

    /// Always at least two hour digits, so the text sorts the same way the
    /// times do.
    pub fn to_hms_string(&self) -> String {
        let h = self.0 / HOUR_TO_SEC;
        let m = (self.0 % HOUR_TO_SEC) / MINUTE_TO_SEC;
        let s = self.0 % MINUTE_TO_SEC;
        format!("{:02}:{:02}:{:02}", h, m, s)
    }

    /// 12-hour clock, wrapping past midnight: `25:30:00` is `1:30 AM`.
    pub fn to_clock_string(&self) -> String {
        let hour = self.hours() % 24;
        let period = if hour < 12 { "AM" } else { "PM" };
        let hour = match hour % 12 {
            0 => 12,
            h => h,
        };
        format!("{}:{:02} {}", hour, self.minutes(), period)
    }

    pub fn from_hms(time: &str) -> Option<Self> {
        let mut split = time.trim().split(':');
        let hours: u32 = split.next()?.parse().ok()?;
        let minutes: u32 = split.next()?.parse().ok()?;
        let seconds: u32 = split.next()?.parse().ok()?;
        if split.next().is_some() || minutes >= 60 || seconds >= 60 {
            return None;
        }
        hours
            .checked_mul(HOUR_TO_SEC)?
            .checked_add(minutes * MINUTE_TO_SEC + seconds)
            .map(Self)
    }

    /// Whole minutes from `now` until this time, never negative.
    pub fn minutes_until(&self, now: Time) -> u32 {
        self.0.saturating_sub(now.0) / MINUTE_TO_SEC
    }
}

#[test]
fn rejects_hours_past_u32_seconds() {
    assert_eq!(Time::from_hms("2000000:00:00"), None);
    assert!(Time::from_hms("1193046:28:15").is_some());
    assert_eq!(Time::from_hms("1193046:28:16"), None);
}

#[test]
fn parse_unparse() {
    for time in ["00:00:00", "00:00:30", "00:30:00", "12:00:00", "12:30:30", "25:10:00"] {
        let stime = Time::from_hms(time).unwrap();
        assert_eq!(time, stime.to_hms_string())
    }
}

#[test]
fn single_digit_hours_are_padded() {
    let time = Time::from_hms("8:05:00").unwrap();
    assert_eq!(time.to_hms_string(), "08:05:00");
}

#[test]
fn valid_time_test() {
    assert_eq!(Time::from_hms("00:00:30").unwrap().as_seconds(), 30);
    assert_eq!(Time::from_hms("00:01:30").unwrap().as_seconds(), 90);
    assert_eq!(Time::from_hms("01:01:30").unwrap().as_seconds(), 3690);
}

#[test]
fn invalid_time_test() {
    assert!(Time::from_hms("00:00:0a").is_none());
    assert!(Time::from_hms("00:00").is_none());
    assert!(Time::from_hms("10:61:00").is_none());
    assert!(Time::from_hms("10:00:00:00").is_none());
}

#[test]
fn minutes_until_floors_at_zero() {
    let now = Time::from_hms("14:00:00").unwrap();
    assert_eq!(Time::from_hms("25:00:00").unwrap().minutes_until(now), 660);
    assert_eq!(Time::from_hms("23:59:00").unwrap().minutes_until(now), 599);
    assert_eq!(Time::from_hms("13:00:00").unwrap().minutes_until(now), 0);
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Duration(u32);

impl From<u32> for Duration {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl Duration {
    pub const fn from_seconds(secs: u32) -> Self {
        Self(secs)
    }

    pub const fn from_minutes(minutes: u32) -> Self {
        Self(minutes * MINUTE_TO_SEC)
    }

    pub const fn from_hours(hours: u32) -> Self {
        Self(hours * HOUR_TO_SEC)
    }

    pub const fn as_seconds(&self) -> u32 {
        self.0
    }

    pub const fn as_minutes(&self) -> u32 {
        self.0 / MINUTE_TO_SEC
    }
}

impl Add for Duration {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}
