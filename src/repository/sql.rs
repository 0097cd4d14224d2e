use crate::{gtfs::Direction, shared::Time};
use chrono::{NaiveDate, Weekday};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};

/// Stored as zero-padded `HH:MM:SS` so text order is chronological.
impl ToSql for Time {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.to_hms_string()))
    }
}

impl FromSql for Time {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        Time::from_hms(value.as_str()?).ok_or(FromSqlError::InvalidType)
    }
}

impl ToSql for Direction {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(i64::from(self.id())))
    }
}

impl FromSql for Direction {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let id = value.as_i64()?;
        u8::try_from(id)
            .ok()
            .and_then(Direction::from_id)
            .ok_or(FromSqlError::OutOfRange(id))
    }
}

/// `YYYYMMDD`, the feed's own date format, which also sorts correctly.
pub(crate) fn date_key(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

pub(crate) fn weekday_column(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "monday",
        Weekday::Tue => "tuesday",
        Weekday::Wed => "wednesday",
        Weekday::Thu => "thursday",
        Weekday::Fri => "friday",
        Weekday::Sat => "saturday",
        Weekday::Sun => "sunday",
    }
}

/// Services running on `:date`: the weekly pattern minus removals, plus
/// additions.
pub(crate) fn active_services(weekday: Weekday) -> String {
    format!(
        "WITH active(service_id) AS (
            SELECT service_id FROM calendar
            WHERE {day} = 1 AND start_date <= :date AND end_date >= :date
              AND service_id NOT IN (
                  SELECT service_id FROM calendar_dates
                  WHERE date = :date AND exception_type = 2)
            UNION
            SELECT service_id FROM calendar_dates
            WHERE date = :date AND exception_type = 1
        )",
        day = weekday_column(weekday)
    )
}

#[test]
fn date_keys_sort_like_dates() {
    let early = NaiveDate::from_ymd_opt(2024, 9, 30).unwrap();
    let late = NaiveDate::from_ymd_opt(2024, 10, 1).unwrap();
    assert_eq!(date_key(early), "20240930");
    assert!(date_key(early) < date_key(late));
}
