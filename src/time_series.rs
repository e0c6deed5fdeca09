//! Helpers for working with series of values on a 15-minute grid.
use anyhow::{Result, bail};
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use indexmap::IndexMap;

/// The number of 15-minute slots in a day
pub const SLOTS_PER_DAY: usize = 96;

/// The length of a slot in minutes
pub const MINUTES_PER_SLOT: u32 = 15;

/// The number of slots in an hour
pub const SLOTS_PER_HOUR: f64 = 4.0;

/// A series of values keyed by timestamp.
///
/// The entries are ordered (see [`IndexMap`]) and, once built by the functions in this module,
/// are always in chronological order.
pub type TimeSeries = IndexMap<NaiveDateTime, f64>;

/// Timestamp formats accepted in input files, tried in order
const TIMESTAMP_FORMATS: [&str; 7] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%d-%m-%Y %H:%M:%S",
    "%d-%m-%Y %H:%M",
    "%d/%m/%Y %H:%M",
];

/// Parse a timestamp in any of the formats found in input files
pub fn parse_timestamp(s: &str) -> Result<NaiveDateTime> {
    let s = s.trim();
    for format in TIMESTAMP_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(s, format) {
            return Ok(ts);
        }
    }

    bail!("Invalid timestamp: '{s}'")
}

/// Get the index of the 15-minute slot of the day that `ts` falls in (0 to 95)
pub fn slot_of(ts: &NaiveDateTime) -> usize {
    (ts.hour() * 60 / MINUTES_PER_SLOT + ts.minute() / MINUTES_PER_SLOT) as usize
}

/// Iterate over every 15-minute timestamp from `first` 00:00 to `last` 23:45 inclusive
pub fn interval_grid(first: NaiveDate, last: NaiveDate) -> impl Iterator<Item = NaiveDateTime> {
    let start = first.and_time(NaiveTime::MIN);
    let num_days = (last - first).num_days() + 1;
    let len = num_days.max(0) as usize * SLOTS_PER_DAY;
    (0..len).map(move |i| start + Duration::minutes(i as i64 * i64::from(MINUTES_PER_SLOT)))
}

/// Put a set of readings taken at arbitrary times onto a 15-minute grid.
///
/// The grid runs from 00:00 on the day of the earliest reading to 23:45 on the day of the latest.
/// Each grid point takes the value of the latest reading at or before it. Grid points before the
/// first reading are zero.
pub fn reindex_forward_fill(mut points: Vec<(NaiveDateTime, f64)>) -> TimeSeries {
    points.sort_by_key(|(ts, _)| *ts);
    let (Some(first), Some(last)) = (points.first(), points.last()) else {
        return TimeSeries::new();
    };

    let mut series = TimeSeries::new();
    let mut next = 0;
    let mut current = 0.0;
    for ts in interval_grid(first.0.date(), last.0.date()) {
        while next < points.len() && points[next].0 <= ts {
            current = points[next].1;
            next += 1;
        }
        series.insert(ts, current);
    }

    series
}

/// Move a timestamp into another year.
///
/// Returns `None` if the date does not exist in that year (i.e. 29 February).
pub fn with_year(ts: &NaiveDateTime, year: i32) -> Option<NaiveDateTime> {
    ts.with_year(year)
}

/// The number of days in the given month
pub fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    let first = NaiveDate::from_ymd_opt(year, month, 1).expect("Invalid month");
    let next = NaiveDate::from_ymd_opt(next_year, next_month, 1).expect("Invalid month");

    (next - first).num_days() as u32
}
