//! Averages time series over representative periods: each of the 96 daily slots of each month.
use crate::time_series::{SLOTS_PER_DAY, slot_of};
use chrono::{Datelike, NaiveDateTime};
use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;

/// One 15-minute slot of the day within one month of the year
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct RepresentativePeriod {
    /// Month of the year (1 to 12)
    pub month: u32,
    /// Slot of the day (0 to 95)
    pub slot: usize,
}

impl RepresentativePeriod {
    /// The representative period that the given time falls in
    pub fn of(ts: &NaiveDateTime) -> Self {
        Self {
            month: ts.month(),
            slot: slot_of(ts),
        }
    }

    /// Whether this is the last slot of the day
    pub fn is_end_of_day(&self) -> bool {
        self.slot + 1 == SLOTS_PER_DAY
    }
}

impl fmt::Display for RepresentativePeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "month {} slot {}", self.month, self.slot)
    }
}

/// Mean values for each representative period, ordered by month then slot
pub type SlotProfile = IndexMap<RepresentativePeriod, f64>;

/// Average the values falling in each representative period.
///
/// Periods with no values are absent from the result.
pub fn monthly_slot_profile<I>(values: I) -> SlotProfile
where
    I: IntoIterator<Item = (NaiveDateTime, f64)>,
{
    let mut totals: IndexMap<RepresentativePeriod, (f64, u32)> = IndexMap::new();
    for (ts, value) in values {
        let (sum, count) = totals.entry(RepresentativePeriod::of(&ts)).or_default();
        *sum += value;
        *count += 1;
    }
    totals.sort_keys();

    totals
        .into_iter()
        .map(|(period, (sum, count))| (period, sum / f64::from(count)))
        .collect()
}
