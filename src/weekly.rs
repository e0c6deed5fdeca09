//! Weekly statistics of demand and renewable output, used to flag weeks worth a closer look.
//!
//! This is diagnostic only: nothing downstream depends on it.
use crate::dataset::IntervalRecord;
use chrono::{Datelike, Duration, NaiveDate, NaiveTime, Timelike};
use indexmap::IndexMap;
use itertools::Itertools;
use log::info;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, IntoEnumIterator};

/// Statistics for one day
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DailyStats {
    /// Evening peak net demand less midday minimum net demand
    pub duck_magnitude: Option<f64>,
    /// Largest change in net demand between consecutive intervals
    pub max_ramp: Option<f64>,
}

/// Statistics for one week (Monday to Sunday)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyStats {
    /// The Monday the week starts on
    pub week_start: NaiveDate,
    /// Mean total demand (MW)
    pub avg_demand: f64,
    /// Mean renewable output (MW)
    pub avg_renewable: f64,
    /// Mean of the daily duck magnitudes
    pub avg_duck_magnitude: f64,
    /// Mean of the daily maximum ramps
    pub avg_max_ramp: f64,
    /// Sample standard deviation of net demand
    pub net_demand_std: f64,
}

/// The kinds of week that are flagged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, Serialize)]
pub enum WeekCategory {
    /// Demand and renewable output both in the top 10%
    #[strum(serialize = "High Demand & High RE")]
    #[serde(rename = "High Demand & High RE")]
    HighDemandHighRenewable,
    /// Demand in the top 10% and renewable output in the bottom 10%
    #[strum(serialize = "High Demand & Low RE")]
    #[serde(rename = "High Demand & Low RE")]
    HighDemandLowRenewable,
    /// Duck magnitude in the top 10%
    #[strum(serialize = "High Duck Curve")]
    #[serde(rename = "High Duck Curve")]
    HighDuckCurve,
    /// Ramping in the top 10%
    #[strum(serialize = "High Ramping Requirements")]
    #[serde(rename = "High Ramping Requirements")]
    HighRamping,
}

/// The weeks flagged under each category
pub type InterestingWeeks = IndexMap<WeekCategory, Vec<NaiveDate>>;

/// Whether the time falls within the given hours (start inclusive, end exclusive)
fn in_hours(time: NaiveTime, start_hour: u32, end_hour: u32) -> bool {
    (start_hour..end_hour).contains(&time.hour())
}

/// Calculate statistics for a single day's records.
///
/// The duck magnitude is the maximum net demand between 17:00 and 21:45 less the minimum between
/// 10:00 and 15:45. It is missing if either window has no records.
pub fn daily_stats(day: &[IntervalRecord]) -> DailyStats {
    let evening = day
        .iter()
        .filter(|r| in_hours(r.timestamp.time(), 17, 22))
        .map(|r| r.net_demand)
        .reduce(f64::max);
    let midday = day
        .iter()
        .filter(|r| in_hours(r.timestamp.time(), 10, 16))
        .map(|r| r.net_demand)
        .reduce(f64::min);
    let duck_magnitude = evening.zip(midday).map(|(peak, trough)| peak - trough);

    let max_ramp = day
        .iter()
        .tuple_windows()
        .map(|(a, b)| (b.net_demand - a.net_demand).abs())
        .reduce(f64::max);

    DailyStats {
        duck_magnitude,
        max_ramp,
    }
}

fn mean<I: IntoIterator<Item = f64>>(values: I) -> Option<f64> {
    let (sum, count) = values
        .into_iter()
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    (count > 0).then(|| sum / count as f64)
}

/// Sample standard deviation (one degree of freedom removed)
fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let mean = mean(values.iter().copied())?;
    let sum_sq: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
    Some((sum_sq / (values.len() - 1) as f64).sqrt())
}

/// Calculate a quantile with linear interpolation between the closest ranks
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let pos = q * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * (pos - lower as f64))
}

/// The Monday on or before the given day
fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

/// Calculate statistics for one week's records, or `None` if any is missing
fn week_stats(week: &[IntervalRecord]) -> Option<WeeklyStats> {
    let days: Vec<DailyStats> = week
        .chunk_by(|a, b| a.timestamp.date() == b.timestamp.date())
        .map(daily_stats)
        .collect();
    let net_demand: Vec<f64> = week.iter().map(|r| r.net_demand).collect();

    Some(WeeklyStats {
        week_start: week_start(week.first()?.timestamp.date()),
        avg_demand: mean(week.iter().map(|r| r.total_demand))?,
        avg_renewable: mean(week.iter().map(|r| r.renewable))?,
        avg_duck_magnitude: mean(days.iter().filter_map(|d| d.duck_magnitude))?,
        avg_max_ramp: mean(days.iter().filter_map(|d| d.max_ramp))?,
        net_demand_std: sample_std(&net_demand)?,
    })
}

/// Calculate statistics for each week of the records.
///
/// Records must be in chronological order. Weeks with any missing statistic are dropped.
pub fn weekly_stats(records: &[IntervalRecord]) -> Vec<WeeklyStats> {
    records
        .chunk_by(|a, b| week_start(a.timestamp.date()) == week_start(b.timestamp.date()))
        .filter_map(week_stats)
        .collect()
}

/// Flag the weeks whose statistics are unusually high or low.
///
/// "High" means above the 90th percentile across weeks and "low" below the 10th.
pub fn interesting_weeks(stats: &[WeeklyStats]) -> InterestingWeeks {
    let mut weeks: InterestingWeeks = WeekCategory::iter().map(|c| (c, Vec::new())).collect();
    let column = |f: fn(&WeeklyStats) -> f64| stats.iter().map(f).collect_vec();
    let demand = column(|s| s.avg_demand);
    let renewable = column(|s| s.avg_renewable);
    let duck = column(|s| s.avg_duck_magnitude);
    let ramp = column(|s| s.avg_max_ramp);
    let (Some(high_demand), Some(high_re), Some(low_re), Some(high_duck), Some(high_ramp)) = (
        quantile(&demand, 0.9),
        quantile(&renewable, 0.9),
        quantile(&renewable, 0.1),
        quantile(&duck, 0.9),
        quantile(&ramp, 0.9),
    ) else {
        return weeks;
    };

    for s in stats {
        let mut flag = |category| weeks[&category].push(s.week_start);
        if s.avg_demand > high_demand && s.avg_renewable > high_re {
            flag(WeekCategory::HighDemandHighRenewable);
        }
        if s.avg_demand > high_demand && s.avg_renewable < low_re {
            flag(WeekCategory::HighDemandLowRenewable);
        }
        if s.avg_duck_magnitude > high_duck {
            flag(WeekCategory::HighDuckCurve);
        }
        if s.avg_max_ramp > high_ramp {
            flag(WeekCategory::HighRamping);
        }
    }

    weeks
}

/// Pearson correlation coefficient of two equal-length series
pub fn correlation(x: &[f64], y: &[f64]) -> Option<f64> {
    let mean_x = mean(x.iter().copied())?;
    let mean_y = mean(y.iter().copied())?;
    let (mut cov, mut var_x, mut var_y) = (0.0, 0.0, 0.0);
    for (a, b) in x.iter().zip(y) {
        cov += (a - mean_x) * (b - mean_y);
        var_x += (a - mean_x).powi(2);
        var_y += (b - mean_y).powi(2);
    }
    let denominator = (var_x * var_y).sqrt();
    (denominator > 0.0).then(|| cov / denominator)
}

/// Log how strongly demand is correlated with renewable, solar and wind output
pub fn log_correlations(records: &[IntervalRecord]) {
    let column = |f: fn(&IntervalRecord) -> f64| records.iter().map(f).collect_vec();
    let demand = column(|r| r.total_demand);
    for (name, values) in [
        ("renewable", column(|r| r.renewable)),
        ("solar", column(|r| r.total_solar)),
        ("wind", column(|r| r.total_wind)),
    ] {
        match correlation(&demand, &values) {
            Some(r) => info!("Correlation of demand with {name} output: {r:.3}"),
            None => info!("Correlation of demand with {name} output is undefined"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time_series::{interval_grid, parse_timestamp};
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    /// One day of records with net demand given by `f(slot)`
    fn day_records(date: &str, f: impl Fn(usize) -> f64) -> Vec<IntervalRecord> {
        let day = parse_timestamp(&format!("{date} 00:00")).unwrap().date();
        interval_grid(day, day)
            .enumerate()
            .map(|(slot, timestamp)| IntervalRecord {
                timestamp,
                net_demand: f(slot),
                total_demand: f(slot),
                ..Default::default()
            })
            .collect()
    }

    #[test]
    fn test_daily_stats() {
        // 100 at midday, 300 at 18:00, 150 otherwise
        let day = day_records("2030-01-01", |slot| match slot {
            48 => 100.0,
            72 => 300.0,
            _ => 150.0,
        });
        let stats = daily_stats(&day);
        assert_approx_eq!(f64, stats.duck_magnitude.unwrap(), 200.0);
        assert_approx_eq!(f64, stats.max_ramp.unwrap(), 150.0);
    }

    #[test]
    fn test_duck_magnitude_missing_without_evening() {
        let day: Vec<_> = day_records("2030-01-01", |_| 100.0)
            .into_iter()
            .filter(|r| r.timestamp.hour() < 17)
            .collect();
        let stats = daily_stats(&day);
        assert_eq!(stats.duck_magnitude, None);
        assert!(stats.max_ramp.is_some());
    }

    #[rstest]
    #[case(0.5, 2.5)]
    #[case(0.9, 3.7)]
    #[case(0.1, 1.3)]
    #[case(1.0, 4.0)]
    fn test_quantile(#[case] q: f64, #[case] expected: f64) {
        assert_approx_eq!(f64, quantile(&[4.0, 1.0, 3.0, 2.0], q).unwrap(), expected);
    }

    #[test]
    fn test_sample_std() {
        assert_approx_eq!(f64, sample_std(&[1.0, 2.0, 3.0, 4.0]).unwrap(), 1.290_994_448_735_805_6);
        assert_eq!(sample_std(&[1.0]), None);
    }

    #[test]
    fn test_weekly_stats() {
        // 2030-01-06 is a Sunday and 2030-01-07 a Monday
        let mut records = day_records("2030-01-06", |slot| slot as f64);
        records.extend(day_records("2030-01-07", |slot| 2.0 * slot as f64));
        let stats = weekly_stats(&records);

        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].week_start, NaiveDate::from_ymd_opt(2029, 12, 31).unwrap());
        assert_eq!(stats[1].week_start, NaiveDate::from_ymd_opt(2030, 1, 7).unwrap());
        assert_approx_eq!(f64, stats[0].avg_demand, 47.5);
        assert_approx_eq!(f64, stats[1].avg_max_ramp, 2.0);
    }

    #[test]
    fn test_weekly_stats_drops_incomplete_weeks() {
        // A single midday record: no evening window, no ramp and no standard deviation
        let records: Vec<_> = day_records("2030-01-07", |_| 1.0)
            .into_iter()
            .filter(|r| r.timestamp.hour() == 12 && r.timestamp.minute() == 0)
            .collect();
        assert!(weekly_stats(&records).is_empty());
    }

    #[test]
    fn test_interesting_weeks() {
        let stats: Vec<WeeklyStats> = (0..10)
            .map(|i| WeeklyStats {
                week_start: NaiveDate::from_ymd_opt(2030, 1, 7).unwrap() + Duration::weeks(i),
                avg_demand: i as f64,
                avg_renewable: i as f64,
                avg_duck_magnitude: 0.0,
                avg_max_ramp: (9 - i) as f64,
                net_demand_std: 1.0,
            })
            .collect();
        let weeks = interesting_weeks(&stats);

        assert_eq!(
            weeks[&WeekCategory::HighDemandHighRenewable],
            [stats[9].week_start]
        );
        assert!(weeks[&WeekCategory::HighDemandLowRenewable].is_empty());
        assert!(weeks[&WeekCategory::HighDuckCurve].is_empty());
        assert_eq!(weeks[&WeekCategory::HighRamping], [stats[0].week_start]);
    }

    #[test]
    fn test_correlation() {
        let x = [1.0, 2.0, 3.0];
        assert_approx_eq!(f64, correlation(&x, &[2.0, 4.0, 6.0]).unwrap(), 1.0);
        assert_approx_eq!(f64, correlation(&x, &[3.0, 2.0, 1.0]).unwrap(), -1.0);
        assert_eq!(correlation(&x, &[1.0, 1.0, 1.0]), None);
    }
}
