//! Puts the demand and renewable series onto a common 15-minute grid for the target year.
use crate::error::PlanningError;
use crate::input::demand::DemandRecord;
use crate::model::Model;
use crate::model::Readings;
use crate::model::parameters::{DateRange, DemandParameters, WindSourceParameters};
use crate::site::{Site, Technology};
use crate::time_series::{SLOTS_PER_HOUR, TimeSeries, reindex_forward_fill, with_year};
use anyhow::{Result, bail, ensure};
use chrono::{Datelike, NaiveDateTime};
use indexmap::IndexMap;
use log::{debug, warn};
use strum::IntoEnumIterator;

/// Production profile for one renewable site, on the target year's grid
#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    /// The capacity (MW) that the values correspond to
    pub capacity: f64,
    /// Output (MW) at each interval
    pub series: TimeSeries,
}

impl Profile {
    /// Look up the output at the given time
    pub fn get(&self, ts: &NaiveDateTime) -> Result<f64> {
        lookup(&self.series, ts)
    }
}

/// Look up the value at the given time, raising a data alignment error if there isn't one
pub fn lookup(series: &TimeSeries, ts: &NaiveDateTime) -> Result<f64> {
    let value = series.get(ts).copied().ok_or_else(|| {
        PlanningError::DataAlignment(format!("No renewable data for {ts}"))
    })?;

    Ok(value)
}

/// Move every entry of a series into the given year.
///
/// 29 February does not exist in most years; those entries are dropped with a warning.
fn map_to_year<I>(entries: I, year: i32, what: &str) -> TimeSeries
where
    I: IntoIterator<Item = (NaiveDateTime, f64)>,
{
    let mut series = TimeSeries::new();
    let mut dropped = 0;
    for (ts, value) in entries {
        if let Some(ts) = with_year(&ts, year) {
            series.insert(ts, value);
        } else {
            dropped += 1;
        }
    }
    if dropped > 0 {
        warn!("Dropped {dropped} {what} intervals which do not exist in {year} (29 February)");
    }
    series.sort_keys();

    series
}

/// Calculate demand energy (MU) for each month with any records
fn monthly_energy_mu<'a, I>(records: I) -> IndexMap<u32, f64>
where
    I: Iterator<Item = &'a DemandRecord>,
{
    let mut energy = IndexMap::new();
    for record in records {
        *energy.entry(record.timestamp.month()).or_insert(0.0) +=
            record.total_demand / SLOTS_PER_HOUR / 1000.0;
    }

    energy
}

/// Scale historical demand so that each month matches its target and move it into the target
/// year.
///
/// Only records from the year of the first record are used. Each month is multiplied by
/// `target_month_MU × (annual_demand_mus / reference_annual_mus) / base_month_MU`.
pub fn project_demand(
    records: &[DemandRecord],
    params: &DemandParameters,
    target_year: i32,
) -> Result<TimeSeries> {
    let Some(first) = records.first() else {
        bail!(PlanningError::DataAlignment("Demand file is empty".into()));
    };
    let base_year = first.timestamp.year();
    let base_records = || records.iter().filter(|r| r.timestamp.year() == base_year);

    let scale = params.annual_demand_mus / params.reference_annual_mus;
    let mut ratios = IndexMap::new();
    for (month, base_mu) in monthly_energy_mu(base_records()) {
        if base_mu == 0.0 {
            Err(PlanningError::NumericDegenerate(format!(
                "Demand for month {month} of {base_year} is zero, so it cannot be scaled"
            )))?;
        }
        let target_mu = params.monthly_targets_mu[month as usize - 1] * scale;
        debug!("Demand scaling for month {month}: {base_mu:.3} MU -> {target_mu:.3} MU");
        ratios.insert(month, target_mu / base_mu);
    }

    let scaled = base_records().map(|r| {
        let ratio = ratios[&r.timestamp.month()];
        (r.timestamp, r.total_demand * ratio)
    });

    Ok(map_to_year(scaled, target_year, "demand"))
}

/// Clamp negative readings to zero
fn clamp_readings<I>(readings: I) -> Readings
where
    I: IntoIterator<Item = (NaiveDateTime, f64)>,
{
    readings
        .into_iter()
        .map(|(ts, value)| (ts, value.max(0.0)))
        .collect()
}

/// Build the profile for a 1 MW solar installation in the target year
pub fn solar_profile(readings: &Readings, target_year: i32) -> TimeSeries {
    let filled = reindex_forward_fill(clamp_readings(readings.iter().copied()));
    map_to_year(filled, target_year, "solar")
}

/// Zero the output on every blacked-out day
pub fn apply_blackouts(series: &mut TimeSeries, blackouts: &[DateRange]) {
    for (ts, value) in series.iter_mut() {
        if blackouts.iter().any(|b| b.contains(&ts.date())) {
            *value = 0.0;
        }
    }
}

/// Build a wind profile in the target year.
///
/// Readings are divided by the capacity they were measured at and multiplied by the source's
/// installed capacity.
pub fn wind_profile(
    readings: &Readings,
    source: &WindSourceParameters,
    target_year: i32,
) -> TimeSeries {
    let factor = source.installed_capacity.value() / source.measured_capacity.value();
    let scaled = readings.iter().map(|(ts, value)| (*ts, value * factor));
    let filled = reindex_forward_fill(clamp_readings(scaled));
    map_to_year(filled, target_year, "wind")
}

/// Build the production profile for every site.
///
/// Solar sites use their region's 1 MW profile (with blackouts applied for Goa); wind sites use
/// their wind source's profile at the source's installed capacity.
pub fn build_profiles(model: &Model) -> Result<IndexMap<Site, Profile>> {
    let params = &model.parameters;
    let target_year = params.timeline.target_year();

    let mut profiles = IndexMap::new();
    for site in Site::iter() {
        let profile = match site.technology() {
            Technology::Solar => {
                let mut series = solar_profile(&model.solar[&site], target_year);
                if site == Site::SolarGoa {
                    apply_blackouts(&mut series, &params.timeline.goa_blackouts);
                }
                Profile {
                    capacity: 1.0,
                    series,
                }
            }
            Technology::Wind => {
                let source = params.wind_source(site);
                let source_params = params.wind_sources.get(source);
                Profile {
                    capacity: source_params.installed_capacity.value(),
                    series: wind_profile(&model.wind[&source], source_params, target_year),
                }
            }
        };
        ensure!(
            !profile.series.is_empty(),
            PlanningError::DataAlignment(format!("No renewable data for site {site}"))
        );
        profiles.insert(site, profile);
    }

    Ok(profiles)
}
