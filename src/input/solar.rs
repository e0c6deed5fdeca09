//! Code for reading solar production profiles.
use super::{input_err_msg, read_csv};
use crate::time_series::parse_timestamp;
use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct SolarRaw {
    local_time: String,
    electricity: f64,
}

/// Read a solar profile for a 1 MW installation.
///
/// Readings may be at any resolution; they are returned as `(time, MW)` pairs in file order.
pub fn read_solar_profile(file_path: &Path) -> Result<Vec<(NaiveDateTime, f64)>> {
    let rows: Vec<SolarRaw> = read_csv(file_path)?;
    rows.into_iter()
        .map(|row| Ok((parse_timestamp(&row.local_time)?, row.electricity)))
        .collect::<Result<_>>()
        .with_context(|| input_err_msg(file_path))
}
