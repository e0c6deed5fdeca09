//! Code for reading the historical demand CSV file.
use super::{deserialise_number, read_csv};
use crate::time_series::parse_timestamp;
use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use serde::Deserialize;
use std::path::Path;

/// A row of the demand file
#[derive(Debug, Deserialize, PartialEq)]
struct DemandRaw {
    #[serde(rename = "timestamp", alias = "Timestamp")]
    timestamp: String,
    #[serde(
        rename = "total_demand",
        alias = "TOTAL DEMAND",
        deserialize_with = "deserialise_number"
    )]
    total_demand: f64,
}

/// A demand reading in MW
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DemandRecord {
    /// The start of the interval
    pub timestamp: NaiveDateTime,
    /// Mean demand over the interval (MW)
    pub total_demand: f64,
}

/// Read historical demand from a CSV file.
///
/// Records are returned in the order they appear in the file.
pub fn read_demand(file_path: &Path) -> Result<Vec<DemandRecord>> {
    let rows: Vec<DemandRaw> = read_csv(file_path)?;
    rows.into_iter()
        .map(|row| {
            Ok(DemandRecord {
                timestamp: parse_timestamp(&row.timestamp)?,
                total_demand: row.total_demand,
            })
        })
        .collect::<Result<_>>()
        .with_context(|| super::input_err_msg(file_path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_read_demand() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("demand.csv");
        fs::write(
            &file_path,
            "Timestamp,TOTAL DEMAND\n01-09-2022 00:00:00,\"1,050.5\"\n2022-09-01 00:15:00,990\n",
        )
        .unwrap();

        let records = read_demand(&file_path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].total_demand, 1050.5);
        assert_eq!(
            records[1].timestamp,
            parse_timestamp("2022-09-01 00:15").unwrap()
        );
    }

    #[test]
    fn test_read_demand_bad_timestamp() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("demand.csv");
        fs::write(&file_path, "timestamp,total_demand\nnot a date,1\n").unwrap();
        assert!(read_demand(&file_path).is_err());
    }
}
