//! Code for reading precomputed shortage (unserved demand) tables.
use super::{deserialise_number, input_err_msg, read_csv};
use crate::time_series::parse_timestamp;
use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct ShortageRaw {
    #[serde(rename = "timestamp", alias = "Timestamp")]
    timestamp: String,
    #[serde(
        rename = "unserved_demand",
        alias = "Unserved Demand",
        deserialize_with = "deserialise_number"
    )]
    unserved_demand: f64,
}

/// Read a shortage table as `(time, MW)` pairs
pub fn read_shortage(file_path: &Path) -> Result<Vec<(NaiveDateTime, f64)>> {
    let rows: Vec<ShortageRaw> = read_csv(file_path)?;
    rows.into_iter()
        .map(|row| Ok((parse_timestamp(&row.timestamp)?, row.unserved_demand)))
        .collect::<Result<_>>()
        .with_context(|| input_err_msg(file_path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_read_shortage() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("shortage.csv");
        fs::write(
            &file_path,
            "Timestamp,Unserved Demand\n2030-01-01 00:00:00,12.5\n2030-01-01 00:15:00,0\n",
        )
        .unwrap();

        let rows = read_shortage(&file_path).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].1, 12.5);
    }
}
