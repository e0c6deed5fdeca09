//! Code for reading measured wind output.
//!
//! Wind files are laid out as a wide table: one row per day, with the date in the first column
//! and one column per time of day. The header of each time column contains the start of the slot
//! (e.g. `00:15 - 00:30`).
use super::{input_err_msg, parse_number};
use anyhow::{Context, Result, bail, ensure};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use std::path::Path;

/// Date formats accepted in the first column
const DATE_FORMATS: [&str; 3] = ["%d-%b-%y", "%Y-%m-%d", "%d-%m-%Y"];

/// Parse the date column of a wind file
fn parse_date(s: &str) -> Result<NaiveDate> {
    let s = s.trim();
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, format) {
            return Ok(date);
        }
    }

    bail!("Invalid date: '{s}'")
}

/// Get the time of day given by the first `HH:MM` in a column header
fn parse_time_label(label: &str) -> Result<NaiveTime> {
    let bytes = label.as_bytes();
    for (i, _) in label.match_indices(':') {
        let hour_start = (0..i)
            .rev()
            .take_while(|&j| bytes[j].is_ascii_digit())
            .last();
        let Some(hour_start) = hour_start else {
            continue;
        };
        let minute_end = i + 3;
        if minute_end > bytes.len() || !bytes[i + 1..minute_end].iter().all(u8::is_ascii_digit) {
            continue;
        }

        let hour: u32 = label[hour_start..i].parse()?;
        let minute: u32 = label[i + 1..minute_end].parse()?;
        if let Some(time) = NaiveTime::from_hms_opt(hour, minute, 0) {
            return Ok(time);
        }
    }

    bail!("Column header '{label}' does not contain a time of day")
}

/// Read a wind output file.
///
/// Returns `(time, MW)` pairs in the order day then time of day. Empty cells are skipped.
pub fn read_wind_profile(file_path: &Path) -> Result<Vec<(NaiveDateTime, f64)>> {
    read_wind_profile_internal(file_path).with_context(|| input_err_msg(file_path))
}

fn read_wind_profile_internal(file_path: &Path) -> Result<Vec<(NaiveDateTime, f64)>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_path(file_path)?;
    let times: Vec<NaiveTime> = reader
        .headers()?
        .iter()
        .skip(1)
        .map(parse_time_label)
        .collect::<Result<_>>()?;
    ensure!(!times.is_empty(), "Wind file has no time columns");

    let mut points = Vec::new();
    for record in reader.records() {
        let record = record?;
        let Some(date) = record.get(0) else {
            continue;
        };
        let date = parse_date(date)?;
        for (time, cell) in times.iter().zip(record.iter().skip(1)) {
            if cell.is_empty() {
                continue;
            }
            points.push((date.and_time(*time), parse_number(cell)?));
        }
    }
    ensure!(!points.is_empty(), "Wind file contains no readings");

    Ok(points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::fs;
    use tempfile::tempdir;

    #[rstest]
    #[case("00:00", 0, 0)]
    #[case("00:15 - 00:30", 0, 15)]
    #[case("Slot 9:45-10:00", 9, 45)]
    #[case("23:45:00", 23, 45)]
    fn test_parse_time_label(#[case] label: &str, #[case] hour: u32, #[case] minute: u32) {
        assert_eq!(
            parse_time_label(label).unwrap(),
            NaiveTime::from_hms_opt(hour, minute, 0).unwrap()
        );
    }

    #[test]
    fn test_parse_time_label_invalid() {
        assert!(parse_time_label("Total").is_err());
        assert!(parse_time_label("25:00").is_err());
    }

    #[rstest]
    #[case("01-Sep-22")]
    #[case("2022-09-01")]
    fn test_parse_date(#[case] s: &str) {
        assert_eq!(
            parse_date(s).unwrap(),
            NaiveDate::from_ymd_opt(2022, 9, 1).unwrap()
        );
    }

    #[test]
    fn test_read_wind_profile() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("wind.csv");
        fs::write(
            &file_path,
            "Date,00:00 - 00:15,00:15 - 00:30\n01-Sep-22,10,\"1,200\"\n02-Sep-22,5,\n",
        )
        .unwrap();

        let points = read_wind_profile(&file_path).unwrap();
        assert_eq!(points.len(), 3);
        assert_eq!(points[1].1, 1200.0);
        assert_eq!(
            points[2].0,
            NaiveDate::from_ymd_opt(2022, 9, 2)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap()
        );
    }
}
