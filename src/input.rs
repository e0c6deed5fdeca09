//! Common routines for handling input data.
use crate::error::PlanningError;
use anyhow::{Context, Result, ensure};
use serde::de::{Deserialize, DeserializeOwned, Deserializer};
use std::fs;
use std::path::Path;

pub mod demand;
pub mod generator;
pub mod price;
pub mod shortage;
pub mod solar;
pub mod wind;

/// Format an error message to include the file path. To be used with `anyhow::Context`.
pub fn input_err_msg<P: AsRef<Path>>(file_path: P) -> String {
    format!("Error reading {}", file_path.as_ref().display())
}

/// Read a series of type `T`s from a CSV file.
///
/// Will raise an error if the file is empty.
///
/// # Arguments
///
/// * `file_path` - Path to the CSV file
pub fn read_csv<T: DeserializeOwned>(file_path: &Path) -> Result<Vec<T>> {
    let vec = read_csv_internal(file_path).with_context(|| input_err_msg(file_path))?;
    ensure!(
        !vec.is_empty(),
        "{}: CSV file cannot be empty",
        input_err_msg(file_path)
    );

    Ok(vec)
}

fn read_csv_internal<T: DeserializeOwned>(file_path: &Path) -> Result<Vec<T>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(file_path)?;

    let mut vec = Vec::new();
    for result in reader.deserialize() {
        vec.push(result?);
    }

    Ok(vec)
}

/// Parse a TOML file at the specified path.
///
/// # Arguments
///
/// * `file_path` - Path to the TOML file
///
/// # Returns
///
/// * The deserialised TOML data or an error if the file could not be read or parsed.
pub fn read_toml<T: DeserializeOwned>(file_path: &Path) -> Result<T> {
    let toml_str = fs::read_to_string(file_path).with_context(|| input_err_msg(file_path))?;
    let toml_data = toml::from_str(&toml_str).with_context(|| input_err_msg(file_path))?;

    Ok(toml_data)
}

/// Check that an input file exists, returning a configuration error if not
pub fn check_file_exists(file_path: &Path) -> Result<()> {
    if !file_path.is_file() {
        Err(PlanningError::Configuration(format!(
            "Input file not found: {}",
            file_path.display()
        )))?;
    }

    Ok(())
}

/// Parse a number which may contain thousands separators (e.g. "1,234.5")
pub fn parse_number(s: &str) -> Result<f64> {
    let cleaned: String = s.trim().chars().filter(|c| *c != ',').collect();
    cleaned
        .parse()
        .with_context(|| format!("Invalid number: '{s}'"))
}

/// Deserialise a number which may contain thousands separators.
///
/// Plain numbers are accepted too.
pub fn deserialise_number<'de, D>(deserialiser: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = String::deserialize(deserialiser)?;
    parse_number(&value).map_err(serde::de::Error::custom)
}

/// Read an f64, checking that it is between 0 and 1
pub fn deserialise_proportion<'de, D>(deserialiser: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = f64::deserialize(deserialiser)?;
    if !(0.0..=1.0).contains(&value) {
        Err(serde::de::Error::custom("Value must be between 0 and 1"))?;
    }

    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::fs::File;
    use std::io::Write;
    use std::path::PathBuf;
    use tempfile::tempdir;

    #[derive(Debug, PartialEq, Deserialize)]
    struct Record {
        id: String,
        #[serde(deserialize_with = "deserialise_number")]
        value: f64,
    }

    /// Create an example CSV file in dir_path
    fn create_csv_file(dir_path: &Path, contents: &str) -> PathBuf {
        let file_path = dir_path.join("test.csv");
        let mut file = File::create(&file_path).unwrap();
        writeln!(file, "{contents}").unwrap();
        file_path
    }

    #[test]
    fn test_read_csv() {
        let dir = tempdir().unwrap();
        let file_path = create_csv_file(dir.path(), "id,value\nhello,1\nworld,\"1,234.5\"");
        let records: Vec<Record> = read_csv(&file_path).unwrap();
        assert_eq!(
            records,
            &[
                Record {
                    id: "hello".to_string(),
                    value: 1.0,
                },
                Record {
                    id: "world".to_string(),
                    value: 1234.5,
                }
            ]
        );

        // File with no data (only column headers)
        let file_path = create_csv_file(dir.path(), "id,value\n");
        assert!(read_csv::<Record>(&file_path).is_err());
    }

    #[test]
    fn test_read_toml() {
        #[derive(Debug, PartialEq, Deserialize)]
        struct Value {
            value: u32,
        }

        let dir = tempdir().unwrap();
        let file_path = dir.path().join("test.toml");
        fs::write(&file_path, "value = 1").unwrap();
        assert_eq!(read_toml::<Value>(&file_path).unwrap(), Value { value: 1 });

        fs::write(&file_path, "bad toml syntax").unwrap();
        assert!(read_toml::<Value>(&file_path).is_err());
    }

    #[test]
    fn test_check_file_exists() {
        let dir = tempdir().unwrap();
        let file_path = create_csv_file(dir.path(), "a");
        assert!(check_file_exists(&file_path).is_ok());

        let err = check_file_exists(&dir.path().join("missing.csv")).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PlanningError>(),
            Some(PlanningError::Configuration(_))
        ));
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number("1,234,567").unwrap(), 1_234_567.0);
        assert_eq!(parse_number(" 42.5 ").unwrap(), 42.5);
        assert!(parse_number("abc").is_err());
    }

    #[derive(Debug, Deserialize)]
    struct Proportion {
        #[serde(deserialize_with = "deserialise_proportion")]
        value: f64,
    }

    #[test]
    fn test_deserialise_proportion() {
        let parse = |s: &str| toml::from_str::<Proportion>(s);
        assert_eq!(parse("value = 0.5").unwrap().value, 0.5);
        assert_eq!(parse("value = 0.0").unwrap().value, 0.0);
        assert!(parse("value = 1.5").is_err());
        assert!(parse("value = -0.1").is_err());
    }
}
