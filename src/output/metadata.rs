//! Writes `metadata.toml`, describing the run, the model inputs, the build and the host.
use crate::model::Model;
use crate::site::Site;
use crate::units::Power;
use anyhow::{Context, Result, anyhow};
use chrono::{Local, NaiveDate};
use indexmap::IndexMap;
use platform_info::{PlatformInfo, PlatformInfoAPI, UNameAPI};
use serde::Serialize;
use std::fs;
use std::path::Path;

const METADATA_FILE_NAME: &str = "metadata.toml";

/// Build-time information generated by `build.rs`
mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

#[derive(Serialize)]
struct Metadata<'a> {
    run: RunSection<'a>,
    inputs: InputSection,
    program: ProgramSection,
    platform: IndexMap<&'static str, String>,
}

#[derive(Serialize)]
struct RunSection<'a> {
    model_path: &'a Path,
    /// When the run started, in RFC 2822 format
    started: String,
    /// The year onto which input data was projected
    target_year: i32,
    window_start: NaiveDate,
    window_end: NaiveDate,
    run_optimisation: bool,
}

/// A summary of what was loaded from the model folder
#[derive(Serialize)]
struct InputSection {
    demand_records: usize,
    thermal_generators: usize,
    thermal_capacity: Power,
    battery_units: usize,
    installed_capacity: IndexMap<Site, Power>,
}

impl InputSection {
    fn new(model: &Model) -> Self {
        let params = &model.parameters;
        Self {
            demand_records: model.demand.len(),
            thermal_generators: model.generators.len(),
            thermal_capacity: model.generators.iter().map(|g| g.capacity).sum(),
            battery_units: params.batteries.units.len(),
            installed_capacity: params
                .sites
                .iter()
                .map(|(site, site_params)| (*site, site_params.installed_capacity))
                .collect(),
        }
    }
}

#[derive(Serialize)]
struct ProgramSection {
    name: &'static str,
    version: &'static str,
    /// Target triple of the build
    target: &'static str,
    is_debug: bool,
    rustc_version: &'static str,
    build_time_utc: &'static str,
    /// Short commit hash, suffixed with `-dirty` for uncommitted changes
    git_commit: String,
}

impl ProgramSection {
    fn new() -> Self {
        let git_commit = match built_info::GIT_COMMIT_HASH_SHORT {
            Some(hash) if built_info::GIT_DIRTY == Some(true) => format!("{hash}-dirty"),
            Some(hash) => hash.to_string(),
            None => "unknown".to_string(),
        };

        Self {
            name: built_info::PKG_NAME,
            version: built_info::PKG_VERSION,
            target: built_info::TARGET,
            is_debug: built_info::DEBUG,
            rustc_version: built_info::RUSTC_VERSION,
            build_time_utc: built_info::BUILT_TIME_UTC,
            git_commit,
        }
    }
}

/// The `uname`-style description of the host
fn platform_fields() -> Result<IndexMap<&'static str, String>> {
    let info = PlatformInfo::new()
        .map_err(|err| anyhow!("Unable to determine platform info: {err}"))?;

    Ok([
        ("sysname", info.sysname()),
        ("nodename", info.nodename()),
        ("release", info.release()),
        ("version", info.version()),
        ("machine", info.machine()),
        ("osname", info.osname()),
    ]
    .into_iter()
    .map(|(key, value)| (key, value.to_string_lossy().into_owned()))
    .collect())
}

/// Write metadata for a run of `model` into `output_path`
pub fn write_metadata(output_path: &Path, model: &Model) -> Result<()> {
    let timeline = &model.parameters.timeline;
    let metadata = Metadata {
        run: RunSection {
            model_path: &model.model_path,
            started: Local::now().to_rfc2822(),
            target_year: timeline.target_year(),
            window_start: timeline.start,
            window_end: timeline.end,
            run_optimisation: model.parameters.run_optimisation,
        },
        inputs: InputSection::new(model),
        program: ProgramSection::new(),
        platform: platform_fields()?,
    };

    let file_path = output_path.join(METADATA_FILE_NAME);
    let contents = toml::to_string(&metadata).context("Could not serialise metadata")?;
    fs::write(&file_path, contents)
        .with_context(|| format!("Could not write {}", file_path.display()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::model_dir;
    use rstest::rstest;
    use tempfile::{TempDir, tempdir};

    #[rstest]
    fn test_write_metadata(model_dir: TempDir) {
        let model = Model::from_path(model_dir.path()).unwrap();
        let output_dir = tempdir().unwrap();
        write_metadata(output_dir.path(), &model).unwrap();

        let contents = fs::read_to_string(output_dir.path().join(METADATA_FILE_NAME)).unwrap();
        let metadata: toml::Table = toml::from_str(&contents).unwrap();
        assert_eq!(metadata["run"]["target_year"].as_integer(), Some(2030));
        assert_eq!(metadata["program"]["name"].as_str(), Some("gridplan"));
        assert_eq!(metadata["inputs"]["thermal_generators"].as_integer(), Some(2));
        assert_eq!(metadata["inputs"]["thermal_capacity"].as_float(), Some(900.0));
        assert_eq!(
            metadata["inputs"]["installed_capacity"]["solar_goa"].as_float(),
            Some(50.0)
        );
    }
}
