//! The model definition: validated parameters plus every input series they refer to.
use crate::input::check_file_exists;
use crate::input::demand::{DemandRecord, read_demand};
use crate::input::generator::{Generator, read_generators};
use crate::input::price::{PriceTable, read_prices};
use crate::input::shortage::read_shortage;
use crate::input::solar::read_solar_profile;
use crate::input::wind::read_wind_profile;
use crate::site::{Site, Technology, WindSource};
use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use indexmap::IndexMap;
use log::info;
use std::path::{Path, PathBuf};

pub mod parameters;
use parameters::{DemandSource, InputFiles, ModelParameters};

/// Raw readings taken at arbitrary times
pub type Readings = Vec<(NaiveDateTime, f64)>;

/// Model definition
#[derive(Debug)]
pub struct Model {
    /// Path to model folder
    pub model_path: PathBuf,
    /// Parameters from the model TOML file
    pub parameters: ModelParameters,
    /// Historical demand, in file order
    pub demand: Vec<DemandRecord>,
    /// Raw solar readings for a 1 MW installation at each solar site
    pub solar: IndexMap<Site, Readings>,
    /// Raw wind readings for each source
    pub wind: IndexMap<WindSource, Readings>,
    /// Thermal generators, in file order
    pub generators: Vec<Generator>,
    /// Precomputed unserved demand, if the sizing stage takes its demand from a file
    pub shortage: Option<Readings>,
    /// Day-ahead market prices, if the optimisation stages are run
    pub prices: Option<PriceTable>,
}

impl InputFiles {
    /// The solar profile file for the given solar site
    pub fn solar(&self, site: Site) -> &Path {
        match site {
            Site::SolarGoa => &self.solar_goa,
            Site::SolarGujarat => &self.solar_gujarat,
            Site::SolarRajasthan => &self.solar_rajasthan,
            _ => &self.solar_telangana,
        }
    }

    /// The file of measured output for the given wind source
    pub fn wind(&self, source: WindSource) -> &Path {
        match source {
            WindSource::Sri => &self.wind_sri,
            WindSource::Seci => &self.wind_seci,
        }
    }

    /// The shortage table for the given demand source, if it takes its demand from a file
    pub fn shortage(&self, source: DemandSource) -> Option<&Path> {
        match source {
            DemandSource::Thermal => None,
            DemandSource::Case1 => self.shortage_case1.as_deref(),
            DemandSource::Case2 => self.shortage_case2.as_deref(),
        }
    }

    /// Make every path relative to the given model directory
    fn resolve(&self, model_dir: &Path) -> InputFiles {
        let join = |p: &PathBuf| model_dir.join(p);
        InputFiles {
            demand: join(&self.demand),
            wind_sri: join(&self.wind_sri),
            wind_seci: join(&self.wind_seci),
            solar_goa: join(&self.solar_goa),
            solar_gujarat: join(&self.solar_gujarat),
            solar_rajasthan: join(&self.solar_rajasthan),
            solar_telangana: join(&self.solar_telangana),
            generators: join(&self.generators),
            shortage_case1: self.shortage_case1.as_ref().map(join),
            shortage_case2: self.shortage_case2.as_ref().map(join),
            gdam_prices: self.gdam_prices.as_ref().map(join),
        }
    }
}

/// Check that every file the run will read is present
fn check_input_files(files: &InputFiles, parameters: &ModelParameters) -> Result<()> {
    let mut paths = vec![
        files.demand.as_path(),
        files.wind_sri.as_path(),
        files.wind_seci.as_path(),
        files.solar_goa.as_path(),
        files.solar_gujarat.as_path(),
        files.solar_rajasthan.as_path(),
        files.solar_telangana.as_path(),
        files.generators.as_path(),
    ];
    if let Some(path) = files.shortage(parameters.sizing.demand_source) {
        paths.push(path);
    }
    if parameters.run_optimisation {
        paths.extend(files.gdam_prices.as_deref());
    }

    for path in paths {
        check_file_exists(path)?;
    }

    Ok(())
}

impl Model {
    /// Read a model from the specified directory.
    ///
    /// # Arguments
    ///
    /// * `model_dir` - Folder containing model configuration files
    pub fn from_path<P: AsRef<Path>>(model_dir: P) -> Result<Model> {
        let model_dir = model_dir.as_ref();
        let mut parameters = ModelParameters::from_path(model_dir)?;
        parameters.files = parameters.files.resolve(model_dir);
        let files = &parameters.files;
        check_input_files(files, &parameters)?;

        let demand = read_demand(&files.demand)?;
        info!("Read {} demand records", demand.len());

        let solar = Site::iter_technology(Technology::Solar)
            .map(|site| Ok((site, read_solar_profile(files.solar(site))?)))
            .collect::<Result<_>>()?;
        let wind = [WindSource::Sri, WindSource::Seci]
            .into_iter()
            .map(|source| Ok((source, read_wind_profile(files.wind(source))?)))
            .collect::<Result<_>>()?;
        let generators = read_generators(&files.generators)?;

        let shortage = files
            .shortage(parameters.sizing.demand_source)
            .map(read_shortage)
            .transpose()?;
        let prices = match (&files.gdam_prices, parameters.run_optimisation) {
            (Some(path), true) => Some(
                read_prices(path, parameters.sizing.gdam_price_year)
                    .context("Failed to read market prices")?,
            ),
            _ => None,
        };

        Ok(Model {
            model_path: model_dir.to_path_buf(),
            parameters,
            demand,
            solar,
            wind,
            generators,
            shortage,
            prices,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{PlanningError, find_planning_error};
    use crate::fixture::model_dir;
    use rstest::rstest;
    use std::fs;
    use tempfile::TempDir;

    #[rstest]
    fn test_model_from_path(model_dir: TempDir) {
        let model = Model::from_path(model_dir.path()).unwrap();
        assert_eq!(model.demand.len(), 96);
        assert_eq!(model.solar.len(), 4);
        assert_eq!(model.wind.len(), 2);
        assert_eq!(model.generators.len(), 2);
        assert!(model.shortage.is_none());
        assert!(model.prices.is_some());
    }

    #[rstest]
    fn test_model_missing_file(model_dir: TempDir) {
        fs::remove_file(model_dir.path().join("solar_telangana.csv")).unwrap();
        let err = Model::from_path(model_dir.path()).unwrap_err();
        assert!(matches!(
            find_planning_error(&err),
            Some(PlanningError::Configuration(_))
        ));
    }
}
