//! Defines the `ModelParameters` struct, which represents the contents of `model.toml`.
use crate::error::PlanningError;
use crate::input::{deserialise_proportion, input_err_msg, read_toml};
use crate::site::{Site, Technology, Transmission, WindSource};
use crate::units::{Dimensionless, Energy, Hours, Money, MoneyPerEnergy, Power};
use anyhow::{Context, Result, ensure};
use chrono::{Datelike, NaiveDate};
use indexmap::IndexMap;
use serde::Deserialize;
use serde_string_enum::DeserializeLabeledStringEnum;
use std::path::{Path, PathBuf};
use strum::IntoEnumIterator;

/// The name of the model parameters file
pub const MODEL_PARAMETERS_FILE_NAME: &str = "model.toml";

/// Monthly demand targets (in MU) for the reference year
const DEFAULT_MONTHLY_TARGETS_MU: [f64; 12] = [
    633.0, 598.0, 673.0, 685.0, 716.0, 641.0, 581.0, 486.0, 594.0, 615.0, 610.0, 635.0,
];

macro_rules! define_unit_param_default {
    ($name:ident, $type: ty, $value: expr) => {
        fn $name() -> $type {
            <$type>::new($value)
        }
    };
}

macro_rules! define_param_default {
    ($name:ident, $type: ty, $value: expr) => {
        fn $name() -> $type {
            $value
        }
    };
}

define_param_default!(default_run_optimisation, bool, true);
define_param_default!(default_reference_annual_mus, f64, 7471.0);
define_param_default!(default_monthly_targets_mu, [f64; 12], DEFAULT_MONTHLY_TARGETS_MU);
define_unit_param_default!(default_measured_capacity, Power, 40.0);
define_unit_param_default!(default_installed_capacity, Power, 450.0);
define_unit_param_default!(default_dre_goa, Power, 1.0);
define_unit_param_default!(default_nuclear, Power, 60.0);
define_unit_param_default!(default_biomass, Power, 42.0);
define_unit_param_default!(default_gas, Power, 23.3);
define_unit_param_default!(default_rtc, Power, 325.0);
define_param_default!(default_intra_state_loss, f64, 0.03);
define_param_default!(default_inter_state_loss, f64, 0.045);
define_param_default!(default_min_soc, f64, 0.1);
define_param_default!(default_efficiency, f64, 0.9);
define_unit_param_default!(default_unmet_demand_penalty, MoneyPerEnergy, 99_999.0);
define_param_default!(default_ramp_rate, f64, 0.15);
define_param_default!(default_min_generation_factor, f64, 0.5);
define_unit_param_default!(default_deficit_penalty, MoneyPerEnergy, 39_000.0);
define_unit_param_default!(default_throughput_penalty, MoneyPerEnergy, 10.0);
define_unit_param_default!(default_battery_cost, Money, 4500.0);
define_unit_param_default!(default_max_battery_energy, Energy, 3200.0);
define_unit_param_default!(default_max_battery_power, Power, 400.0);
define_unit_param_default!(default_max_grid_purchase, Power, 0.1);
define_param_default!(default_gdam_price_year, u32, 2023);
define_unit_param_default!(default_max_total_solar, Power, 1300.0);
define_unit_param_default!(default_max_total_wind, Power, 1000.0);

/// Represents the contents of the entire model file.
#[derive(Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ModelParameters {
    /// Whether to run the thermal dispatch and sizing optimisations after the heuristic stages
    #[serde(default = "default_run_optimisation")]
    pub run_optimisation: bool,
    /// Wall-clock limit for each solver call, in seconds
    pub solver_time_limit: Option<f64>,
    /// Whether a month with zero achieved CUF is a fatal error
    #[serde(default)]
    pub strict_cuf: bool,
    /// Input file paths
    pub files: InputFiles,
    /// Demand projection
    pub demand: DemandParameters,
    /// Parameters for each renewable site
    pub sites: IndexMap<Site, SiteParameters>,
    /// Capacities for each source of measured wind data
    #[serde(default)]
    pub wind_sources: WindSources,
    /// Generation which runs at a constant level
    #[serde(default)]
    pub must_run: MustRun,
    /// Transmission losses
    #[serde(default)]
    pub losses: Losses,
    /// Fixed-size batteries for the heuristic dispatcher
    #[serde(default)]
    pub batteries: BatteryParameters,
    /// The planning window
    pub timeline: Timeline,
    /// Thermal dispatch parameters
    #[serde(default)]
    pub thermal: ThermalParameters,
    /// Capacity sizing parameters
    #[serde(default)]
    pub sizing: SizingParameters,
    /// Target monthly CUF (%) for each site. Sites not listed are not calibrated.
    #[serde(default = "default_cuf_targets")]
    pub cuf_targets: IndexMap<Site, [f64; 12]>,
}

/// Paths to the input files, relative to the model directory
#[derive(Debug, Deserialize, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct InputFiles {
    /// Historical demand
    pub demand: PathBuf,
    /// Wind measured by SRI
    pub wind_sri: PathBuf,
    /// Wind measured by SECI
    pub wind_seci: PathBuf,
    /// Solar profile for Goa
    pub solar_goa: PathBuf,
    /// Solar profile for Gujarat
    pub solar_gujarat: PathBuf,
    /// Solar profile for Rajasthan
    pub solar_rajasthan: PathBuf,
    /// Solar profile for Telangana
    pub solar_telangana: PathBuf,
    /// Thermal generator roster
    pub generators: PathBuf,
    /// Precomputed shortage table, case 1
    pub shortage_case1: Option<PathBuf>,
    /// Precomputed shortage table, case 2
    pub shortage_case2: Option<PathBuf>,
    /// Day-ahead market prices
    pub gdam_prices: Option<PathBuf>,
}

/// Parameters for projecting demand onto the target year
#[derive(Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct DemandParameters {
    /// Annual demand in the target year (MU)
    pub annual_demand_mus: f64,
    /// Annual demand that the monthly targets add up to (MU)
    #[serde(default = "default_reference_annual_mus")]
    pub reference_annual_mus: f64,
    /// Demand in each month of the reference year (MU)
    #[serde(default = "default_monthly_targets_mu")]
    pub monthly_targets_mu: [f64; 12],
}

/// Parameters for a renewable site
#[derive(Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SiteParameters {
    /// Capacity used to build the dataset
    pub installed_capacity: Power,
    /// Cost of each MWh generated, used when sizing
    pub unit_cost: MoneyPerEnergy,
    /// Lower bound on capacity when sizing
    #[serde(default)]
    pub min_capacity: Power,
    /// Upper bound on capacity when sizing
    pub max_capacity: Option<Power>,
    /// Which measured wind data drives the site (wind sites only; defaults to SRI)
    pub wind_source: Option<WindSource>,
}

/// Capacities of a measured wind data source
#[derive(Debug, Deserialize, PartialEq, Clone, Copy)]
#[serde(deny_unknown_fields)]
pub struct WindSourceParameters {
    /// Capacity of the turbines the data was measured at
    #[serde(default = "default_measured_capacity")]
    pub measured_capacity: Power,
    /// Capacity the measured data is scaled up to
    #[serde(default = "default_installed_capacity")]
    pub installed_capacity: Power,
}

impl Default for WindSourceParameters {
    fn default() -> Self {
        Self {
            measured_capacity: default_measured_capacity(),
            installed_capacity: default_installed_capacity(),
        }
    }
}

/// Capacities for every wind data source
#[derive(Debug, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct WindSources {
    /// SRI data
    #[serde(default)]
    pub sri: WindSourceParameters,
    /// SECI data
    #[serde(default)]
    pub seci: WindSourceParameters,
}

impl WindSources {
    /// Get the parameters for the given source
    pub fn get(&self, source: WindSource) -> &WindSourceParameters {
        match source {
            WindSource::Sri => &self.sri,
            WindSource::Seci => &self.seci,
        }
    }
}

/// Constant-output generation (MW)
#[derive(Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct MustRun {
    /// Distributed solar in Goa, driven by the Goa solar profile
    #[serde(default = "default_dre_goa")]
    pub dre_goa: Power,
    /// Nuclear
    #[serde(default = "default_nuclear")]
    pub nuclear: Power,
    /// Biomass
    #[serde(default = "default_biomass")]
    pub biomass: Power,
    /// Gas
    #[serde(default = "default_gas")]
    pub gas: Power,
    /// Round-the-clock contracted supply
    #[serde(default = "default_rtc")]
    pub rtc: Power,
}

impl Default for MustRun {
    fn default() -> Self {
        Self {
            dre_goa: default_dre_goa(),
            nuclear: default_nuclear(),
            biomass: default_biomass(),
            gas: default_gas(),
            rtc: default_rtc(),
        }
    }
}

/// Transmission losses, as proportions of output
#[derive(Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Losses {
    /// Losses for sites within the state
    #[serde(default = "default_intra_state_loss")]
    #[serde(deserialize_with = "deserialise_proportion")]
    pub intra_state: f64,
    /// Losses for sites in other states
    #[serde(default = "default_inter_state_loss")]
    #[serde(deserialize_with = "deserialise_proportion")]
    pub inter_state: f64,
}

impl Default for Losses {
    fn default() -> Self {
        Self {
            intra_state: default_intra_state_loss(),
            inter_state: default_inter_state_loss(),
        }
    }
}

/// A fixed-size battery
#[derive(Debug, Deserialize, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct BatteryUnit {
    /// Display name (defaults to "Battery n")
    pub name: Option<String>,
    /// Maximum charge or discharge power
    pub power: Power,
    /// Hours of storage at full power
    pub duration: Hours,
}

/// Parameters for the heuristic battery dispatcher
#[derive(Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct BatteryParameters {
    /// Minimum state of charge as a proportion of capacity
    #[serde(default = "default_min_soc")]
    #[serde(deserialize_with = "deserialise_proportion")]
    pub min_soc: f64,
    /// Round-trip efficiency applied on both charge and discharge
    #[serde(default = "default_efficiency")]
    #[serde(deserialize_with = "deserialise_proportion")]
    pub efficiency: f64,
    /// Batteries in priority order
    #[serde(default = "default_battery_units")]
    pub units: Vec<BatteryUnit>,
}

fn default_battery_units() -> Vec<BatteryUnit> {
    [(500.0, 4.0), (500.0, 6.0), (250.0, 4.0)]
        .into_iter()
        .map(|(power, duration)| BatteryUnit {
            name: None,
            power: Power(power),
            duration: Hours(duration),
        })
        .collect()
}

impl Default for BatteryParameters {
    fn default() -> Self {
        Self {
            min_soc: default_min_soc(),
            efficiency: default_efficiency(),
            units: default_battery_units(),
        }
    }
}

/// An inclusive range of whole days
#[derive(Debug, Deserialize, PartialEq, Clone, Copy)]
#[serde(deny_unknown_fields)]
pub struct DateRange {
    /// First day
    pub start: NaiveDate,
    /// Last day
    pub end: NaiveDate,
}

impl DateRange {
    /// Whether the given day is within this range
    pub fn contains(&self, date: &NaiveDate) -> bool {
        (self.start..=self.end).contains(date)
    }
}

/// The planning window
#[derive(Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Timeline {
    /// First day of the analysis window; its year is the target planning year
    pub start: NaiveDate,
    /// Last day of the analysis window
    pub end: NaiveDate,
    /// Days on which Goa solar (and so distributed solar) produces nothing
    #[serde(default)]
    pub goa_blackouts: Vec<DateRange>,
}

impl Timeline {
    /// The year that data is projected onto
    pub fn target_year(&self) -> i32 {
        self.start.year()
    }

    /// The analysis window as a [`DateRange`]
    pub fn window(&self) -> DateRange {
        DateRange {
            start: self.start,
            end: self.end,
        }
    }
}

/// Parameters for the thermal dispatch LP
#[derive(Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ThermalParameters {
    /// Cost of each MWh of demand left unmet
    #[serde(default = "default_unmet_demand_penalty")]
    pub unmet_demand_penalty: MoneyPerEnergy,
    /// Maximum change in output between intervals, as a proportion of capacity
    #[serde(default = "default_ramp_rate")]
    #[serde(deserialize_with = "deserialise_proportion")]
    pub ramp_rate: f64,
    /// Minimum output of every generator, as a proportion of capacity
    #[serde(default = "default_min_generation_factor")]
    #[serde(deserialize_with = "deserialise_proportion")]
    pub min_generation_factor: f64,
}

impl Default for ThermalParameters {
    fn default() -> Self {
        Self {
            unmet_demand_penalty: default_unmet_demand_penalty(),
            ramp_rate: default_ramp_rate(),
            min_generation_factor: default_min_generation_factor(),
        }
    }
}

/// Where the demand to be met by the sizing model comes from
#[derive(DeserializeLabeledStringEnum, Debug, PartialEq, Clone, Copy, Default)]
pub enum DemandSource {
    /// Unmet demand from the thermal dispatch
    #[default]
    #[string = "thermal"]
    Thermal,
    /// The `shortage_case1` file
    #[string = "case1"]
    Case1,
    /// The `shortage_case2` file
    #[string = "case2"]
    Case2,
}

/// Parameters for the renewable and battery sizing MILP
#[derive(Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SizingParameters {
    /// Where the demand to be met comes from
    #[serde(default)]
    pub demand_source: DemandSource,
    /// Cost of each MWh of deficit
    #[serde(default = "default_deficit_penalty")]
    pub deficit_penalty: MoneyPerEnergy,
    /// Cost of each MWh charged or discharged
    #[serde(default = "default_throughput_penalty")]
    pub throughput_penalty: MoneyPerEnergy,
    /// Cost of each MWh of battery capacity
    #[serde(default = "default_battery_cost")]
    pub battery_cost: Money,
    /// Upper bound on battery capacity
    #[serde(default = "default_max_battery_energy")]
    pub max_battery_energy: Energy,
    /// Global ceiling on charge and discharge power
    #[serde(default = "default_max_battery_power")]
    pub max_battery_power: Power,
    /// Ceiling on market purchases in each period
    #[serde(default = "default_max_grid_purchase")]
    pub max_grid_purchase: Power,
    /// Which year's prices to use from the price file
    #[serde(default = "default_gdam_price_year")]
    pub gdam_price_year: u32,
    /// Lower bound on total solar capacity
    #[serde(default)]
    pub min_total_solar: Power,
    /// Upper bound on total solar capacity
    #[serde(default = "default_max_total_solar")]
    pub max_total_solar: Power,
    /// Lower bound on total wind capacity
    #[serde(default)]
    pub min_total_wind: Power,
    /// Upper bound on total wind capacity
    #[serde(default = "default_max_total_wind")]
    pub max_total_wind: Power,
    /// Allow renewable output to exceed demand
    #[serde(default)]
    pub allow_oversized_re: bool,
}

impl Default for SizingParameters {
    fn default() -> Self {
        Self {
            demand_source: DemandSource::default(),
            deficit_penalty: default_deficit_penalty(),
            throughput_penalty: default_throughput_penalty(),
            battery_cost: default_battery_cost(),
            max_battery_energy: default_max_battery_energy(),
            max_battery_power: default_max_battery_power(),
            max_grid_purchase: default_max_grid_purchase(),
            gdam_price_year: default_gdam_price_year(),
            min_total_solar: Power(0.0),
            max_total_solar: default_max_total_solar(),
            min_total_wind: Power(0.0),
            max_total_wind: default_max_total_wind(),
            allow_oversized_re: false,
        }
    }
}

fn default_cuf_targets() -> IndexMap<Site, [f64; 12]> {
    [
        (
            Site::SolarGujarat,
            [15.0, 18.5, 20.0, 22.0, 21.0, 17.0, 12.0, 12.0, 16.0, 17.0, 14.0, 12.5],
        ),
        (
            Site::SolarRajasthan,
            [14.0, 17.5, 20.0, 21.5, 22.0, 20.0, 17.5, 16.0, 17.0, 17.0, 14.0, 13.5],
        ),
        (
            Site::SolarTelangana,
            [16.0, 18.0, 18.0, 20.0, 20.0, 17.5, 12.5, 12.5, 17.5, 18.0, 20.0, 14.0],
        ),
        (
            Site::WindMaharashtra,
            [25.0, 25.0, 25.0, 30.0, 40.0, 52.0, 61.0, 52.0, 32.0, 24.0, 28.0, 25.0],
        ),
        (
            Site::WindTamilNadu,
            [30.0, 25.0, 20.0, 28.0, 48.0, 62.0, 68.0, 60.0, 55.0, 30.0, 16.0, 28.0],
        ),
        (
            Site::WindKarnataka,
            [30.0, 32.0, 28.0, 22.0, 50.0, 62.0, 62.0, 58.0, 45.0, 35.0, 29.0, 38.0],
        ),
    ]
    .into_iter()
    .collect()
}

/// Check that a value is a finite, non-negative number
fn check_non_negative(value: f64, name: &str) -> Result<()> {
    ensure!(
        value.is_finite() && value >= 0.0,
        "{name} must be a finite, non-negative number"
    );

    Ok(())
}

/// Check that a value is a finite number greater than zero
fn check_positive(value: f64, name: &str) -> Result<()> {
    ensure!(
        value.is_finite() && value > 0.0,
        "{name} must be a finite number greater than zero"
    );

    Ok(())
}

/// Check the `demand` section
fn check_demand(demand: &DemandParameters) -> Result<()> {
    check_positive(demand.annual_demand_mus, "demand.annual_demand_mus")?;
    check_positive(demand.reference_annual_mus, "demand.reference_annual_mus")?;
    for value in demand.monthly_targets_mu {
        check_non_negative(value, "demand.monthly_targets_mu")?;
    }

    Ok(())
}

/// Check the `sites` section
fn check_sites(sites: &IndexMap<Site, SiteParameters>) -> Result<()> {
    for site in Site::iter() {
        let params = sites
            .get(&site)
            .with_context(|| format!("Missing parameters for site {site}"))?;
        let name = |field| format!("sites.{site}.{field}");

        check_non_negative(params.installed_capacity.value(), &name("installed_capacity"))?;
        check_non_negative(params.unit_cost.value(), &name("unit_cost"))?;
        check_non_negative(params.min_capacity.value(), &name("min_capacity"))?;
        if let Some(max_capacity) = params.max_capacity {
            check_non_negative(max_capacity.value(), &name("max_capacity"))?;
            ensure!(
                params.min_capacity <= max_capacity,
                "{} cannot be greater than {}",
                name("min_capacity"),
                name("max_capacity")
            );
        }
        ensure!(
            params.wind_source.is_none() || site.technology() == Technology::Wind,
            "{} can only be given for wind sites",
            name("wind_source")
        );
    }

    Ok(())
}

/// Check the `wind_sources` section
fn check_wind_sources(wind_sources: &WindSources) -> Result<()> {
    for source in [WindSource::Sri, WindSource::Seci] {
        let params = wind_sources.get(source);
        check_positive(
            params.measured_capacity.value(),
            &format!("wind_sources.{source}.measured_capacity"),
        )?;
        check_positive(
            params.installed_capacity.value(),
            &format!("wind_sources.{source}.installed_capacity"),
        )?;
    }

    Ok(())
}

/// Check the `must_run` section
fn check_must_run(must_run: &MustRun) -> Result<()> {
    check_non_negative(must_run.dre_goa.value(), "must_run.dre_goa")?;
    check_non_negative(must_run.nuclear.value(), "must_run.nuclear")?;
    check_non_negative(must_run.biomass.value(), "must_run.biomass")?;
    check_non_negative(must_run.gas.value(), "must_run.gas")?;
    check_non_negative(must_run.rtc.value(), "must_run.rtc")
}

/// Check the `batteries` section
fn check_batteries(batteries: &BatteryParameters) -> Result<()> {
    ensure!(
        batteries.efficiency > 0.0,
        "batteries.efficiency must be greater than zero"
    );
    for (i, unit) in batteries.units.iter().enumerate() {
        check_positive(unit.power.value(), &format!("batteries.units[{i}].power"))?;
        check_positive(
            unit.duration.value(),
            &format!("batteries.units[{i}].duration"),
        )?;
    }

    Ok(())
}

/// Check the `timeline` section
fn check_timeline(timeline: &Timeline) -> Result<()> {
    ensure!(
        timeline.start <= timeline.end,
        "timeline.start cannot be after timeline.end"
    );
    ensure!(
        timeline.start.year() == timeline.end.year(),
        "timeline.start and timeline.end must be in the same year"
    );
    let target_year = timeline.start.year();
    for blackout in &timeline.goa_blackouts {
        ensure!(
            blackout.start <= blackout.end,
            "Goa blackout starting on {} ends before it starts",
            blackout.start
        );
        ensure!(
            blackout.start.year() == target_year && blackout.end.year() == target_year,
            "Goa blackout starting on {} must be in the target year {target_year}",
            blackout.start
        );
    }

    Ok(())
}

/// Check the `thermal` section
fn check_thermal(thermal: &ThermalParameters) -> Result<()> {
    check_non_negative(
        thermal.unmet_demand_penalty.value(),
        "thermal.unmet_demand_penalty",
    )
}

/// Check the `sizing` section
fn check_sizing(sizing: &SizingParameters) -> Result<()> {
    check_non_negative(sizing.deficit_penalty.value(), "sizing.deficit_penalty")?;
    check_non_negative(sizing.throughput_penalty.value(), "sizing.throughput_penalty")?;
    check_non_negative(sizing.battery_cost.value(), "sizing.battery_cost")?;
    check_non_negative(sizing.max_battery_energy.value(), "sizing.max_battery_energy")?;
    check_non_negative(sizing.max_battery_power.value(), "sizing.max_battery_power")?;
    check_non_negative(sizing.max_grid_purchase.value(), "sizing.max_grid_purchase")?;
    check_non_negative(sizing.min_total_solar.value(), "sizing.min_total_solar")?;
    check_non_negative(sizing.min_total_wind.value(), "sizing.min_total_wind")?;
    ensure!(
        sizing.min_total_solar <= sizing.max_total_solar,
        "sizing.min_total_solar cannot be greater than sizing.max_total_solar"
    );
    ensure!(
        sizing.min_total_wind <= sizing.max_total_wind,
        "sizing.min_total_wind cannot be greater than sizing.max_total_wind"
    );

    Ok(())
}

/// Check the `cuf_targets` section
fn check_cuf_targets(cuf_targets: &IndexMap<Site, [f64; 12]>) -> Result<()> {
    for (site, targets) in cuf_targets {
        for target in targets {
            ensure!(
                target.is_finite() && (0.0..=100.0).contains(target),
                "cuf_targets.{site} values must be percentages between 0 and 100"
            );
        }
    }

    Ok(())
}

impl ModelParameters {
    /// Read a model file from the specified directory.
    ///
    /// # Arguments
    ///
    /// * `model_dir` - Folder containing model configuration files
    ///
    /// # Returns
    ///
    /// The model file contents as a [`ModelParameters`] struct or an error if the file is invalid
    pub fn from_path<P: AsRef<Path>>(model_dir: P) -> Result<ModelParameters> {
        let file_path = model_dir.as_ref().join(MODEL_PARAMETERS_FILE_NAME);
        let model_params: ModelParameters = read_toml(&file_path).with_context(|| {
            PlanningError::Configuration("Could not load model parameters".into())
        })?;

        model_params
            .validate()
            .with_context(|| PlanningError::Configuration(input_err_msg(file_path)))?;

        Ok(model_params)
    }

    /// Validate parameters after reading in file
    fn validate(&self) -> Result<()> {
        if let Some(time_limit) = self.solver_time_limit {
            check_positive(time_limit, "solver_time_limit")?;
        }

        check_demand(&self.demand)?;
        check_sites(&self.sites)?;
        check_wind_sources(&self.wind_sources)?;
        check_must_run(&self.must_run)?;

        // losses already validated with deserialise_proportion

        check_batteries(&self.batteries)?;
        check_timeline(&self.timeline)?;
        check_thermal(&self.thermal)?;
        check_sizing(&self.sizing)?;
        check_cuf_targets(&self.cuf_targets)?;

        // Files needed for the sizing stage
        match self.sizing.demand_source {
            DemandSource::Case1 => ensure!(
                self.files.shortage_case1.is_some(),
                "files.shortage_case1 is required when sizing.demand_source is \"case1\""
            ),
            DemandSource::Case2 => ensure!(
                self.files.shortage_case2.is_some(),
                "files.shortage_case2 is required when sizing.demand_source is \"case2\""
            ),
            DemandSource::Thermal => {}
        }
        ensure!(
            !self.run_optimisation || self.files.gdam_prices.is_some(),
            "files.gdam_prices is required when run_optimisation is true"
        );

        Ok(())
    }

    /// The parameters for the given site
    pub fn site(&self, site: Site) -> &SiteParameters {
        &self.sites[&site]
    }

    /// The measured wind data driving the given wind site
    pub fn wind_source(&self, site: Site) -> WindSource {
        self.site(site).wind_source.unwrap_or(WindSource::Sri)
    }

    /// The proportion of output lost in transmission from the given site
    pub fn loss(&self, site: Site) -> Dimensionless {
        match site.transmission() {
            Transmission::IntraState => Dimensionless(self.losses.intra_state),
            Transmission::InterState => Dimensionless(self.losses.inter_state),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::find_planning_error;
    use crate::fixture::{assert_error, model_toml};
    use rstest::rstest;
    use std::fs;
    use tempfile::tempdir;

    fn parse(toml_str: &str) -> ModelParameters {
        toml::from_str(toml_str).unwrap()
    }

    #[rstest]
    fn test_model_params_from_path(model_toml: String) {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(MODEL_PARAMETERS_FILE_NAME), model_toml).unwrap();

        let params = ModelParameters::from_path(dir.path()).unwrap();
        assert_eq!(params.timeline.target_year(), 2030);
        assert_eq!(params.batteries.units.len(), 3);
        assert_eq!(params.sizing.demand_source, DemandSource::Thermal);
        assert_eq!(params.wind_source(Site::WindKarnataka), WindSource::Sri);
        assert_eq!(params.loss(Site::SolarGoa), Dimensionless(0.03));
        assert_eq!(params.loss(Site::SolarGujarat), Dimensionless(0.045));
        assert!(!params.cuf_targets.contains_key(&Site::SolarGoa));
    }

    #[rstest]
    fn test_unknown_field(model_toml: String) {
        let toml_str = format!("colour = \"blue\"\n{model_toml}");
        assert!(toml::from_str::<ModelParameters>(&toml_str).is_err());
    }

    #[rstest]
    fn test_missing_site(model_toml: String) {
        let mut params = parse(&model_toml);
        params.sites.shift_remove(&Site::WindTamilNadu);
        assert_error!(
            params.validate(),
            "Missing parameters for site wind_tamil_nadu"
        );
    }

    #[rstest]
    fn test_wind_source_for_solar_site(model_toml: String) {
        let mut params = parse(&model_toml);
        params.sites[&Site::SolarGoa].wind_source = Some(WindSource::Seci);
        assert_error!(
            params.validate(),
            "sites.solar_goa.wind_source can only be given for wind sites"
        );
    }

    #[rstest]
    fn test_site_min_above_max(model_toml: String) {
        let mut params = parse(&model_toml);
        let site = &mut params.sites[&Site::SolarGujarat];
        site.min_capacity = Power(10.0);
        site.max_capacity = Some(Power(5.0));
        assert_error!(
            params.validate(),
            "sites.solar_gujarat.min_capacity cannot be greater than sites.solar_gujarat.max_capacity"
        );
    }

    #[rstest]
    fn test_timeline_backwards(model_toml: String) {
        let mut params = parse(&model_toml);
        params.timeline.end = NaiveDate::from_ymd_opt(2029, 1, 1).unwrap();
        assert_error!(
            params.validate(),
            "timeline.start cannot be after timeline.end"
        );
    }

    #[rstest]
    fn test_blackout_outside_target_year(model_toml: String) {
        let mut params = parse(&model_toml);
        let day = NaiveDate::from_ymd_opt(2023, 6, 1).unwrap();
        params.timeline.goa_blackouts.push(DateRange {
            start: day,
            end: day,
        });
        assert_error!(
            params.validate(),
            "Goa blackout starting on 2023-06-01 must be in the target year 2030"
        );
    }

    #[rstest]
    fn test_blackout_in_target_year(model_toml: String) {
        let mut params = parse(&model_toml);
        params.timeline.goa_blackouts.push(DateRange {
            start: NaiveDate::from_ymd_opt(2030, 6, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2030, 6, 2).unwrap(),
        });
        assert!(params.validate().is_ok());
    }

    #[rstest]
    #[case("annual_demand_mus = 8000.0", "annual_demand_mus = -5.0")]
    #[case("end = \"2030-06-01\"", "end = \"2029-06-01\"")]
    #[case("gdam_prices = \"prices.csv\"\n", "")]
    #[case("annual_demand_mus = 8000.0", "annual_demand_mus = \"lots\"")]
    fn test_invalid_parameters_are_configuration_errors(
        model_toml: String,
        #[case] from: &str,
        #[case] to: &str,
    ) {
        assert!(model_toml.contains(from));
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join(MODEL_PARAMETERS_FILE_NAME),
            model_toml.replacen(from, to, 1),
        )
        .unwrap();

        let err = ModelParameters::from_path(dir.path()).unwrap_err();
        assert!(matches!(
            find_planning_error(&err),
            Some(PlanningError::Configuration(_))
        ));
    }

    #[rstest]
    fn test_shortage_file_required(model_toml: String) {
        let mut params = parse(&model_toml);
        params.sizing.demand_source = DemandSource::Case2;
        assert_error!(
            params.validate(),
            "files.shortage_case2 is required when sizing.demand_source is \"case2\""
        );
    }

    #[rstest]
    fn test_prices_required(model_toml: String) {
        let mut params = parse(&model_toml);
        params.files.gdam_prices = None;
        assert!(params.validate().is_err());

        params.run_optimisation = false;
        assert!(params.validate().is_ok());
    }

    #[rstest]
    #[case(0.5, true)]
    #[case(0.0, true)]
    #[case(1.0, true)]
    #[case(1.5, false)]
    #[case(-0.5, false)]
    fn test_loss_is_proportion(model_toml: String, #[case] value: f64, #[case] valid: bool) {
        let toml_str = format!("{model_toml}\n[losses]\nintra_state = {value:?}\n");
        assert_eq!(toml::from_str::<ModelParameters>(&toml_str).is_ok(), valid);
    }

    #[rstest]
    #[case(1.0, true)]
    #[case(1e-3, true)]
    #[case(0.0, false)]
    #[case(-1.0, false)]
    #[case(f64::INFINITY, false)]
    #[case(f64::NAN, false)]
    fn test_check_positive(#[case] value: f64, #[case] valid: bool) {
        assert_eq!(check_positive(value, "x").is_ok(), valid);
    }

    #[rstest]
    fn test_cuf_target_out_of_range(model_toml: String) {
        let mut params = parse(&model_toml);
        params.cuf_targets.insert(Site::SolarGoa, [101.0; 12]);
        assert_error!(
            params.validate(),
            "cuf_targets.solar_goa values must be percentages between 0 and 100"
        );
    }
}
