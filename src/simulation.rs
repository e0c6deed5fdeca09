//! Functionality for running the planning pipeline.
use crate::aggregate::{SlotProfile, monthly_slot_profile};
use crate::battery::{battery_configs, dispatch_batteries};
use crate::cuf::calibrate_profiles;
use crate::dataset::Dataset;
use crate::error::PlanningError;
use crate::harmonise::{build_profiles, project_demand};
use crate::model::Model;
use crate::model::parameters::DemandSource;
use crate::optimisation::sizing::{SizingInput, perform_sizing};
use crate::optimisation::thermal::{ThermalSolution, perform_thermal_dispatch};
use crate::output::DataWriter;
use crate::site::Site;
use crate::weekly::{interesting_weeks, log_correlations, weekly_stats};
use anyhow::{Context, Result, bail};
use chrono::NaiveDateTime;
use indexmap::IndexMap;
use log::{info, warn};
use std::path::Path;

/// Run the pipeline.
///
/// # Arguments:
///
/// * `model` - The model to run
/// * `output_path` - The folder to which output files will be written
/// * `debug_model` - Whether to write additional information (e.g. sizing inputs) to output files
pub fn run(model: &Model, output_path: &Path, debug_model: bool) -> Result<()> {
    let params = &model.parameters;
    let mut writer = DataWriter::create(output_path, debug_model)?;

    // Harmonise every input onto the target year
    let target_year = params.timeline.target_year();
    info!("Projecting input data onto {target_year}");
    let demand = project_demand(&model.demand, &params.demand, target_year)?;
    let mut profiles = build_profiles(model)?;
    let report = calibrate_profiles(&mut profiles, &params.cuf_targets, params.strict_cuf)?;
    writer.write_cuf_calibration(&report)?;

    let dataset = Dataset::build(&demand, &profiles, params)?;
    info!("Built dataset with {} intervals", dataset.records.len());
    writer.write_dataset(&dataset.records)?;

    // Diagnostics
    let stats = weekly_stats(&dataset.records);
    writer.write_weekly_stats(&stats, &interesting_weeks(&stats))?;
    log_correlations(&dataset.records);

    // Heuristic battery dispatch over the analysis window
    let window = dataset.window(&params.timeline.window())?;
    let timestamps = dataset.timestamps(window.clone());
    let batteries = battery_configs(&params.batteries)?;
    let surplus = dataset.surplus(window.clone());
    let dispatch = dispatch_batteries(
        &batteries,
        params.batteries.min_soc,
        params.batteries.efficiency,
        &surplus,
    );
    if let Some(residual) = dispatch.final_residual() {
        let unserved: f64 = residual.iter().filter(|x| **x > 0.0).sum();
        info!("Surplus remaining after battery dispatch: {unserved:.1} MW summed over intervals");
    }
    writer.write_battery_dispatch(&timestamps, &surplus, &dispatch)?;

    // Make sure everything so far is on disk before the (possibly slow) optimisation stages
    writer.flush()?;

    if !params.run_optimisation {
        info!("Skipping optimisation");
        return Ok(());
    }

    let net_demand = dataset.net_demand(window);
    let thermal = perform_thermal_dispatch(
        &model.generators,
        &net_demand,
        &params.thermal,
        params.solver_time_limit,
    )?;
    let unmet: f64 = thermal.unmet_demand.iter().sum();
    info!(
        "Thermal dispatch cost: {}; unmet demand: {unmet:.1} MW summed over intervals",
        thermal.objective_value
    );
    writer.write_thermal_dispatch(&timestamps, &net_demand, &thermal)?;

    let demand = sizing_demand(model, &timestamps, &thermal)?;
    let site_profiles = per_mw_profiles(&dataset);
    let Some(prices) = &model.prices else {
        bail!(PlanningError::Configuration(
            "Market prices must be provided to run the sizing model".into()
        ));
    };
    let input = SizingInput::new(&demand, &site_profiles, prices)?;
    writer.write_debug_representative_profiles(&input)?;

    let solution = perform_sizing(&input, params)?;
    for (site, capacity) in &solution.capacities {
        info!("{site}: {capacity} MW");
    }
    info!(
        "Battery: {} MWh; remaining deficit: {:.1}",
        solution.battery_capacity,
        solution.total_deficit()
    );
    writer.write_sizing(&solution)?;

    Ok(())
}

/// The demand for the sizing model to meet, in each representative period
fn sizing_demand(
    model: &Model,
    timestamps: &[NaiveDateTime],
    thermal: &ThermalSolution,
) -> Result<SlotProfile> {
    let source = model.parameters.sizing.demand_source;
    let profile = match source {
        DemandSource::Thermal => monthly_slot_profile(
            timestamps
                .iter()
                .copied()
                .zip(thermal.unmet_demand.iter().copied()),
        ),
        DemandSource::Case1 | DemandSource::Case2 => {
            let readings = model
                .shortage
                .as_ref()
                .with_context(|| format!("No shortage table was loaded for {source:?}"))?;
            monthly_slot_profile(readings.iter().copied())
        }
    };

    if profile.values().all(|x| *x <= 0.0) {
        warn!("There is no demand for the sizing model to meet");
    }

    Ok(profile)
}

/// Delivered output per MW of capacity for each site, averaged by month and slot
fn per_mw_profiles(dataset: &Dataset) -> IndexMap<Site, SlotProfile> {
    dataset
        .per_mw
        .iter()
        .map(|(site, values)| {
            let values = dataset
                .records
                .iter()
                .map(|r| r.timestamp)
                .zip(values.iter().copied());
            (*site, monthly_slot_profile(values))
        })
        .collect()
}
