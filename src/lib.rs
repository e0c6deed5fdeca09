//! Common functionality for gridplan.
//!
//! The crate blends historical demand and renewable time series onto a 15-minute grid for a
//! target planning year, calibrates renewable output to target capacity utilisation factors,
//! simulates fixed-size batteries heuristically and then solves a thermal dispatch LP followed by
//! a renewable and battery sizing MILP.
#![warn(missing_docs)]
use std::path::PathBuf;

pub mod aggregate;
pub mod battery;
pub mod cli;
pub mod cuf;
pub mod dataset;
pub mod error;
pub mod harmonise;
pub mod id;
pub mod input;
pub mod log;
pub mod model;
pub mod optimisation;
pub mod output;
pub mod settings;
pub mod simulation;
pub mod site;
pub mod time_series;
pub mod units;
pub mod weekly;

#[cfg(test)]
mod fixture;

/// Get the config dir for the program
pub fn get_gridplan_config_dir() -> PathBuf {
    let Some(mut config_dir) = dirs::config_dir() else {
        panic!("Could not get config dir for your OS")
    };
    config_dir.push("gridplan");

    config_dir
}
