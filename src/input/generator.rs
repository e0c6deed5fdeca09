//! Code for reading the thermal generator roster.
use super::{input_err_msg, read_csv};
use crate::id::{GeneratorID, check_ids_unique, define_id_getter};
use crate::units::{MoneyPerEnergy, Power};
use anyhow::{Context, Result, ensure};
use serde::Deserialize;
use std::path::Path;

/// A thermal generator which can be dispatched to meet net demand
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Generator {
    /// Unique identifier for the generator
    #[serde(alias = "PPA Details")]
    pub id: GeneratorID,
    /// Maximum output
    #[serde(alias = "MW")]
    pub capacity: Power,
    /// Cost of each MWh generated
    #[serde(alias = "Variable Cost")]
    pub variable_cost: MoneyPerEnergy,
}
define_id_getter! {Generator, GeneratorID}

/// Check a generator's parameters are in range
fn check_generator(generator: &Generator) -> Result<()> {
    ensure!(
        generator.capacity.is_finite() && generator.capacity > Power(0.0),
        "Capacity of generator {} must be a finite number greater than zero",
        generator.id
    );
    ensure!(
        generator.variable_cost.is_finite() && generator.variable_cost >= MoneyPerEnergy(0.0),
        "Variable cost of generator {} must be a finite, non-negative number",
        generator.id
    );

    Ok(())
}

/// Read the generator roster from a CSV file.
///
/// Generators are returned in file order, which is also the order of the dispatch output.
pub fn read_generators(file_path: &Path) -> Result<Vec<Generator>> {
    let generators: Vec<Generator> = read_csv(file_path)?;
    check_ids_unique(&generators, "generator").with_context(|| input_err_msg(file_path))?;
    for generator in &generators {
        check_generator(generator).with_context(|| input_err_msg(file_path))?;
    }

    Ok(generators)
}
