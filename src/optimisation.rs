//! Code for building and solving the optimisation problems.
//!
//! Both problems are handed to the HiGHS solver. Failures are reported as [`PlanningError`]s
//! carrying the name of the model that failed.
use crate::error::PlanningError;
use crate::log::is_logging_disabled;
use anyhow::Result;
use highs::{HighsModelStatus, HighsStatus, RowProblem as Problem, Sense};
use log::{error, info};
use std::error::Error;
use std::fmt;

pub mod sizing;
pub mod thermal;

/// A decision variable in the optimisation
///
/// Note that this type does **not** include the value of the variable; it just refers to a
/// particular column of the problem.
type Variable = highs::Col;

/// Defines the possible errors that can occur when running the solver
#[derive(Debug, Clone)]
pub enum ModelError {
    /// The model definition is incoherent.
    ///
    /// Users should not be able to trigger this error.
    Incoherent(HighsStatus),
    /// An optimal solution could not be found
    NonOptimal(HighsModelStatus),
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelError::Incoherent(status) => write!(f, "Incoherent model: {status:?}"),
            ModelError::NonOptimal(status) => {
                write!(f, "Could not find optimal result: {status:?}")
            }
        }
    }
}

impl Error for ModelError {}

impl ModelError {
    /// Categorise the failure of the named model
    pub fn into_planning_error(self, model: &str) -> PlanningError {
        let model = model.to_string();
        match self {
            ModelError::NonOptimal(
                status @ (HighsModelStatus::Infeasible | HighsModelStatus::UnboundedOrInfeasible),
            ) => PlanningError::InfeasibleModel {
                model,
                status: format!("{status:?}"),
            },
            ModelError::NonOptimal(status) => PlanningError::SolverUnavailable {
                model,
                status: format!("{status:?}"),
            },
            ModelError::Incoherent(status) => PlanningError::SolverUnavailable {
                model,
                status: format!("{status:?}"),
            },
        }
    }
}

/// Try to solve the model, returning an error if the model is incoherent or result is non-optimal
pub fn solve_optimal(model: highs::Model) -> Result<highs::SolvedModel, ModelError> {
    let solved = model.try_solve().map_err(ModelError::Incoherent)?;

    match solved.status() {
        HighsModelStatus::Optimal => Ok(solved),
        status => Err(ModelError::NonOptimal(status)),
    }
}

/// Enable logging for the HiGHS solver
fn enable_highs_logging(model: &mut highs::Model) {
    // HiGHS writes straight to stdout, bypassing our logger
    if is_logging_disabled() {
        return;
    }

    model.set_option("log_to_console", true);
    model.set_option("output_flag", true);
}

/// Minimise the objective of the given problem.
///
/// # Arguments
///
/// * `problem` - The problem to solve
/// * `model_name` - Name of the model, used in log messages and errors
/// * `time_limit` - Optional wall-clock limit for the solver, in seconds
pub fn minimise(
    problem: Problem,
    model_name: &str,
    time_limit: Option<f64>,
) -> Result<highs::SolvedModel> {
    info!(
        "Solving {model_name} model with {} variables",
        problem.num_cols()
    );

    let mut model = problem.optimise(Sense::Minimise);
    enable_highs_logging(&mut model);
    if let Some(time_limit) = time_limit {
        model.set_option("time_limit", time_limit);
    }

    match solve_optimal(model) {
        Ok(solved) => {
            info!(
                "Solved {model_name} model; objective value: {}",
                solved.objective_value()
            );
            Ok(solved)
        }
        Err(err) => {
            let err = err.into_planning_error(model_name);
            error!("{err}");
            Err(err)?
        }
    }
}
