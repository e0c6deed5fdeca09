//! The kinds of failure a planning run can end with.
//!
//! Most code returns [`anyhow::Result`]. Where a failure belongs to one of the categories below, a
//! [`PlanningError`] is attached to the error chain so that callers (and tests) can find out what
//! went wrong with [`anyhow::Error::downcast_ref`].
use std::error::Error;
use std::fmt;

/// A categorised error from a planning run
#[derive(Debug, Clone, PartialEq)]
pub enum PlanningError {
    /// An input file is missing or a parameter is out of range
    Configuration(String),
    /// Time series could not be lined up with one another
    DataAlignment(String),
    /// The solver could not be run to completion
    SolverUnavailable {
        /// The name of the model being solved
        model: String,
        /// The status reported by the solver
        status: String,
    },
    /// The solver proved that there is no feasible solution
    InfeasibleModel {
        /// The name of the model being solved
        model: String,
        /// The status reported by the solver
        status: String,
    },
    /// A calculation would have divided by zero
    NumericDegenerate(String),
}

impl fmt::Display for PlanningError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanningError::Configuration(msg) => write!(f, "Configuration error: {msg}"),
            PlanningError::DataAlignment(msg) => write!(f, "Data alignment error: {msg}"),
            PlanningError::SolverUnavailable { model, status } => {
                write!(f, "Solver unavailable for {model} model: {status}")
            }
            PlanningError::InfeasibleModel { model, status } => {
                write!(f, "The {model} model is infeasible: {status}")
            }
            PlanningError::NumericDegenerate(msg) => write!(f, "Numerically degenerate: {msg}"),
        }
    }
}

impl Error for PlanningError {}

/// Find the [`PlanningError`] in an error chain, if there is one.
///
/// It may have been attached either as the original error or as context.
pub fn find_planning_error(err: &anyhow::Error) -> Option<&PlanningError> {
    err.downcast_ref::<PlanningError>()
        .or_else(|| err.chain().find_map(|cause| cause.downcast_ref::<PlanningError>()))
}
