//! The thermal dispatch LP.
//!
//! Thermal generators are dispatched to cover net demand over the analysis window. Demand which
//! cannot be met is allowed, at a penalty.
use super::{Variable, minimise};
use crate::error::PlanningError;
use crate::id::GeneratorID;
use crate::input::generator::Generator;
use crate::model::parameters::ThermalParameters;
use crate::units::Money;
use anyhow::{Result, ensure};
use highs::RowProblem as Problem;
use indexmap::IndexMap;
use std::ops::Range;

/// The name used for this model in logs and errors
pub const MODEL_NAME: &str = "thermal dispatch";

/// The solution to the thermal dispatch problem
#[derive(Debug, Clone, PartialEq)]
pub struct ThermalSolution {
    /// Output (MW) of each generator at each interval
    pub dispatch: IndexMap<GeneratorID, Vec<f64>>,
    /// Demand (MW) left unmet at each interval
    pub unmet_demand: Vec<f64>,
    /// Value of the objective function
    pub objective_value: Money,
}

/// The variables of the problem.
///
/// Output variables are added generator by generator, so each generator's variables occupy a
/// contiguous range of columns.
struct VariableMap {
    output: Vec<Vec<Variable>>,
    output_idx: Vec<Range<usize>>,
    unmet: Vec<Variable>,
    unmet_idx: Range<usize>,
}

/// Add variables to the problem.
///
/// Each generator's output is bounded below by its minimum generation level, so every generator is
/// committed at every interval.
fn add_variables(
    problem: &mut Problem,
    generators: &[Generator],
    num_intervals: usize,
    params: &ThermalParameters,
) -> VariableMap {
    let mut output = Vec::with_capacity(generators.len());
    let mut output_idx = Vec::with_capacity(generators.len());
    for generator in generators {
        let capacity = generator.capacity.value();
        let floor = params.min_generation_factor * capacity;

        // This line **must** come before we add more variables
        let start = problem.num_cols();
        output.push(
            (0..num_intervals)
                .map(|_| problem.add_column(generator.variable_cost.value(), floor..=capacity))
                .collect(),
        );
        output_idx.push(start..problem.num_cols());
    }

    let start = problem.num_cols();
    let penalty = params.unmet_demand_penalty.value();
    let unmet = (0..num_intervals)
        .map(|_| problem.add_column(penalty, 0.0..))
        .collect();
    let unmet_idx = start..problem.num_cols();

    VariableMap {
        output,
        output_idx,
        unmet,
        unmet_idx,
    }
}

/// Thermal output plus unmet demand must cover net demand at every interval
fn add_demand_constraints(problem: &mut Problem, variables: &VariableMap, net_demand: &[f64]) {
    let mut terms = Vec::new();
    for (t, demand) in net_demand.iter().enumerate() {
        terms.extend(variables.output.iter().map(|vars| (vars[t], 1.0)));
        terms.push((variables.unmet[t], 1.0));
        problem.add_row(*demand.., terms.drain(0..));
    }
}

/// Limit the change in each generator's output between consecutive intervals
fn add_ramp_constraints(
    problem: &mut Problem,
    variables: &VariableMap,
    generators: &[Generator],
    ramp_rate: f64,
) {
    for (generator, vars) in generators.iter().zip(variables.output.iter()) {
        let limit = ramp_rate * generator.capacity.value();
        for pair in vars.windows(2) {
            problem.add_row(-limit..=limit, [(pair[1], 1.0), (pair[0], -1.0)]);
        }
    }
}

/// Perform the thermal dispatch optimisation.
///
/// # Arguments
///
/// * `generators` - The thermal generators
/// * `net_demand` - Net demand (MW) at each interval of the analysis window
/// * `params` - Parameters for the thermal model
/// * `time_limit` - Optional solver time limit, in seconds
pub fn perform_thermal_dispatch(
    generators: &[Generator],
    net_demand: &[f64],
    params: &ThermalParameters,
    time_limit: Option<f64>,
) -> Result<ThermalSolution> {
    ensure!(
        !net_demand.is_empty(),
        PlanningError::DataAlignment("There are no intervals to dispatch".into())
    );

    let mut problem = Problem::default();
    let variables = add_variables(&mut problem, generators, net_demand.len(), params);
    add_demand_constraints(&mut problem, &variables, net_demand);
    add_ramp_constraints(&mut problem, &variables, generators, params.ramp_rate);

    let solved = minimise(problem, MODEL_NAME, time_limit)?;
    let solution = solved.get_solution();
    let columns = solution.columns();

    let dispatch = generators
        .iter()
        .zip(variables.output_idx)
        .map(|(generator, range)| (generator.id.clone(), columns[range].to_vec()))
        .collect();

    Ok(ThermalSolution {
        dispatch,
        unmet_demand: columns[variables.unmet_idx].to_vec(),
        objective_value: Money(solved.objective_value()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::{MoneyPerEnergy, Power};
    use float_cmp::assert_approx_eq;
    use rstest::{fixture, rstest};

    fn generator(id: &str, capacity: f64, variable_cost: f64) -> Generator {
        Generator {
            id: id.into(),
            capacity: Power(capacity),
            variable_cost: MoneyPerEnergy(variable_cost),
        }
    }

    #[fixture]
    fn generators() -> Vec<Generator> {
        vec![generator("cheap", 50.0, 10.0), generator("dear", 100.0, 20.0)]
    }

    #[rstest]
    fn test_cheapest_first(generators: Vec<Generator>) {
        let solution = perform_thermal_dispatch(
            &generators,
            &[100.0; 4],
            &ThermalParameters::default(),
            None,
        )
        .unwrap();

        assert_approx_eq!(f64, solution.objective_value.value(), 6000.0, epsilon = 1e-6);
        for t in 0..4 {
            assert_approx_eq!(f64, solution.dispatch["cheap"][t], 50.0, epsilon = 1e-6);
            assert_approx_eq!(f64, solution.dispatch["dear"][t], 50.0, epsilon = 1e-6);
            assert_approx_eq!(f64, solution.unmet_demand[t], 0.0, epsilon = 1e-6);
        }
    }

    #[rstest]
    fn test_ramp_limit(generators: Vec<Generator>) {
        // Without ramp limits both generators would sit at their floors in the first interval
        let net_demand = [75.0, 150.0];
        let params = ThermalParameters::default();
        let solution = perform_thermal_dispatch(&generators, &net_demand, &params, None).unwrap();

        for (generator, output) in generators.iter().zip(solution.dispatch.values()) {
            let limit = params.ramp_rate * generator.capacity.value();
            for pair in output.windows(2) {
                assert!((pair[1] - pair[0]).abs() <= limit + 1e-6);
            }
        }
        assert_approx_eq!(f64, solution.dispatch["cheap"][0], 42.5, epsilon = 1e-6);
        assert_approx_eq!(f64, solution.dispatch["dear"][0], 85.0, epsilon = 1e-6);
        assert!(solution.unmet_demand.iter().all(|x| x.abs() < 1e-6));
    }

    #[rstest]
    fn test_minimum_generation(generators: Vec<Generator>) {
        // Every generator runs at least at its floor, even with no demand
        let solution = perform_thermal_dispatch(
            &generators,
            &[0.0; 2],
            &ThermalParameters::default(),
            None,
        )
        .unwrap();
        assert_approx_eq!(f64, solution.dispatch["cheap"][0], 25.0, epsilon = 1e-6);
        assert_approx_eq!(f64, solution.dispatch["dear"][1], 50.0, epsilon = 1e-6);
    }

    #[test]
    fn test_no_intervals() {
        assert!(perform_thermal_dispatch(&[], &[], &ThermalParameters::default(), None).is_err());
    }
}
