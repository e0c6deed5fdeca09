//! The renewable and battery sizing MILP.
//!
//! The model chooses the capacity of every renewable site and of a single battery to cover a
//! demand profile over representative periods (each 15-minute slot of each month), with market
//! purchases and penalised deficits available as a last resort.
use super::{Variable, minimise};
use crate::aggregate::{RepresentativePeriod, SlotProfile};
use crate::error::PlanningError;
use crate::input::price::PriceTable;
use crate::model::parameters::ModelParameters;
use crate::site::{Site, Technology};
use crate::time_series::SLOTS_PER_DAY;
use crate::units::{Energy, INTERVAL, Money, Power};
use anyhow::{Result, ensure};
use highs::RowProblem as Problem;
use indexmap::IndexMap;
use log::warn;
use std::ops::Range;

/// The name used for this model in logs and errors
pub const MODEL_NAME: &str = "renewable and battery sizing";

/// State of charge at the start, end and each day boundary, as a proportion of capacity
const SOC_ANCHOR: f64 = 0.5;

/// Minimum state of charge, as a proportion of capacity
const MIN_SOC: f64 = 0.1;

/// Maximum charge or discharge power, as a proportion of capacity
const MAX_POWER_RATIO: f64 = 0.1;

/// Maximum C-rate of the battery
const MAX_C_RATE: f64 = 0.5;

/// Everything the sizing model needs to know about each representative period
#[derive(Debug, Clone, PartialEq)]
pub struct SizingInput {
    /// The periods, ordered by month then slot
    pub periods: Vec<RepresentativePeriod>,
    /// Demand to be met (MW)
    pub demand: Vec<f64>,
    /// Output per MW of capacity at each site
    pub profiles: IndexMap<Site, Vec<f64>>,
    /// Market price for each MWh bought
    pub prices: Vec<f64>,
}

impl SizingInput {
    /// Line up demand, profiles and prices for every period with demand.
    ///
    /// Every site must have a profile value for each of these periods.
    pub fn new(
        demand: &SlotProfile,
        profiles: &IndexMap<Site, SlotProfile>,
        prices: &PriceTable,
    ) -> Result<Self> {
        ensure!(
            !demand.is_empty(),
            PlanningError::DataAlignment("There is no demand for the sizing model".into())
        );

        let periods: Vec<_> = demand.keys().copied().collect();
        let mut site_profiles = IndexMap::new();
        for (site, profile) in profiles {
            let values: Vec<f64> = periods
                .iter()
                .map(|period| {
                    let value = profile.get(period).copied().ok_or_else(|| {
                        PlanningError::DataAlignment(format!(
                            "No {site} output for {period} of the sizing model"
                        ))
                    })?;
                    Ok(value)
                })
                .collect::<Result<_>>()?;
            site_profiles.insert(*site, values);
        }
        let period_prices: Vec<f64> = periods
            .iter()
            .map(|period| Ok(prices.get(period)?.value()))
            .collect::<Result<_>>()?;

        Ok(Self {
            periods,
            demand: demand.values().copied().collect(),
            profiles: site_profiles,
            prices: period_prices,
        })
    }

    fn len(&self) -> usize {
        self.periods.len()
    }
}

/// The variables of the problem, grouped by kind
struct VariableMap {
    capacity: IndexMap<Site, Variable>,
    capacity_idx: Range<usize>,
    battery_capacity: Variable,
    battery_capacity_idx: usize,
    max_charge_rate: Variable,
    max_charge_rate_idx: usize,
    grid: Vec<Variable>,
    grid_idx: Range<usize>,
    charge: Vec<Variable>,
    charge_idx: Range<usize>,
    discharge: Vec<Variable>,
    discharge_idx: Range<usize>,
    soc: Vec<Variable>,
    soc_idx: Range<usize>,
    deficit: Vec<Variable>,
    deficit_idx: Range<usize>,
}

/// Add one column per period and return them with their column range
fn add_period_columns<B>(
    problem: &mut Problem,
    costs: impl Iterator<Item = f64>,
    bounds: B,
) -> (Vec<Variable>, Range<usize>)
where
    B: std::ops::RangeBounds<f64> + Clone,
{
    let start = problem.num_cols();
    let vars = costs
        .map(|cost| problem.add_column(cost, bounds.clone()))
        .collect();

    (vars, start..problem.num_cols())
}

/// Add variables to the problem.
///
/// The cost of energy from each site is its unit cost multiplied by the energy produced over all
/// periods.
fn add_variables(
    problem: &mut Problem,
    input: &SizingInput,
    params: &ModelParameters,
) -> VariableMap {
    let sizing = &params.sizing;
    let n = input.len();

    let start = problem.num_cols();
    let capacity = input
        .profiles
        .iter()
        .map(|(site, profile)| {
            let site_params = params.site(*site);
            let energy: f64 = profile.iter().sum();
            let cost = site_params.unit_cost.value() * energy;
            let min = site_params.min_capacity.value();
            let var = match site_params.max_capacity {
                Some(max) => problem.add_column(cost, min..=max.value()),
                None => problem.add_column(cost, min..),
            };
            (*site, var)
        })
        .collect();
    let capacity_idx = start..problem.num_cols();

    let battery_capacity_idx = problem.num_cols();
    let battery_capacity = problem.add_column(
        sizing.battery_cost.value(),
        0.0..=sizing.max_battery_energy.value(),
    );
    let max_charge_rate_idx = problem.num_cols();
    let max_charge_rate = problem.add_column(0.0, 0.0..);

    let (grid, grid_idx) = add_period_columns(
        problem,
        input.prices.iter().copied(),
        0.0..=sizing.max_grid_purchase.value(),
    );
    let throughput = sizing.throughput_penalty.value();
    let power_bounds = 0.0..=sizing.max_battery_power.value();
    let (charge, charge_idx) =
        add_period_columns(problem, (0..n).map(|_| throughput), power_bounds.clone());
    let (discharge, discharge_idx) =
        add_period_columns(problem, (0..n).map(|_| throughput), power_bounds);
    let (soc, soc_idx) = add_period_columns(problem, (0..n).map(|_| 0.0), 0.0..);
    let penalty = sizing.deficit_penalty.value();
    let (deficit, deficit_idx) = add_period_columns(problem, (0..n).map(|_| penalty), 0.0..);

    // Charging indicator. Nothing constrains it; it only makes this a mixed-integer problem.
    for _ in 0..n {
        problem.add_integer_column(0.0, 0.0..=1.0);
    }

    VariableMap {
        capacity,
        capacity_idx,
        battery_capacity,
        battery_capacity_idx,
        max_charge_rate,
        max_charge_rate_idx,
        grid,
        grid_idx,
        charge,
        charge_idx,
        discharge,
        discharge_idx,
        soc,
        soc_idx,
        deficit,
        deficit_idx,
    }
}

/// Supply (renewables, battery, market and deficit) must match demand in every period.
///
/// If oversized renewables are allowed, supply may exceed demand.
fn add_balance_constraints(
    problem: &mut Problem,
    variables: &VariableMap,
    input: &SizingInput,
    allow_oversized_re: bool,
) {
    let mut terms = Vec::new();
    for (t, demand) in input.demand.iter().enumerate() {
        terms.extend(
            input
                .profiles
                .iter()
                .map(|(site, profile)| (variables.capacity[site], profile[t])),
        );
        terms.push((variables.discharge[t], 1.0));
        terms.push((variables.charge[t], -1.0));
        terms.push((variables.grid[t], 1.0));
        terms.push((variables.deficit[t], 1.0));

        if allow_oversized_re {
            problem.add_row(*demand.., terms.drain(0..));
        } else {
            problem.add_row(*demand..=*demand, terms.drain(0..));
        }
    }
}

/// Battery state of charge dynamics and limits
fn add_battery_constraints(problem: &mut Problem, variables: &VariableMap) {
    let capacity = variables.battery_capacity;
    let rate = variables.max_charge_rate;
    let hours = INTERVAL.value();

    for (t, soc) in variables.soc.iter().copied().enumerate() {
        let charge = variables.charge[t];
        let discharge = variables.discharge[t];

        // soc[t] = soc[t - 1] + (charge - discharge) / 4, starting from the anchor
        let previous = match t {
            0 => (capacity, -SOC_ANCHOR),
            _ => (variables.soc[t - 1], -1.0),
        };
        problem.add_row(
            0.0..=0.0,
            [
                (soc, 1.0),
                previous,
                (charge, -hours),
                (discharge, hours),
            ],
        );

        problem.add_row(..=0.0, [(soc, 1.0), (capacity, -1.0)]);
        problem.add_row(0.0.., [(soc, 1.0), (capacity, -MIN_SOC)]);

        for var in [charge, discharge] {
            problem.add_row(..=0.0, [(var, 1.0), (capacity, -MAX_POWER_RATIO)]);
            problem.add_row(..=0.0, [(var, 1.0), (rate, -1.0)]);
        }
    }

    problem.add_row(..=0.0, [(rate, 1.0), (capacity, -MAX_C_RATE)]);
}

/// The battery must end where it started, both overall and at the end of each complete day.
///
/// At the end of each day, the state of charge must equal that at the end of the previous day (or
/// the starting state of charge, for the first day).
fn add_soc_neutrality_constraints(
    problem: &mut Problem,
    variables: &VariableMap,
    periods: &[RepresentativePeriod],
) {
    let capacity = variables.battery_capacity;
    let soc = &variables.soc;

    if let Some(last) = soc.last() {
        problem.add_row(0.0..=0.0, [(*last, 1.0), (capacity, -SOC_ANCHOR)]);
    }

    let mut start_of_day = (capacity, -SOC_ANCHOR);
    for (period, var) in periods.iter().zip(soc) {
        if period.is_end_of_day() {
            problem.add_row(0.0..=0.0, [(*var, 1.0), start_of_day]);
            start_of_day = (*var, -1.0);
        }
    }
}

/// Keep total solar and total wind capacity within their configured ranges
fn add_technology_constraints(
    problem: &mut Problem,
    variables: &VariableMap,
    params: &ModelParameters,
) {
    let sizing = &params.sizing;
    let limits = [
        (
            Technology::Solar,
            sizing.min_total_solar..=sizing.max_total_solar,
        ),
        (
            Technology::Wind,
            sizing.min_total_wind..=sizing.max_total_wind,
        ),
    ];
    for (technology, limits) in limits {
        let terms: Vec<_> = variables
            .capacity
            .iter()
            .filter(|(site, _)| site.technology() == technology)
            .map(|(_, var)| (*var, 1.0))
            .collect();
        problem.add_row(limits.start().value()..=limits.end().value(), terms);
    }
}

/// The solution to the sizing problem
#[derive(Debug, Clone, PartialEq)]
pub struct SizingSolution {
    /// The periods, in the same order as the input
    pub periods: Vec<RepresentativePeriod>,
    /// Capacity chosen for each site
    pub capacities: IndexMap<Site, Power>,
    /// Energy capacity of the battery
    pub battery_capacity: Energy,
    /// Maximum charge or discharge rate of the battery
    pub max_charge_rate: Power,
    /// Output (MW) of each site in each period
    pub site_output: IndexMap<Site, Vec<f64>>,
    /// Market purchases (MW)
    pub grid_purchase: Vec<f64>,
    /// Charging power (MW)
    pub charge: Vec<f64>,
    /// Discharging power (MW)
    pub discharge: Vec<f64>,
    /// State of charge (MWh) at the end of each period
    pub soc: Vec<f64>,
    /// Demand (MW) left unmet
    pub deficit: Vec<f64>,
    /// The demand that was to be met (MW)
    pub demand: Vec<f64>,
    /// Value of the objective function
    pub objective_value: Money,
}

impl SizingSolution {
    /// Total deficit over all periods (MW summed over periods)
    pub fn total_deficit(&self) -> f64 {
        self.deficit.iter().sum()
    }

    /// Charge and discharge in each period with one netted off against the other.
    ///
    /// Returns `(charge, discharge)` pairs, at most one of which is non-zero.
    pub fn net_battery_flows(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.charge
            .iter()
            .zip(self.discharge.iter())
            .map(|(charge, discharge)| {
                let net = charge - discharge;
                (net.max(0.0), (-net).max(0.0))
            })
    }
}

/// Perform the sizing optimisation.
///
/// # Arguments
///
/// * `input` - Demand, profiles and prices for each representative period
/// * `params` - Model parameters
pub fn perform_sizing(input: &SizingInput, params: &ModelParameters) -> Result<SizingSolution> {
    if input.len() % SLOTS_PER_DAY != 0 {
        warn!(
            "The sizing model has {} periods, which is not a whole number of days",
            input.len()
        );
    }

    let mut problem = Problem::default();
    let variables = add_variables(&mut problem, input, params);
    add_balance_constraints(
        &mut problem,
        &variables,
        input,
        params.sizing.allow_oversized_re,
    );
    add_battery_constraints(&mut problem, &variables);
    add_soc_neutrality_constraints(&mut problem, &variables, &input.periods);
    add_technology_constraints(&mut problem, &variables, params);

    let solved = minimise(problem, MODEL_NAME, params.solver_time_limit)?;
    let solution = solved.get_solution();
    let columns = solution.columns();
    let value = |var_idx: usize| columns[var_idx];

    let capacities: IndexMap<_, _> = variables
        .capacity
        .keys()
        .zip(variables.capacity_idx.clone())
        .map(|(site, idx)| (*site, Power(value(idx))))
        .collect();
    let site_output = input
        .profiles
        .iter()
        .map(|(site, profile)| {
            let capacity = capacities[site].value();
            (*site, profile.iter().map(|x| x * capacity).collect())
        })
        .collect();

    Ok(SizingSolution {
        periods: input.periods.clone(),
        capacities,
        battery_capacity: Energy(value(variables.battery_capacity_idx)),
        max_charge_rate: Power(value(variables.max_charge_rate_idx)),
        site_output,
        grid_purchase: columns[variables.grid_idx].to_vec(),
        charge: columns[variables.charge_idx].to_vec(),
        discharge: columns[variables.discharge_idx].to_vec(),
        soc: columns[variables.soc_idx].to_vec(),
        deficit: columns[variables.deficit_idx].to_vec(),
        demand: input.demand.clone(),
        objective_value: Money(solved.objective_value()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::find_planning_error;
    use crate::fixture::model_parameters;
    use float_cmp::assert_approx_eq;
    use rstest::rstest;
    use strum::IntoEnumIterator;

    /// Two days in June: solar output around midday, wind nowhere, constant demand
    fn input(demand: f64) -> SizingInput {
        let periods: Vec<_> = (0..2 * SLOTS_PER_DAY)
            .map(|i| RepresentativePeriod {
                month: 6,
                slot: i % SLOTS_PER_DAY,
            })
            .collect();
        let solar: Vec<f64> = periods
            .iter()
            .map(|p| if (40..56).contains(&p.slot) { 0.8 } else { 0.0 })
            .collect();
        let profiles = Site::iter()
            .map(|site| match site.technology() {
                Technology::Solar => (site, solar.clone()),
                Technology::Wind => (site, vec![0.1; periods.len()]),
            })
            .collect();

        SizingInput {
            demand: vec![demand; periods.len()],
            prices: vec![5000.0; periods.len()],
            periods,
            profiles,
        }
    }

    #[rstest]
    fn test_soc_neutrality(mut model_parameters: ModelParameters) {
        model_parameters.sizing.allow_oversized_re = true;
        let solution = perform_sizing(&input(50.0), &model_parameters).unwrap();

        let anchor = 0.5 * solution.battery_capacity.value();
        assert_approx_eq!(f64, solution.soc[95], anchor, epsilon = 1e-6);
        assert_approx_eq!(f64, solution.soc[191], solution.soc[95], epsilon = 1e-6);
        for soc in &solution.soc {
            assert!(*soc <= solution.battery_capacity.value() + 1e-6);
            assert!(*soc >= 0.1 * solution.battery_capacity.value() - 1e-6);
        }
    }

    #[rstest]
    fn test_soc_neutrality_part_day(mut model_parameters: ModelParameters) {
        model_parameters.sizing.allow_oversized_re = true;

        // Start at midday, so days end at the 48th and last periods
        let mut input = input(50.0);
        let skip = SLOTS_PER_DAY / 2;
        input.periods.drain(..skip);
        input.demand.drain(..skip);
        input.prices.drain(..skip);
        for profile in input.profiles.values_mut() {
            profile.drain(..skip);
        }
        let solution = perform_sizing(&input, &model_parameters).unwrap();

        let anchor = 0.5 * solution.battery_capacity.value();
        let end_of_first_day = SLOTS_PER_DAY - skip - 1;
        assert!(input.periods[end_of_first_day].is_end_of_day());
        assert_approx_eq!(f64, solution.soc[end_of_first_day], anchor, epsilon = 1e-6);
        assert_approx_eq!(
            f64,
            *solution.soc.last().unwrap(),
            solution.soc[end_of_first_day],
            epsilon = 1e-6
        );
    }

    #[rstest]
    fn test_balance(mut model_parameters: ModelParameters) {
        model_parameters.sizing.allow_oversized_re = false;
        let input = input(50.0);
        let solution = perform_sizing(&input, &model_parameters).unwrap();

        for t in 0..input.len() {
            let supply: f64 = solution.site_output.values().map(|output| output[t]).sum::<f64>()
                + solution.discharge[t]
                - solution.charge[t]
                + solution.grid_purchase[t]
                + solution.deficit[t];
            assert_approx_eq!(f64, supply, 50.0, epsilon = 1e-5);
        }
        for (site, capacity) in &solution.capacities {
            assert!(*capacity >= model_parameters.site(*site).min_capacity - Power(1e-6));
        }
    }

    #[rstest]
    fn test_infeasible(mut model_parameters: ModelParameters) {
        // Renewable output which can be neither used nor stored
        model_parameters.sizing.allow_oversized_re = false;
        model_parameters.sizing.max_battery_energy = Energy(0.0);
        model_parameters.sizing.min_total_solar = Power(100.0);
        model_parameters.sizing.max_total_solar = Power(200.0);
        let err = perform_sizing(&input(0.0), &model_parameters).unwrap_err();
        assert!(matches!(
            find_planning_error(&err),
            Some(PlanningError::InfeasibleModel { .. })
        ));
    }

    #[test]
    fn test_net_battery_flows() {
        let solution = SizingSolution {
            periods: Vec::new(),
            capacities: IndexMap::new(),
            battery_capacity: Energy(0.0),
            max_charge_rate: Power(0.0),
            site_output: IndexMap::new(),
            grid_purchase: Vec::new(),
            charge: vec![10.0, 2.0, 0.0],
            discharge: vec![4.0, 6.0, 0.0],
            soc: Vec::new(),
            deficit: vec![1.0, 2.0, 0.5],
            demand: Vec::new(),
            objective_value: Money(0.0),
        };
        let flows: Vec<_> = solution.net_battery_flows().collect();
        assert_eq!(flows, [(6.0, 0.0), (0.0, 4.0), (0.0, 0.0)]);
        assert_approx_eq!(f64, solution.total_deficit(), 3.5);
    }

    #[test]
    fn test_sizing_input_missing_profile() {
        let period = RepresentativePeriod { month: 1, slot: 0 };
        let demand: SlotProfile = [(period, 10.0)].into_iter().collect();
        let profiles = [(Site::SolarGoa, SlotProfile::new())].into_iter().collect();
        let prices: PriceTable = [crate::units::MoneyPerEnergy(1.0)].into_iter().collect();
        let err = SizingInput::new(&demand, &profiles, &prices).unwrap_err();
        assert!(matches!(
            find_planning_error(&err),
            Some(PlanningError::DataAlignment(_))
        ));
    }
}
