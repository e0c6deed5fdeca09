//! The heuristic battery dispatcher.
//!
//! Fixed-size batteries are simulated one after another in priority order. Each battery sees the
//! surplus left over by the batteries before it: it charges when there is excess generation
//! (negative surplus) and discharges when there is unmet demand (positive surplus).
use crate::id::{BatteryID, check_ids_unique, define_id_getter};
use crate::model::parameters::BatteryParameters;
use crate::time_series::SLOTS_PER_HOUR;
use crate::units::{Energy, Hours, INTERVAL, Power};
use anyhow::Result;
use log::debug;

/// A fixed-size battery
#[derive(Debug, Clone, PartialEq)]
pub struct BatteryConfig {
    /// Name of the battery
    pub id: BatteryID,
    /// Maximum charge or discharge power
    pub power: Power,
    /// Hours of storage at full power
    pub duration: Hours,
}
define_id_getter! {BatteryConfig, BatteryID}

impl BatteryConfig {
    /// The energy the battery can hold
    pub fn energy_capacity(&self) -> Energy {
        self.power * self.duration
    }
}

/// Build the batteries described in the parameters, in priority order.
///
/// Unnamed batteries are called "Battery n" after their position. Names must be unique.
pub fn battery_configs(params: &BatteryParameters) -> Result<Vec<BatteryConfig>> {
    let configs: Vec<_> = params
        .units
        .iter()
        .enumerate()
        .map(|(i, unit)| {
            let id = match &unit.name {
                Some(name) => BatteryID::new(name),
                None => BatteryID::from(format!("Battery {}", i + 1)),
            };
            BatteryConfig {
                id,
                power: unit.power,
                duration: unit.duration,
            }
        })
        .collect();
    check_ids_unique(&configs, "battery")?;

    Ok(configs)
}

/// The simulated operation of one battery.
///
/// All series are aligned with the surplus series that was dispatched against.
#[derive(Debug, Clone, PartialEq)]
pub struct BatterySchedule {
    /// The battery
    pub id: BatteryID,
    /// Charging power (MW)
    pub charge: Vec<f64>,
    /// Discharging power (MW)
    pub discharge: Vec<f64>,
    /// State of charge at the end of each interval (MWh)
    pub soc: Vec<f64>,
}

/// The result of dispatching all batteries
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchResult {
    /// One schedule per battery, in priority order
    pub schedules: Vec<BatterySchedule>,
    /// The surplus remaining after each battery, in priority order
    pub residuals: Vec<Vec<f64>>,
}

impl DispatchResult {
    /// The surplus remaining after every battery has been dispatched
    pub fn final_residual(&self) -> Option<&[f64]> {
        self.residuals.last().map(Vec::as_slice)
    }
}

/// Simulate a single battery against the given surplus.
///
/// Returns the battery's schedule and the surplus left over for the next battery.
fn dispatch_battery(
    battery: &BatteryConfig,
    min_soc: f64,
    efficiency: f64,
    surplus: &[f64],
) -> (BatterySchedule, Vec<f64>) {
    let capacity = battery.energy_capacity().value();
    let power = battery.power.value();
    let soc_floor = capacity * min_soc;
    let hours = INTERVAL.value();

    let mut soc = soc_floor;
    let mut schedule = BatterySchedule {
        id: battery.id.clone(),
        charge: Vec::with_capacity(surplus.len()),
        discharge: Vec::with_capacity(surplus.len()),
        soc: Vec::with_capacity(surplus.len()),
    };
    let mut residual = surplus.to_vec();

    for (value, remaining) in surplus.iter().zip(residual.iter_mut()) {
        let mut charge = 0.0;
        let mut discharge = 0.0;
        if *value < 0.0 {
            charge = value
                .abs()
                .min(power)
                .min((capacity - soc) * SLOTS_PER_HOUR);
            soc = (soc + charge * hours * efficiency).min(capacity);
            *remaining += charge;
        } else if *value > 0.0 && soc > soc_floor {
            discharge = value.min(power).min((soc - soc_floor) * SLOTS_PER_HOUR);
            soc -= discharge * hours;
            *remaining -= discharge * efficiency;
        }

        schedule.charge.push(charge);
        schedule.discharge.push(discharge);
        schedule.soc.push(soc);
    }

    (schedule, residual)
}

/// Dispatch the batteries in priority order.
///
/// Each battery starts at its minimum state of charge. Efficiency is applied both when charging
/// (to the energy stored) and when discharging (to the energy delivered).
///
/// # Arguments
///
/// * `batteries` - The batteries, highest priority first
/// * `min_soc` - Minimum state of charge as a proportion of capacity
/// * `efficiency` - Charge and discharge efficiency
/// * `surplus` - Demand less generation at each interval
pub fn dispatch_batteries(
    batteries: &[BatteryConfig],
    min_soc: f64,
    efficiency: f64,
    surplus: &[f64],
) -> DispatchResult {
    let mut schedules = Vec::with_capacity(batteries.len());
    let mut residuals: Vec<Vec<f64>> = Vec::with_capacity(batteries.len());
    for battery in batteries {
        let current = residuals.last().map_or(surplus, Vec::as_slice);
        let (schedule, residual) = dispatch_battery(battery, min_soc, efficiency, current);
        debug!(
            "{}: charged {:.1} MWh, discharged {:.1} MWh",
            battery.id,
            schedule.charge.iter().sum::<f64>() * INTERVAL.value(),
            schedule.discharge.iter().sum::<f64>() * INTERVAL.value()
        );
        schedules.push(schedule);
        residuals.push(residual);
    }

    DispatchResult {
        schedules,
        residuals,
    }
}
