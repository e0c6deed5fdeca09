//! Fixtures for tests
use crate::model::parameters::{MODEL_PARAMETERS_FILE_NAME, ModelParameters};
use crate::time_series::SLOTS_PER_DAY;
use itertools::Itertools;
use rstest::fixture;
use std::fs;
use tempfile::TempDir;

/// Assert that an error with the given message occurs
macro_rules! assert_error {
    ($result:expr, $msg:expr) => {
        assert_eq!(
            $result.unwrap_err().chain().next().unwrap().to_string(),
            $msg
        );
    };
}
pub(crate) use assert_error;

/// The year of the historical input data
const BASE_YEAR: i32 = 2023;

#[fixture]
pub fn model_toml() -> String {
    r#"solver_time_limit = 60.0

[files]
demand = "demand.csv"
wind_sri = "wind_sri.csv"
wind_seci = "wind_seci.csv"
solar_goa = "solar_goa.csv"
solar_gujarat = "solar_gujarat.csv"
solar_rajasthan = "solar_rajasthan.csv"
solar_telangana = "solar_telangana.csv"
generators = "generators.csv"
gdam_prices = "prices.csv"

[demand]
annual_demand_mus = 8000.0

[timeline]
start = "2030-06-01"
end = "2030-06-01"

[sites.solar_goa]
installed_capacity = 50.0
unit_cost = 2500.0

[sites.solar_gujarat]
installed_capacity = 200.0
unit_cost = 2600.0

[sites.solar_rajasthan]
installed_capacity = 200.0
unit_cost = 2550.0

[sites.solar_telangana]
installed_capacity = 100.0
unit_cost = 2700.0

[sites.wind_maharashtra]
installed_capacity = 100.0
unit_cost = 3300.0

[sites.wind_tamil_nadu]
installed_capacity = 150.0
unit_cost = 3200.0
wind_source = "seci"

[sites.wind_karnataka]
installed_capacity = 100.0
unit_cost = 3400.0
"#
    .into()
}

#[fixture]
pub fn model_parameters(model_toml: String) -> ModelParameters {
    toml::from_str(&model_toml).unwrap()
}

/// Demand for one day, peaking in the evening
fn demand_csv() -> String {
    let rows = (0..SLOTS_PER_DAY).map(|slot| {
        let hour = slot / 4;
        let minute = (slot % 4) * 15;
        let demand = if (18..22).contains(&hour) { 1100.0 } else { 800.0 };
        format!("{BASE_YEAR}-06-01 {hour:02}:{minute:02},{demand}")
    });
    ["timestamp,total_demand".to_string()]
        .into_iter()
        .chain(rows)
        .join("\n")
}

/// Hourly solar output for a 1 MW installation over one day
fn solar_csv() -> String {
    let rows = (0..24).map(|hour| {
        let output = if (7..18).contains(&hour) { 0.6 } else { 0.0 };
        format!("{BASE_YEAR}-06-01 {hour:02}:00,{output}")
    });
    ["local_time,electricity".to_string()]
        .into_iter()
        .chain(rows)
        .join("\n")
}

/// One day of measured wind output, one column per slot
fn wind_csv() -> String {
    let header = (0..SLOTS_PER_DAY).map(|slot| {
        let (hour, minute) = (slot / 4, (slot % 4) * 15);
        format!("{hour:02}:{minute:02}")
    });
    let header = ["Date".to_string()].into_iter().chain(header).join(",");
    let row = [format!("{BASE_YEAR}-06-01")]
        .into_iter()
        .chain((0..SLOTS_PER_DAY).map(|_| "12.0".to_string()))
        .join(",");

    format!("{header}\n{row}")
}

/// Prices for every month and slot
fn prices_csv() -> String {
    let rows = (0..12 * SLOTS_PER_DAY)
        .map(|i| format!("{},{}", i / SLOTS_PER_DAY + 1, 4000 + i % 7));
    [format!("Month,Average of MCP {BASE_YEAR}")]
        .into_iter()
        .chain(rows)
        .join("\n")
}

/// A model directory with every input file present
#[fixture]
pub fn model_dir(model_toml: String) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let write = |name: &str, contents: String| {
        fs::write(dir.path().join(name), contents).unwrap();
    };

    write(MODEL_PARAMETERS_FILE_NAME, model_toml);
    write("demand.csv", demand_csv());
    for region in ["goa", "gujarat", "rajasthan", "telangana"] {
        write(&format!("solar_{region}.csv"), solar_csv());
    }
    write("wind_sri.csv", wind_csv());
    write("wind_seci.csv", wind_csv());
    write(
        "generators.csv",
        "id,capacity,variable_cost\ncoal,600.0,3000.0\ngas_turbine,300.0,6000.0".into(),
    );
    write("prices.csv", prices_csv());

    dir
}
