//! Code for reading day-ahead market (GDAM) clearing prices.
use super::{input_err_msg, parse_number};
use crate::aggregate::RepresentativePeriod;
use crate::error::PlanningError;
use crate::time_series::SLOTS_PER_DAY;
use crate::units::MoneyPerEnergy;
use anyhow::{Context, Result, ensure};
use std::path::Path;

/// Average clearing prices for each representative period of the year.
///
/// Row `i` of the price file holds the price for month `i / 96 + 1` at slot `i % 96`.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceTable(Vec<MoneyPerEnergy>);

impl PriceTable {
    /// Get the price for the given representative period
    pub fn get(&self, period: &RepresentativePeriod) -> Result<MoneyPerEnergy> {
        let index = (period.month as usize - 1) * SLOTS_PER_DAY + period.slot;
        let price = self.0.get(index).copied().ok_or_else(|| {
            PlanningError::DataAlignment(format!(
                "No market price for month {} slot {}",
                period.month, period.slot
            ))
        })?;

        Ok(price)
    }
}

impl FromIterator<MoneyPerEnergy> for PriceTable {
    fn from_iter<I: IntoIterator<Item = MoneyPerEnergy>>(iter: I) -> Self {
        PriceTable(iter.into_iter().collect())
    }
}

/// The name of the price column for the given year
fn price_column_name(year: u32) -> String {
    format!("Average of MCP {year}")
}

/// Read prices for the given year from the price file
pub fn read_prices(file_path: &Path, year: u32) -> Result<PriceTable> {
    read_prices_internal(file_path, year).with_context(|| input_err_msg(file_path))
}

fn read_prices_internal(file_path: &Path, year: u32) -> Result<PriceTable> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(file_path)?;
    let column_name = price_column_name(year);
    let column = reader
        .headers()?
        .iter()
        .position(|header| header == column_name)
        .ok_or_else(|| {
            PlanningError::Configuration(format!("Price file has no column '{column_name}'"))
        })?;

    let mut prices = Vec::new();
    for record in reader.records() {
        let record = record?;
        let value = record.get(column).context("Missing price value")?;
        let price = parse_number(value)?;
        ensure!(price.is_finite(), "Prices must be finite numbers");
        prices.push(MoneyPerEnergy(price));
    }
    ensure!(!prices.is_empty(), "Price file contains no prices");

    Ok(PriceTable(prices))
}
