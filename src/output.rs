//! The module responsible for writing output data to disk.
use crate::aggregate::RepresentativePeriod;
use crate::battery::DispatchResult;
use crate::cuf::CufCalibration;
use crate::dataset::IntervalRecord;
use crate::id::{BatteryID, GeneratorID};
use crate::optimisation::sizing::{SizingInput, SizingSolution};
use crate::optimisation::thermal::ThermalSolution;
use crate::weekly::{InterestingWeeks, WeekCategory, WeeklyStats};
use anyhow::{Context, Result, bail, ensure};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fs;
use std::fs::File;
use std::iter;
use std::path::{Path, PathBuf};

pub mod metadata;

/// The root folder in which model-specific output folders will be created
const OUTPUT_DIRECTORY_ROOT: &str = "gridplan_results";

/// The output file name for the merged dataset
const DATASET_FILE_NAME: &str = "demand_and_re.csv";

/// The output file name for battery schedules
const BATTERY_SCHEDULES_FILE_NAME: &str = "battery_schedules.csv";

/// The output file name for the surplus left after each battery
const REMAINING_SURPLUS_FILE_NAME: &str = "remaining_surplus.csv";

/// The output file name for weekly statistics
const WEEKLY_STATS_FILE_NAME: &str = "weekly_stats.csv";

/// The output file name for flagged weeks
const INTERESTING_WEEKS_FILE_NAME: &str = "interesting_weeks.csv";

/// The output file name for the CUF calibration report
const CUF_CALIBRATION_FILE_NAME: &str = "cuf_calibration.csv";

/// The output file name for the thermal dispatch schedule
const THERMAL_DISPATCH_FILE_NAME: &str = "thermal_dispatch.csv";

/// The output file name for the sizing model's per-period trace
const SIZING_TIME_SERIES_FILE_NAME: &str = "sizing_time_series.csv";

/// The output file name for the sizing model's capacities
const SIZING_RESULTS_FILE_NAME: &str = "sizing_results.csv";

/// The output file name for the sizing model's inputs
const REPRESENTATIVE_PROFILES_FILE_NAME: &str = "debug_representative_profiles.csv";

/// The format of timestamps in hand-written CSV files, matching that used by serde
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// The default output folder for a model: a subfolder of `gridplan_results` named after the model
pub fn get_output_dir(model_dir: &Path) -> Result<PathBuf> {
    // Resolve "." and similar to a real folder name
    let model_dir = model_dir
        .canonicalize()
        .with_context(|| format!("Could not resolve model path {}", model_dir.display()))?;
    let Some(model_name) = model_dir.file_name().and_then(|name| name.to_str()) else {
        bail!(
            "Cannot name an output folder after model path {}",
            model_dir.display()
        );
    };

    Ok(Path::new(OUTPUT_DIRECTORY_ROOT).join(model_name))
}

/// Create a new output directory for the model, if it does not already exist.
///
/// A non-empty directory is only reused if `allow_overwrite` is set.
///
/// # Returns
///
/// Whether existing output will be overwritten.
pub fn create_output_directory(output_dir: &Path, allow_overwrite: bool) -> Result<bool> {
    if output_dir.is_dir() {
        let is_empty = fs::read_dir(output_dir)?.next().is_none();
        if is_empty {
            return Ok(false);
        }

        ensure!(
            allow_overwrite,
            "Output folder already exists and is not empty. Use --overwrite to replace its contents."
        );
        return Ok(true);
    }

    // Try to create the directory, with parents
    fs::create_dir_all(output_dir)?;

    Ok(false)
}

/// Represents a row in the battery schedules CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct BatteryScheduleRow {
    timestamp: NaiveDateTime,
    battery: BatteryID,
    charge: f64,
    discharge: f64,
    soc: f64,
}

/// Represents a row in the remaining surplus CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct RemainingSurplusRow {
    timestamp: NaiveDateTime,
    /// Surplus before any battery was dispatched
    original_surplus: f64,
    after_battery: BatteryID,
    remaining_surplus: f64,
}

/// Represents a row in the interesting weeks CSV file
#[derive(Serialize, Debug, PartialEq)]
struct InterestingWeekRow {
    category: WeekCategory,
    week_start: NaiveDate,
}

/// Represents a row in the sizing results CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct SizingResultRow {
    parameter: String,
    value: f64,
}

/// Open a CSV file in the output folder for writing
fn new_writer(output_path: &Path, file_name: &str) -> Result<csv::Writer<File>> {
    let file_path = output_path.join(file_name);
    csv::Writer::from_path(&file_path)
        .with_context(|| format!("Could not create output file {}", file_path.display()))
}

/// An object for writing output data to file.
///
/// The files for the stages which run before optimisation are created up front. The optimisation
/// outputs are only created once there is something to write to them.
pub struct DataWriter {
    output_path: PathBuf,
    dataset_writer: csv::Writer<File>,
    battery_schedules_writer: csv::Writer<File>,
    remaining_surplus_writer: csv::Writer<File>,
    weekly_stats_writer: csv::Writer<File>,
    interesting_weeks_writer: csv::Writer<File>,
    cuf_calibration_writer: csv::Writer<File>,
    save_debug_info: bool,
}

impl DataWriter {
    /// Open CSV files to write output data to
    ///
    /// # Arguments
    ///
    /// * `output_path` - Folder where files will be saved
    /// * `save_debug_info` - Whether to include extra CSV files for debugging model
    pub fn create(output_path: &Path, save_debug_info: bool) -> Result<Self> {
        Ok(Self {
            output_path: output_path.to_path_buf(),
            dataset_writer: new_writer(output_path, DATASET_FILE_NAME)?,
            battery_schedules_writer: new_writer(output_path, BATTERY_SCHEDULES_FILE_NAME)?,
            remaining_surplus_writer: new_writer(output_path, REMAINING_SURPLUS_FILE_NAME)?,
            weekly_stats_writer: new_writer(output_path, WEEKLY_STATS_FILE_NAME)?,
            interesting_weeks_writer: new_writer(output_path, INTERESTING_WEEKS_FILE_NAME)?,
            cuf_calibration_writer: new_writer(output_path, CUF_CALIBRATION_FILE_NAME)?,
            save_debug_info,
        })
    }

    /// Write the merged dataset to a CSV file
    pub fn write_dataset(&mut self, records: &[IntervalRecord]) -> Result<()> {
        for record in records {
            self.dataset_writer.serialize(record)?;
        }

        Ok(())
    }

    /// Write the CUF calibration report to a CSV file
    pub fn write_cuf_calibration(&mut self, report: &[CufCalibration]) -> Result<()> {
        for row in report {
            self.cuf_calibration_writer.serialize(row)?;
        }

        Ok(())
    }

    /// Write weekly statistics and the flagged weeks to CSV files
    pub fn write_weekly_stats(
        &mut self,
        stats: &[WeeklyStats],
        interesting_weeks: &InterestingWeeks,
    ) -> Result<()> {
        for row in stats {
            self.weekly_stats_writer.serialize(row)?;
        }
        for (category, weeks) in interesting_weeks {
            for week_start in weeks {
                let row = InterestingWeekRow {
                    category: *category,
                    week_start: *week_start,
                };
                self.interesting_weeks_writer.serialize(row)?;
            }
        }

        Ok(())
    }

    /// Write battery schedules and the surplus remaining after each battery to CSV files.
    ///
    /// `surplus` is the surplus the batteries were dispatched against.
    pub fn write_battery_dispatch(
        &mut self,
        timestamps: &[NaiveDateTime],
        surplus: &[f64],
        dispatch: &DispatchResult,
    ) -> Result<()> {
        for (schedule, residual) in dispatch.schedules.iter().zip(dispatch.residuals.iter()) {
            for (i, timestamp) in timestamps.iter().enumerate() {
                let row = BatteryScheduleRow {
                    timestamp: *timestamp,
                    battery: schedule.id.clone(),
                    charge: schedule.charge[i],
                    discharge: schedule.discharge[i],
                    soc: schedule.soc[i],
                };
                self.battery_schedules_writer.serialize(row)?;

                let row = RemainingSurplusRow {
                    timestamp: *timestamp,
                    original_surplus: surplus[i],
                    after_battery: schedule.id.clone(),
                    remaining_surplus: residual[i],
                };
                self.remaining_surplus_writer.serialize(row)?;
            }
        }

        Ok(())
    }

    /// Write the thermal dispatch schedule to a CSV file.
    ///
    /// The net demand being met comes first, then one column per generator, followed by unmet
    /// demand. Each row's generator outputs and unmet demand sum to its net demand.
    pub fn write_thermal_dispatch(
        &self,
        timestamps: &[NaiveDateTime],
        net_demand: &[f64],
        solution: &ThermalSolution,
    ) -> Result<()> {
        let mut writer = new_writer(&self.output_path, THERMAL_DISPATCH_FILE_NAME)?;
        let header = ["timestamp".to_string(), "net_demand".to_string()]
            .into_iter()
            .chain(solution.dispatch.keys().map(GeneratorID::to_string))
            .chain(["unmet_demand".to_string()]);
        writer.write_record(header)?;

        for (i, timestamp) in timestamps.iter().enumerate() {
            let values = iter::once(net_demand[i])
                .chain(solution.dispatch.values().map(|output| output[i]))
                .chain([solution.unmet_demand[i]])
                .map(|value| value.to_string());
            let timestamp = timestamp.format(TIMESTAMP_FORMAT).to_string();
            writer.write_record([timestamp].into_iter().chain(values))?;
        }
        writer.flush()?;

        Ok(())
    }

    /// Write the sizing model's per-period trace and capacities to CSV files.
    ///
    /// Battery charge and discharge are netted off against each other, with charging written as a
    /// negative value.
    pub fn write_sizing(&self, solution: &SizingSolution) -> Result<()> {
        let mut writer = new_writer(&self.output_path, SIZING_TIME_SERIES_FILE_NAME)?;
        let header = ["month", "slot"]
            .into_iter()
            .map(String::from)
            .chain(solution.site_output.keys().map(ToString::to_string))
            .chain(
                [
                    "grid_purchase",
                    "battery_discharge",
                    "battery_charge",
                    "remaining_deficit",
                    "original_unmet_demand",
                    "battery_soc",
                ]
                .map(String::from),
            );
        writer.write_record(header)?;

        for (i, (period, (charge, discharge))) in solution
            .periods
            .iter()
            .zip(solution.net_battery_flows())
            .enumerate()
        {
            let values = solution
                .site_output
                .values()
                .map(|output| output[i])
                .chain([
                    solution.grid_purchase[i],
                    discharge,
                    -charge,
                    solution.deficit[i],
                    solution.demand[i],
                    solution.soc[i],
                ]);
            writer.write_record(period_fields(period).chain(values.map(|x| x.to_string())))?;
        }
        writer.flush()?;

        let mut writer = new_writer(&self.output_path, SIZING_RESULTS_FILE_NAME)?;
        let rows = solution
            .capacities
            .iter()
            .map(|(site, capacity)| (site.to_string(), capacity.value()))
            .chain([
                (
                    "battery_capacity".into(),
                    solution.battery_capacity.value(),
                ),
                ("max_charge_rate".into(), solution.max_charge_rate.value()),
                ("total_deficit".into(), solution.total_deficit()),
                ("objective_value".into(), solution.objective_value.value()),
            ]);
        for (parameter, value) in rows {
            writer.serialize(SizingResultRow { parameter, value })?;
        }
        writer.flush()?;

        Ok(())
    }

    /// Write the sizing model's inputs to a CSV file, if debug info is enabled
    pub fn write_debug_representative_profiles(&self, input: &SizingInput) -> Result<()> {
        if !self.save_debug_info {
            return Ok(());
        }

        let mut writer = new_writer(&self.output_path, REPRESENTATIVE_PROFILES_FILE_NAME)?;
        let header = ["month", "slot", "demand", "price"]
            .into_iter()
            .map(String::from)
            .chain(input.profiles.keys().map(ToString::to_string));
        writer.write_record(header)?;

        for (i, period) in input.periods.iter().enumerate() {
            let values = [input.demand[i], input.prices[i]]
                .into_iter()
                .chain(input.profiles.values().map(|profile| profile[i]));
            writer.write_record(period_fields(period).chain(values.map(|x| x.to_string())))?;
        }
        writer.flush()?;

        Ok(())
    }

    /// Flush the underlying streams
    pub fn flush(&mut self) -> Result<()> {
        self.dataset_writer.flush()?;
        self.battery_schedules_writer.flush()?;
        self.remaining_surplus_writer.flush()?;
        self.weekly_stats_writer.flush()?;
        self.interesting_weeks_writer.flush()?;
        self.cuf_calibration_writer.flush()?;

        Ok(())
    }
}

/// The month and slot of a representative period as CSV fields
fn period_fields(period: &RepresentativePeriod) -> impl Iterator<Item = String> {
    [period.month.to_string(), period.slot.to_string()].into_iter()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battery::BatterySchedule;
    use crate::site::Site;
    use crate::units::{Energy, Money, Power};
    use indexmap::IndexMap;
    use itertools::Itertools;
    use itertools::assert_equal;
    use std::iter;
    use tempfile::tempdir;

    fn ts(s: &str) -> NaiveDateTime {
        crate::time_series::parse_timestamp(s).unwrap()
    }

    fn read_lines(path: &Path) -> Vec<String> {
        fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(String::from)
            .collect()
    }

    #[test]
    fn test_create_output_directory() {
        let dir = tempdir().unwrap();
        let output_dir = dir.path().join("results");

        // New directory
        assert!(!create_output_directory(&output_dir, false).unwrap());
        assert!(output_dir.is_dir());

        // Existing, empty directory
        assert!(!create_output_directory(&output_dir, false).unwrap());

        // Existing directory with contents
        fs::write(output_dir.join("file.txt"), "").unwrap();
        assert!(create_output_directory(&output_dir, false).is_err());
        assert!(create_output_directory(&output_dir, true).unwrap());
    }

    #[test]
    fn test_write_battery_dispatch() {
        let dir = tempdir().unwrap();
        let timestamps = [ts("2030-01-01 00:00")];
        let dispatch = DispatchResult {
            schedules: vec![BatterySchedule {
                id: "Battery 1".into(),
                charge: vec![10.0],
                discharge: vec![0.0],
                soc: vec![52.25],
            }],
            residuals: vec![vec![-5.0]],
        };

        {
            let mut writer = DataWriter::create(dir.path(), false).unwrap();
            writer
                .write_battery_dispatch(&timestamps, &[20.0], &dispatch)
                .unwrap();
            writer.flush().unwrap();
        }

        let expected = BatteryScheduleRow {
            timestamp: timestamps[0],
            battery: "Battery 1".into(),
            charge: 10.0,
            discharge: 0.0,
            soc: 52.25,
        };
        let records: Vec<BatteryScheduleRow> =
            csv::Reader::from_path(dir.path().join(BATTERY_SCHEDULES_FILE_NAME))
                .unwrap()
                .into_deserialize()
                .try_collect()
                .unwrap();
        assert_equal(records, iter::once(expected));

        let records: Vec<RemainingSurplusRow> =
            csv::Reader::from_path(dir.path().join(REMAINING_SURPLUS_FILE_NAME))
                .unwrap()
                .into_deserialize()
                .try_collect()
                .unwrap();
        assert_eq!(records[0].original_surplus, 20.0);
        assert_eq!(records[0].remaining_surplus, -5.0);
    }

    #[test]
    fn test_write_thermal_dispatch() {
        let dir = tempdir().unwrap();
        let solution = ThermalSolution {
            dispatch: [
                (GeneratorID::new("G1"), vec![50.0]),
                (GeneratorID::new("G2"), vec![25.5]),
            ]
            .into_iter()
            .collect(),
            unmet_demand: vec![1.0],
            objective_value: Money(0.0),
        };
        let writer = DataWriter::create(dir.path(), false).unwrap();
        writer
            .write_thermal_dispatch(&[ts("2030-01-01 00:15")], &[76.5], &solution)
            .unwrap();

        assert_eq!(
            read_lines(&dir.path().join(THERMAL_DISPATCH_FILE_NAME)),
            [
                "timestamp,net_demand,G1,G2,unmet_demand",
                "2030-01-01T00:15:00,76.5,50,25.5,1"
            ]
        );
    }

    #[test]
    fn test_write_sizing() {
        let dir = tempdir().unwrap();
        let solution = SizingSolution {
            periods: vec![RepresentativePeriod { month: 3, slot: 7 }],
            capacities: [(Site::SolarGujarat, Power(100.0))].into_iter().collect(),
            battery_capacity: Energy(40.0),
            max_charge_rate: Power(4.0),
            site_output: [(Site::SolarGujarat, vec![20.0])].into_iter().collect(),
            grid_purchase: vec![0.0],
            charge: vec![4.0],
            discharge: vec![1.0],
            soc: vec![20.75],
            deficit: vec![2.0],
            demand: vec![21.0],
            objective_value: Money(123.0),
        };
        let writer = DataWriter::create(dir.path(), false).unwrap();
        writer.write_sizing(&solution).unwrap();

        let lines = read_lines(&dir.path().join(SIZING_TIME_SERIES_FILE_NAME));
        assert_eq!(
            lines[0],
            "month,slot,solar_gujarat,grid_purchase,battery_discharge,battery_charge,\
             remaining_deficit,original_unmet_demand,battery_soc"
        );
        assert_eq!(lines[1], "3,7,20,0,0,-3,2,21,20.75");

        let records: Vec<SizingResultRow> =
            csv::Reader::from_path(dir.path().join(SIZING_RESULTS_FILE_NAME))
                .unwrap()
                .into_deserialize()
                .try_collect()
                .unwrap();
        let results: IndexMap<_, _> = records.into_iter().map(|r| (r.parameter, r.value)).collect();
        assert_eq!(results["solar_gujarat"], 100.0);
        assert_eq!(results["total_deficit"], 2.0);
        assert_eq!(results["objective_value"], 123.0);
    }

    #[test]
    fn test_debug_profiles_only_when_enabled() {
        let dir = tempdir().unwrap();
        let input = SizingInput {
            periods: vec![RepresentativePeriod { month: 1, slot: 0 }],
            demand: vec![5.0],
            profiles: [(Site::WindKarnataka, vec![0.5])].into_iter().collect(),
            prices: vec![3000.0],
        };
        let file_path = dir.path().join(REPRESENTATIVE_PROFILES_FILE_NAME);

        let writer = DataWriter::create(dir.path(), false).unwrap();
        writer.write_debug_representative_profiles(&input).unwrap();
        assert!(!file_path.exists());

        let writer = DataWriter::create(dir.path(), true).unwrap();
        writer.write_debug_representative_profiles(&input).unwrap();
        assert_eq!(
            read_lines(&file_path),
            ["month,slot,demand,price,wind_karnataka", "1,0,5,3000,0.5"]
        );
    }
}
