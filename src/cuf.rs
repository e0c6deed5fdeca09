//! Calibrates renewable profiles so that each month's capacity utilisation factor (CUF) matches a
//! target.
use crate::error::PlanningError;
use crate::harmonise::Profile;
use crate::site::Site;
use crate::time_series::{SLOTS_PER_HOUR, days_in_month};
use anyhow::{Result, bail};
use chrono::Datelike;
use indexmap::IndexMap;
use log::{info, warn};
use serde::{Deserialize, Serialize};

/// The outcome of calibrating one site for one month
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CufCalibration {
    /// The site that was calibrated
    pub site: Site,
    /// Month of the year (1 to 12)
    pub month: u32,
    /// CUF (%) before calibration
    pub achieved: f64,
    /// Target CUF (%)
    pub target: f64,
    /// Factor that every interval of the month was multiplied by
    pub scale: f64,
}

/// Calculate the CUF (%) of each month with any data.
///
/// `CUF = 100 × (Σ MW / 4) / (capacity × days_in_month × 24)`
pub fn monthly_cuf(profile: &Profile) -> IndexMap<(i32, u32), f64> {
    let mut energy: IndexMap<(i32, u32), f64> = IndexMap::new();
    for (ts, value) in &profile.series {
        *energy.entry((ts.year(), ts.month())).or_default() += value / SLOTS_PER_HOUR;
    }

    energy
        .into_iter()
        .map(|((year, month), energy)| {
            let hours = f64::from(days_in_month(year, month)) * 24.0;
            ((year, month), 100.0 * energy / (profile.capacity * hours))
        })
        .collect()
}

/// Rescale a site's profile so that each month's CUF matches its target.
///
/// Months with no data are skipped. A month whose CUF is zero cannot be rescaled: this is left
/// unchanged with a warning, unless `strict` is set, in which case it is an error.
pub fn calibrate(
    site: Site,
    profile: &mut Profile,
    targets: &[f64; 12],
    strict: bool,
) -> Result<Vec<CufCalibration>> {
    let mut report = Vec::new();
    for ((year, month), achieved) in monthly_cuf(profile) {
        let target = targets[month as usize - 1];
        if achieved == 0.0 {
            let err = PlanningError::NumericDegenerate(format!(
                "CUF of {site} is zero in month {month}, so it cannot be calibrated"
            ));
            if strict {
                bail!(err);
            }
            warn!("{err}");
            report.push(CufCalibration {
                site,
                month,
                achieved,
                target,
                scale: 1.0,
            });
            continue;
        }

        let scale = target / achieved;
        for (_, value) in profile
            .series
            .iter_mut()
            .filter(|(ts, _)| ts.year() == year && ts.month() == month)
        {
            *value *= scale;
        }
        report.push(CufCalibration {
            site,
            month,
            achieved,
            target,
            scale,
        });
    }

    Ok(report)
}

/// Calibrate every site which has a target table.
///
/// Sites without targets are left as they are.
pub fn calibrate_profiles(
    profiles: &mut IndexMap<Site, Profile>,
    targets: &IndexMap<Site, [f64; 12]>,
    strict: bool,
) -> Result<Vec<CufCalibration>> {
    let mut report = Vec::new();
    for (site, profile) in profiles.iter_mut() {
        let Some(site_targets) = targets.get(site) else {
            info!("No CUF targets for {site}; leaving profile uncalibrated");
            continue;
        };
        report.extend(calibrate(*site, profile, site_targets, strict)?);
    }

    Ok(report)
}
