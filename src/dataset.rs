//! The merged dataset: demand and production by source at every interval of the target year.
use crate::error::PlanningError;
use crate::harmonise::Profile;
use crate::model::parameters::{DateRange, ModelParameters};
use crate::site::Site;
use crate::time_series::TimeSeries;
use anyhow::{Result, ensure};
use chrono::NaiveDateTime;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::ops::Range;
use strum::IntoEnumIterator;

/// Demand and production (all in MW) for one 15-minute interval
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct IntervalRecord {
    /// The start of the interval
    pub timestamp: NaiveDateTime,
    /// Total demand
    pub total_demand: f64,
    /// Solar in Goa
    pub solar_goa: f64,
    /// Solar in Gujarat
    pub solar_gujarat: f64,
    /// Solar in Rajasthan
    pub solar_rajasthan: f64,
    /// Solar in Telangana
    pub solar_telangana: f64,
    /// Distributed solar in Goa
    pub dre: f64,
    /// Wind in Maharashtra
    pub wind_maharashtra: f64,
    /// Wind in Tamil Nadu
    pub wind_tamil_nadu: f64,
    /// Wind in Karnataka
    pub wind_karnataka: f64,
    /// Nuclear
    pub nuclear: f64,
    /// Biomass
    pub biomass: f64,
    /// Gas
    pub gas: f64,
    /// Round-the-clock supply
    pub rtc: f64,
    /// All solar, including distributed solar
    pub total_solar: f64,
    /// All wind
    pub total_wind: f64,
    /// Solar, wind, biomass, nuclear and round-the-clock supply
    pub renewable: f64,
    /// Surplus, floored at zero
    pub net_demand: f64,
    /// Demand less renewables and gas (negative when there is excess generation)
    pub surplus: f64,
}

impl IntervalRecord {
    /// Production at the given site
    pub fn site_output(&self, site: Site) -> f64 {
        match site {
            Site::SolarGoa => self.solar_goa,
            Site::SolarGujarat => self.solar_gujarat,
            Site::SolarRajasthan => self.solar_rajasthan,
            Site::SolarTelangana => self.solar_telangana,
            Site::WindMaharashtra => self.wind_maharashtra,
            Site::WindTamilNadu => self.wind_tamil_nadu,
            Site::WindKarnataka => self.wind_karnataka,
        }
    }

    fn site_output_mut(&mut self, site: Site) -> &mut f64 {
        match site {
            Site::SolarGoa => &mut self.solar_goa,
            Site::SolarGujarat => &mut self.solar_gujarat,
            Site::SolarRajasthan => &mut self.solar_rajasthan,
            Site::SolarTelangana => &mut self.solar_telangana,
            Site::WindMaharashtra => &mut self.wind_maharashtra,
            Site::WindTamilNadu => &mut self.wind_tamil_nadu,
            Site::WindKarnataka => &mut self.wind_karnataka,
        }
    }

    /// Fill in the totals, `renewable`, `surplus` and `net_demand` from the other fields
    pub fn update_totals(&mut self) {
        self.total_solar = self.solar_goa
            + self.solar_gujarat
            + self.solar_rajasthan
            + self.solar_telangana
            + self.dre;
        self.total_wind = self.wind_maharashtra + self.wind_tamil_nadu + self.wind_karnataka;
        self.renewable =
            self.total_solar + self.total_wind + self.biomass + self.nuclear + self.rtc;
        self.surplus = self.total_demand - self.renewable - self.gas;
        self.net_demand = self.surplus.max(0.0);
    }
}

/// The merged dataset
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Dataset {
    /// One record per demand interval, in chronological order
    pub records: Vec<IntervalRecord>,
    /// Delivered output per MW of capacity at each site, aligned with `records`
    pub per_mw: IndexMap<Site, Vec<f64>>,
}

impl Dataset {
    /// Build the dataset from projected demand and calibrated profiles.
    ///
    /// Site output is the profile rescaled to the site's installed capacity, less transmission
    /// losses. Distributed solar follows the Goa profile and has intra-state losses.
    pub fn build(
        demand: &TimeSeries,
        profiles: &IndexMap<Site, Profile>,
        params: &ModelParameters,
    ) -> Result<Dataset> {
        ensure!(
            !demand.is_empty(),
            PlanningError::DataAlignment("There is no demand data in the target year".into())
        );

        let must_run = &params.must_run;
        let mut per_mw: IndexMap<Site, Vec<f64>> = Site::iter()
            .map(|site| (site, Vec::with_capacity(demand.len())))
            .collect();
        let mut records = Vec::with_capacity(demand.len());
        for (timestamp, total_demand) in demand {
            let mut record = IntervalRecord {
                timestamp: *timestamp,
                total_demand: *total_demand,
                nuclear: must_run.nuclear.value(),
                biomass: must_run.biomass.value(),
                gas: must_run.gas.value(),
                rtc: must_run.rtc.value(),
                ..Default::default()
            };

            for (site, profile) in profiles {
                let delivered = profile.get(timestamp)? / profile.capacity
                    * (1.0 - params.loss(*site).value());
                per_mw[site].push(delivered);
                *record.site_output_mut(*site) =
                    delivered * params.site(*site).installed_capacity.value();
            }
            if let Some(goa) = profiles.get(&Site::SolarGoa) {
                record.dre = goa.get(timestamp)? / goa.capacity
                    * must_run.dre_goa.value()
                    * (1.0 - params.losses.intra_state);
            }

            record.update_totals();
            records.push(record);
        }

        Ok(Dataset { records, per_mw })
    }

    /// The index range of the records within the given window of days
    pub fn window(&self, window: &DateRange) -> Result<Range<usize>> {
        let start = self
            .records
            .partition_point(|r| r.timestamp.date() < window.start);
        let end = self
            .records
            .partition_point(|r| r.timestamp.date() <= window.end);
        ensure!(
            start < end,
            PlanningError::DataAlignment(format!(
                "No demand data between {} and {}",
                window.start, window.end
            ))
        );

        Ok(start..end)
    }

    /// The surplus at each interval of the given range
    pub fn surplus(&self, range: Range<usize>) -> Vec<f64> {
        self.records[range].iter().map(|r| r.surplus).collect()
    }

    /// The net demand at each interval of the given range
    pub fn net_demand(&self, range: Range<usize>) -> Vec<f64> {
        self.records[range].iter().map(|r| r.net_demand).collect()
    }

    /// The timestamps of the given range
    pub fn timestamps(&self, range: Range<usize>) -> Vec<NaiveDateTime> {
        self.records[range].iter().map(|r| r.timestamp).collect()
    }
}
