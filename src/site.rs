//! The renewable generation sites that can be sized by the model.
use serde::{Deserialize, Serialize};
use serde_string_enum::DeserializeLabeledStringEnum;
use strum::{Display, EnumIter, IntoEnumIterator};

/// A solar or wind site
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Display,
    EnumIter,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Site {
    /// Solar in Goa (also drives distributed solar)
    SolarGoa,
    /// Solar in Gujarat
    SolarGujarat,
    /// Solar in Rajasthan
    SolarRajasthan,
    /// Solar in Telangana
    SolarTelangana,
    /// Wind in Maharashtra
    WindMaharashtra,
    /// Wind in Tamil Nadu
    WindTamilNadu,
    /// Wind in Karnataka
    WindKarnataka,
}

/// The kind of generation at a site
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Technology {
    /// Photovoltaic generation
    Solar,
    /// Wind turbines
    Wind,
}

/// How output from a site reaches the grid, which determines its losses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transmission {
    /// The site is in the same state as the demand
    IntraState,
    /// The site is in another state
    InterState,
}

/// A source of measured wind data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, DeserializeLabeledStringEnum, Display)]
pub enum WindSource {
    /// SRI measurements
    #[string = "sri"]
    #[strum(serialize = "sri")]
    Sri,
    /// SECI measurements
    #[string = "seci"]
    #[strum(serialize = "seci")]
    Seci,
}

impl Site {
    /// The technology at this site
    pub fn technology(self) -> Technology {
        match self {
            Site::SolarGoa | Site::SolarGujarat | Site::SolarRajasthan | Site::SolarTelangana => {
                Technology::Solar
            }
            Site::WindMaharashtra | Site::WindTamilNadu | Site::WindKarnataka => Technology::Wind,
        }
    }

    /// How this site is connected to the demand
    pub fn transmission(self) -> Transmission {
        match self {
            Site::SolarGoa | Site::WindMaharashtra => Transmission::IntraState,
            _ => Transmission::InterState,
        }
    }

    /// Iterate over the sites with the given technology
    pub fn iter_technology(technology: Technology) -> impl Iterator<Item = Site> {
        Site::iter().filter(move |site| site.technology() == technology)
    }
}
