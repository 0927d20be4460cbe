//! Emission estimation for transport options
//!
//! Derives the per-passenger emission stored on a segment, the category
//! breakdown shown next to each option, and the carpool consolidation
//! applied to the raw option list returned by the transport factor service.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::{FootprintEntry, TransportOption};

pub const MIN_PASSENGERS: u8 = 1;
pub const MAX_PASSENGERS: u8 = 4;

pub const CARPOOL_COMBUSTION_ID: &str = "carpool-combustion";
pub const CARPOOL_COMBUSTION_NAME: &str = "Carpool Combustion";
pub const CARPOOL_ELECTRIC_ID: &str = "carpool-electric";
pub const CARPOOL_ELECTRIC_NAME: &str = "Carpool Electric";

/// Catalog entries whose footprint is reused by the consolidated carpools
const COMBUSTION_CAR_NAME: &str = "Combustion car";
const ELECTRIC_CAR_NAME: &str = "Electric car";

/// Number of people sharing a carpool, always within `[1, 4]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct PassengerCount(u8);

impl PassengerCount {
    /// Clamp any requested count into `[1, 4]`
    #[must_use]
    pub fn new(requested: i64) -> Self {
        let clamped = requested.clamp(i64::from(MIN_PASSENGERS), i64::from(MAX_PASSENGERS));
        // clamped always fits in u8
        Self(clamped as u8)
    }

    /// Step the count up or down, staying within bounds
    #[must_use]
    pub fn adjust(self, change: i64) -> Self {
        Self::new(i64::from(self.0).saturating_add(change))
    }

    #[must_use]
    pub fn get(self) -> u8 {
        self.0
    }

    pub fn can_decrease(self) -> bool {
        self.0 > MIN_PASSENGERS
    }

    pub fn can_increase(self) -> bool {
        self.0 < MAX_PASSENGERS
    }
}

impl Default for PassengerCount {
    fn default() -> Self {
        Self(MIN_PASSENGERS)
    }
}

impl<'de> Deserialize<'de> for PassengerCount {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        Ok(Self::new(i64::deserialize(deserializer)?))
    }
}

/// Carpool variants share their emission across passengers
#[must_use]
pub fn is_carpool(option: &TransportOption) -> bool {
    option.normalized_name().contains("carpool")
}

/// Headline emission for an option. Carpool variants divide the baseline
/// by the passenger count, everything else passes through unchanged.
#[must_use]
pub fn emission_per_passenger(option: &TransportOption, passengers: PassengerCount) -> f64 {
    if is_carpool(option) {
        option.value / f64::from(passengers.get())
    } else {
        option.value
    }
}

/// Footprint categories reported by the transport factor service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FootprintCategory {
    Construction,
    Consumption,
    CondensationTrails,
    Other,
}

impl FootprintCategory {
    #[must_use]
    pub fn from_id(id: u32) -> Self {
        match id {
            4 => Self::Construction,
            5 => Self::Consumption,
            6 => Self::CondensationTrails,
            _ => Self::Other,
        }
    }

    /// Consumption and condensation trails are reported per kilometre
    #[must_use]
    pub fn is_per_km(self) -> bool {
        matches!(self, Self::Consumption | Self::CondensationTrails)
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Construction => "Construction",
            Self::Consumption => "Consumption",
            Self::CondensationTrails => "Condensation trails",
            Self::Other => "Other",
        }
    }
}

/// Contribution of one category for a given distance
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BreakdownLine {
    pub id: u32,
    pub category: FootprintCategory,
    pub contribution: f64,
}

/// Category breakdown of an option, display only
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Breakdown {
    pub lines: Vec<BreakdownLine>,
    pub total: f64,
}

/// Per-category contributions for `distance_km`. Per-km categories are
/// multiplied by the distance; the rest are taken as-is.
///
/// Independent of the carpool division applied to the headline value.
#[must_use]
pub fn breakdown(entries: &[FootprintEntry], distance_km: f64) -> Breakdown {
    let lines: Vec<BreakdownLine> = entries
        .iter()
        .map(|entry| {
            let category = FootprintCategory::from_id(entry.id);
            let contribution = if category.is_per_km() {
                entry.value * distance_km
            } else {
                entry.value
            };
            BreakdownLine {
                id: entry.id,
                category,
                contribution,
            }
        })
        .collect();
    let total = lines.iter().map(|line| line.contribution).sum();
    Breakdown { lines, total }
}

/// How emission values are rendered. Values are never stored rounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EmissionDisplay {
    /// Two decimals, `12.35 kg CO2e`
    #[default]
    Kilograms,
    /// Whole kilograms, `12 kg CO2e`
    Whole,
}

impl EmissionDisplay {
    #[must_use]
    pub fn format(self, kg: f64) -> String {
        match self {
            Self::Kilograms => format!("{kg:.2} kg CO2e"),
            Self::Whole => format!("{:.0} kg CO2e", kg.round()),
        }
    }
}

/// Where consolidated options take their category breakdown from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BreakdownStrategy {
    /// Look the option up by name in the footprint catalog (`footprintDetail`)
    #[default]
    FootprintCatalog,
    /// Keep the `details` list returned alongside each option
    InlineDetails,
}

impl fmt::Display for BreakdownStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FootprintCatalog => write!(f, "footprint-catalog"),
            Self::InlineDetails => write!(f, "inline-details"),
        }
    }
}

/// Merge per-vehicle carpool entries into at most one combustion and one
/// electric carpool. Non-carpool options keep their order and come first.
#[must_use]
pub fn consolidate_carpools(options: Vec<TransportOption>) -> Vec<TransportOption> {
    let mut combustion: Option<TransportOption> = None;
    let mut electric: Option<TransportOption> = None;
    let mut result = Vec::with_capacity(options.len());

    for option in options {
        if !is_carpool(&option) {
            result.push(option);
            continue;
        }
        let slot = if option.normalized_name().contains("electric") {
            &mut electric
        } else {
            &mut combustion
        };
        if slot.is_none() {
            *slot = Some(option);
        }
    }

    if let Some(mut option) = combustion {
        option.id = CARPOOL_COMBUSTION_ID.to_string();
        option.name = CARPOOL_COMBUSTION_NAME.to_string();
        result.push(option);
    }
    if let Some(mut option) = electric {
        option.id = CARPOOL_ELECTRIC_ID.to_string();
        option.name = CARPOOL_ELECTRIC_NAME.to_string();
        result.push(option);
    }

    result
}

/// Catalog row used to enrich consolidated options
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogEntry {
    pub name: String,
    pub slug: String,
    pub footprint: Vec<FootprintEntry>,
}

/// Replace breakdown and slug of each option with the catalog entry of the
/// same name. Carpools borrow the matching car entry. Options without a
/// catalog match end up with an empty breakdown and slug.
#[must_use]
pub fn attach_catalog_breakdowns(
    options: Vec<TransportOption>,
    catalog: &[CatalogEntry],
) -> Vec<TransportOption> {
    options
        .into_iter()
        .map(|mut option| {
            let lookup = match option.name.as_str() {
                CARPOOL_COMBUSTION_NAME => COMBUSTION_CAR_NAME,
                CARPOOL_ELECTRIC_NAME => ELECTRIC_CAR_NAME,
                name => name,
            };
            match catalog.iter().find(|entry| entry.name == lookup) {
                Some(entry) => {
                    option.breakdown = entry.footprint.clone();
                    option.slug = entry.slug.clone();
                }
                None => {
                    option.breakdown = Vec::new();
                    option.slug = String::new();
                }
            }
            option
        })
        .collect()
}

/// Emission figures for one candidate option
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmissionEstimate {
    /// Emission stored on the segment (per passenger for carpools)
    pub emissions_kg: f64,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub passengers: Option<PassengerCount>,
    pub breakdown: Breakdown,
}

/// Computes the displayed and stored emission for an option
#[derive(Debug, Clone, Copy, Default)]
pub struct EmissionEstimator {
    display: EmissionDisplay,
}

impl EmissionEstimator {
    #[must_use]
    pub fn new(display: EmissionDisplay) -> Self {
        Self { display }
    }

    /// `passengers` is ignored for non-carpool options
    #[must_use]
    pub fn estimate(
        &self,
        option: &TransportOption,
        distance_km: f64,
        passengers: PassengerCount,
    ) -> EmissionEstimate {
        let emissions_kg = emission_per_passenger(option, passengers);
        EmissionEstimate {
            emissions_kg,
            label: self.display.format(emissions_kg),
            passengers: is_carpool(option).then_some(passengers),
            breakdown: breakdown(&option.breakdown, distance_km),
        }
    }
}
