//! Transport option model

use serde::{Deserialize, Deserializer, Serialize};

/// One footprint category entry attached to a transport option
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct FootprintEntry {
    /// Category id as reported by the transport factor service
    pub id: u32,
    /// Raw factor value
    #[serde(deserialize_with = "number_or_string")]
    pub value: f64,
}

/// A transport choice with its baseline emission for a given distance
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TransportOption {
    pub id: String,
    pub name: String,
    /// Category slug, empty when the catalog has none
    #[serde(default)]
    pub slug: String,
    /// Baseline emission in kg CO2e for the requested distance
    pub value: f64,
    pub unit: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Category-level breakdown factors
    #[serde(default)]
    pub breakdown: Vec<FootprintEntry>,
}

impl TransportOption {
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, value: f64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            slug: String::new(),
            value,
            unit: "kg CO2e".to_string(),
            description: None,
            breakdown: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_breakdown(mut self, breakdown: Vec<FootprintEntry>) -> Self {
        self.breakdown = breakdown;
        self
    }

    /// Lower-cased name used for carpool detection and availability matching
    #[must_use]
    pub fn normalized_name(&self) -> String {
        self.name.to_lowercase()
    }
}

/// The transport factor service returns numeric fields either as JSON
/// numbers or as strings.
pub(crate) fn number_or_string<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Text(s) => s.trim().parse::<f64>().map_err(serde::de::Error::custom),
    }
}

/// Ids come back as numbers or strings; both are kept as strings.
pub(crate) fn id_as_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(i64),
        Text(String),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Number(n) => n.to_string(),
        Raw::Text(s) => s,
    })
}
