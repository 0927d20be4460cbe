//! City model for resolved search results

use serde::{Deserialize, Serialize};

/// A city resolved from a search query. Immutable once resolved.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct City {
    pub name: String,
    pub country: String,
    /// Administrative state or region, when the geocoder knows it
    pub state: Option<String>,
    /// Latitude in decimal degrees
    pub latitude: f64,
    /// Longitude in decimal degrees
    pub longitude: f64,
}

impl City {
    #[must_use]
    pub fn new(name: impl Into<String>, country: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            name: name.into(),
            country: country.into(),
            state: None,
            latitude,
            longitude,
        }
    }

    #[must_use]
    pub fn with_state(mut self, state: impl Into<String>) -> Self {
        self.state = Some(state.into());
        self
    }

    /// `(latitude, longitude)` pair
    #[must_use]
    pub fn coordinates(&self) -> (f64, f64) {
        (self.latitude, self.longitude)
    }

    /// Label used in suggestion lists and map popups: `name, country[, state]`
    #[must_use]
    pub fn display_label(&self) -> String {
        match &self.state {
            Some(state) => format!("{}, {}, {}", self.name, self.country, state),
            None => format!("{}, {}", self.name, self.country),
        }
    }
}
