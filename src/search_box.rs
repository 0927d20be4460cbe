//! As-you-type city search field

use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tracing::debug;

use crate::clients::city_search::validate_city_name;
use crate::clients::{CityQuery, CitySearch};
use crate::debounce::Debouncer;
use crate::models::City;
use crate::{CarbonTripError, Result};

/// Which trip form field a search box feeds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchField {
    Origin,
    Destination,
}

impl FromStr for SearchField {
    type Err = CarbonTripError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "origin" => Ok(Self::Origin),
            "destination" => Ok(Self::Destination),
            other => Err(CarbonTripError::not_found(format!("Unknown search field '{other}'"))),
        }
    }
}

impl fmt::Display for SearchField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Origin => f.write_str("origin"),
            Self::Destination => f.write_str("destination"),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchView {
    pub text: String,
    pub suggestions: Vec<City>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub searching: bool,
}

/// Text input with debounced city suggestions
pub struct CitySearchBox {
    search: Arc<dyn CitySearch>,
    debouncer: Debouncer,
    min_query_length: usize,
    text: String,
    suggestions: Arc<Mutex<Vec<City>>>,
}

impl CitySearchBox {
    pub fn new(search: Arc<dyn CitySearch>, debounce: Duration, min_query_length: usize) -> Self {
        Self {
            search,
            debouncer: Debouncer::new(debounce),
            min_query_length,
            text: String::new(),
            suggestions: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Record a keystroke. Short input clears the suggestions, longer input
    /// schedules a lookup once typing pauses.
    pub fn input(&mut self, text: &str) {
        self.text = text.to_string();

        let Some(query) = CityQuery::new(text, self.min_query_length) else {
            self.debouncer.cancel();
            self.set_suggestions(Vec::new());
            return;
        };

        let search = Arc::clone(&self.search);
        let suggestions = Arc::clone(&self.suggestions);
        self.debouncer.call(async move {
            let cities = search.search(&query).await;
            debug!("{} suggestions for '{}'", cities.len(), query.as_str());
            *suggestions.lock().unwrap_or_else(PoisonError::into_inner) = cities;
        });
    }

    /// The suggestion at `index`, leaving the list untouched
    pub fn suggestion(&self, index: usize) -> Result<City> {
        self.suggestions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(index)
            .cloned()
            .ok_or_else(|| CarbonTripError::not_found(format!("No suggestion at position {index}")))
    }

    /// Fill the field with a picked city and drop the suggestions
    pub fn accept(&mut self, city: &City) {
        self.set_text(&city.name);
    }

    /// Show `text` without searching, e.g. after the field was filled in
    /// programmatically
    pub fn set_text(&mut self, text: &str) {
        self.debouncer.cancel();
        self.text = text.to_string();
        self.set_suggestions(Vec::new());
    }

    pub fn clear(&mut self) {
        self.debouncer.cancel();
        self.text.clear();
        self.set_suggestions(Vec::new());
    }

    pub fn suggestions(&self) -> Vec<City> {
        self.suggestions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn view(&self) -> SearchView {
        SearchView {
            text: self.text.clone(),
            suggestions: self.suggestions(),
            error: validate_city_name(&self.text)
                .err()
                .map(|e| e.user_message()),
            searching: self.debouncer.is_pending(),
        }
    }

    fn set_suggestions(&self, cities: Vec<City>) {
        *self.suggestions.lock().unwrap_or_else(PoisonError::into_inner) = cities;
    }
}
