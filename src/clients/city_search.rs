//! City search against the Photon geocoder
//!
//! Lookups fail open: any transport or decoding failure is logged and
//! surfaces as an empty result list, the user simply retries.

use async_trait::async_trait;
use reqwest_middleware::ClientWithMiddleware;
use serde::Deserialize;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

use crate::models::City;
use crate::{CarbonTripError, Result};

/// Minimum length accepted by the city form field
pub const MIN_CITY_NAME_CHARS: usize = 2;

/// Validate a city form field the way the trip form does
pub fn validate_city_name(text: &str) -> Result<&str> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(CarbonTripError::validation("City name is required"));
    }
    if trimmed.chars().count() < MIN_CITY_NAME_CHARS {
        return Err(CarbonTripError::validation(format!(
            "City name must be at least {MIN_CITY_NAME_CHARS} characters"
        )));
    }
    Ok(trimmed)
}

/// A query long enough to be sent to the city search service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CityQuery(String);

impl CityQuery {
    /// `None` when the trimmed text is shorter than `min_chars`
    #[must_use]
    pub fn new(text: &str, min_chars: usize) -> Option<Self> {
        let trimmed = text.trim();
        (trimmed.chars().count() >= min_chars).then(|| Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// City search capability
#[async_trait]
pub trait CitySearch: Send + Sync {
    /// Cities matching `query`; empty on no match or failure
    async fn search(&self, query: &CityQuery) -> Vec<City>;
}

/// Photon geocoder response
#[derive(Debug, Deserialize)]
pub struct PhotonResponse {
    #[serde(default)]
    pub features: Vec<PhotonFeature>,
}

#[derive(Debug, Deserialize)]
pub struct PhotonFeature {
    pub geometry: PhotonGeometry,
    pub properties: PhotonProperties,
}

#[derive(Debug, Deserialize)]
pub struct PhotonGeometry {
    /// `[longitude, latitude]`
    pub coordinates: [f64; 2],
}

#[derive(Debug, Deserialize)]
pub struct PhotonProperties {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub country: String,
    pub state: Option<String>,
}

impl PhotonFeature {
    pub fn is_city(&self) -> bool {
        self.properties.kind == "city"
    }
}

impl From<PhotonFeature> for City {
    fn from(feature: PhotonFeature) -> Self {
        let [longitude, latitude] = feature.geometry.coordinates;
        City {
            name: feature.properties.name,
            country: feature.properties.country,
            state: feature.properties.state,
            latitude,
            longitude,
        }
    }
}

/// Keep only `city` features and map them to domain cities
#[must_use]
pub fn cities_from_response(response: PhotonResponse) -> Vec<City> {
    response
        .features
        .into_iter()
        .filter(PhotonFeature::is_city)
        .map(City::from)
        .collect()
}

/// Photon-backed city search
pub struct PhotonCitySearch {
    client: ClientWithMiddleware,
    base_url: String,
}

impl PhotonCitySearch {
    pub fn new(client: ClientWithMiddleware, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    async fn fetch(&self, query: &CityQuery) -> Result<Vec<City>> {
        let url = format!("{}?q={}", self.base_url, urlencoding::encode(query.as_str()));
        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(CarbonTripError::api(format!(
                "City search returned {}",
                response.status()
            )));
        }

        let body: PhotonResponse = response.json().await?;
        Ok(cities_from_response(body))
    }
}

#[async_trait]
impl CitySearch for PhotonCitySearch {
    #[instrument(skip(self), fields(query = query.as_str()))]
    async fn search(&self, query: &CityQuery) -> Vec<City> {
        let start_time = Instant::now();
        match self.fetch(query).await {
            Ok(cities) => {
                info!(
                    "Found {} cities for '{}' in {:.3}s",
                    cities.len(),
                    query.as_str(),
                    start_time.elapsed().as_secs_f64()
                );
                debug!(
                    "City results: {:?}",
                    cities.iter().map(City::display_label).collect::<Vec<_>>()
                );
                cities
            }
            Err(e) => {
                warn!("City search failed for '{}': {}", query.as_str(), e);
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const PHOTON_BODY: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "geometry": {"type": "Point", "coordinates": [4.8320114, 45.7578137]},
                "properties": {"name": "Lyon", "type": "city", "country": "France", "state": "Auvergne-Rhône-Alpes"}
            },
            {
                "type": "Feature",
                "geometry": {"type": "Point", "coordinates": [4.85, 45.76]},
                "properties": {"name": "Gare de Lyon", "type": "house", "country": "France"}
            },
            {
                "type": "Feature",
                "geometry": {"type": "Point", "coordinates": [-96.63, 38.0]},
                "properties": {"name": "Lyons", "type": "city", "country": "United States"}
            }
        ]
    }"#;

    #[test]
    fn test_cities_from_response_filters_and_swaps_coordinates() {
        let response: PhotonResponse = serde_json::from_str(PHOTON_BODY).unwrap();
        let cities = cities_from_response(response);

        assert_eq!(cities.len(), 2);
        assert_eq!(cities[0].name, "Lyon");
        assert_eq!(cities[0].latitude, 45.7578137);
        assert_eq!(cities[0].longitude, 4.8320114);
        assert_eq!(cities[0].state.as_deref(), Some("Auvergne-Rhône-Alpes"));
        assert_eq!(cities[1].name, "Lyons");
        assert!(cities[1].state.is_none());
    }

    #[test]
    fn test_empty_response() {
        let response: PhotonResponse = serde_json::from_str("{}").unwrap();
        assert!(cities_from_response(response).is_empty());
    }

    #[rstest]
    #[case("", Some("City name is required"))]
    #[case("   ", Some("City name is required"))]
    #[case("L", Some("City name must be at least 2 characters"))]
    #[case("Ly", None)]
    #[case(" Lyon ", None)]
    fn test_validate_city_name(#[case] input: &str, #[case] error: Option<&str>) {
        match (validate_city_name(input), error) {
            (Ok(_), None) => {}
            (Err(e), Some(expected)) => assert_eq!(e.user_message(), expected),
            (result, expected) => panic!("unexpected {result:?} for {expected:?}"),
        }
    }

    #[rstest]
    #[case("Ly", 3, None)]
    #[case("Lyo", 3, Some("Lyo"))]
    #[case("  Paris ", 3, Some("Paris"))]
    #[case("Ōsaka", 5, Some("Ōsaka"))]
    fn test_city_query_threshold(
        #[case] input: &str,
        #[case] min: usize,
        #[case] expected: Option<&str>,
    ) {
        let query = CityQuery::new(input, min);
        assert_eq!(query.as_ref().map(CityQuery::as_str), expected);
    }
}
