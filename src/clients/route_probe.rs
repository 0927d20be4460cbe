//! Route probing against OpenRouteService
//!
//! A probe asks the routing service whether it can build a path between two
//! cities for one travel profile.

use std::fmt;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest_middleware::ClientWithMiddleware;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::clients::http::{RateLimiter, json_body};
use crate::models::City;
use crate::{CarbonTripError, Result};

/// Routing profiles probed for ground transport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoutingProfile {
    #[serde(rename = "driving-car")]
    DrivingCar,
    #[serde(rename = "foot-walking")]
    FootWalking,
    #[serde(rename = "cycling-regular")]
    CyclingRegular,
}

impl RoutingProfile {
    pub const ALL: [RoutingProfile; 3] = [
        RoutingProfile::DrivingCar,
        RoutingProfile::FootWalking,
        RoutingProfile::CyclingRegular,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DrivingCar => "driving-car",
            Self::FootWalking => "foot-walking",
            Self::CyclingRegular => "cycling-regular",
        }
    }
}

impl fmt::Display for RoutingProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Summary of the first route found
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct RouteSummary {
    /// Metres
    #[serde(default)]
    pub distance: f64,
    /// Seconds
    #[serde(default)]
    pub duration: f64,
}

/// Remote routing capability
#[async_trait]
pub trait RouteProbe: Send + Sync {
    /// `Ok(None)` when the service answers but finds no route
    async fn probe(
        &self,
        origin: &City,
        destination: &City,
        profile: RoutingProfile,
    ) -> Result<Option<RouteSummary>>;
}

#[derive(Debug, Serialize)]
struct DirectionsRequest {
    /// `[[lon, lat], [lon, lat]]`
    coordinates: [[f64; 2]; 2],
}

#[derive(Debug, Deserialize)]
pub struct DirectionsResponse {
    #[serde(default)]
    pub routes: Vec<RouteEntry>,
}

#[derive(Debug, Deserialize)]
pub struct RouteEntry {
    pub summary: RouteSummary,
}

impl DirectionsResponse {
    pub fn first_route(&self) -> Option<RouteSummary> {
        self.routes.first().map(|route| route.summary)
    }
}

/// OpenRouteService directions client
pub struct OpenRouteServiceClient {
    client: ClientWithMiddleware,
    base_url: String,
    api_key: String,
    rate_limiter: Mutex<RateLimiter>,
}

impl OpenRouteServiceClient {
    pub fn new(
        client: ClientWithMiddleware,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        requests_per_minute: u32,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
            rate_limiter: Mutex::new(RateLimiter::new(requests_per_minute)),
        }
    }

    fn check_rate_limit(&self) -> Result<()> {
        let mut limiter = self
            .rate_limiter
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if limiter.allow_request() {
            Ok(())
        } else {
            let wait = limiter.time_until_next_request();
            Err(CarbonTripError::api(format!(
                "Routing rate limit exceeded. Please wait {} seconds.",
                wait.as_secs()
            )))
        }
    }
}

#[async_trait]
impl RouteProbe for OpenRouteServiceClient {
    #[instrument(skip(self, origin, destination), fields(origin = %origin.name, destination = %destination.name))]
    async fn probe(
        &self,
        origin: &City,
        destination: &City,
        profile: RoutingProfile,
    ) -> Result<Option<RouteSummary>> {
        self.check_rate_limit()?;

        let url = format!("{}/v2/directions/{}/json", self.base_url, profile);
        let body = json_body(&DirectionsRequest {
            coordinates: [
                [origin.longitude, origin.latitude],
                [destination.longitude, destination.latitude],
            ],
        })?;

        let response = self
            .client
            .post(&url)
            .header(AUTHORIZATION, self.api_key.as_str())
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            warn!("Routing service returned {} for {}: {}", status, profile, detail);
            return Err(CarbonTripError::api(format!(
                "Routing service returned {status} for {profile}"
            )));
        }

        let directions: DirectionsResponse = response.json().await?;
        let route = directions.first_route();
        debug!("Probe {} found route: {:?}", profile, route);
        Ok(route)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directions_response_first_route() {
        let body = r#"{"routes": [
            {"summary": {"distance": 465123.4, "duration": 16500.2}, "segments": []},
            {"summary": {"distance": 470000.0, "duration": 17000.0}}
        ]}"#;
        let response: DirectionsResponse = serde_json::from_str(body).unwrap();
        let route = response.first_route().unwrap();
        assert_eq!(route.distance, 465123.4);
    }

    #[test]
    fn test_directions_response_without_routes() {
        let response: DirectionsResponse = serde_json::from_str(r#"{"routes": []}"#).unwrap();
        assert!(response.first_route().is_none());
        let response: DirectionsResponse = serde_json::from_str("{}").unwrap();
        assert!(response.first_route().is_none());
    }

    #[test]
    fn test_request_coordinates_are_lon_lat() {
        let request = DirectionsRequest {
            coordinates: [[2.3522, 48.8566], [4.8357, 45.764]],
        };
        let json = serde_json::to_string(&request).unwrap();
        assert_eq!(json, r#"{"coordinates":[[2.3522,48.8566],[4.8357,45.764]]}"#);
    }

    #[test]
    fn test_profile_names() {
        let names: Vec<&str> = RoutingProfile::ALL.iter().map(|p| p.as_str()).collect();
        assert_eq!(names, vec!["driving-car", "foot-walking", "cycling-regular"]);
        assert_eq!(
            serde_json::to_string(&RoutingProfile::CyclingRegular).unwrap(),
            r#""cycling-regular""#
        );
    }
}
