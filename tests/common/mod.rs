//! Fake service implementations shared by the integration tests

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use carbontrip::api::{self, AppState};
use carbontrip::clients::{
    AuthUser, CityQuery, CitySearch, FederatedCredential, IdentityService, TransportFactorService,
};
use carbontrip::emissions::consolidate_carpools;
use carbontrip::session::{SessionDefaults, SessionStore};
use carbontrip::{
    CarbonTripError, City, DistanceHeuristic, EmissionEstimator, FootprintEntry, PlanningServices,
    Result, TransportOption,
};

pub fn paris() -> City {
    City::new("Paris", "France", 48.8566, 2.3522)
}

pub fn lyon() -> City {
    City::new("Lyon", "France", 45.764, 4.8357).with_state("Auvergne-Rhône-Alpes")
}

pub fn marseille() -> City {
    City::new("Marseille", "France", 43.2965, 5.3698)
}

/// Searches a fixed list by name prefix
pub struct FakeCities;

#[async_trait]
impl CitySearch for FakeCities {
    async fn search(&self, query: &CityQuery) -> Vec<City> {
        let needle = query.as_str().to_lowercase();
        [paris(), lyon(), marseille()]
            .into_iter()
            .filter(|city| city.name.to_lowercase().starts_with(&needle))
            .collect()
    }
}

/// Raw option list as the transport service would return it, before
/// consolidation
pub fn raw_options() -> Vec<TransportOption> {
    vec![
        TransportOption::new("1", "Plane", 80.0),
        TransportOption::new("2", "Train", 5.0)
            .with_breakdown(vec![FootprintEntry { id: 4, value: 0.5 }, FootprintEntry { id: 5, value: 0.0125 }]),
        TransportOption::new("3", "Bus", 12.0),
        TransportOption::new("10", "Carpool", 40.0),
        TransportOption::new("11", "Carpool Electric", 8.0),
        TransportOption::new("7", "Bike", 0.0),
    ]
}

pub struct FakeTransports {
    pub fail: bool,
}

#[async_trait]
impl TransportFactorService for FakeTransports {
    async fn transport_options(&self, _distance_km: f64) -> Result<Vec<TransportOption>> {
        if self.fail {
            return Err(CarbonTripError::api("No response from transport API"));
        }
        Ok(consolidate_carpools(raw_options()))
    }
}

/// Accepts `secret` as the only valid password
pub struct FakeIdentity;

#[async_trait]
impl IdentityService for FakeIdentity {
    async fn sign_up(&self, email: &str, _password: &str) -> Result<AuthUser> {
        Ok(AuthUser {
            email: Some(email.to_string()),
            uid: "new-user".to_string(),
        })
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser> {
        if password == "secret" {
            Ok(AuthUser {
                email: Some(email.to_string()),
                uid: "user-1".to_string(),
            })
        } else {
            Err(CarbonTripError::authentication("Invalid email or password."))
        }
    }

    async fn sign_in_with_provider(&self, credential: &FederatedCredential) -> Result<AuthUser> {
        Ok(AuthUser {
            email: None,
            uid: format!("{}-user", credential.provider_id),
        })
    }
}

pub fn planning_services(fail_transports: bool) -> PlanningServices {
    PlanningServices {
        transports: Arc::new(FakeTransports {
            fail: fail_transports,
        }),
        availability: Arc::new(DistanceHeuristic),
    }
}

pub fn test_state(fail_transports: bool) -> AppState {
    let city_search: Arc<dyn CitySearch> = Arc::new(FakeCities);
    let sessions = SessionStore::new(SessionDefaults {
        city_search: city_search.clone(),
        estimator: EmissionEstimator::default(),
        search_debounce: Duration::from_millis(300),
        min_query_length: 3,
    });
    AppState {
        sessions: Arc::new(sessions),
        planning: planning_services(fail_transports),
        city_search,
        identity: Arc::new(FakeIdentity),
        min_query_length: 3,
    }
}

pub fn test_app(fail_transports: bool) -> Router {
    api::router(test_state(fail_transports))
}

/// Send one request and decode the JSON response (`Null` for empty bodies)
pub async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&json).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

pub async fn new_session(app: &Router) -> String {
    let (status, body) = send(app, Method::POST, "/sessions", None).await;
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_str().unwrap().to_string()
}
