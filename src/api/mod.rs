//! JSON API consumed by the trip planner frontend

mod auth;
mod sessions;

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post, put};
use axum::Router;
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use crate::clients::{CityQuery, CitySearch, IdentityService};
use crate::models::City;
use crate::planner::PlanningServices;
use crate::session::SessionStore;
use crate::{CarbonTripError, VERSION};

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionStore>,
    pub planning: PlanningServices,
    pub city_search: Arc<dyn CitySearch>,
    pub identity: Arc<dyn IdentityService>,
    pub min_query_length: usize,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl CarbonTripError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation { .. } => StatusCode::BAD_REQUEST,
            Self::Authentication { .. } => StatusCode::UNAUTHORIZED,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Api { .. } => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for CarbonTripError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        } else {
            warn!("Request rejected: {}", self);
        }
        (
            status,
            Json(ErrorBody {
                error: self.user_message(),
            }),
        )
            .into_response()
    }
}

pub type ApiResult<T> = std::result::Result<T, CarbonTripError>;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/cities", get(search_cities))
        .route("/sessions", post(sessions::create))
        .route("/sessions/{id}", get(sessions::snapshot).delete(sessions::remove))
        .route("/sessions/{id}/origin", put(sessions::select_origin))
        .route("/sessions/{id}/destination", put(sessions::select_destination))
        .route(
            "/sessions/{id}/search/{field}",
            get(sessions::search_view).post(sessions::search_input),
        )
        .route("/sessions/{id}/route", post(sessions::calculate_route))
        .route("/sessions/{id}/passengers", put(sessions::passengers))
        .route("/sessions/{id}/segments", post(sessions::confirm_segment))
        .route("/sessions/{id}/map", get(sessions::map_view))
        .route("/sessions/{id}/summary", get(sessions::summary))
        .route("/sessions/{id}/summary/toggle", post(sessions::toggle_summary))
        .route("/sessions/{id}/auth/sign-up", post(auth::sign_up))
        .route("/sessions/{id}/auth/sign-in", post(auth::sign_in))
        .route("/sessions/{id}/auth/sign-in/provider", post(auth::sign_in_with_provider))
        .route("/sessions/{id}/auth/sign-out", post(auth::sign_out))
        .route("/sessions/{id}/auth/user", get(auth::current_user))
        .with_state(state)
}

#[derive(Serialize)]
struct Health {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<Health> {
    Json(Health {
        status: "ok",
        version: VERSION,
    })
}

#[derive(Deserialize)]
struct CitySearchParams {
    #[serde(default)]
    q: String,
}

/// Immediate lookup; short queries return no cities
async fn search_cities(
    State(state): State<AppState>,
    Query(params): Query<CitySearchParams>,
) -> Json<Vec<City>> {
    match CityQuery::new(&params.q, state.min_query_length) {
        Some(query) => Json(state.city_search.search(&query).await),
        None => Json(Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(CarbonTripError::validation("bad"), StatusCode::BAD_REQUEST)]
    #[case(CarbonTripError::authentication("no"), StatusCode::UNAUTHORIZED)]
    #[case(CarbonTripError::not_found("gone"), StatusCode::NOT_FOUND)]
    #[case(CarbonTripError::api("down"), StatusCode::BAD_GATEWAY)]
    #[case(CarbonTripError::general("oops"), StatusCode::INTERNAL_SERVER_ERROR)]
    #[case(CarbonTripError::config("cfg"), StatusCode::INTERNAL_SERVER_ERROR)]
    fn test_error_status(#[case] error: CarbonTripError, #[case] expected: StatusCode) {
        assert_eq!(error.into_response().status(), expected);
    }
}
