//! Planning session handlers

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{ApiResult, AppState};
use crate::map::{MapTheme, MapView, build_map_view};
use crate::models::{City, TripSegment};
use crate::planner::PlannerSnapshot;
use crate::search_box::{SearchField, SearchView};
use crate::session::Session;
use crate::summary::SummaryView;
use crate::CarbonTripError;

#[derive(Serialize)]
pub struct Created {
    id: String,
}

pub async fn create(State(state): State<AppState>) -> (StatusCode, Json<Created>) {
    let id = state.sessions.create().await;
    info!("Opened planning session {}", id);
    (StatusCode::CREATED, Json(Created { id }))
}

pub async fn snapshot(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<PlannerSnapshot>> {
    let session = state.sessions.get(&id).await?;
    let session = session.lock().await;
    Ok(Json(session.planner.snapshot()))
}

pub async fn remove(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<StatusCode> {
    state.sessions.remove(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Either an explicit city, a suggestion index from the field's search box,
/// or neither to clear the field
#[derive(Debug, Default, Deserialize)]
pub struct SelectCity {
    #[serde(default)]
    city: Option<City>,
    #[serde(default)]
    suggestion: Option<usize>,
}

fn resolve_city(session: &Session, field: SearchField, request: &SelectCity) -> ApiResult<Option<City>> {
    match (&request.city, request.suggestion) {
        (Some(_), Some(_)) => Err(CarbonTripError::validation(
            "Provide either a city or a suggestion, not both",
        )),
        (Some(city), None) => Ok(Some(city.clone())),
        (None, Some(index)) => session.search_box(field).suggestion(index).map(Some),
        (None, None) => Ok(None),
    }
}

/// The search box is only updated once the planner has accepted the city
async fn select(
    state: &AppState,
    id: &str,
    field: SearchField,
    request: SelectCity,
) -> ApiResult<Json<PlannerSnapshot>> {
    let session = state.sessions.get(id).await?;
    let mut session = session.lock().await;
    let city = resolve_city(&session, field, &request)?;
    match field {
        SearchField::Origin => session.planner.select_origin(city.clone())?,
        SearchField::Destination => session.planner.select_destination(city.clone())?,
    }
    match (city, request.suggestion) {
        (None, _) => session.search_box_mut(field).clear(),
        (Some(city), Some(_)) => session.search_box_mut(field).accept(&city),
        (Some(_), None) => {}
    }
    Ok(Json(session.planner.snapshot()))
}

pub async fn select_origin(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<SelectCity>,
) -> ApiResult<Json<PlannerSnapshot>> {
    select(&state, &id, SearchField::Origin, request).await
}

pub async fn select_destination(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<SelectCity>,
) -> ApiResult<Json<PlannerSnapshot>> {
    select(&state, &id, SearchField::Destination, request).await
}

#[derive(Debug, Deserialize)]
pub struct SearchInput {
    text: String,
}

pub async fn search_input(
    State(state): State<AppState>,
    Path((id, field)): Path<(String, String)>,
    Json(input): Json<SearchInput>,
) -> ApiResult<(StatusCode, Json<SearchView>)> {
    let field: SearchField = field.parse()?;
    let session = state.sessions.get(&id).await?;
    let mut session = session.lock().await;
    let search_box = session.search_box_mut(field);
    search_box.input(&input.text);
    Ok((StatusCode::ACCEPTED, Json(search_box.view())))
}

pub async fn search_view(
    State(state): State<AppState>,
    Path((id, field)): Path<(String, String)>,
) -> ApiResult<Json<SearchView>> {
    let field: SearchField = field.parse()?;
    let session = state.sessions.get(&id).await?;
    let session = session.lock().await;
    Ok(Json(session.search_box(field).view()))
}

pub async fn calculate_route(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<PlannerSnapshot>> {
    let session = state.sessions.get(&id).await?;
    let mut session = session.lock().await;
    session.planner.calculate_route(&state.planning).await?;
    Ok(Json(session.planner.snapshot()))
}

/// `change` adjusts the current count, `passengers` sets it outright
#[derive(Debug, Deserialize)]
pub struct PassengersRequest {
    option_id: String,
    #[serde(default)]
    change: Option<i64>,
    #[serde(default)]
    passengers: Option<i64>,
}

pub async fn passengers(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<PassengersRequest>,
) -> ApiResult<Json<PlannerSnapshot>> {
    let session = state.sessions.get(&id).await?;
    let mut session = session.lock().await;
    match (request.change, request.passengers) {
        (Some(change), None) => session.planner.adjust_passengers(&request.option_id, change)?,
        (None, Some(count)) => session.planner.set_passengers(&request.option_id, count)?,
        _ => {
            return Err(CarbonTripError::validation(
                "Provide exactly one of 'change' or 'passengers'",
            ));
        }
    };
    Ok(Json(session.planner.snapshot()))
}

#[derive(Debug, Deserialize)]
pub struct ConfirmRequest {
    option_id: String,
}

pub async fn confirm_segment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<ConfirmRequest>,
) -> ApiResult<(StatusCode, Json<TripSegment>)> {
    let session = state.sessions.get(&id).await?;
    let mut session = session.lock().await;
    let segment = session.planner.confirm(&request.option_id)?.clone();

    session.destination_search.clear();
    session.origin_search.set_text(&segment.destination().name);

    Ok((StatusCode::CREATED, Json(segment)))
}

#[derive(Debug, Deserialize)]
pub struct MapParams {
    theme: Option<String>,
}

pub async fn map_view(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<MapParams>,
) -> ApiResult<Json<MapView>> {
    let theme = params
        .theme
        .as_deref()
        .map(str::parse::<MapTheme>)
        .transpose()?
        .unwrap_or_default();
    let session = state.sessions.get(&id).await?;
    let session = session.lock().await;
    let planner = &session.planner;
    Ok(Json(build_map_view(
        planner.trip().segments(),
        planner.origin(),
        planner.destination(),
        theme,
    )))
}

pub async fn summary(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<SummaryView>> {
    let session = state.sessions.get(&id).await?;
    let session = session.lock().await;
    Ok(Json(session.summary.view(session.planner.trip())))
}

pub async fn toggle_summary(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<SummaryView>> {
    let session = state.sessions.get(&id).await?;
    let mut session = session.lock().await;
    session.summary.toggle();
    Ok(Json(session.summary.view(session.planner.trip())))
}
