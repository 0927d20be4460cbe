//! Identity handlers
//!
//! Failures come back as a message in the body with a 401 status; the
//! session keeps whoever was signed in before.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::{Deserialize, Serialize};

use super::{ApiResult, AppState};
use crate::clients::{AuthSession, AuthUser, FederatedCredential};

#[derive(Debug, Deserialize)]
pub struct Credentials {
    email: String,
    password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthView {
    user: Option<AuthUser>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn respond(auth: &AuthSession) -> (StatusCode, Json<AuthView>) {
    let status = if auth.error().is_some() {
        StatusCode::UNAUTHORIZED
    } else {
        StatusCode::OK
    };
    (
        status,
        Json(AuthView {
            user: auth.current_user().cloned(),
            error: auth.error().map(str::to_string),
        }),
    )
}

pub async fn sign_up(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(credentials): Json<Credentials>,
) -> ApiResult<(StatusCode, Json<AuthView>)> {
    let session = state.sessions.get(&id).await?;
    let mut session = session.lock().await;
    session
        .auth
        .sign_up(state.identity.as_ref(), &credentials.email, &credentials.password)
        .await;
    Ok(respond(&session.auth))
}

pub async fn sign_in(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(credentials): Json<Credentials>,
) -> ApiResult<(StatusCode, Json<AuthView>)> {
    let session = state.sessions.get(&id).await?;
    let mut session = session.lock().await;
    session
        .auth
        .sign_in(state.identity.as_ref(), &credentials.email, &credentials.password)
        .await;
    Ok(respond(&session.auth))
}

pub async fn sign_in_with_provider(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(credential): Json<FederatedCredential>,
) -> ApiResult<(StatusCode, Json<AuthView>)> {
    let session = state.sessions.get(&id).await?;
    let mut session = session.lock().await;
    session
        .auth
        .sign_in_with_provider(state.identity.as_ref(), &credential)
        .await;
    Ok(respond(&session.auth))
}

pub async fn sign_out(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<(StatusCode, Json<AuthView>)> {
    let session = state.sessions.get(&id).await?;
    let mut session = session.lock().await;
    session.auth.sign_out();
    Ok(respond(&session.auth))
}

pub async fn current_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<AuthView>> {
    let session = state.sessions.get(&id).await?;
    let session = session.lock().await;
    Ok(Json(AuthView {
        user: session.auth.current_user().cloned(),
        error: None,
    }))
}
