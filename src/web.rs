use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::Router;
use axum::http::StatusCode;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::services::ServeDir;
use tower_http::timeout::TimeoutLayer;
use tracing::{info, warn};

use crate::api::{self, AppState};
use crate::availability::{
    AvailabilityPolicyKind, DistanceHeuristic, RouteProbePolicy, TransportAvailabilityPolicy,
};
use crate::clients::http::build_client;
use crate::clients::{FirebaseIdentityClient, ImpactCo2Client, OpenRouteServiceClient, PhotonCitySearch};
use crate::config::{CarbonTripConfig, ServerConfig};
use crate::emissions::EmissionEstimator;
use crate::planner::PlanningServices;
use crate::session::{SessionDefaults, SessionStore};
use crate::CarbonTripError;

const SESSION_PRUNE_INTERVAL: Duration = Duration::from_secs(600);

/// Wire the remote clients and planning strategies named in the config
pub fn build_state(config: &CarbonTripConfig) -> crate::Result<AppState> {
    let services = &config.services;
    let planning = &config.planning;
    let client = build_client(services)?;

    let availability: Arc<dyn TransportAvailabilityPolicy> =
        match planning.availability_policy.unwrap_or_default() {
            AvailabilityPolicyKind::Distance => Arc::new(DistanceHeuristic),
            AvailabilityPolicyKind::RouteProbe => {
                let api_key = services.routing_api_key.clone().ok_or_else(|| {
                    CarbonTripError::config("The route-probe policy needs services.routing_api_key")
                })?;
                Arc::new(RouteProbePolicy::new(Arc::new(OpenRouteServiceClient::new(
                    client.clone(),
                    services.routing_url.trim_end_matches('/'),
                    api_key,
                    services.routing_requests_per_minute,
                ))))
            }
        };

    let strategy = planning.breakdown_strategy;
    let city_search = Arc::new(PhotonCitySearch::new(client.clone(), &services.city_search_url));

    info!(
        "Planning with {} availability, {} breakdowns",
        availability.name(),
        strategy
    );

    let sessions = SessionStore::new(SessionDefaults {
        city_search: city_search.clone(),
        estimator: EmissionEstimator::new(planning.emission_display),
        search_debounce: Duration::from_millis(planning.search_debounce_ms),
        min_query_length: planning.min_query_length,
    });

    Ok(AppState {
        sessions: Arc::new(sessions),
        planning: PlanningServices {
            transports: Arc::new(ImpactCo2Client::new(
                client.clone(),
                &services.transport_url,
                &services.language,
                strategy,
            )),
            availability,
        },
        city_search,
        identity: Arc::new(FirebaseIdentityClient::new(
            client,
            services.identity_url.trim_end_matches('/'),
            services.identity_api_key.clone(),
        )),
        min_query_length: planning.min_query_length,
    })
}

/// API under `/api`, the frontend bundle everywhere else
pub fn app(state: AppState, server: &ServerConfig) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .nest("/api", api::router(state))
        .fallback_service(ServeDir::new(&server.static_dir))
        .layer(
            ServiceBuilder::new()
                .layer(RequestBodyLimitLayer::new(server.body_limit_bytes))
                .layer(TimeoutLayer::with_status_code(
                    StatusCode::REQUEST_TIMEOUT,
                    Duration::from_secs(server.request_timeout_seconds.into()),
                ))
                .layer(cors),
        )
}

fn spawn_session_pruning(sessions: Arc<SessionStore>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SESSION_PRUNE_INTERVAL);
        loop {
            interval.tick().await;
            sessions.prune_expired().await;
        }
    });
}

pub async fn run(config: CarbonTripConfig) -> Result<()> {
    let state = build_state(&config).context("Failed to set up services")?;
    spawn_session_pruning(Arc::clone(&state.sessions));

    let server = &config.server;
    let app = app(state, server);
    let addr: SocketAddr = format!("{}:{}", server.host, server.port)
        .parse()
        .with_context(|| format!("Invalid listen address {}:{}", server.host, server.port))?;

    match (&server.tls_cert_path, &server.tls_key_path) {
        (Some(cert), Some(key)) => serve_tls(app, addr, cert, key).await,
        (None, None) => serve_http(app, addr).await,
        _ => {
            warn!("Both tls_cert_path and tls_key_path are needed for TLS, serving plain HTTP");
            serve_http(app, addr).await
        }
    }
}

async fn serve_http(app: Router, addr: SocketAddr) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Web server running at http://{}", addr);
    axum::serve(listener, app).await.context("Web server stopped")?;
    Ok(())
}

#[cfg(feature = "tls")]
async fn serve_tls(app: Router, addr: SocketAddr, cert: &str, key: &str) -> Result<()> {
    use axum_server::tls_rustls::RustlsConfig;

    let tls = RustlsConfig::from_pem_file(cert, key)
        .await
        .with_context(|| format!("Failed to load TLS certificate {cert}"))?;
    info!("Web server running at https://{}", addr);
    axum_server::bind_rustls(addr, tls)
        .serve(app.into_make_service())
        .await
        .context("Web server stopped")?;
    Ok(())
}

#[cfg(not(feature = "tls"))]
async fn serve_tls(app: Router, addr: SocketAddr, _cert: &str, _key: &str) -> Result<()> {
    warn!("Built without the tls feature, serving plain HTTP");
    serve_http(app, addr).await
}
