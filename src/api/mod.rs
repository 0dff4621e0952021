//! HTTP interface for the ranking service
//!
//! Routes map one-to-one onto `RankingService` operations. Every response,
//! error responses included, is encoded in the format the client negotiated.

pub mod handlers;
pub mod negotiate;
pub mod server;

use std::sync::Arc;
use std::time::Duration;

use axum::extract::{MatchedPath, Request, State};
use axum::http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use axum::http::request::Parts;
use axum::http::{HeaderValue, Method, StatusCode};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post};
use axum::Router;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::config::ServerSettings;
use crate::metrics::MetricsCollector;
use crate::service::{HealthCheck, RankingService};

pub use negotiate::Negotiated;
pub use server::ApiServer;

/// Shared handles for request handlers
#[derive(Clone)]
pub struct ApiState {
    pub rankings: Arc<RankingService>,
    pub health: Arc<HealthCheck>,
    pub metrics: Arc<MetricsCollector>,
    pub request_timeout: Duration,
}

/// Build the full router with tracing, CORS, metrics and request timeouts
pub fn create_router(state: ApiState, settings: &ServerSettings) -> Router {
    let api = Router::new()
        .route("/api/companies", get(handlers::list_companies))
        .route("/api/companies/{slug}", get(handlers::get_company))
        .route("/api/companies/{slug}/ratings", get(handlers::company_ratings))
        .route("/api/companies/{slug}/comments", get(handlers::company_comments))
        .route("/api/vote/matchup", get(handlers::get_matchup))
        .route("/api/vote", post(handlers::submit_vote))
        .route("/api/leaderboard", get(handlers::leaderboard))
        .route("/api/leaderboard/users", get(handlers::user_leaderboard))
        .route("/api/ratings", post(handlers::submit_rating))
        .route("/api/comments", post(handlers::submit_comment))
        .route("/api/comments/{id}/upvote", post(handlers::upvote_comment))
        .route("/api/categories", get(handlers::categories))
        .route("/api/stats", get(handlers::stats))
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics));

    api.route_layer(middleware::from_fn_with_state(
        state.clone(),
        enforce_request_timeout,
    ))
    .route_layer(middleware::from_fn_with_state(state.clone(), track_metrics))
    .layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(cors_layer(&settings.cors_allowed_origins)),
    )
    .with_state(state)
}

/// Count and time every routed request by its route template
async fn track_metrics(State(state): State<ApiState>, request: Request, next: Next) -> Response {
    let timer = state.metrics.start_timer();
    let method = request.method().clone();
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let response = next.run(request).await;

    state.metrics.record_http_request(
        method.as_str(),
        &route,
        response.status().as_u16(),
        timer.stop(),
    );
    response
}

/// Abort requests that exceed the configured timeout. Dropping the handler
/// future cancels any store call it was waiting on.
async fn enforce_request_timeout(
    State(state): State<ApiState>,
    request: Request,
    next: Next,
) -> Response {
    let negotiated = Negotiated::from_headers(request.headers());
    let path = request.uri().path().to_string();

    match tokio::time::timeout(state.request_timeout, next.run(request)).await {
        Ok(response) => response,
        Err(_) => {
            warn!("Request to {} timed out after {:?}", path, state.request_timeout);
            state.metrics.record_request_timeout();
            negotiated.error(StatusCode::SERVICE_UNAVAILABLE, "Request timed out")
        }
    }
}

/// CORS for the configured origins. `https://*.example.com` allows any
/// subdomain of example.com over https.
fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let allowed = allowed_origins.to_vec();

    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(
            move |origin: &HeaderValue, _parts: &Parts| {
                origin
                    .to_str()
                    .map(|origin| allowed.iter().any(|pattern| origin_matches(pattern, origin)))
                    .unwrap_or(false)
            },
        ))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, ACCEPT, AUTHORIZATION])
        .allow_credentials(true)
        .max_age(Duration::from_secs(300))
}

fn origin_matches(pattern: &str, origin: &str) -> bool {
    if pattern == "*" {
        return true;
    }
    match pattern.split_once("*.") {
        Some((scheme, domain)) => origin
            .strip_prefix(scheme)
            .and_then(|host| host.strip_suffix(domain))
            .map(|sub| sub.ends_with('.') && sub.len() > 1)
            .unwrap_or(false),
        None => pattern == origin,
    }
}
