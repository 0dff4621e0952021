//! HTTP handlers
//!
//! Thin adapters: pull parameters out of the request, call the ranking
//! service, encode the outcome in the negotiated format.

use axum::body::Bytes;
use axum::extract::rejection::{BytesRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use tracing::{debug, error};

use super::negotiate::Negotiated;
use super::ApiState;
use crate::leaderboard::PageRequest;
use crate::types::{CommentRequest, RatingRequest, VoteRequest};

/// `?category=&search=`
#[derive(Debug, Default, Deserialize)]
pub struct CompanyParams {
    pub category: Option<String>,
    pub search: Option<String>,
}

/// `?category=`
#[derive(Debug, Default, Deserialize)]
pub struct CategoryParams {
    pub category: Option<String>,
}

/// `?category=&page=&page_size=`. Numbers stay strings so junk values fall
/// back to defaults instead of rejecting the request.
#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub category: Option<String>,
    pub page: Option<String>,
    pub page_size: Option<String>,
}

impl PageParams {
    fn page_request(&self) -> PageRequest {
        PageRequest::from_query(self.page.as_deref(), self.page_size.as_deref())
    }
}

fn query_or_default<T: Default>(query: Result<Query<T>, QueryRejection>) -> T {
    match query {
        Ok(Query(params)) => params,
        Err(e) => {
            debug!("Ignoring malformed query string: {}", e);
            T::default()
        }
    }
}

fn body_or_fail(negotiated: &Negotiated, body: Result<Bytes, BytesRejection>) -> Result<Bytes, Response> {
    body.map_err(|e| {
        debug!("Failed to read request body: {}", e);
        negotiated.error(StatusCode::BAD_REQUEST, "Invalid request body")
    })
}

pub async fn health(State(state): State<ApiState>, negotiated: Negotiated) -> Response {
    let report = state.health.check().await;
    negotiated.respond(StatusCode::OK, &report)
}

/// Prometheus text exposition
pub async fn metrics(State(state): State<ApiState>) -> Response {
    match state.metrics.encode_text() {
        Ok(text) => (
            StatusCode::OK,
            [(CONTENT_TYPE, "text/plain; version=0.0.4")],
            text,
        )
            .into_response(),
        Err(e) => {
            error!("Failed to encode metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to encode metrics").into_response()
        }
    }
}

pub async fn list_companies(
    State(state): State<ApiState>,
    negotiated: Negotiated,
    query: Result<Query<CompanyParams>, QueryRejection>,
) -> Response {
    let params = query_or_default(query);
    let result = state
        .rankings
        .list_companies(params.category.as_deref(), params.search.as_deref())
        .await;
    negotiated.reply(StatusCode::OK, result)
}

pub async fn get_company(
    State(state): State<ApiState>,
    negotiated: Negotiated,
    Path(slug): Path<String>,
) -> Response {
    negotiated.reply(StatusCode::OK, state.rankings.get_company(&slug).await)
}

pub async fn company_ratings(
    State(state): State<ApiState>,
    negotiated: Negotiated,
    Path(slug): Path<String>,
) -> Response {
    negotiated.reply(StatusCode::OK, state.rankings.company_ratings(&slug).await)
}

pub async fn company_comments(
    State(state): State<ApiState>,
    negotiated: Negotiated,
    Path(slug): Path<String>,
) -> Response {
    negotiated.reply(StatusCode::OK, state.rankings.company_comments(&slug).await)
}

pub async fn get_matchup(
    State(state): State<ApiState>,
    negotiated: Negotiated,
    query: Result<Query<CategoryParams>, QueryRejection>,
) -> Response {
    let params = query_or_default(query);
    let result = state.rankings.get_matchup(params.category.as_deref()).await;
    negotiated.reply(StatusCode::OK, result)
}

pub async fn submit_vote(
    State(state): State<ApiState>,
    negotiated: Negotiated,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let body = match body_or_fail(&negotiated, body) {
        Ok(body) => body,
        Err(response) => return response,
    };
    let request: VoteRequest = match negotiated.decode(&body) {
        Ok(request) => request,
        Err(e) => return negotiated.fail(&e),
    };

    let authorization = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok());
    let result = state.rankings.submit_vote(request, authorization).await;
    negotiated.reply(StatusCode::OK, result)
}

pub async fn leaderboard(
    State(state): State<ApiState>,
    negotiated: Negotiated,
    query: Result<Query<PageParams>, QueryRejection>,
) -> Response {
    let params = query_or_default(query);
    let result = state
        .rankings
        .leaderboard(params.category.as_deref(), params.page_request())
        .await;
    negotiated.reply(StatusCode::OK, result)
}

pub async fn user_leaderboard(
    State(state): State<ApiState>,
    negotiated: Negotiated,
    query: Result<Query<PageParams>, QueryRejection>,
) -> Response {
    let params = query_or_default(query);
    let result = state.rankings.user_leaderboard(params.page_request()).await;
    negotiated.reply(StatusCode::OK, result)
}

pub async fn submit_rating(
    State(state): State<ApiState>,
    negotiated: Negotiated,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let body = match body_or_fail(&negotiated, body) {
        Ok(body) => body,
        Err(response) => return response,
    };
    let request: RatingRequest = match negotiated.decode(&body) {
        Ok(request) => request,
        Err(e) => return negotiated.fail(&e),
    };
    negotiated.reply(StatusCode::CREATED, state.rankings.submit_rating(request).await)
}

pub async fn submit_comment(
    State(state): State<ApiState>,
    negotiated: Negotiated,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let body = match body_or_fail(&negotiated, body) {
        Ok(body) => body,
        Err(response) => return response,
    };
    let request: CommentRequest = match negotiated.decode(&body) {
        Ok(request) => request,
        Err(e) => return negotiated.fail(&e),
    };
    negotiated.reply(StatusCode::CREATED, state.rankings.submit_comment(request).await)
}

pub async fn upvote_comment(
    State(state): State<ApiState>,
    negotiated: Negotiated,
    Path(id): Path<String>,
) -> Response {
    negotiated.reply(StatusCode::OK, state.rankings.upvote_comment(&id).await)
}

pub async fn categories(State(state): State<ApiState>, negotiated: Negotiated) -> Response {
    negotiated.reply(StatusCode::OK, state.rankings.categories().await)
}

pub async fn stats(State(state): State<ApiState>, negotiated: Negotiated) -> Response {
    negotiated.reply(StatusCode::OK, state.rankings.stats().await)
}
