//! Catalog routes backed by the resolution engine
//!
//! HTTP-specific concerns live here: query parsing, required-parameter
//! validation, cookie forwarding, and mapping the canonical envelope's
//! status onto an HTTP status. The `data` payload is never
//! reinterpreted.

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use tokio_util::sync::CancellationToken;

use crate::engine::{QueryParams, ResolveRequest};
use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// Build routes for every registered logical operation.
pub fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/api/search/hot", get(hot_search))
        .route("/api/search", get(search))
        .route("/api/lyric", get(lyric))
        .route("/api/song/url", get(song_url))
        .route("/api/login/status", get(login_status))
        .route("/api/toplist", get(toplist))
}

/// JSON 404 for unknown routes.
pub async fn not_found() -> ApiError {
    ApiError::NotFound("no such endpoint".to_string())
}

async fn hot_search(
    State(state): State<AppState>,
    Query(params): Query<QueryParams>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    resolve(&state, "hot_search", params, &headers).await
}

async fn search(
    State(state): State<AppState>,
    Query(params): Query<QueryParams>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    require_param(&params, "keywords")?;
    resolve(&state, "search", params, &headers).await
}

async fn lyric(
    State(state): State<AppState>,
    Query(params): Query<QueryParams>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    require_param(&params, "id")?;
    resolve(&state, "lyric", params, &headers).await
}

async fn song_url(
    State(state): State<AppState>,
    Query(params): Query<QueryParams>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    require_param(&params, "id")?;
    resolve(&state, "song_url", params, &headers).await
}

async fn login_status(
    State(state): State<AppState>,
    Query(params): Query<QueryParams>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    resolve(&state, "login_status", params, &headers).await
}

async fn toplist(
    State(state): State<AppState>,
    Query(params): Query<QueryParams>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    resolve(&state, "toplist", params, &headers).await
}

fn require_param(params: &QueryParams, name: &str) -> ApiResult<()> {
    match params.get(name) {
        Some(value) if !value.trim().is_empty() => Ok(()),
        _ => Err(ApiError::BadRequest(format!("{name} is required"))),
    }
}

/// Run one logical operation and map its envelope to HTTP.
async fn resolve(
    state: &AppState,
    operation: &str,
    params: QueryParams,
    headers: &HeaderMap,
) -> ApiResult<Response> {
    let chain = state
        .registry
        .get(operation)
        .ok_or_else(|| ApiError::Internal(format!("operation not registered: {operation}")))?;

    let request = ResolveRequest {
        params,
        cookie: headers
            .get(header::COOKIE)
            .and_then(|value| value.to_str().ok())
            .map(String::from),
    };

    // Axum drops this future when the caller disconnects, which fires
    // the token and aborts the in-flight tier call.
    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();

    let envelope = state
        .dispatcher
        .resolve(chain, &request, &cancel)
        .await
        .ok_or_else(|| ApiError::Internal("request cancelled".to_string()))?;

    let status =
        StatusCode::from_u16(envelope.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    Ok((status, Json(envelope)).into_response())
}
