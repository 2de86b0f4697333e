//! tunegate-gw library interface
//!
//! Exposes the resolution engine and router construction for
//! integration testing.

pub mod api;
pub mod engine;
pub mod error;
pub mod operations;
pub mod upstream;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use engine::Dispatcher;
use operations::OperationRegistry;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use upstream::Transport;

/// Application state shared across handlers. Everything here is built
/// once at startup and read-only afterwards; concurrent requests share
/// it without locks.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
    pub registry: Arc<OperationRegistry>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(transport: Arc<dyn Transport>, registry: OperationRegistry) -> Self {
        Self {
            dispatcher: Arc::new(Dispatcher::new(transport)),
            registry: Arc::new(registry),
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::catalog_routes())
        .merge(api::health_routes())
        .fallback(api::not_found)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
