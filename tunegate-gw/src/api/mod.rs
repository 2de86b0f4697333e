//! HTTP API handlers for the gateway
//!
//! Thin glue over the resolution engine: each route forwards query
//! parameters and the caller's cookie to one logical operation and
//! serializes the canonical envelope it gets back.

pub mod catalog;
pub mod health;

pub use catalog::{catalog_routes, not_found};
pub use health::health_routes;
