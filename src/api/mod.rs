//! REST API module using Axum
//!
//! Thin HTTP glue over [`ScoringPipeline`](crate::pipeline::ScoringPipeline):
//! JSON in, JSON out, permissive CORS, per-request tracing.

pub mod envelope;
pub mod handlers;
mod routes;

pub use handlers::ApiState;

use axum::Router;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::config::defaults::MAX_REQUEST_BODY_BYTES;

/// Create the complete application router.
pub fn create_app(state: ApiState) -> Router {
    routes::api_routes(state)
        .layer(RequestBodyLimitLayer::new(MAX_REQUEST_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
}
