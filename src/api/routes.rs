//! API route definitions
//!
//! - `POST /predict` - score one reading
//! - `GET /health` - readiness and model summary

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{self, ApiState};

/// Create all API routes
pub fn api_routes(state: ApiState) -> Router {
    Router::new()
        .route("/predict", post(handlers::predict))
        .route("/health", get(handlers::health_check))
        .with_state(state)
}
