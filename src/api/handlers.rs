//! API route handlers

use axum::body::Bytes;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use super::envelope::ApiErrorResponse;
use crate::pipeline::ScoringPipeline;
use crate::types::{
    AttributionSource, Explanation, InsightSource, PredictionResult, RawReading,
    RecommendedAction, Suitability,
};

// ============================================================================
// API State
// ============================================================================

/// Shared state for API handlers
#[derive(Clone)]
pub struct ApiState {
    pub pipeline: Arc<ScoringPipeline>,
    pub started_at: DateTime<Utc>,
}

impl ApiState {
    pub fn new(pipeline: Arc<ScoringPipeline>) -> Self {
        Self {
            pipeline,
            started_at: Utc::now(),
        }
    }
}

// ============================================================================
// Prediction
// ============================================================================

/// Recommended action as sent to clients.
#[derive(Debug, Serialize)]
pub struct ActionResponse {
    pub level: RecommendedAction,
    pub message: &'static str,
}

/// `POST /predict` success body
#[derive(Debug, Serialize)]
pub struct PredictResponse {
    pub predicted_efficiency: f64,
    pub risk_score: f64,
    pub failure_flag: bool,
    pub explanation: Explanation,
    pub attribution_source: Option<AttributionSource>,
    pub insights_and_suggestions: String,
    pub insights: Vec<String>,
    pub insight_source: InsightSource,
    pub recommended_action: ActionResponse,
    pub suitability: Suitability,
}

impl From<PredictionResult> for PredictResponse {
    fn from(result: PredictionResult) -> Self {
        Self {
            predicted_efficiency: (result.efficiency * 1000.0).round() / 1000.0,
            risk_score: result.risk_score,
            failure_flag: result.failure_flag,
            attribution_source: result.explanation.source(),
            explanation: result.explanation,
            insights_and_suggestions: result.insights.join("\n"),
            insights: result.insights,
            insight_source: result.insight_source,
            recommended_action: ActionResponse {
                level: result.recommended_action,
                message: result.recommended_action.message(),
            },
            suitability: result.suitability,
        }
    }
}

/// POST /predict - Score one sensor/weather reading
///
/// The body must be a non-empty JSON object. Non-numeric members are ignored
/// after that check, so a body with only non-numeric members reports the
/// missing required fields.
pub async fn predict(State(state): State<ApiState>, body: Bytes) -> Response {
    let reading = serde_json::from_slice::<serde_json::Value>(&body)
        .ok()
        .filter(|v| v.as_object().is_some_and(|o| !o.is_empty()))
        .and_then(|v| RawReading::from_json(&v));

    let Some(reading) = reading else {
        return ApiErrorResponse::bad_request("No data provided");
    };

    match state.pipeline.score(&reading).await {
        Ok(result) => {
            info!(
                efficiency = result.efficiency,
                risk_score = result.risk_score,
                suitability = %result.suitability,
                action = %result.recommended_action,
                "Prediction served"
            );
            Json(PredictResponse::from(result)).into_response()
        }
        Err(e) => {
            warn!(missing = ?e.missing, "Prediction rejected");
            ApiErrorResponse::missing_fields(&e)
        }
    }
}

// ============================================================================
// Health
// ============================================================================

/// `GET /health` body
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub models_loaded: bool,
    pub exact_attribution: bool,
    pub external_insights: bool,
    pub efficiency_features: usize,
    pub suitability_features: usize,
    pub uptime_seconds: i64,
    pub timestamp: String,
}

/// GET /health - Readiness and loaded-model summary
pub async fn health_check(State(state): State<ApiState>) -> Json<HealthResponse> {
    let pipeline = &state.pipeline;
    let now = Utc::now();
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        models_loaded: true,
        exact_attribution: pipeline.exact_attribution(),
        external_insights: pipeline.external_insights(),
        efficiency_features: pipeline.efficiency_feature_count(),
        suitability_features: pipeline.suitability_feature_count(),
        uptime_seconds: (now - state.started_at).num_seconds(),
        timestamp: now.to_rfc3339(),
    })
}
