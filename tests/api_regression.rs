//! API Regression Tests
//!
//! In-process tests that build the Axum app via `create_app()` and exercise
//! `/predict` and `/health` using `tower::ServiceExt::oneshot()`.
//! No binary spawn, no network port.

mod common;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use common::shipped_config;
use solarsense::api::{create_app, ApiState};
use solarsense::ScoringPipeline;

fn create_test_app() -> Router {
    let pipeline = ScoringPipeline::from_config(&shipped_config()).unwrap();
    create_app(ApiState::new(Arc::new(pipeline)))
}

async fn post_predict(body: impl Into<Body>) -> (StatusCode, Value) {
    let resp = create_test_app()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/predict")
                .header(header::CONTENT_TYPE, "application/json")
                .body(body.into())
                .unwrap(),
        )
        .await
        .unwrap();

    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

/// Successful prediction carries every documented field.
#[tokio::test]
async fn test_predict_returns_full_result() {
    let body = json!({"temperature": 40, "humidity": 80, "irradiance": 750}).to_string();
    let (status, v) = post_predict(body).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["predicted_efficiency"], json!(0.85));
    assert_eq!(v["risk_score"], json!(15.0));
    assert_eq!(v["failure_flag"], json!(false));
    assert_eq!(v["suitability"], json!("Yes"));
    assert_eq!(v["attribution_source"], json!("exact"));
    assert_eq!(v["insight_source"], json!("rule_based"));
    assert_eq!(v["recommended_action"]["level"], json!("monitor"));
    assert_eq!(
        v["recommended_action"]["message"],
        json!("Monitor closely - System performing well")
    );

    let explanation = v["explanation"].as_object().unwrap();
    for key in ["temperature", "humidity", "irradiance", "dust_index", "panel_temp"] {
        assert!(explanation.contains_key(key), "explanation missing {key}");
    }

    let insights = v["insights"].as_array().unwrap();
    let joined: Vec<&str> = insights.iter().filter_map(Value::as_str).collect();
    assert_eq!(v["insights_and_suggestions"], json!(joined.join("\n")));
}

/// Missing required fields are enumerated in the error body.
#[tokio::test]
async fn test_predict_missing_fields_is_400() {
    let (status, v) = post_predict(json!({"temperature": 25}).to_string()).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(v["missing"], json!(["humidity", "irradiance"]));
    assert_eq!(
        v["error"],
        json!(r#"Missing required fields: ["humidity", "irradiance"]"#)
    );
}

/// Non-numeric required fields count as missing.
#[tokio::test]
async fn test_predict_non_numeric_field_is_missing() {
    let body = json!({"temperature": "hot", "humidity": 50, "irradiance": 600}).to_string();
    let (status, v) = post_predict(body).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(v["missing"], json!(["temperature"]));
}

/// Empty, non-JSON, and non-object bodies are rejected uniformly.
#[tokio::test]
async fn test_predict_without_data_is_400() {
    for body in ["", "not json", "[1, 2, 3]", "{}", "null"] {
        let (status, v) = post_predict(body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "body {body:?}");
        assert_eq!(v, json!({"error": "No data provided"}), "body {body:?}");
    }
}

/// An object holding only non-numeric members is data, just not usable data.
#[tokio::test]
async fn test_predict_non_numeric_only_body_lists_missing_fields() {
    let (status, v) = post_predict(json!({"site": "roof-a"}).to_string()).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(v["missing"], json!(["temperature", "humidity", "irradiance"]));
    assert_ne!(v["error"], json!("No data provided"));
}

/// Unknown fields are accepted and ignored by the models.
#[tokio::test]
async fn test_predict_ignores_unknown_fields() {
    let body = json!({
        "temperature": 40, "humidity": 80, "irradiance": 750,
        "site_id": "roof-3", "inverter_temp": 51.5
    })
    .to_string();
    let (status, v) = post_predict(body).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["predicted_efficiency"], json!(0.85));
    assert!(v["explanation"].get("inverter_temp").is_none());
}

/// GET /health reports the loaded pipeline.
#[tokio::test]
async fn test_health_reports_models() {
    let resp = create_test_app()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let v: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(v["status"], "healthy");
    assert_eq!(v["models_loaded"], true);
    assert_eq!(v["exact_attribution"], true);
    assert_eq!(v["external_insights"], false);
    assert_eq!(v["efficiency_features"], 10);
    assert_eq!(v["suitability_features"], 29);
}

/// Unknown routes return 404.
#[tokio::test]
async fn test_unknown_route_is_404() {
    let resp = create_test_app()
        .oneshot(Request::builder().uri("/api/v1/status").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
