//! Error envelope for the HTTP API.
//!
//! Errors use a flat shape, `{ "error": "<message>" }`, with the list of
//! missing fields added for validation failures:
//!
//! ```json
//! { "error": "Missing required fields: [\"humidity\"]", "missing": ["humidity"] }
//! ```

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::types::ValidationError;

/// Error body returned by every endpoint.
#[derive(Debug, Serialize)]
pub struct ApiErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub missing: Option<Vec<String>>,
}

impl ApiErrorResponse {
    fn build(status: StatusCode, msg: impl Into<String>, missing: Option<Vec<String>>) -> Response {
        let body = Self {
            error: msg.into(),
            missing,
        };
        (status, axum::Json(body)).into_response()
    }

    pub fn bad_request(msg: impl Into<String>) -> Response {
        Self::build(StatusCode::BAD_REQUEST, msg, None)
    }

    /// 400 naming the missing required fields.
    pub fn missing_fields(err: &ValidationError) -> Response {
        Self::build(StatusCode::BAD_REQUEST, err.to_string(), Some(err.missing.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bad_request_shape() {
        let resp = ApiErrorResponse::bad_request("No data provided");
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let v: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(v, serde_json::json!({"error": "No data provided"}));
    }

    #[tokio::test]
    async fn test_missing_fields_shape() {
        let err = ValidationError {
            missing: vec!["humidity".to_string()],
        };
        let resp = ApiErrorResponse::missing_fields(&err);
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let v: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(v["error"], r#"Missing required fields: ["humidity"]"#);
        assert_eq!(v["missing"], serde_json::json!(["humidity"]));
    }
}
