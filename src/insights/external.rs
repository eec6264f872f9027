//! External natural-language insight client
//!
//! Talks to an OpenAI-compatible chat-completions endpoint. Every call is
//! bounded by the configured timeout and a stall surfaces as
//! [`InsightError::Timeout`]. Any failure lets the service fall back to
//! templates.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{InsightError, InsightGenerator};
use crate::config::InsightsConfig;
use crate::types::Explanation;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatContent,
}

#[derive(Debug, Deserialize)]
struct ChatContent {
    #[serde(default)]
    content: Option<String>,
}

/// HTTP client for the external insight service.
#[derive(Clone)]
pub struct ExternalInsights {
    http: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    timeout: Duration,
    max_tokens: u32,
    temperature: f32,
}

impl std::fmt::Debug for ExternalInsights {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExternalInsights")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl ExternalInsights {
    /// Build a client from config. The API key is read from the environment
    /// variable named by `api_key_env`; a missing key is sent unauthenticated.
    pub fn from_config(config: &InsightsConfig) -> Result<Self, InsightError> {
        let api_key = std::env::var(&config.api_key_env).ok().filter(|k| !k.is_empty());
        if api_key.is_none() {
            tracing::warn!(
                env = %config.api_key_env,
                "External insight API key not set, requests will be unauthenticated"
            );
        }
        Self::new(config, api_key)
    }

    pub fn new(config: &InsightsConfig, api_key: Option<String>) -> Result<Self, InsightError> {
        let timeout = Duration::from_secs(config.timeout_secs);
        // Whole-request bound is applied in `generate`; the client only caps connecting.
        let http = reqwest::Client::builder().connect_timeout(timeout).build()?;

        Ok(Self {
            http,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            api_key,
            timeout,
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        })
    }

    async fn request(&self, prompt: &str) -> Result<String, InsightError> {
        let body = ChatRequest {
            model: &self.model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        let mut req = self.http.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(InsightError::Status(status));
        }

        let parsed: ChatResponse = resp
            .json()
            .await
            .map_err(|e| InsightError::Malformed(e.to_string()))?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| InsightError::Malformed("response has no message content".to_string()))
    }
}

/// Prompt sent to the external service.
pub fn build_prompt(explanation: &Explanation, efficiency: f64) -> String {
    let attribution = serde_json::to_string(explanation).unwrap_or_else(|_| "{}".to_string());
    format!(
        "Based on attribution values {attribution} for solar panel efficiency of {:.2}%. \
         Provide 3 concise insights and actionable suggestions to improve or maintain efficiency.",
        efficiency * 100.0
    )
}

/// Split a completion into non-empty trimmed lines.
pub fn split_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

#[async_trait]
impl InsightGenerator for ExternalInsights {
    async fn generate(&self, explanation: &Explanation, efficiency: f64) -> Result<Vec<String>, InsightError> {
        let prompt = build_prompt(explanation, efficiency);
        let text = tokio::time::timeout(self.timeout, self.request(&prompt))
            .await
            .map_err(|_| InsightError::Timeout(self.timeout))??;

        let lines = split_lines(&text);
        if lines.is_empty() {
            return Err(InsightError::Empty);
        }
        Ok(lines)
    }

    fn name(&self) -> &'static str {
        "external"
    }
}
