//! Insight generation
//!
//! Turns an attribution plus an efficiency score into short human-readable
//! findings. Two strategies sit behind [`InsightGenerator`]:
//!
//! - [`RuleBasedInsights`]: deterministic templates, always available
//! - [`ExternalInsights`]: optional OpenAI-compatible service, time-bounded
//!
//! [`InsightService`] tries the external generator when configured and falls
//! back to templates on any error. External failures are logged, never
//! returned.

mod external;
mod templates;

pub use external::{build_prompt, split_lines, ExternalInsights};
pub use templates::RuleBasedInsights;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::InsightsConfig;
use crate::types::{Explanation, InsightSource};

#[derive(Debug, Error)]
pub enum InsightError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Insight service returned status {0}")]
    Status(reqwest::StatusCode),

    #[error("Insight service timed out after {0:?}")]
    Timeout(Duration),

    #[error("Malformed insight response: {0}")]
    Malformed(String),

    #[error("Insight service returned no text")]
    Empty,
}

/// Produces insight lines for one prediction.
#[async_trait]
pub trait InsightGenerator: Send + Sync {
    async fn generate(&self, explanation: &Explanation, efficiency: f64) -> Result<Vec<String>, InsightError>;

    /// Name for logging
    fn name(&self) -> &'static str;
}

/// Insight lines and the generator that produced them.
#[derive(Debug, Clone, PartialEq)]
pub struct Insights {
    pub lines: Vec<String>,
    pub source: InsightSource,
}

/// External generator with template fallback.
#[derive(Clone)]
pub struct InsightService {
    external: Option<Arc<dyn InsightGenerator>>,
    fallback: Arc<dyn InsightGenerator>,
}

impl std::fmt::Debug for InsightService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InsightService")
            .field("external", &self.external.as_ref().map(|g| g.name()))
            .field("fallback", &self.fallback.name())
            .finish()
    }
}

impl InsightService {
    pub fn new(external: Option<Arc<dyn InsightGenerator>>, fallback: Arc<dyn InsightGenerator>) -> Self {
        Self { external, fallback }
    }

    /// Templates only.
    pub fn rule_based() -> Self {
        Self::new(None, Arc::new(RuleBasedInsights::new()))
    }

    /// Build from config. A client that cannot be constructed disables the
    /// external path.
    pub fn from_config(config: &InsightsConfig) -> Self {
        if !config.external_enabled {
            info!("External insights disabled, using rule-based insights");
            return Self::rule_based();
        }
        match ExternalInsights::from_config(config) {
            Ok(client) => {
                info!(
                    endpoint = %config.endpoint,
                    model = %config.model,
                    timeout_secs = config.timeout_secs,
                    "External insights enabled"
                );
                Self::new(Some(Arc::new(client)), Arc::new(RuleBasedInsights::new()))
            }
            Err(e) => {
                warn!(error = %e, "External insight client unavailable, using rule-based insights");
                Self::rule_based()
            }
        }
    }

    pub fn external_enabled(&self) -> bool {
        self.external.is_some()
    }

    /// Generate insights, preferring the external service.
    ///
    /// Only fails when the fallback generator itself fails.
    pub async fn generate(&self, explanation: &Explanation, efficiency: f64) -> Result<Insights, InsightError> {
        if let Some(external) = &self.external {
            match external.generate(explanation, efficiency).await {
                Ok(lines) => {
                    return Ok(Insights {
                        lines,
                        source: InsightSource::External,
                    })
                }
                Err(e) => warn!(
                    generator = external.name(),
                    error = %e,
                    "External insights failed, falling back to rule-based"
                ),
            }
        }

        let lines = self.fallback.generate(explanation, efficiency).await?;
        Ok(Insights {
            lines,
            source: InsightSource::RuleBased,
        })
    }
}

/// Single-line summary used when no generator produced output.
pub fn summary_line(efficiency: f64, failure_flag: bool) -> String {
    let status = if failure_flag {
        "requires attention"
    } else {
        "operating normally"
    };
    format!("Efficiency: {:.1}%. System {status}.", efficiency * 100.0)
}
