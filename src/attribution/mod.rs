//! Per-feature attribution of the efficiency prediction
//!
//! Two interchangeable [`Attributor`]s share one output shape:
//!
//! - [`TreeExplainer`]: exact tree-path Shapley values from the trained
//!   efficiency ensemble, one entry per schema feature in schema order
//! - [`RuleBasedAttributor`]: deterministic physical rules, always available
//!
//! [`AttributionEngine`] picks the strategy once at startup and, per request,
//! falls back to the rules when the exact path fails. Downstream consumers only
//! see an [`Explanation`].

mod exact;
mod rules;

pub use exact::TreeExplainer;
pub use rules::RuleBasedAttributor;

use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crate::features::SynthesizedFeatures;
use crate::model::{FeatureSchema, ModelError, TreeEnsemble};
use crate::types::{AttributionMap, AttributionSource, Explanation};

/// Features every attribution map must cover.
pub const REQUIRED_ATTRIBUTION_FEATURES: [&str; 4] =
    ["temperature", "humidity", "irradiance", "dust_index"];

#[derive(Debug, Error)]
pub enum AttributionError {
    #[error("Exact attribution unavailable: {0}")]
    Unavailable(String),

    #[error("Attribution input missing feature '{0}'")]
    MissingFeature(String),

    #[error("Non-finite contribution for '{0}'")]
    NonFinite(String),

    #[error(transparent)]
    Model(#[from] ModelError),
}

/// One attribution strategy.
pub trait Attributor: Send + Sync {
    fn attribute(&self, features: &SynthesizedFeatures) -> Result<AttributionMap, AttributionError>;

    /// Which path this attributor represents.
    fn source(&self) -> AttributionSource;
}

// ============================================================================
// Engine
// ============================================================================

/// Exact attribution with rule-based fallback.
#[derive(Clone)]
pub struct AttributionEngine {
    exact: Option<Arc<dyn Attributor>>,
    fallback: Arc<dyn Attributor>,
}

impl std::fmt::Debug for AttributionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AttributionEngine")
            .field("exact", &self.exact.is_some())
            .finish()
    }
}

impl AttributionEngine {
    pub fn new(exact: Option<Arc<dyn Attributor>>, fallback: Arc<dyn Attributor>) -> Self {
        Self { exact, fallback }
    }

    /// Rule-based attribution only.
    pub fn approximate() -> Self {
        Self::new(None, Arc::new(RuleBasedAttributor::new()))
    }

    /// Startup selection: try to build the exact explainer, else rules only.
    pub fn select(ensemble: Option<Arc<TreeEnsemble>>, schema: &FeatureSchema, exact_enabled: bool) -> Self {
        if !exact_enabled {
            info!("Exact attribution disabled by config, using rule-based attribution");
            return Self::approximate();
        }
        let explainer = ensemble
            .ok_or_else(|| AttributionError::Unavailable("efficiency model is not a tree ensemble".to_string()))
            .and_then(|e| TreeExplainer::new(e, schema.clone()));

        match explainer {
            Ok(explainer) => {
                info!(features = schema.len(), "Exact tree attribution enabled");
                Self::new(Some(Arc::new(explainer)), Arc::new(RuleBasedAttributor::new()))
            }
            Err(e) => {
                warn!(error = %e, "Exact attribution unavailable, using rule-based attribution");
                Self::approximate()
            }
        }
    }

    pub fn exact_available(&self) -> bool {
        self.exact.is_some()
    }

    /// Attribute one request. Never fails; both paths failing yields
    /// [`Explanation::Unavailable`].
    pub fn explain(&self, features: &SynthesizedFeatures) -> Explanation {
        if let Some(exact) = &self.exact {
            match exact.attribute(features) {
                Ok(contributions) => {
                    return Explanation::Available {
                        contributions,
                        source: exact.source(),
                    }
                }
                Err(e) => warn!(error = %e, "Exact attribution failed, falling back to rules"),
            }
        }

        match self.fallback.attribute(features) {
            Ok(contributions) => Explanation::Available {
                contributions,
                source: self.fallback.source(),
            },
            Err(e) => {
                warn!(error = %e, "Rule-based attribution failed");
                Explanation::Unavailable {
                    reason: e.to_string(),
                }
            }
        }
    }
}

// ============================================================================
// Explanation Helpers
// ============================================================================

/// Top `n` entries by absolute contribution; ties keep map order.
pub fn top_features(map: &AttributionMap, n: usize) -> Vec<(&str, f64)> {
    let mut ranked = map.ranked();
    ranked.truncate(n);
    ranked
}

/// Human-readable summary of the top `n` factors.
pub fn format_explanation(map: &AttributionMap, n: usize) -> String {
    let mut lines = vec![format!("Top {n} factors affecting efficiency:"), String::new()];
    for (i, (feature, value)) in top_features(map, n).into_iter().enumerate() {
        let impact = if value > 0.0 { "increases" } else { "decreases" };
        lines.push(format!(
            "{}. {feature}: {impact} efficiency by {:.4}",
            i + 1,
            value.abs()
        ));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FeatureSynthesizer;
    use crate::types::RawReading;

    struct Failing;

    impl Attributor for Failing {
        fn attribute(&self, _: &SynthesizedFeatures) -> Result<AttributionMap, AttributionError> {
            Err(AttributionError::Unavailable("forced".to_string()))
        }
        fn source(&self) -> AttributionSource {
            AttributionSource::Exact
        }
    }

    fn features() -> SynthesizedFeatures {
        FeatureSynthesizer::new(FeatureSchema::new(["temperature"]), FeatureSchema::new(["Precipitation"]))
            .synthesize(
                &RawReading::new()
                    .with("temperature", 40.0)
                    .with("humidity", 80.0)
                    .with("irradiance", 750.0),
            )
            .unwrap()
    }

    #[test]
    fn test_exact_failure_falls_back_to_rules() {
        let engine = AttributionEngine::new(Some(Arc::new(Failing)), Arc::new(RuleBasedAttributor::new()));
        assert!(engine.exact_available());

        let explanation = engine.explain(&features());
        assert_eq!(explanation.source(), Some(AttributionSource::Approximate));
        let map = explanation.contributions().unwrap();
        for name in REQUIRED_ATTRIBUTION_FEATURES {
            assert!(map.contains(name), "missing {name}");
        }
    }

    #[test]
    fn test_both_paths_failing_yields_marker() {
        let engine = AttributionEngine::new(Some(Arc::new(Failing)), Arc::new(Failing));
        let explanation = engine.explain(&features());
        assert!(matches!(explanation, Explanation::Unavailable { .. }));
    }

    #[test]
    fn test_fallback_is_deterministic() {
        let engine = AttributionEngine::approximate();
        assert_eq!(engine.explain(&features()), engine.explain(&features()));
    }

    #[test]
    fn test_select_without_ensemble_is_approximate() {
        let engine = AttributionEngine::select(None, &FeatureSchema::new(["temperature"]), true);
        assert!(!engine.exact_available());
        let disabled = AttributionEngine::select(None, &FeatureSchema::new(["temperature"]), false);
        assert!(!disabled.exact_available());
    }

    #[test]
    fn test_top_features_and_format() {
        let map: AttributionMap = vec![
            ("temperature", -0.025),
            ("humidity", -0.01),
            ("irradiance", 0.06),
            ("dust_index", -0.03),
        ]
        .into_iter()
        .collect();

        let top = top_features(&map, 2);
        assert_eq!(top, vec![("irradiance", 0.06), ("dust_index", -0.03)]);

        let text = format_explanation(&map, 2);
        assert_eq!(
            text,
            "Top 2 factors affecting efficiency:\n\n\
             1. irradiance: increases efficiency by 0.0600\n\
             2. dust_index: decreases efficiency by 0.0300"
        );
    }
}
