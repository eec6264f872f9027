//! Efficiency and suitability scoring
//!
//! Applies the projected feature vectors to the two trained models and
//! normalizes their outputs:
//!
//! | Output | Rule |
//! |---|---|
//! | efficiency | raw prediction clamped to [0, 1]; non-finite → 0 |
//! | risk score | `round((1 − efficiency) × 100, 2)` |
//! | failure flag | `efficiency < 0.75` |
//! | suitability | label 1 → Yes, other → No, any failure → Unknown |
//! | action | risk < 30 monitor, < 60 optimize, else immediate action |

use tracing::warn;

use crate::config::defaults::FAILURE_EFFICIENCY_THRESHOLD;
use crate::model::{EfficiencyModel, ModelError, SuitabilityModel};
use crate::types::{FeatureVector, RecommendedAction, Suitability};

/// Normalized efficiency outputs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EfficiencyScore {
    pub efficiency: f64,
    pub risk_score: f64,
    pub failure_flag: bool,
}

impl EfficiencyScore {
    /// Derive risk and failure flag from a raw model output.
    pub fn from_raw(raw: f64) -> Self {
        let efficiency = clamp_efficiency(raw);
        Self {
            efficiency,
            risk_score: risk_score(efficiency),
            failure_flag: efficiency < FAILURE_EFFICIENCY_THRESHOLD,
        }
    }

    pub fn recommended_action(&self) -> RecommendedAction {
        RecommendedAction::from_risk_score(self.risk_score)
    }
}

/// Clamp to [0, 1]. A non-finite value carries no usable signal and maps to 0.
pub fn clamp_efficiency(raw: f64) -> f64 {
    if raw.is_finite() {
        raw.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// `round((1 − efficiency) × 100, 2)`
pub fn risk_score(efficiency: f64) -> f64 {
    ((1.0 - efficiency) * 100.0 * 100.0).round() / 100.0
}

/// Runs both models.
#[derive(Clone)]
pub struct EfficiencyScorer {
    efficiency: EfficiencyModel,
    suitability: SuitabilityModel,
}

impl EfficiencyScorer {
    pub fn new(efficiency: EfficiencyModel, suitability: SuitabilityModel) -> Self {
        Self {
            efficiency,
            suitability,
        }
    }

    pub fn score_efficiency(&self, features: &FeatureVector) -> EfficiencyScore {
        let raw = self.efficiency.model.predict(features);
        if !raw.is_finite() {
            warn!(raw, "Efficiency model returned a non-finite value");
        }
        EfficiencyScore::from_raw(raw)
    }

    /// Suitability verdict; failures are logged and reported as `Unknown`.
    pub fn score_suitability(&self, features: &FeatureVector) -> Suitability {
        match self.predict_suitability(features) {
            Ok(label) => Suitability::from_label(label),
            Err(e) => {
                warn!(error = %e, "Suitability prediction failed");
                Suitability::Unknown
            }
        }
    }

    fn predict_suitability(&self, features: &FeatureVector) -> Result<u8, ModelError> {
        let expected = self.suitability.model.feature_count();
        if features.len() != expected {
            return Err(ModelError::FeatureCountMismatch {
                expected,
                actual: features.len(),
            });
        }
        self.suitability.model.predict(features)
    }
}
