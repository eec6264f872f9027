//! Rule-based insight templates
//!
//! Always available and deterministic. Produces one performance-band line,
//! up to three factor lines for the strongest attribution entries, and one
//! closing recommendation.

use async_trait::async_trait;

use super::{InsightError, InsightGenerator};
use crate::attribution::top_features;
use crate::config::defaults::{DIAGNOSTIC_EFFICIENCY, EXCELLENT_EFFICIENCY, GOOD_EFFICIENCY, TOP_FACTORS};
use crate::types::{AttributionMap, Explanation};

/// A factor template: feature-name substring, contribution test, message.
struct FactorRule {
    keyword: &'static str,
    applies: fn(f64) -> bool,
    message: &'static str,
}

/// Checked in order; the first match wins.
const FACTOR_RULES: [FactorRule; 4] = [
    FactorRule {
        keyword: "temperature",
        applies: |impact: f64| impact < -0.03,
        message: "🌡️ High temperature is reducing efficiency. Consider cooling systems or shade structures.",
    },
    FactorRule {
        keyword: "irradiance",
        applies: |impact: f64| impact > 0.05,
        message: "☀️ Good solar irradiance levels. Maintain panel cleanliness to maximize capture.",
    },
    FactorRule {
        keyword: "dust",
        applies: |impact: f64| impact < -0.03,
        message: "🧹 Dust accumulation detected. Schedule cleaning to restore 5-10% efficiency.",
    },
    FactorRule {
        keyword: "humidity",
        applies: |impact: f64| impact < -0.02,
        message: "💧 High humidity affecting performance. Monitor for condensation issues.",
    },
];

/// Deterministic template generator.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleBasedInsights;

impl RuleBasedInsights {
    pub fn new() -> Self {
        Self
    }

    /// Build the insight lines. Factor lines are skipped when no attribution
    /// map is available.
    pub fn lines(&self, attribution: Option<&AttributionMap>, efficiency: f64) -> Vec<String> {
        let mut lines = vec![band_line(efficiency).to_string()];
        if let Some(map) = attribution {
            lines.extend(
                top_features(map, TOP_FACTORS)
                    .into_iter()
                    .filter_map(|(feature, impact)| factor_line(feature, impact))
                    .map(str::to_string),
            );
        }
        lines.push(closing_line(efficiency).to_string());
        lines
    }
}

#[async_trait]
impl InsightGenerator for RuleBasedInsights {
    async fn generate(&self, explanation: &Explanation, efficiency: f64) -> Result<Vec<String>, InsightError> {
        Ok(self.lines(explanation.contributions(), efficiency))
    }

    fn name(&self) -> &'static str {
        "rule_based"
    }
}

fn band_line(efficiency: f64) -> &'static str {
    if efficiency > EXCELLENT_EFFICIENCY {
        "✓ Excellent performance - System is operating at peak efficiency."
    } else if efficiency > GOOD_EFFICIENCY {
        "⚠ Good performance with room for optimization."
    } else {
        "⚠ Low efficiency detected - Immediate attention required."
    }
}

fn factor_line(feature: &str, impact: f64) -> Option<&'static str> {
    let feature = feature.to_lowercase();
    FACTOR_RULES
        .iter()
        .find(|rule| feature.contains(rule.keyword) && (rule.applies)(impact))
        .map(|rule| rule.message)
}

fn closing_line(efficiency: f64) -> &'static str {
    if efficiency < DIAGNOSTIC_EFFICIENCY {
        "📊 Recommendation: Conduct full system diagnostic and performance audit."
    } else {
        "🔄 Recommendation: Continue regular maintenance schedule for optimal performance."
    }
}
