//! Scoring pipeline coordinator

use std::time::Instant;
use tracing::{debug, warn};

use crate::attribution::AttributionEngine;
use crate::config::SolarConfig;
use crate::features::FeatureSynthesizer;
use crate::insights::{summary_line, InsightService};
use crate::model::{load_models, ModelError, ModelSet};
use crate::scoring::EfficiencyScorer;
use crate::types::{InsightSource, PredictionResult, RawReading, ValidationError};

/// Composes synthesis, scoring, attribution, and insights into one
/// request → result transformation.
///
/// Holds only immutable, pre-loaded collaborators; `score` takes `&self` and
/// is safe to call from any number of concurrent requests.
#[derive(Clone)]
pub struct ScoringPipeline {
    synthesizer: FeatureSynthesizer,
    scorer: EfficiencyScorer,
    attribution: AttributionEngine,
    insights: InsightService,
}

impl std::fmt::Debug for ScoringPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScoringPipeline")
            .field("efficiency_features", &self.efficiency_feature_count())
            .field("suitability_features", &self.suitability_feature_count())
            .field("attribution", &self.attribution)
            .field("insights", &self.insights)
            .finish()
    }
}

impl ScoringPipeline {
    /// Assemble a pipeline. Fails if a model's input width disagrees with its
    /// schema.
    pub fn new(
        models: ModelSet,
        attribution: AttributionEngine,
        insights: InsightService,
    ) -> Result<Self, ModelError> {
        models.check()?;
        let synthesizer = FeatureSynthesizer::new(
            models.efficiency.schema.clone(),
            models.suitability.schema.clone(),
        );
        Ok(Self {
            synthesizer,
            scorer: EfficiencyScorer::new(models.efficiency, models.suitability),
            attribution,
            insights,
        })
    }

    /// Load artifacts and select attribution/insight strategies from config.
    pub fn from_config(config: &SolarConfig) -> Result<Self, ModelError> {
        let loaded = load_models(&config.models)?;
        let attribution = AttributionEngine::select(
            Some(loaded.efficiency_ensemble),
            &loaded.set.efficiency.schema,
            config.attribution.exact,
        );
        let insights = InsightService::from_config(&config.insights);
        Self::new(loaded.set, attribution, insights)
    }

    pub fn exact_attribution(&self) -> bool {
        self.attribution.exact_available()
    }

    pub fn external_insights(&self) -> bool {
        self.insights.external_enabled()
    }

    pub fn efficiency_feature_count(&self) -> usize {
        self.synthesizer.efficiency_schema().len()
    }

    pub fn suitability_feature_count(&self) -> usize {
        self.synthesizer.suitability_schema().len()
    }

    /// Score one reading.
    ///
    /// The only error is a missing required field; every other failure is
    /// absorbed into the result.
    pub async fn score(&self, raw: &RawReading) -> Result<PredictionResult, ValidationError> {
        let start = Instant::now();

        // Validate + Synthesize
        let features = self.synthesizer.synthesize(raw)?;

        // Score(efficiency)
        let score = self.scorer.score_efficiency(&features.efficiency);

        // Attribute
        let explanation = self.attribution.explain(&features);

        // GenerateInsights
        let (insights, insight_source) = match self
            .insights
            .generate(&explanation, score.efficiency)
            .await
        {
            Ok(insights) => (insights.lines, insights.source),
            Err(e) => {
                warn!(error = %e, "Insight generation failed, using summary line");
                (
                    vec![summary_line(score.efficiency, score.failure_flag)],
                    InsightSource::Summary,
                )
            }
        };

        // Score(suitability)
        let suitability = self.scorer.score_suitability(&features.suitability);

        // Classify(action)
        let recommended_action = score.recommended_action();

        debug!(
            efficiency = score.efficiency,
            risk_score = score.risk_score,
            suitability = %suitability,
            attribution = ?explanation.source(),
            insight_source = ?insight_source,
            elapsed_us = start.elapsed().as_micros() as u64,
            "Reading scored"
        );

        // Assemble
        Ok(PredictionResult {
            efficiency: score.efficiency,
            risk_score: score.risk_score,
            failure_flag: score.failure_flag,
            suitability,
            explanation,
            insights,
            insight_source,
            recommended_action,
        })
    }
}
