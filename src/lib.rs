//! SolarSense: solar installation efficiency scoring
//!
//! Scores a live sensor/weather reading for operating efficiency and site
//! suitability, explains which factors drove the score, and turns the
//! explanation into operator guidance.
//!
//! ## Architecture
//!
//! - **Features**: derives the model-facing vectors from a sparse reading
//! - **Model**: tree-ensemble regression/classification behind trait seams
//! - **Attribution**: exact tree-path Shapley values with a rule-based fallback
//! - **Scoring**: clamping, risk score, failure flag, suitability, action
//! - **Insights**: rule-based templates with an optional external service
//! - **Pipeline**: orchestration with per-stage failure isolation
//! - **API**: axum HTTP surface (`POST /predict`, `GET /health`)

pub mod api;
pub mod attribution;
pub mod config;
pub mod features;
pub mod insights;
pub mod model;
pub mod pipeline;
pub mod scoring;
pub mod types;

// Re-export configuration
pub use config::SolarConfig;

// Re-export commonly used types
pub use types::{
    AttributionMap, AttributionSource, Explanation, FeatureVector, InsightSource,
    PredictionResult, RawReading, RecommendedAction, Suitability, ValidationError,
};

// Re-export pipeline components
pub use attribution::{AttributionEngine, RuleBasedAttributor, TreeExplainer};
pub use features::{project, FeatureSynthesizer};
pub use insights::{InsightGenerator, InsightService, RuleBasedInsights};
pub use model::{FeatureSchema, ModelError, ModelSet, TreeEnsemble};
pub use pipeline::ScoringPipeline;
