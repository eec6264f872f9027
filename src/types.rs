//! Shared data structures for the solar scoring pipeline
//!
//! This module defines the request-scoped types that flow through the pipeline:
//! - `RawReading`: sparse sensor/weather reading as received
//! - `FeatureVector`: ordered, model-facing feature values
//! - `AttributionMap`: signed per-feature contributions toward efficiency
//! - `PredictionResult`: the assembled, externally visible result

use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Raw fields every reading must carry.
pub const REQUIRED_FIELDS: [&str; 3] = ["temperature", "humidity", "irradiance"];

// ============================================================================
// Raw Reading
// ============================================================================

/// Sensor/weather reading for a single request, keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawReading {
    fields: BTreeMap<String, f64>,
}

impl RawReading {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, name: &str, value: f64) -> Self {
        self.fields.insert(name.to_string(), value);
        self
    }

    pub fn insert(&mut self, name: &str, value: f64) {
        self.fields.insert(name.to_string(), value);
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.fields.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Build a reading from an arbitrary JSON value.
    ///
    /// Returns `None` when the value is not an object. Non-numeric members are
    /// dropped, so a string `"temperature": "hot"` counts as absent.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        let object = value.as_object()?;
        Some(
            object
                .iter()
                .filter_map(|(k, v)| v.as_f64().map(|n| (k.clone(), n)))
                .collect(),
        )
    }

    /// Names of required fields absent from this reading, in canonical order.
    pub fn missing_required(&self) -> Vec<String> {
        REQUIRED_FIELDS
            .iter()
            .filter(|name| !self.contains(name))
            .map(|name| (*name).to_string())
            .collect()
    }

    /// Check the required-field precondition.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let missing = self.missing_required();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { missing })
        }
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for RawReading {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

/// The only caller-visible scoring failure: required raw fields are absent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Missing required fields: {missing:?}")]
pub struct ValidationError {
    /// Missing field names, in canonical order.
    pub missing: Vec<String>,
}

// ============================================================================
// Feature Vector
// ============================================================================

/// Ordered mapping from feature name to value.
///
/// Insertion order is preserved; re-inserting an existing name overwrites the
/// value in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureVector {
    entries: Vec<(String, f64)>,
}

impl FeatureVector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    pub fn insert(&mut self, name: &str, value: f64) {
        match self.entries.iter_mut().find(|(k, _)| k == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name.to_string(), value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.entries.iter().find(|(k, _)| k == name).map(|(_, v)| *v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// Values in key order, ready for model inference.
    pub fn values(&self) -> Vec<f64> {
        self.entries.iter().map(|(_, v)| *v).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

impl Serialize for FeatureVector {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

// ============================================================================
// Attribution
// ============================================================================

/// Signed contribution of each feature toward the efficiency prediction.
///
/// Positive values improve the outcome. Entries keep insertion order, which is
/// also the tie-break order when ranking by magnitude.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributionMap {
    entries: Vec<(String, f64)>,
}

impl AttributionMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, feature: &str, contribution: f64) {
        match self.entries.iter_mut().find(|(k, _)| k == feature) {
            Some(entry) => entry.1 = contribution,
            None => self.entries.push((feature.to_string(), contribution)),
        }
    }

    pub fn get(&self, feature: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|(k, _)| k == feature)
            .map(|(_, v)| *v)
    }

    pub fn contains(&self, feature: &str) -> bool {
        self.get(feature).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Entries sorted by absolute contribution, largest first.
    ///
    /// The sort is stable, so equal magnitudes keep insertion order.
    pub fn ranked(&self) -> Vec<(&str, f64)> {
        let mut ranked: Vec<(&str, f64)> = self.iter().collect();
        ranked.sort_by(|a, b| b.1.abs().total_cmp(&a.1.abs()));
        ranked
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for AttributionMap {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (k, v) in iter {
            map.insert(&k.into(), v);
        }
        map
    }
}

impl Serialize for AttributionMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

/// Which attribution path produced a map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributionSource {
    /// Tree-path Shapley values from the efficiency model itself
    Exact,
    /// Deterministic rule-based proxy
    Approximate,
}

impl std::fmt::Display for AttributionSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttributionSource::Exact => write!(f, "exact"),
            AttributionSource::Approximate => write!(f, "approximate"),
        }
    }
}

/// Attribution field of a prediction: a map, or an explicit error marker.
#[derive(Debug, Clone, PartialEq)]
pub enum Explanation {
    Available {
        contributions: AttributionMap,
        source: AttributionSource,
    },
    Unavailable {
        reason: String,
    },
}

impl Explanation {
    pub fn contributions(&self) -> Option<&AttributionMap> {
        match self {
            Explanation::Available { contributions, .. } => Some(contributions),
            Explanation::Unavailable { .. } => None,
        }
    }

    pub fn source(&self) -> Option<AttributionSource> {
        match self {
            Explanation::Available { source, .. } => Some(*source),
            Explanation::Unavailable { .. } => None,
        }
    }
}

impl Serialize for Explanation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Explanation::Available { contributions, .. } => contributions.serialize(serializer),
            Explanation::Unavailable { .. } => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("error", "Explanation not available")?;
                map.end()
            }
        }
    }
}

// ============================================================================
// Scoring Outputs
// ============================================================================

/// Site suitability verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Suitability {
    Yes,
    No,
    Unknown,
}

impl Suitability {
    /// Map a binary classifier label. Label 1 is suitable; anything else is not.
    pub fn from_label(label: u8) -> Self {
        if label == 1 {
            Suitability::Yes
        } else {
            Suitability::No
        }
    }
}

impl std::fmt::Display for Suitability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Suitability::Yes => write!(f, "Yes"),
            Suitability::No => write!(f, "No"),
            Suitability::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Recommended operator action, a fixed three-way classification of risk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendedAction {
    /// risk < 30
    Monitor,
    /// 30 <= risk < 60
    Optimize,
    /// risk >= 60
    ImmediateAction,
}

impl RecommendedAction {
    pub fn from_risk_score(risk_score: f64) -> Self {
        use crate::config::defaults::{RISK_IMMEDIATE_ACTION, RISK_OPTIMIZE};

        if risk_score < RISK_OPTIMIZE {
            RecommendedAction::Monitor
        } else if risk_score < RISK_IMMEDIATE_ACTION {
            RecommendedAction::Optimize
        } else {
            RecommendedAction::ImmediateAction
        }
    }

    /// Operator-facing wording.
    pub fn message(&self) -> &'static str {
        match self {
            RecommendedAction::Monitor => "Monitor closely - System performing well",
            RecommendedAction::Optimize => "Optimize - Consider maintenance and cleaning",
            RecommendedAction::ImmediateAction => {
                "Immediate action required - Failure risk detected!"
            }
        }
    }
}

impl std::fmt::Display for RecommendedAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecommendedAction::Monitor => write!(f, "monitor"),
            RecommendedAction::Optimize => write!(f, "optimize"),
            RecommendedAction::ImmediateAction => write!(f, "immediate action"),
        }
    }
}

/// Which generator produced the insight lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightSource {
    /// External natural-language service
    External,
    /// Deterministic templates
    RuleBased,
    /// Last-resort one-line summary when every generator failed
    Summary,
}

/// Complete scoring result for one reading. Never mutated after assembly.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionResult {
    /// Predicted efficiency, clamped to [0, 1]
    pub efficiency: f64,
    /// `round((1 - efficiency) * 100, 2)`
    pub risk_score: f64,
    /// `efficiency < 0.75`
    pub failure_flag: bool,
    pub suitability: Suitability,
    pub explanation: Explanation,
    pub insights: Vec<String>,
    pub insight_source: InsightSource,
    pub recommended_action: RecommendedAction,
}
