//! Gradient-boosted tree ensemble
//!
//! JSON artifact layout:
//!
//! ```json
//! {
//!   "feature_names": ["temperature", "humidity", "..."],
//!   "base_score": 0.62,
//!   "objective": "regression",
//!   "trees": [
//!     { "nodes": [
//!       { "kind": "split", "feature": 0, "threshold": 35.0, "left": 1, "right": 2 },
//!       { "kind": "leaf", "value": 0.08, "cover": 120.0 },
//!       { "kind": "leaf", "value": -0.05, "cover": 40.0 }
//!     ] }
//!   ]
//! }
//! ```
//!
//! - `nodes[0]` is the root; children always have larger indices than parents.
//! - Split rule: `x < threshold` goes left; a missing (NaN) value follows
//!   `default_left` (default `true`).
//! - `base_score` is in margin space. Regression output is the margin;
//!   `binary_logistic` applies a sigmoid.
//! - Leaf `cover` is the training weight that reached the leaf. Subtree covers
//!   are derived, and drive both expectations and exact attribution.

use serde::{Deserialize, Serialize};
use std::path::Path;

use super::{ClassificationModel, ModelError, RegressionModel};
use crate::types::FeatureVector;

/// Training objective of an ensemble.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Objective {
    #[default]
    Regression,
    BinaryLogistic,
}

impl std::fmt::Display for Objective {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Objective::Regression => write!(f, "regression"),
            Objective::BinaryLogistic => write!(f, "binary_logistic"),
        }
    }
}

/// One node of a decision tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
        #[serde(default = "default_left")]
        default_left: bool,
    },
    Leaf {
        value: f64,
        cover: f64,
    },
}

fn default_left() -> bool {
    true
}

/// A single regression tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    pub nodes: Vec<Node>,
}

/// Serialized form, validated into [`TreeEnsemble`].
#[derive(Debug, Clone, Deserialize)]
struct EnsembleArtifact {
    feature_names: Vec<String>,
    #[serde(default)]
    base_score: f64,
    #[serde(default)]
    objective: Objective,
    trees: Vec<Tree>,
}

/// Tree plus derived per-node statistics.
#[derive(Debug, Clone)]
pub(super) struct CompiledTree {
    pub(super) nodes: Vec<Node>,
    /// Training weight below each node
    pub(super) covers: Vec<f64>,
    /// Cover-weighted mean output below the root
    pub(super) expected_value: f64,
}

impl CompiledTree {
    fn compile(tree: Tree, tree_idx: usize, n_features: usize) -> Result<Self, ModelError> {
        let nodes = tree.nodes;
        if nodes.is_empty() {
            return Err(ModelError::Invalid(format!("tree {tree_idx} has no nodes")));
        }

        for (idx, node) in nodes.iter().enumerate() {
            match node {
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    if *feature >= n_features {
                        return Err(ModelError::Invalid(format!(
                            "tree {tree_idx} node {idx}: split feature {feature} out of range ({n_features} features)"
                        )));
                    }
                    if threshold.is_nan() {
                        return Err(ModelError::Invalid(format!(
                            "tree {tree_idx} node {idx}: NaN threshold"
                        )));
                    }
                    for child in [left, right] {
                        if *child <= idx || *child >= nodes.len() {
                            return Err(ModelError::Invalid(format!(
                                "tree {tree_idx} node {idx}: child index {child} invalid"
                            )));
                        }
                    }
                }
                Node::Leaf { value, cover } => {
                    if !value.is_finite() {
                        return Err(ModelError::Invalid(format!(
                            "tree {tree_idx} node {idx}: non-finite leaf value"
                        )));
                    }
                    if !cover.is_finite() || *cover <= 0.0 {
                        return Err(ModelError::Invalid(format!(
                            "tree {tree_idx} node {idx}: leaf cover must be positive"
                        )));
                    }
                }
            }
        }

        // Children have larger indices, so a reverse sweep sees them first.
        let mut covers = vec![0.0; nodes.len()];
        let mut expectations = vec![0.0; nodes.len()];
        for idx in (0..nodes.len()).rev() {
            match &nodes[idx] {
                Node::Leaf { value, cover } => {
                    covers[idx] = *cover;
                    expectations[idx] = *value;
                }
                Node::Split { left, right, .. } => {
                    let cover = covers[*left] + covers[*right];
                    covers[idx] = cover;
                    expectations[idx] =
                        (covers[*left] * expectations[*left] + covers[*right] * expectations[*right])
                            / cover;
                }
            }
        }

        Ok(Self {
            nodes,
            expected_value: expectations[0],
            covers,
        })
    }

    /// Which child `x` falls into at a split node.
    pub(super) fn goes_left(x: &[f64], feature: usize, threshold: f64, default_left: bool) -> bool {
        match x.get(feature).copied() {
            Some(v) if !v.is_nan() => v < threshold,
            _ => default_left,
        }
    }

    fn leaf_value(&self, x: &[f64]) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { value, .. } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    default_left,
                } => {
                    idx = if Self::goes_left(x, *feature, *threshold, *default_left) {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }
}

/// Gradient-boosted tree ensemble.
///
/// Always structurally valid: construction and deserialization both run the
/// same checks, so traversal never leaves the node arrays.
#[derive(Debug, Clone)]
pub struct TreeEnsemble {
    feature_names: Vec<String>,
    base_score: f64,
    objective: Objective,
    pub(super) trees: Vec<CompiledTree>,
}

impl TreeEnsemble {
    /// Build and validate an ensemble.
    pub fn new(
        feature_names: Vec<String>,
        base_score: f64,
        objective: Objective,
        trees: Vec<Tree>,
    ) -> Result<Self, ModelError> {
        if feature_names.is_empty() {
            return Err(ModelError::Invalid("ensemble has no features".to_string()));
        }
        if !base_score.is_finite() {
            return Err(ModelError::Invalid("base_score must be finite".to_string()));
        }
        let n_features = feature_names.len();
        let trees = trees
            .into_iter()
            .enumerate()
            .map(|(i, t)| CompiledTree::compile(t, i, n_features))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            feature_names,
            base_score,
            objective,
            trees,
        })
    }

    /// Parse an ensemble from JSON text.
    pub fn from_json_str(json: &str) -> Result<Self, ModelError> {
        let artifact: EnsembleArtifact = serde_json::from_str(json)
            .map_err(|e| ModelError::Parse(std::path::PathBuf::from("<inline>"), e))?;
        Self::from_artifact(artifact)
    }

    /// Load an ensemble artifact from disk.
    pub fn load_from_file(path: &Path) -> Result<Self, ModelError> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| ModelError::Io(path.to_path_buf(), e))?;
        let artifact: EnsembleArtifact = serde_json::from_str(&contents)
            .map_err(|e| ModelError::Parse(path.to_path_buf(), e))?;
        let ensemble = Self::from_artifact(artifact)?;

        tracing::info!(
            path = %path.display(),
            trees = ensemble.trees.len(),
            features = ensemble.feature_names.len(),
            objective = %ensemble.objective,
            "Loaded tree ensemble"
        );
        Ok(ensemble)
    }

    fn from_artifact(artifact: EnsembleArtifact) -> Result<Self, ModelError> {
        Self::new(
            artifact.feature_names,
            artifact.base_score,
            artifact.objective,
            artifact.trees,
        )
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn objective(&self) -> Objective {
        self.objective
    }

    pub fn base_score(&self) -> f64 {
        self.base_score
    }

    pub fn tree_count(&self) -> usize {
        self.trees.len()
    }

    /// Raw additive margin: `base_score + Σ leaf values`.
    pub fn predict_margin(&self, x: &[f64]) -> f64 {
        self.base_score + self.trees.iter().map(|t| t.leaf_value(x)).sum::<f64>()
    }

    /// Output in the objective's space.
    pub fn predict_output(&self, x: &[f64]) -> f64 {
        let margin = self.predict_margin(x);
        match self.objective {
            Objective::Regression => margin,
            Objective::BinaryLogistic => sigmoid(margin),
        }
    }

    /// Cover-weighted mean margin over the training distribution.
    pub fn expected_margin(&self) -> f64 {
        self.base_score + self.trees.iter().map(|t| t.expected_value).sum::<f64>()
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

impl RegressionModel for TreeEnsemble {
    fn feature_count(&self) -> usize {
        self.feature_names.len()
    }

    fn predict(&self, features: &FeatureVector) -> f64 {
        self.predict_output(&features.values())
    }
}

impl ClassificationModel for TreeEnsemble {
    fn feature_count(&self) -> usize {
        self.feature_names.len()
    }

    fn predict(&self, features: &FeatureVector) -> Result<u8, ModelError> {
        if self.objective != Objective::BinaryLogistic {
            return Err(ModelError::UnsupportedObjective {
                objective: self.objective,
                operation: "classification",
            });
        }
        let x = features.values();
        if x.len() != self.feature_names.len() {
            return Err(ModelError::FeatureCountMismatch {
                expected: self.feature_names.len(),
                actual: x.len(),
            });
        }
        let probability = sigmoid(self.predict_margin(&x));
        if probability.is_nan() {
            return Err(ModelError::Inference("classifier produced NaN".to_string()));
        }
        Ok(u8::from(probability > 0.5))
    }
}
