//! Trained model seams
//!
//! The scoring pipeline consumes two independently trained models through
//! object-safe traits so tests can inject mocks:
//!
//! - [`RegressionModel`]: efficiency regression, `predict(features) -> f64`
//! - [`ClassificationModel`]: suitability classification, `predict(features) -> {0, 1}`
//!
//! Each model is paired with a [`FeatureSchema`], the ordered feature names it
//! was trained on. The shipped implementation is a gradient-boosted
//! [`TreeEnsemble`] loaded from a JSON artifact, which also supports exact
//! tree-path Shapley attribution (see `tree_shap`).

pub mod tree;
mod tree_shap;

pub use tree::{Node, Objective, Tree, TreeEnsemble};
pub use tree_shap::ShapValues;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

use crate::config::ModelPaths;
use crate::types::FeatureVector;

// ============================================================================
// Error Types
// ============================================================================

/// Errors from model loading and inference
#[derive(Debug, Error)]
pub enum ModelError {
    /// Artifact could not be read
    #[error("Model I/O error ({}): {}", .0.display(), .1)]
    Io(PathBuf, #[source] std::io::Error),

    /// Artifact is not valid JSON for the expected shape
    #[error("Model parse error ({}): {}", .0.display(), .1)]
    Parse(PathBuf, #[source] serde_json::Error),

    /// Artifact parsed but violates a structural invariant
    #[error("Invalid model artifact: {0}")]
    Invalid(String),

    /// Input width differs from the trained feature count
    #[error("Feature count mismatch: model expects {expected}, got {actual}")]
    FeatureCountMismatch { expected: usize, actual: usize },

    /// Schema and model disagree on feature names or order
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    /// Operation not meaningful for this model's objective
    #[error("Objective {objective} does not support {operation}")]
    UnsupportedObjective {
        objective: Objective,
        operation: &'static str,
    },

    /// Inference failed at runtime
    #[error("Inference failed: {0}")]
    Inference(String),
}

// ============================================================================
// Model Traits
// ============================================================================

/// Efficiency regression model.
///
/// Prediction is infallible: inputs are always projected onto the model's
/// schema before inference, and the pipeline checks schema width against
/// [`feature_count`](RegressionModel::feature_count) at construction.
pub trait RegressionModel: Send + Sync {
    /// Number of input features the model was trained on.
    fn feature_count(&self) -> usize;

    /// Raw (unclamped) prediction.
    fn predict(&self, features: &FeatureVector) -> f64;
}

/// Binary classification model.
pub trait ClassificationModel: Send + Sync {
    /// Number of input features the model was trained on.
    fn feature_count(&self) -> usize;

    /// Predicted label, 0 or 1.
    fn predict(&self, features: &FeatureVector) -> Result<u8, ModelError>;
}

// ============================================================================
// Feature Schema
// ============================================================================

/// Ordered feature names a model was trained on.
///
/// Cheap to clone; shared read-only across concurrent requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureSchema {
    names: Arc<[String]>,
}

impl FeatureSchema {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Load a schema from a JSON array of feature names.
    pub fn load_from_file(path: &Path) -> Result<Self, ModelError> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| ModelError::Io(path.to_path_buf(), e))?;
        let names: Vec<String> = serde_json::from_str(&contents)
            .map_err(|e| ModelError::Parse(path.to_path_buf(), e))?;
        Ok(Self::new(names))
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }
}

/// A regression model paired with its schema.
#[derive(Clone)]
pub struct EfficiencyModel {
    pub model: Arc<dyn RegressionModel>,
    pub schema: FeatureSchema,
}

/// A classification model paired with its schema.
#[derive(Clone)]
pub struct SuitabilityModel {
    pub model: Arc<dyn ClassificationModel>,
    pub schema: FeatureSchema,
}

/// Both pre-loaded models, injected into the pipeline at construction.
#[derive(Clone)]
pub struct ModelSet {
    pub efficiency: EfficiencyModel,
    pub suitability: SuitabilityModel,
}

impl ModelSet {
    /// Check that every schema matches its model's input width.
    pub fn check(&self) -> Result<(), ModelError> {
        check_width(
            "efficiency",
            self.efficiency.model.feature_count(),
            &self.efficiency.schema,
        )?;
        check_width(
            "suitability",
            self.suitability.model.feature_count(),
            &self.suitability.schema,
        )
    }
}

/// Models loaded from disk, plus the concrete efficiency ensemble for exact
/// attribution.
#[derive(Clone)]
pub struct LoadedModels {
    pub set: ModelSet,
    pub efficiency_ensemble: Arc<TreeEnsemble>,
}

/// Load both ensembles and their schemas.
///
/// A schema file, when configured, must list exactly the ensemble's own
/// feature names in the same order; otherwise the embedded names are used.
pub fn load_models(paths: &ModelPaths) -> Result<LoadedModels, ModelError> {
    let efficiency = Arc::new(TreeEnsemble::load_from_file(&paths.efficiency_path)?);
    let suitability = Arc::new(TreeEnsemble::load_from_file(&paths.suitability_path)?);
    if suitability.objective() != Objective::BinaryLogistic {
        return Err(ModelError::UnsupportedObjective {
            objective: suitability.objective(),
            operation: "suitability classification",
        });
    }

    let efficiency_schema = resolve_schema(paths.efficiency_schema_path.as_deref(), &efficiency)?;
    let suitability_schema =
        resolve_schema(paths.suitability_schema_path.as_deref(), &suitability)?;

    let set = ModelSet {
        efficiency: EfficiencyModel {
            model: efficiency.clone(),
            schema: efficiency_schema,
        },
        suitability: SuitabilityModel {
            model: suitability,
            schema: suitability_schema,
        },
    };
    set.check()?;

    Ok(LoadedModels {
        set,
        efficiency_ensemble: efficiency,
    })
}

fn resolve_schema(path: Option<&Path>, ensemble: &TreeEnsemble) -> Result<FeatureSchema, ModelError> {
    let Some(path) = path else {
        return Ok(FeatureSchema::new(ensemble.feature_names().iter().cloned()));
    };
    let schema = FeatureSchema::load_from_file(path)?;
    if schema.names() != ensemble.feature_names() {
        return Err(ModelError::SchemaMismatch(format!(
            "{} does not match the feature names embedded in the model",
            path.display()
        )));
    }
    Ok(schema)
}

fn check_width(which: &str, expected: usize, schema: &FeatureSchema) -> Result<(), ModelError> {
    if expected == schema.len() {
        Ok(())
    } else {
        Err(ModelError::SchemaMismatch(format!(
            "{which} model expects {expected} features, schema lists {}",
            schema.len()
        )))
    }
}
