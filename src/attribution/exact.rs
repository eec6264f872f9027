//! Exact attribution from the efficiency tree ensemble

use std::sync::Arc;

use super::{AttributionError, Attributor, REQUIRED_ATTRIBUTION_FEATURES};
use crate::features::SynthesizedFeatures;
use crate::model::{FeatureSchema, ModelError, Objective, TreeEnsemble};
use crate::types::{AttributionMap, AttributionSource};

/// Tree-path Shapley attributor bound to one ensemble and its training schema.
///
/// Construction fails unless the schema matches the ensemble's feature names
/// exactly and covers every feature downstream insights rely on.
#[derive(Debug, Clone)]
pub struct TreeExplainer {
    ensemble: Arc<TreeEnsemble>,
    schema: FeatureSchema,
}

impl TreeExplainer {
    pub fn new(ensemble: Arc<TreeEnsemble>, schema: FeatureSchema) -> Result<Self, AttributionError> {
        if ensemble.objective() != Objective::Regression {
            return Err(ModelError::UnsupportedObjective {
                objective: ensemble.objective(),
                operation: "efficiency attribution",
            }
            .into());
        }
        if ensemble.feature_names() != schema.names() {
            return Err(ModelError::SchemaMismatch(format!(
                "ensemble features {:?} differ from schema {:?}",
                ensemble.feature_names(),
                schema.names()
            ))
            .into());
        }
        if let Some(missing) = REQUIRED_ATTRIBUTION_FEATURES
            .iter()
            .find(|name| !schema.contains(name))
        {
            return Err(AttributionError::MissingFeature((*missing).to_string()));
        }
        Ok(Self { ensemble, schema })
    }
}

impl Attributor for TreeExplainer {
    fn attribute(&self, features: &SynthesizedFeatures) -> Result<AttributionMap, AttributionError> {
        let x = features.efficiency.values();
        let shap = self.ensemble.shap_values(&x)?;

        tracing::debug!(
            base_value = shap.base_value,
            margin = shap.reconstructed(),
            "Exact attribution computed"
        );

        Ok(self
            .schema
            .names()
            .iter()
            .map(String::as_str)
            .zip(shap.contributions)
            .collect())
    }

    fn source(&self) -> AttributionSource {
        AttributionSource::Exact
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FeatureSynthesizer;
    use crate::model::{Node, Tree};
    use crate::types::RawReading;

    const FEATURES: [&str; 5] = ["temperature", "humidity", "irradiance", "dust_index", "panel_temp"];

    fn ensemble(objective: Objective) -> Arc<TreeEnsemble> {
        let tree = Tree {
            nodes: vec![
                Node::Split {
                    feature: 3,
                    threshold: 0.6,
                    left: 1,
                    right: 2,
                    default_left: true,
                },
                Node::Split {
                    feature: 0,
                    threshold: 35.0,
                    left: 3,
                    right: 4,
                    default_left: true,
                },
                Node::Leaf { value: 0.65, cover: 2.0 },
                Node::Leaf { value: 0.92, cover: 4.0 },
                Node::Leaf { value: 0.80, cover: 2.0 },
            ],
        };
        Arc::new(
            TreeEnsemble::new(
                FEATURES.iter().map(|s| s.to_string()).collect(),
                0.0,
                objective,
                vec![tree],
            )
            .unwrap(),
        )
    }

    fn schema() -> FeatureSchema {
        FeatureSchema::new(FEATURES)
    }

    #[test]
    fn test_attribution_sums_to_prediction() {
        let model = ensemble(Objective::Regression);
        let explainer = TreeExplainer::new(model.clone(), schema()).unwrap();
        let synthesizer = FeatureSynthesizer::new(schema(), FeatureSchema::new(["GHI (kWh/m²/day)"]));

        let raw = RawReading::new()
            .with("temperature", 40.0)
            .with("humidity", 80.0)
            .with("irradiance", 750.0);
        let features = synthesizer.synthesize(&raw).unwrap();
        let map = explainer.attribute(&features).unwrap();

        assert_eq!(map.iter().map(|(k, _)| k).collect::<Vec<_>>(), FEATURES);
        let total: f64 = map.iter().map(|(_, v)| v).sum();
        let prediction = model.predict_margin(&features.efficiency.values());
        assert!((model.expected_margin() + total - prediction).abs() < 1e-9);
        // Features the trees never split on contribute nothing
        assert_eq!(map.get("humidity"), Some(0.0));
        assert!(map.get("temperature").unwrap() < 0.0);
    }

    #[test]
    fn test_rejects_reordered_schema() {
        let reordered = FeatureSchema::new(["humidity", "temperature", "irradiance", "dust_index", "panel_temp"]);
        let err = TreeExplainer::new(ensemble(Objective::Regression), reordered).unwrap_err();
        assert!(matches!(err, AttributionError::Model(ModelError::SchemaMismatch(_))));
    }

    #[test]
    fn test_rejects_schema_without_core_features() {
        let names = ["temperature", "humidity", "irradiance", "voltage", "panel_temp"];
        let model = Arc::new(
            TreeEnsemble::new(
                names.iter().map(|s| s.to_string()).collect(),
                0.8,
                Objective::Regression,
                vec![Tree {
                    nodes: vec![Node::Leaf { value: 0.0, cover: 1.0 }],
                }],
            )
            .unwrap(),
        );
        let err = TreeExplainer::new(model, FeatureSchema::new(names)).unwrap_err();
        assert!(matches!(err, AttributionError::MissingFeature(ref f) if f == "dust_index"));
    }

    #[test]
    fn test_rejects_classifier_ensemble() {
        let err = TreeExplainer::new(ensemble(Objective::BinaryLogistic), schema()).unwrap_err();
        assert!(matches!(
            err,
            AttributionError::Model(ModelError::UnsupportedObjective { .. })
        ));
    }
}
