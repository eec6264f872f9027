//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use solarsense::config::{ModelPaths, SolarConfig};
use solarsense::model::{
    ClassificationModel, EfficiencyModel, FeatureSchema, ModelError, ModelSet, RegressionModel,
    SuitabilityModel,
};
use solarsense::{FeatureVector, RawReading};

/// Config pointing at the demo artifacts shipped in `models/`.
pub fn shipped_config() -> SolarConfig {
    let dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("models");
    SolarConfig {
        models: ModelPaths {
            efficiency_path: dir.join("efficiency_model.json"),
            suitability_path: dir.join("suitability_model.json"),
            efficiency_schema_path: None,
            suitability_schema_path: None,
        },
        ..SolarConfig::default()
    }
}

pub fn reading(temperature: f64, humidity: f64, irradiance: f64) -> RawReading {
    RawReading::new()
        .with("temperature", temperature)
        .with("humidity", humidity)
        .with("irradiance", irradiance)
}

/// Regression mock returning a fixed raw output.
pub struct FixedEfficiency(pub f64);

impl RegressionModel for FixedEfficiency {
    fn feature_count(&self) -> usize {
        3
    }
    fn predict(&self, _: &FeatureVector) -> f64 {
        self.0
    }
}

/// Classifier mock that always fails.
pub struct BrokenClassifier;

impl ClassificationModel for BrokenClassifier {
    fn feature_count(&self) -> usize {
        2
    }
    fn predict(&self, _: &FeatureVector) -> Result<u8, ModelError> {
        Err(ModelError::Inference("classifier unavailable".to_string()))
    }
}

/// Classifier mock returning a fixed label.
pub struct FixedLabel(pub u8);

impl ClassificationModel for FixedLabel {
    fn feature_count(&self) -> usize {
        2
    }
    fn predict(&self, _: &FeatureVector) -> Result<u8, ModelError> {
        Ok(self.0)
    }
}

pub fn mock_models(
    efficiency: impl RegressionModel + 'static,
    suitability: impl ClassificationModel + 'static,
) -> ModelSet {
    ModelSet {
        efficiency: EfficiencyModel {
            model: Arc::new(efficiency),
            schema: FeatureSchema::new(["temperature", "dust_index", "panel_temp"]),
        },
        suitability: SuitabilityModel {
            model: Arc::new(suitability),
            schema: FeatureSchema::new(["GHI (kWh/m²/day)", "Precipitation"]),
        },
    }
}
