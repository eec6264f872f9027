//! Rule-based attribution proxy
//!
//! Deterministic, model-free estimate of each physical factor's pull on
//! efficiency. Used whenever exact attribution is unavailable or fails.

use super::{AttributionError, Attributor};
use crate::features::SynthesizedFeatures;
use crate::types::{AttributionMap, AttributionSource, FeatureVector};

/// Ambient temperature above which panels lose efficiency (°C).
const HOT_AMBIENT_C: f64 = 35.0;
/// Ambient temperature below which panels underperform (°C).
const COLD_AMBIENT_C: f64 = 15.0;
/// Relative humidity above which condensation losses start (%).
const HUMID_PERCENT: f64 = 70.0;
/// Irradiance treated as strong sun (W/m²).
const STRONG_IRRADIANCE: f64 = 700.0;
/// Panel temperature above which thermal derating applies (°C).
const HOT_PANEL_C: f64 = 60.0;

/// Stateless rule-based attributor over the unprojected inputs.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleBasedAttributor;

impl RuleBasedAttributor {
    pub fn new() -> Self {
        Self
    }

    /// Rule contributions for a set of inputs.
    ///
    /// Emits `temperature`, `humidity`, `irradiance`, `dust_index` in that
    /// order, then `panel_temp` when present.
    pub fn contributions(&self, inputs: &FeatureVector) -> Result<AttributionMap, AttributionError> {
        let required = |name: &str| {
            inputs
                .get(name)
                .ok_or_else(|| AttributionError::MissingFeature(name.to_string()))
        };

        let mut map = AttributionMap::new();
        map.insert("temperature", temperature_rule(required("temperature")?));
        map.insert("humidity", humidity_rule(required("humidity")?));
        map.insert("irradiance", irradiance_rule(required("irradiance")?));
        map.insert("dust_index", dust_rule(required("dust_index")?));
        if let Some(panel_temp) = inputs.get("panel_temp") {
            map.insert("panel_temp", panel_temp_rule(panel_temp));
        }

        if let Some((name, _)) = map.iter().find(|(_, v)| !v.is_finite()) {
            return Err(AttributionError::NonFinite(name.to_string()));
        }
        Ok(map)
    }
}

impl Attributor for RuleBasedAttributor {
    fn attribute(&self, features: &SynthesizedFeatures) -> Result<AttributionMap, AttributionError> {
        self.contributions(&features.inputs)
    }

    fn source(&self) -> AttributionSource {
        AttributionSource::Approximate
    }
}

fn temperature_rule(t: f64) -> f64 {
    if t > HOT_AMBIENT_C {
        -0.05 * ((t - HOT_AMBIENT_C) / 10.0)
    } else if t < COLD_AMBIENT_C {
        -0.02 * ((COLD_AMBIENT_C - t) / 10.0)
    } else {
        0.01
    }
}

fn humidity_rule(h: f64) -> f64 {
    if h > HUMID_PERCENT {
        -0.03 * ((h - HUMID_PERCENT) / 30.0)
    } else {
        0.005
    }
}

fn irradiance_rule(i: f64) -> f64 {
    if i > STRONG_IRRADIANCE {
        0.08 * (i / 1000.0)
    } else {
        -0.05 * (1.0 - i / 1000.0)
    }
}

fn dust_rule(dust: f64) -> f64 {
    -0.06 * dust
}

fn panel_temp_rule(p: f64) -> f64 {
    if p > HOT_PANEL_C {
        -0.04 * ((p - HOT_PANEL_C) / 20.0)
    } else {
        0.01
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::efficiency_inputs;
    use crate::types::RawReading;

    fn close(a: Option<f64>, b: f64) -> bool {
        a.is_some_and(|a| (a - b).abs() < 1e-9)
    }

    #[test]
    fn test_hot_humid_reading() {
        let raw = RawReading::new()
            .with("temperature", 40.0)
            .with("humidity", 80.0)
            .with("irradiance", 750.0);
        let map = RuleBasedAttributor::new()
            .contributions(&efficiency_inputs(&raw).unwrap())
            .unwrap();

        assert!(close(map.get("temperature"), -0.025));
        assert!(close(map.get("humidity"), -0.01));
        assert!(close(map.get("irradiance"), 0.06));
        assert!(close(map.get("dust_index"), -0.03));
        // panel_temp 58.75 is under the derating threshold
        assert!(close(map.get("panel_temp"), 0.01));
    }

    #[test]
    fn test_dusty_sunny_reading_ranks_irradiance_first() {
        let raw = RawReading::new()
            .with("temperature", 25.0)
            .with("humidity", 50.0)
            .with("irradiance", 900.0)
            .with("dust_index", 0.9)
            .with("cloudcover", 10.0)
            .with("precip", 0.0)
            .with("wind_speed", 3.0)
            .with("voltage", 36.0)
            .with("current", 8.5);
        let map = RuleBasedAttributor::new()
            .contributions(&efficiency_inputs(&raw).unwrap())
            .unwrap();

        assert!(close(map.get("irradiance"), 0.072));
        assert!(close(map.get("dust_index"), -0.054));
        let ranked: Vec<&str> = map.ranked().into_iter().map(|(k, _)| k).collect();
        let irradiance = ranked.iter().position(|k| *k == "irradiance").unwrap();
        let dust = ranked.iter().position(|k| *k == "dust_index").unwrap();
        assert!(irradiance < dust);
    }

    #[test]
    fn test_cold_dim_reading() {
        assert!((temperature_rule(5.0) + 0.02).abs() < 1e-12);
        assert!((irradiance_rule(200.0) + 0.04).abs() < 1e-12);
        assert!((panel_temp_rule(80.0) + 0.04).abs() < 1e-12);
        assert_eq!(humidity_rule(70.0), 0.005);
    }

    #[test]
    fn test_panel_temp_is_optional() {
        let mut inputs = FeatureVector::new();
        inputs.insert("temperature", 20.0);
        inputs.insert("humidity", 40.0);
        inputs.insert("irradiance", 500.0);
        inputs.insert("dust_index", 0.0);
        let map = RuleBasedAttributor::new().contributions(&inputs).unwrap();
        assert_eq!(map.len(), 4);
        assert!(!map.contains("panel_temp"));
    }

    #[test]
    fn test_missing_input_is_an_error() {
        let mut inputs = FeatureVector::new();
        inputs.insert("temperature", 20.0);
        let err = RuleBasedAttributor::new().contributions(&inputs).unwrap_err();
        assert!(matches!(err, AttributionError::MissingFeature(ref f) if f == "humidity"));
    }

    #[test]
    fn test_non_finite_input_is_an_error() {
        let mut inputs = FeatureVector::new();
        inputs.insert("temperature", f64::INFINITY);
        inputs.insert("humidity", 40.0);
        inputs.insert("irradiance", 500.0);
        inputs.insert("dust_index", 0.5);
        assert!(matches!(
            RuleBasedAttributor::new().contributions(&inputs),
            Err(AttributionError::NonFinite(_))
        ));
    }
}
