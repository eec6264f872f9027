//! Feature synthesis
//!
//! Turns a sparse [`RawReading`] into the two model-facing vectors:
//!
//! - efficiency features: raw fields, fixed defaults for absent optional
//!   sensors, and the derived `panel_temp`
//! - suitability features: a climate-aggregate space built from the same
//!   instantaneous reading
//!
//! Both are then [`project`]ed onto the model's declared schema.
//!
//! The suitability model was trained on seasonal aggregates. Only a snapshot
//! is available per request, so every quarter is populated with the current
//! values and yearly precipitation is the snapshot scaled by four. The trained
//! model is conditioned on this approximation; keep it.

use crate::config::defaults::{
    DEFAULT_CLOUDCOVER, DEFAULT_CURRENT, DEFAULT_DHI_PERCENT_OF_GHI, DEFAULT_DUST_INDEX,
    DEFAULT_PRECIP, DEFAULT_SUNSHINE_HOURS, DEFAULT_VOLTAGE, DEFAULT_WIND_SPEED, DNI_DIVISOR,
    GHI_DIVISOR, PANEL_HEAT_REFERENCE_IRRADIANCE, PANEL_HEAT_RISE_C, QUARTERS_PER_YEAR,
};
use crate::model::FeatureSchema;
use crate::types::{FeatureVector, RawReading, ValidationError};

/// Optional efficiency inputs and their fill values, in synthesis order.
pub const OPTIONAL_DEFAULTS: [(&str, f64); 6] = [
    ("dust_index", DEFAULT_DUST_INDEX),
    ("cloudcover", DEFAULT_CLOUDCOVER),
    ("precip", DEFAULT_PRECIP),
    ("wind_speed", DEFAULT_WIND_SPEED),
    ("voltage", DEFAULT_VOLTAGE),
    ("current", DEFAULT_CURRENT),
];

/// Everything synthesized for one request.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesizedFeatures {
    /// Raw fields plus defaults and `panel_temp`, before projection
    pub inputs: FeatureVector,
    /// Projected onto the efficiency schema
    pub efficiency: FeatureVector,
    /// Projected onto the suitability schema
    pub suitability: FeatureVector,
}

/// Derives both model vectors from a raw reading.
#[derive(Debug, Clone)]
pub struct FeatureSynthesizer {
    efficiency_schema: FeatureSchema,
    suitability_schema: FeatureSchema,
}

impl FeatureSynthesizer {
    pub fn new(efficiency_schema: FeatureSchema, suitability_schema: FeatureSchema) -> Self {
        Self {
            efficiency_schema,
            suitability_schema,
        }
    }

    pub fn efficiency_schema(&self) -> &FeatureSchema {
        &self.efficiency_schema
    }

    pub fn suitability_schema(&self) -> &FeatureSchema {
        &self.suitability_schema
    }

    /// Validate the required fields and synthesize both projected vectors.
    pub fn synthesize(&self, raw: &RawReading) -> Result<SynthesizedFeatures, ValidationError> {
        let inputs = efficiency_inputs(raw)?;
        let suitability = suitability_inputs(&inputs);

        Ok(SynthesizedFeatures {
            efficiency: project(&inputs, &self.efficiency_schema),
            suitability: project(&suitability, &self.suitability_schema),
            inputs,
        })
    }
}

/// Panel temperature proxy: ambient plus irradiance-driven heating.
pub fn panel_temperature(ambient: f64, irradiance: f64) -> f64 {
    ambient + (irradiance / PANEL_HEAT_REFERENCE_IRRADIANCE) * PANEL_HEAT_RISE_C
}

/// Raw fields, optional defaults, and the derived `panel_temp`.
///
/// A caller-supplied `panel_temp` is always replaced by the derived value.
pub fn efficiency_inputs(raw: &RawReading) -> Result<FeatureVector, ValidationError> {
    raw.validate()?;
    // Present after validation.
    let temperature = raw.get("temperature").unwrap_or_default();
    let irradiance = raw.get("irradiance").unwrap_or_default();

    let mut inputs = FeatureVector::with_capacity(raw.len() + OPTIONAL_DEFAULTS.len() + 1);
    for (name, value) in raw.iter() {
        inputs.insert(name, value);
    }
    for (name, default) in OPTIONAL_DEFAULTS {
        if inputs.get(name).is_none() {
            inputs.insert(name, default);
        }
    }
    inputs.insert("panel_temp", panel_temperature(temperature, irradiance));
    Ok(inputs)
}

/// Names of the suitability feature space, in synthesis order.
pub fn suitability_feature_names() -> Vec<String> {
    let mut names = vec![
        "GHI (kWh/m²/day)".to_string(),
        "DNI (kWh/m²/day)".to_string(),
        "DHI (% of GHI)".to_string(),
        "Snowfall (mm/year)".to_string(),
    ];
    for q in 1..=QUARTERS_PER_YEAR {
        for metric in QUARTER_METRICS {
            names.push(format!("Quarter{q}-{metric}"));
        }
    }
    names.extend(YEARLY_FEATURES.iter().map(|s| s.to_string()));
    names
}

const QUARTER_METRICS: [&str; 5] = [
    "Cloud cover",
    "Sunshine duration",
    "Ambient temperature",
    "Relative humidity",
    "Precipitation",
];

const YEARLY_FEATURES: [&str; 5] = [
    "YearlyCloud cover",
    "Sunshine duration",
    "Ambient temperature",
    "Relative humidity",
    "Precipitation",
];

/// Climate-aggregate vector derived from the efficiency inputs.
pub fn suitability_inputs(inputs: &FeatureVector) -> FeatureVector {
    let get = |name: &str| inputs.get(name).unwrap_or_default();
    let irradiance = get("irradiance");
    let temperature = get("temperature");
    let humidity = get("humidity");
    let cloudcover = get("cloudcover");
    let precip = get("precip");

    let mut site = FeatureVector::with_capacity(29);
    site.insert("GHI (kWh/m²/day)", irradiance / GHI_DIVISOR);
    site.insert("DNI (kWh/m²/day)", irradiance / DNI_DIVISOR);
    site.insert("DHI (% of GHI)", DEFAULT_DHI_PERCENT_OF_GHI);
    site.insert("Snowfall (mm/year)", 0.0);

    for q in 1..=QUARTERS_PER_YEAR {
        let quarter = [cloudcover, DEFAULT_SUNSHINE_HOURS, temperature, humidity, precip];
        for (metric, value) in QUARTER_METRICS.iter().zip(quarter) {
            site.insert(&format!("Quarter{q}-{metric}"), value);
        }
    }

    let yearly = [
        cloudcover,
        DEFAULT_SUNSHINE_HOURS,
        temperature,
        humidity,
        precip * f64::from(QUARTERS_PER_YEAR),
    ];
    for (name, value) in YEARLY_FEATURES.iter().zip(yearly) {
        site.insert(name, value);
    }
    site
}

/// Reindex `vector` onto `schema`.
///
/// Output keys are exactly the schema names in schema order. Names missing from
/// `vector` are filled with 0; fields the schema does not list are dropped.
pub fn project(vector: &FeatureVector, schema: &FeatureSchema) -> FeatureVector {
    let mut projected = FeatureVector::with_capacity(schema.len());
    for name in schema.names() {
        projected.insert(name, vector.get(name).unwrap_or(0.0));
    }
    projected
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading() -> RawReading {
        RawReading::new()
            .with("temperature", 40.0)
            .with("humidity", 80.0)
            .with("irradiance", 750.0)
    }

    #[test]
    fn test_panel_temperature_proxy() {
        assert!((panel_temperature(40.0, 750.0) - 58.75).abs() < 1e-12);
        assert!((panel_temperature(25.0, 800.0) - 45.0).abs() < 1e-12);
    }

    #[test]
    fn test_efficiency_inputs_fill_defaults() {
        let inputs = efficiency_inputs(&reading()).unwrap();
        assert_eq!(inputs.get("dust_index"), Some(0.5));
        assert_eq!(inputs.get("cloudcover"), Some(0.0));
        assert_eq!(inputs.get("precip"), Some(0.0));
        assert_eq!(inputs.get("wind_speed"), Some(5.0));
        assert_eq!(inputs.get("voltage"), Some(35.0));
        assert_eq!(inputs.get("current"), Some(8.0));
        assert_eq!(inputs.get("panel_temp"), Some(58.75));
    }

    #[test]
    fn test_supplied_optional_fields_are_kept() {
        let raw = reading().with("dust_index", 0.9).with("voltage", 30.0);
        let inputs = efficiency_inputs(&raw).unwrap();
        assert_eq!(inputs.get("dust_index"), Some(0.9));
        assert_eq!(inputs.get("voltage"), Some(30.0));
    }

    #[test]
    fn test_supplied_panel_temp_is_recomputed() {
        let raw = reading().with("panel_temp", 99.0);
        let inputs = efficiency_inputs(&raw).unwrap();
        assert_eq!(inputs.get("panel_temp"), Some(58.75));
    }

    #[test]
    fn test_missing_required_is_reported() {
        let raw = RawReading::new().with("temperature", 20.0);
        let err = efficiency_inputs(&raw).unwrap_err();
        assert_eq!(err.missing, vec!["humidity", "irradiance"]);
    }

    #[test]
    fn test_suitability_quarters_repeat_snapshot() {
        let raw = reading().with("cloudcover", 30.0).with("precip", 2.5);
        let site = suitability_inputs(&efficiency_inputs(&raw).unwrap());

        assert_eq!(site.len(), suitability_feature_names().len());
        assert_eq!(site.get("GHI (kWh/m²/day)"), Some(3.75));
        assert_eq!(site.get("DNI (kWh/m²/day)"), Some(3.125));
        assert_eq!(site.get("DHI (% of GHI)"), Some(20.0));
        for q in 1..=4 {
            assert_eq!(site.get(&format!("Quarter{q}-Cloud cover")), Some(30.0));
            assert_eq!(site.get(&format!("Quarter{q}-Sunshine duration")), Some(8.0));
            assert_eq!(site.get(&format!("Quarter{q}-Ambient temperature")), Some(40.0));
            assert_eq!(site.get(&format!("Quarter{q}-Relative humidity")), Some(80.0));
            assert_eq!(site.get(&format!("Quarter{q}-Precipitation")), Some(2.5));
        }
        assert_eq!(site.get("Precipitation"), Some(10.0));
        assert_eq!(site.get("Sunshine duration"), Some(8.0));
    }

    #[test]
    fn test_suitability_names_match_synthesized_keys() {
        let site = suitability_inputs(&efficiency_inputs(&reading()).unwrap());
        let names: Vec<&str> = site.names().collect();
        assert_eq!(names, suitability_feature_names());
    }

    #[test]
    fn test_project_fills_zero_and_drops_extras() {
        let mut v = FeatureVector::new();
        v.insert("b", 2.0);
        v.insert("extra", 9.0);
        v.insert("a", 1.0);

        let projected = project(&v, &FeatureSchema::new(["a", "b", "c"]));
        assert_eq!(projected.names().collect::<Vec<_>>(), vec!["a", "b", "c"]);
        assert_eq!(projected.values(), vec![1.0, 2.0, 0.0]);
    }

    #[test]
    fn test_synthesize_projects_both_vectors() {
        let synthesizer = FeatureSynthesizer::new(
            FeatureSchema::new(["temperature", "panel_temp", "unknown_sensor"]),
            FeatureSchema::new(["Precipitation", "GHI (kWh/m²/day)"]),
        );
        let features = synthesizer.synthesize(&reading()).unwrap();
        assert_eq!(features.efficiency.values(), vec![40.0, 58.75, 0.0]);
        assert_eq!(features.suitability.values(), vec![0.0, 3.75]);
        assert_eq!(features.inputs.get("humidity"), Some(80.0));
    }
}
