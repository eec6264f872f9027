//! System-wide default constants.
//!
//! These thresholds are tied to the trained efficiency and suitability models
//! and are part of the scoring contract, so they are not exposed in the TOML
//! config. Grouped by pipeline stage.

// ============================================================================
// Feature Synthesis
// ============================================================================

/// Irradiance reference used to normalize panel heat buildup (W/m²).
pub const PANEL_HEAT_REFERENCE_IRRADIANCE: f64 = 800.0;

/// Panel temperature rise above ambient at the reference irradiance (°C).
pub const PANEL_HEAT_RISE_C: f64 = 20.0;

pub const DEFAULT_DUST_INDEX: f64 = 0.5;
pub const DEFAULT_CLOUDCOVER: f64 = 0.0;
pub const DEFAULT_PRECIP: f64 = 0.0;
pub const DEFAULT_WIND_SPEED: f64 = 5.0;
pub const DEFAULT_VOLTAGE: f64 = 35.0;
pub const DEFAULT_CURRENT: f64 = 8.0;

/// Daily sunshine hours assumed per quarter when no climate record exists.
pub const DEFAULT_SUNSHINE_HOURS: f64 = 8.0;

/// Diffuse share of GHI (%) assumed when no climate record exists.
pub const DEFAULT_DHI_PERCENT_OF_GHI: f64 = 20.0;

/// Irradiance (W/m²) to GHI (kWh/m²/day) divisor.
pub const GHI_DIVISOR: f64 = 200.0;

/// Irradiance (W/m²) to DNI (kWh/m²/day) divisor.
pub const DNI_DIVISOR: f64 = 240.0;

/// Quarters per year; yearly precipitation is the snapshot scaled by this.
pub const QUARTERS_PER_YEAR: u8 = 4;

// ============================================================================
// Scoring
// ============================================================================

/// Efficiency strictly below this sets the failure flag.
pub const FAILURE_EFFICIENCY_THRESHOLD: f64 = 0.75;

/// Risk score at which the recommendation moves from monitor to optimize.
pub const RISK_OPTIMIZE: f64 = 30.0;

/// Risk score at which the recommendation becomes immediate action.
pub const RISK_IMMEDIATE_ACTION: f64 = 60.0;

// ============================================================================
// Insights
// ============================================================================

/// Efficiency above this is reported as excellent.
pub const EXCELLENT_EFFICIENCY: f64 = 0.85;

/// Efficiency above this (and not excellent) is reported as good.
pub const GOOD_EFFICIENCY: f64 = 0.75;

/// Efficiency below this closes with a full-diagnostic recommendation.
pub const DIAGNOSTIC_EFFICIENCY: f64 = 0.80;

/// Number of ranked attribution entries considered for factor insights.
pub const TOP_FACTORS: usize = 3;

// ============================================================================
// External Insight Service
// ============================================================================

/// Default HTTP timeout for the external insight service (seconds).
pub const INSIGHT_HTTP_TIMEOUT_SECS: u64 = 10;

/// Default completion budget for the external insight service.
pub const INSIGHT_MAX_TOKENS: u32 = 250;

/// Default sampling temperature for the external insight service.
pub const INSIGHT_TEMPERATURE: f32 = 0.7;

// ============================================================================
// Server
// ============================================================================

/// Default HTTP bind address.
pub const DEFAULT_SERVER_ADDR: &str = "0.0.0.0:5001";

/// Maximum accepted request body for `/predict` (bytes).
pub const MAX_REQUEST_BODY_BYTES: usize = 64 * 1024;
