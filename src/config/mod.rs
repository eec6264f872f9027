//! SolarSense Configuration Module
//!
//! Deployment configuration loaded from TOML: where the model artifacts live,
//! whether the exact explainer is attempted, the optional external insight
//! service, and the HTTP bind address.
//!
//! ## Loading Order
//!
//! 1. `SOLARSENSE_CONFIG` environment variable (path to TOML file)
//! 2. `solarsense.toml` in the current working directory
//! 3. Built-in defaults
//!
//! Scoring thresholds are not configurable; they live in [`defaults`] and are
//! tied to the trained models.
//!
//! The loaded config is passed by value into startup code. There is no global
//! instance; the pipeline receives only the immutable pieces it needs.

mod solar_config;
pub mod defaults;
pub mod validation;

pub use solar_config::*;
