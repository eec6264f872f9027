//! SolarSense - solar efficiency scoring service
//!
//! # Usage
//!
//! ```bash
//! # Serve the HTTP API (default 0.0.0.0:5001)
//! cargo run --release
//!
//! # Score a single reading offline
//! ./solarsense score reading.json
//!
//! # Print the effective configuration
//! ./solarsense show-config
//! ```
//!
//! # Environment Variables
//!
//! - `SOLARSENSE_CONFIG`: Path to TOML config (default: ./solarsense.toml)
//! - `SOLARSENSE_SERVER_ADDR`: Override the bind address
//! - `OPENAI_API_KEY`: Key for the external insight service, when enabled
//! - `RUST_LOG`: Logging level (default: info)

use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

use solarsense::api::handlers::PredictResponse;
use solarsense::api::{create_app, ApiState};
use solarsense::attribution::format_explanation;
use solarsense::{RawReading, ScoringPipeline, SolarConfig};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "solarsense")]
#[command(about = "SolarSense solar efficiency scoring service")]
#[command(version)]
struct CliArgs {
    /// Override the server address (default: "0.0.0.0:5001")
    #[arg(short, long, env = "SOLARSENSE_SERVER_ADDR")]
    addr: Option<String>,

    /// Load configuration from this TOML file instead of the search order
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,

    #[command(subcommand)]
    command: Option<SubCommand>,
}

#[derive(clap::Subcommand, Debug)]
enum SubCommand {
    /// Score one reading from a JSON file and print the result
    Score {
        /// JSON object of sensor/weather fields
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Number of factors in the printed explanation
        #[arg(long, default_value = "5")]
        top: usize,
    },
    /// Print the effective configuration as TOML
    ShowConfig,
}

// ============================================================================
// Startup
// ============================================================================

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    }
}

fn load_config(path: Option<&Path>) -> Result<SolarConfig> {
    match path {
        Some(p) => SolarConfig::load_from_file(p)
            .with_context(|| format!("Failed to load config from {}", p.display())),
        None => Ok(SolarConfig::load()),
    }
}

fn build_pipeline(config: &SolarConfig) -> Result<Arc<ScoringPipeline>> {
    let pipeline = ScoringPipeline::from_config(config).with_context(|| {
        format!(
            "Failed to load models ({}, {})",
            config.models.efficiency_path.display(),
            config.models.suitability_path.display()
        )
    })?;
    Ok(Arc::new(pipeline))
}

async fn score_file(pipeline: &ScoringPipeline, input: &Path, top: usize) -> Result<()> {
    let contents = std::fs::read_to_string(input)
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let value: serde_json::Value = serde_json::from_str(&contents)
        .with_context(|| format!("{} is not valid JSON", input.display()))?;
    let reading = RawReading::from_json(&value)
        .with_context(|| format!("{} must contain a JSON object", input.display()))?;

    let result = pipeline.score(&reading).await?;
    if let Some(map) = result.explanation.contributions() {
        println!("{}\n", format_explanation(map, top));
    }
    let response = PredictResponse::from(result);
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

async fn serve(pipeline: Arc<ScoringPipeline>, server_addr: &str) -> Result<()> {
    let app = create_app(ApiState::new(pipeline));
    let listener = tokio::net::TcpListener::bind(server_addr)
        .await
        .with_context(|| format!("Failed to bind to {server_addr}"))?;

    info!("✓ HTTP server listening on {}", server_addr);
    info!("  POST http://{}/predict", server_addr);
    info!("  GET  http://{}/health", server_addr);

    // Graceful shutdown via Ctrl+C
    let cancel_token = CancellationToken::new();
    let shutdown_token = cancel_token.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("🛑 Received Ctrl+C, initiating shutdown...");
        shutdown_token.cancel();
    });

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            cancel_token.cancelled().await;
        })
        .await
        .context("HTTP server error")?;

    info!("Graceful shutdown complete");
    Ok(())
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();
    init_tracing(args.log_json);

    let config = load_config(args.config.as_deref())?;

    if let Some(SubCommand::ShowConfig) = &args.command {
        println!("{}", config.to_toml()?);
        return Ok(());
    }

    let pipeline = build_pipeline(&config)?;

    if let Some(SubCommand::Score { input, top }) = &args.command {
        return score_file(&pipeline, input, *top).await;
    }

    let server_addr = args.addr.unwrap_or_else(|| config.server.addr.clone());

    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!("  SOLARSENSE - Solar Efficiency Scoring");
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!(
        efficiency_features = pipeline.efficiency_feature_count(),
        suitability_features = pipeline.suitability_feature_count(),
        "Models loaded"
    );
    info!(
        "Attribution: {}",
        if pipeline.exact_attribution() {
            "exact (tree explainer)"
        } else {
            "approximate (rule-based)"
        }
    );
    info!(
        "Insights: {}",
        if pipeline.external_insights() {
            "external service with rule-based fallback"
        } else {
            "rule-based"
        }
    );

    serve(pipeline, &server_addr).await
}
