use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::Local;
use screener_pipeline::{build_pipelines, RunContext, ScreenerConfig};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let json_logging = std::env::var("RUST_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    if json_logging {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
            )
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
            )
            .init();
    }

    tracing::info!("Starting daily news screener");

    let config = ScreenerConfig::from_env().context("Invalid screener configuration")?;
    let pipeline_names: Vec<&str> = config.pipelines.iter().map(|p| p.name()).collect();
    tracing::info!("Configuration loaded");
    tracing::info!("  Pipelines: {}", pipeline_names.join(", "));
    tracing::info!("  Output directory: {}", config.output_dir.display());
    tracing::info!("  Momentum universe: top {} over {} days", config.top_n, config.lookback_days);
    tracing::info!("  Prediction universe: top {}", config.prediction_top_n);
    tracing::info!("  HTTP timeout: {}s", config.http_timeout.as_secs());
    tracing::debug!("{:?}", config);

    let classifier = config
        .ml_config()
        .build_client()
        .context("Failed to build sentiment client")?;
    tracing::info!("  Sentiment endpoint: {}", classifier.url());

    let ctx = RunContext {
        output_dir: config.output_dir.clone(),
        run_date: Local::now().date_naive(),
    };

    let mut failed = Vec::new();
    for pipeline in build_pipelines(&config, Arc::new(classifier)) {
        tracing::info!(pipeline = pipeline.name(), "Running pipeline");
        match pipeline.run(&ctx).await {
            Ok(report) => {
                tracing::info!(
                    pipeline = report.pipeline,
                    rows = report.rows,
                    files = report.files.len(),
                    "Pipeline finished"
                );
            }
            Err(e) => {
                tracing::error!(pipeline = pipeline.name(), "Pipeline failed: {:#}", e);
                failed.push(pipeline.name());
            }
        }
    }

    if !failed.is_empty() {
        bail!("Pipelines failed: {}", failed.join(", "));
    }

    tracing::info!("Daily screen complete");
    Ok(())
}
