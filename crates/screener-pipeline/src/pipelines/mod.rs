//! The three screens, each composed from the shared stages.

pub mod finbrain;
pub mod headlines;
pub mod momentum;

pub use finbrain::FinBrainPipeline;
pub use headlines::HeadlinesPipeline;
pub use momentum::MomentumPipeline;

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use market_data::{ConstituentsClient, FinBrainClient, YahooFinanceClient};
use ml_client::{SentimentClassifier, SentimentScorer};
use news_client::HeadlineCollector;
use screener_core::{PredictionSource, ScoreScale, Symbol};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use crate::config::{PipelineKind, ScreenerConfig};

/// Per-run values shared by every pipeline
#[derive(Debug, Clone)]
pub struct RunContext {
    pub output_dir: PathBuf,
    pub run_date: NaiveDate,
}

#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub pipeline: &'static str,
    pub files: Vec<PathBuf>,
    /// Data rows written across all files
    pub rows: usize,
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    fn name(&self) -> &'static str;

    /// Fetch, score, aggregate and write. Provider trouble degrades to empty
    /// or neutral data; only output failures are errors.
    async fn run(&self, ctx: &RunContext) -> Result<PipelineReport>;
}

fn scorer(
    config: &ScreenerConfig,
    classifier: Arc<dyn SentimentClassifier>,
    scale: ScoreScale,
) -> SentimentScorer {
    SentimentScorer::new(classifier, scale)
        .with_retry_delay(config.retry_delay)
        .with_concurrency(config.scoring_concurrency)
}

/// Wire the configured pipelines to live providers, in configured order.
pub fn build_pipelines(
    config: &ScreenerConfig,
    classifier: Arc<dyn SentimentClassifier>,
) -> Vec<Box<dyn Pipeline>> {
    let credentials = config.news_credentials();
    let timeout = config.http_timeout;

    config
        .pipelines
        .iter()
        .map(|kind| -> Box<dyn Pipeline> {
            match kind {
                PipelineKind::Headlines => {
                    let collector = HeadlineCollector::market_news(&credentials, timeout);
                    Box::new(
                        HeadlinesPipeline::new(
                            collector,
                            scorer(config, classifier.clone(), ScoreScale::TriState),
                        )
                        .with_keep_unknown(config.keep_unknown)
                        .with_debug_snapshot(config.debug_snapshot),
                    )
                }
                PipelineKind::Momentum => {
                    let credentials = credentials.clone();
                    let hours_back = config.news_hours;
                    Box::new(MomentumPipeline::new(
                        Arc::new(ConstituentsClient::new(config.constituents_url.clone(), timeout)),
                        Arc::new(YahooFinanceClient::new(timeout)),
                        Arc::new(move |symbols: Vec<Symbol>| {
                            HeadlineCollector::company_news(&credentials, symbols, hours_back, timeout)
                        }),
                        scorer(config, classifier.clone(), ScoreScale::Continuous),
                        config.top_n,
                        config.lookback_days,
                    ))
                }
                PipelineKind::FinBrain => {
                    let source: Option<Arc<dyn PredictionSource>> = match &config.finbrain_key {
                        Some(key) => Some(Arc::new(FinBrainClient::new(key.clone(), timeout))),
                        None => {
                            info!("FinBrain key missing, finbrain screen will be empty");
                            None
                        }
                    };
                    Box::new(FinBrainPipeline::new(source, config.prediction_top_n))
                }
            }
        })
        .collect()
}
