use anyhow::Result;
use async_trait::async_trait;
use market_data::{prediction_universe, Selection};
use screener_core::{AggregateRecord, PredictionSource, RankedSymbol, ScoreScale, Symbol};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

use super::{Pipeline, PipelineReport, RunContext};
use crate::export::{commit_outputs, render_finbrain};

pub const FINBRAIN_FILE: &str = "finbrain_longlist.csv";

/// Provider sentiment in -1..=1 onto the 0-10 scale. Missing is neutral.
pub fn news_score(sentiment: Option<f64>) -> f64 {
    match sentiment {
        Some(x) => ScoreScale::Continuous.clamp((x + 1.0) * 5.0),
        None => ScoreScale::Continuous.neutral(),
    }
}

/// Top predicted movers with the provider's own news sentiment.
pub struct FinBrainPipeline {
    source: Option<Arc<dyn PredictionSource>>,
    top_n: usize,
}

impl FinBrainPipeline {
    /// `None` when no key is configured; the screen is then written empty.
    pub fn new(source: Option<Arc<dyn PredictionSource>>, top_n: usize) -> Self {
        Self { source, top_n }
    }

    async fn rows(&self, source: &dyn PredictionSource) -> Vec<AggregateRecord> {
        let universe: Vec<RankedSymbol> =
            match prediction_universe(source, Selection::Top(self.top_n)).await {
                Ok(universe) => universe,
                Err(e) => {
                    warn!("FinBrain predictions unavailable: {}", e);
                    return Vec::new();
                }
            };
        if universe.is_empty() {
            return Vec::new();
        }

        let symbols: Vec<Symbol> = universe.iter().map(|r| r.symbol.clone()).collect();
        let sentiment: HashMap<Symbol, f64> = match source.news_sentiment(&symbols).await {
            Ok(sentiment) => sentiment,
            Err(e) => {
                warn!("FinBrain sentiment unavailable, using neutral: {}", e);
                HashMap::new()
            }
        };
        info!(
            universe = universe.len(),
            with_sentiment = sentiment.len(),
            "FinBrain universe scored"
        );

        let mut rows: Vec<AggregateRecord> = universe
            .into_iter()
            .map(|ranked| {
                let value = sentiment.get(&ranked.symbol).copied();
                AggregateRecord {
                    mean_score: news_score(value),
                    headline_count: usize::from(value.is_some()),
                    metric: Some(ranked.metric),
                    symbol: ranked.symbol,
                }
            })
            .collect();
        rows.sort_by(|a, b| b.mean_score.total_cmp(&a.mean_score));
        rows
    }
}

#[async_trait]
impl Pipeline for FinBrainPipeline {
    fn name(&self) -> &'static str {
        "finbrain"
    }

    async fn run(&self, ctx: &RunContext) -> Result<PipelineReport> {
        let rows = match &self.source {
            Some(source) => self.rows(source.as_ref()).await,
            None => Vec::new(),
        };

        let file = render_finbrain(FINBRAIN_FILE.to_string(), &rows)?;
        let written = commit_outputs(&ctx.output_dir, vec![file])?;
        for path in &written {
            info!(path = %path.display(), "Wrote screen");
        }

        Ok(PipelineReport {
            pipeline: self.name(),
            files: written,
            rows: rows.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use screener_core::{PredictionRow, ScreenerError, ScreenerResult};
    use std::fs;

    fn context(dir: &std::path::Path) -> RunContext {
        RunContext {
            output_dir: dir.to_path_buf(),
            run_date: NaiveDate::from_ymd_opt(2024, 5, 17).unwrap(),
        }
    }

    struct ScriptedFinBrain {
        predictions: ScreenerResult<Vec<PredictionRow>>,
        sentiment: HashMap<Symbol, f64>,
    }

    #[async_trait]
    impl PredictionSource for ScriptedFinBrain {
        async fn price_predictions(&self) -> ScreenerResult<Vec<PredictionRow>> {
            self.predictions.clone()
        }

        async fn news_sentiment(&self, symbols: &[Symbol]) -> ScreenerResult<HashMap<Symbol, f64>> {
            Ok(symbols
                .iter()
                .filter_map(|s| self.sentiment.get(s).map(|v| (s.clone(), *v)))
                .collect())
        }
    }

    fn prediction(symbol: &str, diff: Option<f64>) -> PredictionRow {
        PredictionRow {
            symbol: Symbol::new(symbol),
            prediction_diff_pct: diff,
        }
    }

    #[test]
    fn test_news_score_mapping() {
        assert_eq!(news_score(Some(0.5)), 7.5);
        assert_eq!(news_score(Some(-1.0)), 0.0);
        assert_eq!(news_score(Some(1.8)), 10.0);
        assert_eq!(news_score(None), 5.0);
    }

    #[tokio::test]
    async fn test_finbrain_longlist() {
        let dir = tempfile::tempdir().unwrap();
        let source = ScriptedFinBrain {
            predictions: Ok(vec![
                prediction("AAPL", Some(1.5)),
                prediction("MSFT", Some(3.0)),
                prediction("XOM", None),
                prediction("NVDA", Some(0.25)),
            ]),
            sentiment: HashMap::from([(Symbol::new("AAPL"), 0.5), (Symbol::new("NVDA"), -0.5)]),
        };

        let report = FinBrainPipeline::new(Some(Arc::new(source)), 50)
            .run(&context(dir.path()))
            .await
            .unwrap();
        assert_eq!(report.rows, 3);

        let contents = fs::read_to_string(dir.path().join(FINBRAIN_FILE)).unwrap();
        assert_eq!(
            contents,
            "symbol,prediction_diff_pct,NewsScore\nAAPL,1.5,7.5\nMSFT,3.0,5.0\nNVDA,0.25,2.5\n"
        );
    }

    #[tokio::test]
    async fn test_missing_key_writes_header_only() {
        let dir = tempfile::tempdir().unwrap();
        let report = FinBrainPipeline::new(None, 50)
            .run(&context(dir.path()))
            .await
            .unwrap();

        assert_eq!(report.rows, 0);
        let contents = fs::read_to_string(dir.path().join(FINBRAIN_FILE)).unwrap();
        assert_eq!(contents, "symbol,prediction_diff_pct,NewsScore\n");
    }

    #[tokio::test]
    async fn test_prediction_failure_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let source = ScriptedFinBrain {
            predictions: Err(ScreenerError::ProviderError("invalid token".to_string())),
            sentiment: HashMap::new(),
        };

        let report = FinBrainPipeline::new(Some(Arc::new(source)), 50)
            .run(&context(dir.path()))
            .await
            .unwrap();
        assert_eq!(report.rows, 0);
        assert!(dir.path().join(FINBRAIN_FILE).exists());
    }
}
