use anyhow::Result;
use async_trait::async_trait;
use market_data::{load_symbols, momentum_universe, Selection};
use ml_client::SentimentScorer;
use news_client::HeadlineCollector;
use screener_core::{PriceHistorySource, Symbol, SymbolListSource};
use std::sync::Arc;
use tracing::info;

use super::{Pipeline, PipelineReport, RunContext};
use crate::aggregator::aggregate_universe;
use crate::export::{commit_outputs, render_momentum};

pub const MOMENTUM_FILE: &str = "momentum_longlist.csv";

/// Builds the company-news collector once the universe is known
pub type CollectorFactory = Arc<dyn Fn(Vec<Symbol>) -> HeadlineCollector + Send + Sync>;

/// Strongest look-back momentum names, scored 0-10 on their recent news.
pub struct MomentumPipeline {
    symbols: Arc<dyn SymbolListSource>,
    prices: Arc<dyn PriceHistorySource>,
    news: CollectorFactory,
    scorer: SentimentScorer,
    top_n: usize,
    lookback_days: u32,
}

impl MomentumPipeline {
    pub fn new(
        symbols: Arc<dyn SymbolListSource>,
        prices: Arc<dyn PriceHistorySource>,
        news: CollectorFactory,
        scorer: SentimentScorer,
        top_n: usize,
        lookback_days: u32,
    ) -> Self {
        Self {
            symbols,
            prices,
            news,
            scorer,
            top_n,
            lookback_days,
        }
    }
}

#[async_trait]
impl Pipeline for MomentumPipeline {
    fn name(&self) -> &'static str {
        "momentum"
    }

    async fn run(&self, ctx: &RunContext) -> Result<PipelineReport> {
        let candidates = load_symbols(self.symbols.as_ref()).await;
        let universe = momentum_universe(
            self.prices.as_ref(),
            &candidates,
            self.lookback_days,
            Selection::Top(self.top_n),
        )
        .await;

        let scored = if universe.is_empty() {
            info!("No symbol has usable price history, momentum screen will be empty");
            Vec::new()
        } else {
            let collector =
                (self.news)(universe.iter().map(|r| r.symbol.clone()).collect());
            let records = collector.collect().await;
            self.scorer.score_batch(records).await
        };

        let mut rows = aggregate_universe(&universe, &scored, self.scorer.scale());
        rows.sort_by(|a, b| b.mean_score.total_cmp(&a.mean_score));

        let without_news = rows.iter().filter(|r| r.headline_count == 0).count();
        info!(
            universe = universe.len(),
            headlines = scored.len(),
            without_news,
            "Momentum universe scored"
        );

        let file = render_momentum(MOMENTUM_FILE.to_string(), &rows)?;
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
