use anyhow::Result;
use async_trait::async_trait;
use ml_client::SentimentScorer;
use news_client::HeadlineCollector;
use tracing::info;

use super::{Pipeline, PipelineReport, RunContext};
use crate::aggregator::{aggregate, split_buckets};
use crate::export::{commit_outputs, dated_file_name, render_bucket, render_snapshot};

/// Market-wide news, tri-state scores, long and short buckets by date.
pub struct HeadlinesPipeline {
    collector: HeadlineCollector,
    scorer: SentimentScorer,
    keep_unknown: bool,
    debug_snapshot: bool,
}

impl HeadlinesPipeline {
    pub fn new(collector: HeadlineCollector, scorer: SentimentScorer) -> Self {
        Self {
            collector,
            scorer,
            keep_unknown: false,
            debug_snapshot: false,
        }
    }

    /// Keep headlines no provider could attribute to a symbol
    pub fn with_keep_unknown(mut self, keep_unknown: bool) -> Self {
        self.keep_unknown = keep_unknown;
        self
    }

    /// Also write every scored headline
    pub fn with_debug_snapshot(mut self, debug_snapshot: bool) -> Self {
        self.debug_snapshot = debug_snapshot;
        self
    }
}

#[async_trait]
impl Pipeline for HeadlinesPipeline {
    fn name(&self) -> &'static str {
        "headlines"
    }

    async fn run(&self, ctx: &RunContext) -> Result<PipelineReport> {
        info!(providers = ?self.collector.provider_names(), "Collecting market headlines");
        let records = self.collector.collect().await;

        let scored = self.scorer.score_batch(records).await;
        info!(scored = scored.len(), "Headlines scored");

        let mut aggregates = aggregate(&scored);
        if !self.keep_unknown {
            let before = aggregates.len();
            aggregates.retain(|record| !record.symbol.is_unknown());
            let dropped = before - aggregates.len();
            if dropped > 0 {
                info!(dropped, "Dropped headlines without a symbol");
            }
        }

        let buckets = split_buckets(aggregates);
        info!(
            longs = buckets.longs.len(),
            shorts = buckets.shorts.len(),
            neutral = buckets.neutral.len(),
            "Symbols bucketed"
        );

        let mut files = vec![
            render_bucket(dated_file_name("longs", ctx.run_date), &buckets.longs)?,
            render_bucket(dated_file_name("shorts", ctx.run_date), &buckets.shorts)?,
        ];
        if self.debug_snapshot {
            files.push(render_snapshot(dated_file_name("headlines", ctx.run_date), &scored)?);
        }

        let written = commit_outputs(&ctx.output_dir, files)?;
        for path in &written {
            info!(path = %path.display(), "Wrote screen");
        }

        Ok(PipelineReport {
            pipeline: self.name(),
            files: written,
            rows: buckets.longs.len() + buckets.shorts.len(),
        })
    }
}
