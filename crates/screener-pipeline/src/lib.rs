pub mod aggregator;
pub mod config;
pub mod export;
pub mod pipelines;

pub use aggregator::{aggregate, aggregate_universe, join_metric, split_buckets, Buckets};
pub use config::{PipelineKind, ScreenerConfig};
pub use export::{commit_outputs, OutputFile};
pub use pipelines::{build_pipelines, Pipeline, PipelineReport, RunContext};
