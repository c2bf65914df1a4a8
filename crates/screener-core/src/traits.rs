use async_trait::async_trait;
use std::collections::HashMap;
use crate::{HeadlineRecord, PredictionRow, ScreenerError, Symbol};

/// A news source that yields (symbol, headline) pairs
#[async_trait]
pub trait HeadlineProvider: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    async fn fetch(&self) -> Result<Vec<HeadlineRecord>, ScreenerError>;
}

/// Source of the candidate symbol list (index constituents, watchlists, ...)
#[async_trait]
pub trait SymbolListSource: Send + Sync {
    async fn symbols(&self) -> Result<Vec<Symbol>, ScreenerError>;
}

/// Daily close history for momentum ranking
#[async_trait]
pub trait PriceHistorySource: Send + Sync {
    /// Closes for the last `lookback_days`, oldest first. A `None` entry is a
    /// session the provider reported without a close.
    async fn daily_closes(
        &self,
        symbol: &Symbol,
        lookback_days: u32,
    ) -> Result<Vec<Option<f64>>, ScreenerError>;
}

/// Price-prediction provider that also publishes per-symbol news sentiment
#[async_trait]
pub trait PredictionSource: Send + Sync {
    async fn price_predictions(&self) -> Result<Vec<PredictionRow>, ScreenerError>;

    /// Sentiment in -1..=1 per symbol. Symbols without coverage are absent.
    async fn news_sentiment(
        &self,
        symbols: &[Symbol],
    ) -> Result<HashMap<Symbol, f64>, ScreenerError>;
}
