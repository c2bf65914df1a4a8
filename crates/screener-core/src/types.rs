use serde::{Deserialize, Serialize};
use std::fmt;

/// Placeholder for headlines whose provider did not name a symbol.
pub const UNKNOWN_SYMBOL: &str = "UNKNOWN";

/// Tradable instrument identifier, trimmed and upper-cased.
///
/// Blank input never produces an empty symbol; it normalizes to
/// [`UNKNOWN_SYMBOL`] so that downstream grouping keeps the record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Symbol(String);

impl Symbol {
    pub fn new(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            Self::unknown()
        } else {
            Self(trimmed.to_uppercase())
        }
    }

    pub fn unknown() -> Self {
        Self(UNKNOWN_SYMBOL.to_string())
    }

    /// Build from a provider "related symbols" field such as `"AAPL,MSFT"`.
    /// Only the first token is used.
    pub fn from_related(related: &str) -> Self {
        Self::new(related.split(',').next().unwrap_or(""))
    }

    pub fn is_unknown(&self) -> bool {
        self.0 == UNKNOWN_SYMBOL
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Symbol {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

/// Where a headline came from. Kept for traceability only.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NewsSource {
    Finnhub,
    AlphaVantage,
    FinBrain,
    Other(String),
}

impl NewsSource {
    pub fn name(&self) -> &str {
        match self {
            NewsSource::Finnhub => "finnhub",
            NewsSource::AlphaVantage => "alpha_vantage",
            NewsSource::FinBrain => "finbrain",
            NewsSource::Other(name) => name,
        }
    }
}

impl fmt::Display for NewsSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single (symbol, headline) pair as returned by a provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeadlineRecord {
    pub symbol: Symbol,
    pub text: String,
    pub source: NewsSource,
}

impl HeadlineRecord {
    pub fn new(symbol: Symbol, text: impl Into<String>, source: NewsSource) -> Self {
        Self {
            symbol,
            text: text.into(),
            source,
        }
    }
}

/// Headline after sentiment scoring
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredHeadline {
    pub record: HeadlineRecord,
    pub score: f64,
}

/// Range a sentiment score lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScoreScale {
    /// -1 (negative), 0 (neutral), +1 (positive)
    TriState,
    /// 0..=10, 5 is neutral
    Continuous,
}

impl ScoreScale {
    /// Value substituted whenever a score cannot be computed.
    pub fn neutral(&self) -> f64 {
        match self {
            ScoreScale::TriState => 0.0,
            ScoreScale::Continuous => 5.0,
        }
    }

    pub fn bounds(&self) -> (f64, f64) {
        match self {
            ScoreScale::TriState => (-1.0, 1.0),
            ScoreScale::Continuous => (0.0, 10.0),
        }
    }

    pub fn clamp(&self, value: f64) -> f64 {
        if !value.is_finite() {
            return self.neutral();
        }
        let (lo, hi) = self.bounds();
        value.clamp(lo, hi)
    }
}

/// Per-symbol sentiment with an optional ranking metric joined on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateRecord {
    pub symbol: Symbol,
    pub mean_score: f64,
    pub headline_count: usize,
    /// Momentum or prediction delta, when the universe came from a ranking
    pub metric: Option<f64>,
}

/// Symbol kept by the universe selector along with the metric it was ranked on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedSymbol {
    pub symbol: Symbol,
    pub metric: f64,
}

/// One row of a price-prediction table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRow {
    pub symbol: Symbol,
    pub prediction_diff_pct: Option<f64>,
}
