use anyhow::{anyhow, bail, Context, Result};
use market_data::DEFAULT_CONSTITUENTS_URL;
use ml_client::{MLConfig, DEFAULT_FINBERT_URL};
use news_client::NewsCredentials;
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// One year of company news
pub const MAX_NEWS_HOURS: i64 = 24 * 366;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineKind {
    Headlines,
    Momentum,
    FinBrain,
}

impl PipelineKind {
    pub fn name(&self) -> &'static str {
        match self {
            PipelineKind::Headlines => "headlines",
            PipelineKind::Momentum => "momentum",
            PipelineKind::FinBrain => "finbrain",
        }
    }
}

impl fmt::Display for PipelineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PipelineKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "headlines" => Ok(PipelineKind::Headlines),
            "momentum" => Ok(PipelineKind::Momentum),
            "finbrain" => Ok(PipelineKind::FinBrain),
            other => Err(anyhow!(
                "Unknown pipeline '{}' (expected headlines, momentum or finbrain)",
                other
            )),
        }
    }
}

#[derive(Clone)]
pub struct ScreenerConfig {
    // Provider credentials
    pub finnhub_key: Option<String>,
    pub alpha_vantage_key: Option<String>,
    pub finbrain_key: Option<String>,
    pub hf_token: Option<String>,
    pub finbert_url: String,

    // Run selection
    pub pipelines: Vec<PipelineKind>,
    pub output_dir: PathBuf,

    // Universe parameters
    pub top_n: usize,
    pub prediction_top_n: usize,
    pub lookback_days: u32,
    pub news_hours: i64,
    pub constituents_url: String,

    // Network and scoring
    pub http_timeout: Duration,
    pub retry_delay: Duration,
    pub scoring_concurrency: usize,

    // Output switches
    pub debug_snapshot: bool,
    pub keep_unknown: bool,
}

// Keys stay out of log output
impl fmt::Debug for ScreenerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let configured = |key: &Option<String>| if key.is_some() { "set" } else { "unset" };

        f.debug_struct("ScreenerConfig")
            .field("finnhub_key", &configured(&self.finnhub_key))
            .field("alpha_vantage_key", &configured(&self.alpha_vantage_key))
            .field("finbrain_key", &configured(&self.finbrain_key))
            .field("hf_token", &configured(&self.hf_token))
            .field("finbert_url", &self.finbert_url)
            .field("pipelines", &self.pipelines)
            .field("output_dir", &self.output_dir)
            .field("top_n", &self.top_n)
            .field("prediction_top_n", &self.prediction_top_n)
            .field("lookback_days", &self.lookback_days)
            .field("news_hours", &self.news_hours)
            .field("constituents_url", &self.constituents_url)
            .field("http_timeout", &self.http_timeout)
            .field("retry_delay", &self.retry_delay)
            .field("scoring_concurrency", &self.scoring_concurrency)
            .field("debug_snapshot", &self.debug_snapshot)
            .field("keep_unknown", &self.keep_unknown)
            .finish()
    }
}

impl Default for ScreenerConfig {
    fn default() -> Self {
        Self {
            finnhub_key: None,
            alpha_vantage_key: None,
            finbrain_key: None,
            hf_token: None,
            finbert_url: DEFAULT_FINBERT_URL.to_string(),
            pipelines: vec![
                PipelineKind::Headlines,
                PipelineKind::Momentum,
                PipelineKind::FinBrain,
            ],
            output_dir: PathBuf::from("."),
            top_n: 30,
            prediction_top_n: 50,
            lookback_days: 15,
            news_hours: 24,
            constituents_url: DEFAULT_CONSTITUENTS_URL.to_string(),
            http_timeout: Duration::from_secs(15),
            retry_delay: Duration::from_millis(1000),
            scoring_concurrency: 4,
            debug_snapshot: false,
            keep_unknown: false,
        }
    }
}

/// Parse `key` if present, otherwise fall back to `default`.
fn parsed<T, F>(lookup: &F, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .parse()
            .with_context(|| format!("Invalid value for {}: '{}'", key, raw)),
        None => Ok(default),
    }
}

fn parse_pipelines(raw: &str) -> Result<Vec<PipelineKind>> {
    let mut pipelines = Vec::new();
    for name in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let kind: PipelineKind = name.parse()?;
        if !pipelines.contains(&kind) {
            pipelines.push(kind);
        }
    }

    if pipelines.is_empty() {
        bail!("SCREENER_PIPELINES names no pipeline");
    }
    Ok(pipelines)
}

impl ScreenerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let defaults = Self::default();

        let pipelines = match get("SCREENER_PIPELINES") {
            Some(raw) => parse_pipelines(&raw)?,
            None => defaults.pipelines,
        };

        let http_timeout_secs: u64 = parsed(&get, "SCREENER_HTTP_TIMEOUT_SECS", 15)?;
        let retry_delay_ms: u64 = parsed(&get, "SCREENER_RETRY_DELAY_MS", 1000)?;
        let scoring_concurrency: usize = parsed(&get, "SCREENER_SCORING_CONCURRENCY", 4)?;
        let news_hours: i64 = parsed(&get, "SCREENER_NEWS_HOURS", defaults.news_hours)?;
        if !(1..=MAX_NEWS_HOURS).contains(&news_hours) {
            bail!(
                "SCREENER_NEWS_HOURS must be between 1 and {}, got {}",
                MAX_NEWS_HOURS,
                news_hours
            );
        }
        if scoring_concurrency == 0 {
            bail!("SCREENER_SCORING_CONCURRENCY must be at least 1");
        }

        let config = Self {
            finnhub_key: get("FINNHUB_KEY"),
            alpha_vantage_key: get("AV_KEY"),
            finbrain_key: get("FINBRAIN_KEY"),
            hf_token: get("HF_TOKEN"),
            finbert_url: get("FINBERT_URL").unwrap_or(defaults.finbert_url),

            pipelines,
            output_dir: get("SCREENER_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),

            top_n: parsed(&get, "SCREENER_TOP_N", defaults.top_n)?,
            prediction_top_n: parsed(&get, "SCREENER_PREDICTION_TOP_N", defaults.prediction_top_n)?,
            lookback_days: parsed(&get, "SCREENER_LOOKBACK_DAYS", defaults.lookback_days)?,
            news_hours,
            constituents_url: get("SCREENER_CONSTITUENTS_URL")
                .unwrap_or(defaults.constituents_url),

            http_timeout: Duration::from_secs(http_timeout_secs),
            retry_delay: Duration::from_millis(retry_delay_ms),
            scoring_concurrency,

            debug_snapshot: parsed(&get, "SCREENER_DEBUG_SNAPSHOT", false)?,
            keep_unknown: parsed(&get, "SCREENER_KEEP_UNKNOWN", false)?,
        };

        Ok(config)
    }

    pub fn news_credentials(&self) -> NewsCredentials {
        NewsCredentials {
            finnhub_key: self.finnhub_key.clone(),
            alpha_vantage_key: self.alpha_vantage_key.clone(),
        }
    }

    pub fn ml_config(&self) -> MLConfig {
        MLConfig {
            finbert_url: self.finbert_url.clone(),
            api_token: self.hf_token.clone(),
            timeout: self.http_timeout,
        }
    }
}
