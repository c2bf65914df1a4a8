use async_trait::async_trait;
use reqwest::Url;
use screener_core::{PredictionRow, PredictionSource, ScreenerError, ScreenerResult, Symbol};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

const BASE_URL: &str = "https://api.finbrain.tech/v1";
const DEFAULT_MARKET: &str = "S&P 500";

/// FinBrain daily price predictions and news sentiment
#[derive(Clone)]
pub struct FinBrainClient {
    api_key: String,
    client: reqwest::Client,
    base_url: String,
    market: String,
}

impl FinBrainClient {
    pub fn new(api_key: String, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            api_key,
            client,
            base_url: BASE_URL.to_string(),
            market: DEFAULT_MARKET.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// `base_url` plus percent-encoded path segments
    fn endpoint(&self, segments: &[&str]) -> ScreenerResult<Url> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| ScreenerError::ApiError(format!("Bad FinBrain URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| ScreenerError::ApiError("FinBrain URL cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_json(&self, url: Url) -> ScreenerResult<Value> {
        let response = self
            .client
            .get(url)
            .query(&[("token", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| ScreenerError::ApiError(format!("FinBrain request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScreenerError::ApiError(format!(
                "FinBrain returned status {}",
                status
            )));
        }

        response
            .json()
            .await
            .map_err(|e| ScreenerError::InvalidResponse(format!("FinBrain body: {}", e)))
    }

    pub async fn get_price_predictions(&self) -> ScreenerResult<Vec<PredictionRow>> {
        let url = self.endpoint(&["market", self.market.as_str(), "predictions", "daily"])?;
        let json = self.get_json(url).await?;
        parse_predictions(&json)
    }

    /// Most recent sentiment value for one symbol, if FinBrain covers it
    pub async fn get_news_sentiment(&self, symbol: &Symbol) -> ScreenerResult<Option<f64>> {
        let url = self.endpoint(&["sentiments", self.market.as_str(), symbol.as_str()])?;
        let json = self.get_json(url).await?;
        parse_latest_sentiment(&json)
    }
}

/// Accept numbers and numeric strings; FinBrain uses both.
fn number_field(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_end_matches('%').parse().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

/// Prediction table: a list of `{ticker, prediction: {expectedShort, ..}}`
/// items. A flat `prediction_diff_pct` field is accepted as well.
pub fn parse_predictions(json: &Value) -> ScreenerResult<Vec<PredictionRow>> {
    if let Some(error) = json.get("error").or_else(|| json.get("message")) {
        return Err(ScreenerError::ProviderError(format!("FinBrain error: {}", error)));
    }

    let items = json
        .as_array()
        .or_else(|| json.get("data").and_then(|d| d.as_array()))
        .ok_or_else(|| ScreenerError::InvalidResponse("No prediction list found".to_string()))?;

    Ok(items
        .iter()
        .filter_map(|item| {
            let symbol = item
                .get("ticker")
                .or_else(|| item.get("symbol"))
                .and_then(|v| v.as_str())?;

            let diff = item
                .get("prediction_diff_pct")
                .and_then(number_field)
                .or_else(|| {
                    item.get("prediction")
                        .and_then(|p| p.get("expectedShort"))
                        .and_then(number_field)
                });

            Some(PredictionRow {
                symbol: Symbol::new(symbol),
                prediction_diff_pct: diff,
            })
        })
        .collect())
}

/// `sentimentAnalysis` maps ISO dates to scores; the latest date wins.
pub fn parse_latest_sentiment(json: &Value) -> ScreenerResult<Option<f64>> {
    if let Some(error) = json.get("error") {
        return Err(ScreenerError::ProviderError(format!("FinBrain error: {}", error)));
    }

    if let Some(score) = json.get("sentiment_score").and_then(number_field) {
        return Ok(Some(score));
    }

    let series = match json.get("sentimentAnalysis").and_then(|v| v.as_object()) {
        Some(series) => series,
        None => return Ok(None),
    };

    Ok(series
        .iter()
        .filter_map(|(date, value)| number_field(value).map(|v| (date, v)))
        .max_by(|a, b| a.0.cmp(b.0))
        .map(|(_, v)| v))
}

#[async_trait]
impl PredictionSource for FinBrainClient {
    async fn price_predictions(&self) -> ScreenerResult<Vec<PredictionRow>> {
        self.get_price_predictions().await
    }

    async fn news_sentiment(&self, symbols: &[Symbol]) -> ScreenerResult<HashMap<Symbol, f64>> {
        let mut sentiment = HashMap::new();
        for symbol in symbols {
            match self.get_news_sentiment(symbol).await {
                Ok(Some(score)) => {
                    sentiment.insert(symbol.clone(), score);
                }
                Ok(None) => debug!(symbol = %symbol, "No FinBrain sentiment"),
                Err(e) => warn!(symbol = %symbol, "FinBrain sentiment failed: {}", e),
            }
        }
        Ok(sentiment)
    }
}
