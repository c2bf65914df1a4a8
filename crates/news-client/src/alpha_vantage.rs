use async_trait::async_trait;
use reqwest::Client;
use screener_core::{
    HeadlineProvider, HeadlineRecord, NewsSource, ScreenerError, ScreenerResult, Symbol,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::items::{decode_items, null_as_default};

const BASE_URL: &str = "https://www.alphavantage.co/query";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TickerSentiment {
    #[serde(default, deserialize_with = "null_as_default")]
    pub ticker: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlphaVantageNewsItem {
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub ticker_sentiment: Vec<TickerSentiment>,
}

impl AlphaVantageNewsItem {
    /// First tagged ticker, or the unknown sentinel
    pub fn symbol(&self) -> Symbol {
        self.ticker_sentiment
            .first()
            .map(|t| Symbol::new(&t.ticker))
            .unwrap_or_else(Symbol::unknown)
    }
}

#[derive(Clone)]
pub struct AlphaVantageClient {
    api_key: String,
    client: Client,
    base_url: String,
}

impl AlphaVantageClient {
    pub fn new(api_key: String, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            api_key,
            client,
            base_url: BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Latest items from the NEWS_SENTIMENT feed
    pub async fn news_sentiment(&self) -> ScreenerResult<Vec<AlphaVantageNewsItem>> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("function", "NEWS_SENTIMENT"),
                ("apikey", self.api_key.as_str()),
            ])
            .send()
            .await
            .map_err(|e| ScreenerError::ApiError(format!("Alpha Vantage request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScreenerError::ApiError(format!(
                "Alpha Vantage returned status {}",
                status
            )));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ScreenerError::InvalidResponse(format!("Alpha Vantage body: {}", e)))?;

        parse_news_feed(json)
    }
}

/// Extract `feed[]` from a NEWS_SENTIMENT response.
///
/// Alpha Vantage reports bad keys and rate limits with a 200 and one of
/// `Error Message`, `Note` or `Information`. Items that do not decode are
/// skipped.
pub fn parse_news_feed(json: serde_json::Value) -> ScreenerResult<Vec<AlphaVantageNewsItem>> {
    if let Some(error) = json.get("Error Message") {
        return Err(ScreenerError::ProviderError(format!(
            "Alpha Vantage error: {}",
            error
        )));
    }

    if let Some(note) = json.get("Note").or_else(|| json.get("Information")) {
        return Err(ScreenerError::ProviderError(format!(
            "Alpha Vantage rate limit: {}",
            note
        )));
    }

    match json.get("feed") {
        Some(serde_json::Value::Array(items)) => Ok(decode_items("alpha_vantage", items.clone())),
        _ => Err(ScreenerError::InvalidResponse("No news feed found".to_string())),
    }
}

pub struct AlphaVantageNews {
    client: AlphaVantageClient,
}

impl AlphaVantageNews {
    pub fn new(client: AlphaVantageClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HeadlineProvider for AlphaVantageNews {
    fn name(&self) -> &str {
        "alpha_vantage"
    }

    async fn fetch(&self) -> ScreenerResult<Vec<HeadlineRecord>> {
        let items = self.client.news_sentiment().await?;

        Ok(items
            .into_iter()
            .filter(|item| !item.title.trim().is_empty())
            .map(|item| {
                let symbol = item.symbol();
                HeadlineRecord::new(symbol, item.title, NewsSource::AlphaVantage)
            })
            .collect())
    }
}
