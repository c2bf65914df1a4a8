use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, NaiveDate, Utc};
use reqwest::Client;
use screener_core::{
    HeadlineProvider, HeadlineRecord, NewsSource, ScreenerError, ScreenerResult, Symbol,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::items::{decode_items, null_as_default};

const BASE_URL: &str = "https://finnhub.io/api/v1";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinnhubNewsItem {
    #[serde(default, deserialize_with = "null_as_default")]
    pub related: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub headline: String,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub datetime: Option<i64>,
}

#[derive(Clone)]
pub struct FinnhubClient {
    api_key: String,
    client: Client,
    base_url: String,
}

impl FinnhubClient {
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

    /// Market-wide news feed (`/news?category=general`)
    pub async fn general_news(&self) -> ScreenerResult<Vec<FinnhubNewsItem>> {
        let url = format!("{}/news", self.base_url);
        let json = self
            .get_json(&url, &[("category", "general".to_string())])
            .await?;
        parse_news_payload(json)
    }

    /// Company news for one symbol between two calendar dates (inclusive)
    pub async fn company_news(
        &self,
        symbol: &Symbol,
        from: NaiveDate,
        to: NaiveDate,
    ) -> ScreenerResult<Vec<FinnhubNewsItem>> {
        let url = format!("{}/company-news", self.base_url);
        let json = self
            .get_json(
                &url,
                &[
                    ("symbol", symbol.to_string()),
                    ("from", from.format("%Y-%m-%d").to_string()),
                    ("to", to.format("%Y-%m-%d").to_string()),
                ],
            )
            .await?;
        parse_news_payload(json)
    }

    async fn get_json(
        &self,
        url: &str,
        params: &[(&str, String)],
    ) -> ScreenerResult<serde_json::Value> {
        let response = self
            .client
            .get(url)
            .query(params)
            .query(&[("token", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| ScreenerError::ApiError(format!("Finnhub request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScreenerError::ApiError(format!(
                "Finnhub returned status {}",
                status
            )));
        }

        response
            .json()
            .await
            .map_err(|e| ScreenerError::InvalidResponse(format!("Finnhub body: {}", e)))
    }
}

/// Finnhub answers with an array of news items, or with `{"error": "..."}`.
/// Items that do not decode are skipped.
pub fn parse_news_payload(json: serde_json::Value) -> ScreenerResult<Vec<FinnhubNewsItem>> {
    if let Some(error) = json.get("error") {
        return Err(ScreenerError::ProviderError(format!("Finnhub error: {}", error)));
    }

    match json {
        serde_json::Value::Array(items) => Ok(decode_items("finnhub", items)),
        _ => Err(ScreenerError::InvalidResponse(
            "Finnhub news payload is not a list".to_string(),
        )),
    }
}

/// General news, one record per item, symbol from the `related` field
pub struct FinnhubGeneralNews {
    client: FinnhubClient,
}

impl FinnhubGeneralNews {
    pub fn new(client: FinnhubClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HeadlineProvider for FinnhubGeneralNews {
    fn name(&self) -> &str {
        "finnhub"
    }

    async fn fetch(&self) -> ScreenerResult<Vec<HeadlineRecord>> {
        let items = self.client.general_news().await?;

        Ok(items
            .into_iter()
            .filter(|item| !item.headline.trim().is_empty())
            .map(|item| {
                HeadlineRecord::new(
                    Symbol::from_related(&item.related),
                    item.headline,
                    NewsSource::Finnhub,
                )
            })
            .collect())
    }
}

/// Company news for a fixed symbol list over a trailing window.
///
/// A failed symbol is logged and skipped; the others still contribute.
pub struct FinnhubCompanyNews {
    client: FinnhubClient,
    symbols: Vec<Symbol>,
    hours_back: i64,
}

impl FinnhubCompanyNews {
    pub fn new(client: FinnhubClient, symbols: Vec<Symbol>, hours_back: i64) -> Self {
        Self {
            client,
            symbols,
            hours_back,
        }
    }
}

#[async_trait]
impl HeadlineProvider for FinnhubCompanyNews {
    fn name(&self) -> &str {
        "finnhub-company"
    }

    async fn fetch(&self) -> ScreenerResult<Vec<HeadlineRecord>> {
        let now = Utc::now();
        let from = ChronoDuration::try_hours(self.hours_back)
            .filter(|window| *window > ChronoDuration::zero())
            .and_then(|window| now.checked_sub_signed(window))
            .map(|start| start.date_naive());
        let from = match from {
            Some(from) => from,
            None => {
                warn!(hours_back = self.hours_back, "Company news window out of range");
                return Err(ScreenerError::InsufficientData(format!(
                    "Invalid company news window of {} hours",
                    self.hours_back
                )));
            }
        };
        let to = now.date_naive();

        let mut records = Vec::new();
        for symbol in &self.symbols {
            match self.client.company_news(symbol, from, to).await {
                Ok(items) => {
                    debug!(symbol = %symbol, count = items.len(), "Finnhub company news");
                    records.extend(
                        items
                            .into_iter()
                            .filter(|item| !item.headline.trim().is_empty())
                            .map(|item| {
                                HeadlineRecord::new(
                                    symbol.clone(),
                                    item.headline,
                                    NewsSource::Finnhub,
                                )
                            }),
                    );
                }
                Err(e) => warn!(symbol = %symbol, "Finnhub company news failed: {}", e),
            }
        }

        Ok(records)
    }
}
