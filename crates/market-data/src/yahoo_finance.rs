use async_trait::async_trait;
use chrono::Utc;
use screener_core::{PriceHistorySource, ScreenerError, ScreenerResult, Symbol};
use std::time::Duration;

const CHART_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";
const SECONDS_PER_DAY: i64 = 86_400;

#[derive(Clone)]
pub struct YahooFinanceClient {
    client: reqwest::Client,
    chart_url: String,
}

impl YahooFinanceClient {
    pub fn new(timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            chart_url: CHART_URL.to_string(),
        }
    }

    pub fn with_chart_url(mut self, chart_url: impl Into<String>) -> Self {
        self.chart_url = chart_url.into();
        self
    }

    /// Daily closes between two unix timestamps
    pub async fn get_daily_closes(
        &self,
        symbol: &Symbol,
        period1: i64,
        period2: i64,
    ) -> ScreenerResult<Vec<Option<f64>>> {
        let url = format!("{}/{}", self.chart_url, yahoo_ticker(symbol));

        let response = self
            .client
            .get(&url)
            .query(&[
                ("period1", period1.to_string()),
                ("period2", period2.to_string()),
                ("interval", "1d".to_string()),
            ])
            .send()
            .await
            .map_err(|e| ScreenerError::ApiError(format!("Yahoo request failed: {}", e)))?;

        check_chart_status(response.status())?;

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ScreenerError::InvalidResponse(format!("Yahoo body: {}", e)))?;

        parse_chart_closes(&json)
    }
}

/// Rate limits and unknown tickers come back as non-2xx, sometimes with a
/// chart body that would otherwise parse.
pub fn check_chart_status(status: reqwest::StatusCode) -> ScreenerResult<()> {
    if status.is_success() {
        Ok(())
    } else {
        Err(ScreenerError::ApiError(format!(
            "Yahoo chart returned status {}",
            status
        )))
    }
}

/// Yahoo spells share classes with a dash (`BRK-B`)
pub fn yahoo_ticker(symbol: &Symbol) -> String {
    symbol.as_str().replace('.', "-")
}

/// Pull `chart.result[0].indicators.quote[0].close` out of a chart response.
/// `null` closes are kept as `None`.
pub fn parse_chart_closes(json: &serde_json::Value) -> ScreenerResult<Vec<Option<f64>>> {
    let chart = json
        .get("chart")
        .and_then(|v| v.get("result"))
        .and_then(|v| v.as_array())
        .and_then(|arr| arr.first())
        .ok_or_else(|| ScreenerError::InsufficientData("No chart data found".to_string()))?;

    let closes = chart
        .get("indicators")
        .and_then(|v| v.get("quote"))
        .and_then(|v| v.as_array())
        .and_then(|arr| arr.first())
        .and_then(|q| q.get("close"))
        .and_then(|v| v.as_array())
        .ok_or_else(|| ScreenerError::InsufficientData("No close prices".to_string()))?;

    Ok(closes.iter().map(|v| v.as_f64()).collect())
}

#[async_trait]
impl PriceHistorySource for YahooFinanceClient {
    async fn daily_closes(
        &self,
        symbol: &Symbol,
        lookback_days: u32,
    ) -> ScreenerResult<Vec<Option<f64>>> {
        let end = Utc::now().timestamp();
        let start = end - i64::from(lookback_days) * SECONDS_PER_DAY;
        self.get_daily_closes(symbol, start, end).await
    }
}
