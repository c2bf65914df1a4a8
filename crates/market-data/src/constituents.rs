use async_trait::async_trait;
use screener_core::{ScreenerError, ScreenerResult, Symbol, SymbolListSource};
use std::time::Duration;

pub const DEFAULT_CONSTITUENTS_URL: &str =
    "https://raw.githubusercontent.com/datasets/s-and-p-500-companies/master/data/constituents_symbols.txt";

/// Large caps used when the constituent list cannot be fetched
pub const FALLBACK_CONSTITUENTS: &[&str] = &[
    "AAPL", "MSFT", "GOOGL", "AMZN", "NVDA", "TSLA", "META", "BRK.B", "V", "JPM",
    "WMT", "MA", "PG", "HD", "DIS", "NFLX", "ADBE", "CRM", "CSCO", "INTC", "AMD",
    "PYPL", "COST", "PEP", "TMO", "MRK", "ABBV", "NKE", "CVX", "MCD", "XOM", "UNH",
    "JNJ", "LLY", "AVGO", "ORCL", "KO", "BAC", "WFC", "QCOM",
];

/// Newline-separated symbol list served over HTTP
#[derive(Clone)]
pub struct ConstituentsClient {
    client: reqwest::Client,
    url: String,
}

impl ConstituentsClient {
    pub fn new(url: String, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self { client, url }
    }
}

/// One symbol per line; blank lines and a `Symbol` header are skipped.
pub fn parse_constituents(text: &str) -> Vec<Symbol> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.eq_ignore_ascii_case("symbol"))
        .map(Symbol::new)
        .collect()
}

#[async_trait]
impl SymbolListSource for ConstituentsClient {
    async fn symbols(&self) -> ScreenerResult<Vec<Symbol>> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| ScreenerError::ApiError(format!("Constituents request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScreenerError::ApiError(format!(
                "Constituents list returned status {}",
                status
            )));
        }

        let text = response
            .text()
            .await
            .map_err(|e| ScreenerError::InvalidResponse(e.to_string()))?;

        Ok(parse_constituents(&text))
    }
}
