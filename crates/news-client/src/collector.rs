use futures_util::future::join_all;
use screener_core::{HeadlineProvider, HeadlineRecord, Symbol};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::alpha_vantage::{AlphaVantageClient, AlphaVantageNews};
use crate::finnhub::{FinnhubClient, FinnhubCompanyNews, FinnhubGeneralNews};

/// Provider API keys. A missing key disables that provider.
#[derive(Debug, Clone, Default)]
pub struct NewsCredentials {
    pub finnhub_key: Option<String>,
    pub alpha_vantage_key: Option<String>,
}

/// Drop repeated (symbol, headline) pairs, keeping the first occurrence.
pub fn dedupe_headlines(records: Vec<HeadlineRecord>) -> Vec<HeadlineRecord> {
    let mut seen = HashSet::new();
    records
        .into_iter()
        .filter(|r| seen.insert((r.symbol.clone(), r.text.clone())))
        .collect()
}

/// Fans out to every registered provider, merges and dedupes the results.
#[derive(Clone, Default)]
pub struct HeadlineCollector {
    providers: Vec<Arc<dyn HeadlineProvider>>,
}

impl HeadlineCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_provider(mut self, provider: Arc<dyn HeadlineProvider>) -> Self {
        self.providers.push(provider);
        self
    }

    /// Finnhub general news plus Alpha Vantage, whichever are configured
    pub fn market_news(credentials: &NewsCredentials, timeout: Duration) -> Self {
        let mut collector = Self::new();

        match &credentials.finnhub_key {
            Some(key) => {
                let client = FinnhubClient::new(key.clone(), timeout);
                collector = collector.with_provider(Arc::new(FinnhubGeneralNews::new(client)));
            }
            None => info!("Finnhub key missing, skipping Finnhub news"),
        }

        match &credentials.alpha_vantage_key {
            Some(key) => {
                let client = AlphaVantageClient::new(key.clone(), timeout);
                collector = collector.with_provider(Arc::new(AlphaVantageNews::new(client)));
            }
            None => info!("Alpha Vantage key missing, skipping Alpha Vantage news"),
        }

        collector
    }

    /// Finnhub company news for a fixed symbol list
    pub fn company_news(
        credentials: &NewsCredentials,
        symbols: Vec<Symbol>,
        hours_back: i64,
        timeout: Duration,
    ) -> Self {
        match &credentials.finnhub_key {
            Some(key) => {
                let client = FinnhubClient::new(key.clone(), timeout);
                Self::new().with_provider(Arc::new(FinnhubCompanyNews::new(
                    client, symbols, hours_back,
                )))
            }
            None => {
                info!("Finnhub key missing, skipping company news");
                Self::new()
            }
        }
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Fetch from all providers concurrently. A failing provider contributes
    /// nothing; it never fails the collection.
    pub async fn collect(&self) -> Vec<HeadlineRecord> {
        let fetches = self.providers.iter().map(|provider| async move {
            match provider.fetch().await {
                Ok(records) => {
                    info!(provider = provider.name(), count = records.len(), "Fetched headlines");
                    records
                }
                Err(e) => {
                    warn!(provider = provider.name(), "Provider failed, using no headlines: {}", e);
                    Vec::new()
                }
            }
        });

        let merged: Vec<HeadlineRecord> = join_all(fetches).await.into_iter().flatten().collect();
        let total = merged.len();
        let deduped = dedupe_headlines(merged);

        info!(
            collected = total,
            unique = deduped.len(),
            "Headline collection complete"
        );

        deduped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use screener_core::{NewsSource, ScreenerError, ScreenerResult};

    struct StaticProvider {
        name: &'static str,
        records: Vec<HeadlineRecord>,
    }

    #[async_trait]
    impl HeadlineProvider for StaticProvider {
        fn name(&self) -> &str {
            self.name
        }

        async fn fetch(&self) -> ScreenerResult<Vec<HeadlineRecord>> {
            Ok(self.records.clone())
        }
    }

    struct BrokenProvider;

    #[async_trait]
    impl HeadlineProvider for BrokenProvider {
        fn name(&self) -> &str {
            "broken"
        }

        async fn fetch(&self) -> ScreenerResult<Vec<HeadlineRecord>> {
            Err(ScreenerError::InvalidResponse("unexpected token".to_string()))
        }
    }

    fn record(symbol: &str, text: &str, source: NewsSource) -> HeadlineRecord {
        HeadlineRecord::new(Symbol::new(symbol), text, source)
    }

    #[test]
    fn test_dedupe_keeps_first_occurrence_in_order() {
        let records = vec![
            record("AAPL", "Stock soars on earnings beat", NewsSource::Finnhub),
            record("MSFT", "Regulators open inquiry", NewsSource::Finnhub),
            record("AAPL", "Stock soars on earnings beat", NewsSource::AlphaVantage),
            record("TSLA", "Stock soars on earnings beat", NewsSource::AlphaVantage),
            record("MSFT", "Regulators open inquiry", NewsSource::Finnhub),
        ];

        let deduped = dedupe_headlines(records);
        let pairs: Vec<(&str, NewsSource)> = deduped
            .iter()
            .map(|r| (r.symbol.as_str(), r.source.clone()))
            .collect();

        assert_eq!(
            pairs,
            vec![
                ("AAPL", NewsSource::Finnhub),
                ("MSFT", NewsSource::Finnhub),
                ("TSLA", NewsSource::AlphaVantage),
            ]
        );
    }

    #[test]
    fn test_dedupe_is_exact_match() {
        let records = vec![
            record("AAPL", "Stock soars", NewsSource::Finnhub),
            record("AAPL", "stock soars", NewsSource::Finnhub),
        ];
        assert_eq!(dedupe_headlines(records).len(), 2);
    }

    #[tokio::test]
    async fn test_collect_merges_and_isolates_failures() {
        let collector = HeadlineCollector::new()
            .with_provider(Arc::new(StaticProvider {
                name: "first",
                records: vec![
                    record("AAPL", "Stock soars on earnings beat", NewsSource::Finnhub),
                    record("AAPL", "Stock soars on earnings beat", NewsSource::Finnhub),
                ],
            }))
            .with_provider(Arc::new(BrokenProvider))
            .with_provider(Arc::new(StaticProvider {
                name: "second",
                records: vec![record("MSFT", "Regulators open inquiry", NewsSource::AlphaVantage)],
            }));

        assert_eq!(collector.provider_names(), vec!["first", "broken", "second"]);

        let records = collector.collect().await;
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].symbol.as_str(), "AAPL");
        assert_eq!(records[1].symbol.as_str(), "MSFT");
    }

    #[tokio::test]
    async fn test_collect_without_providers_is_empty() {
        let collector = HeadlineCollector::market_news(&NewsCredentials::default(), Duration::from_secs(1));
        assert!(collector.is_empty());
        assert!(collector.collect().await.is_empty());

        let company = HeadlineCollector::company_news(
            &NewsCredentials::default(),
            vec![Symbol::new("AAPL")],
            24,
            Duration::from_secs(1),
        );
        assert!(company.is_empty());
    }

    #[test]
    fn test_market_news_registers_configured_providers() {
        let credentials = NewsCredentials {
            finnhub_key: Some("fh".to_string()),
            alpha_vantage_key: None,
        };
        let collector = HeadlineCollector::market_news(&credentials, Duration::from_secs(1));
        assert_eq!(collector.provider_names(), vec!["finnhub"]);

        let credentials = NewsCredentials {
            finnhub_key: Some("fh".to_string()),
            alpha_vantage_key: Some("av".to_string()),
        };
        let collector = HeadlineCollector::market_news(&credentials, Duration::from_secs(1));
        assert_eq!(collector.provider_names(), vec!["finnhub", "alpha_vantage"]);
    }

    #[tokio::test]
    async fn test_collect_with_unreachable_provider_is_empty() {
        let client = FinnhubClient::new("key".to_string(), Duration::from_secs(2))
            .with_base_url("http://127.0.0.1:9/api/v1");
        let collector =
            HeadlineCollector::new().with_provider(Arc::new(FinnhubGeneralNews::new(client)));
        assert!(collector.collect().await.is_empty());
    }
}
