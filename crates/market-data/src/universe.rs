//! Universe selection
//!
//! Ranks candidate symbols by a metric (momentum, prediction delta) and keeps
//! a bounded slice. Symbols without a usable metric are left out of the
//! ranking instead of failing the run.

use futures_util::stream::{self, StreamExt};
use screener_core::{
    PredictionSource, PriceHistorySource, RankedSymbol, ScreenerResult, Symbol, SymbolListSource,
};
use tracing::{debug, info, warn};

use crate::constituents::FALLBACK_CONSTITUENTS;

/// Price-history requests in flight while computing momentum
const MOMENTUM_CONCURRENCY: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// Highest `n` by metric
    Top(usize),
    /// Lowest `n` by metric
    Bottom(usize),
    /// Highest `n` followed by lowest `n` (long and short candidates)
    TopAndBottom(usize),
}

/// Rank `(symbol, metric)` pairs given in provider order.
///
/// Missing or non-finite metrics are dropped. Sorting is stable, so ties keep
/// provider order.
pub fn select(candidates: Vec<(Symbol, Option<f64>)>, selection: Selection) -> Vec<RankedSymbol> {
    let mut ranked: Vec<RankedSymbol> = candidates
        .into_iter()
        .filter_map(|(symbol, metric)| match metric {
            Some(m) if m.is_finite() => Some(RankedSymbol { symbol, metric: m }),
            _ => None,
        })
        .collect();

    let descending = |a: &RankedSymbol, b: &RankedSymbol| b.metric.total_cmp(&a.metric);
    let ascending = |a: &RankedSymbol, b: &RankedSymbol| a.metric.total_cmp(&b.metric);

    match selection {
        Selection::Top(n) => {
            ranked.sort_by(descending);
            ranked.truncate(n);
            ranked
        }
        Selection::Bottom(n) => {
            ranked.sort_by(ascending);
            ranked.truncate(n);
            ranked
        }
        Selection::TopAndBottom(n) => {
            let mut bottom = ranked.clone();
            bottom.sort_by(ascending);

            ranked.sort_by(descending);
            ranked.truncate(n);

            let extra: Vec<RankedSymbol> = bottom
                .into_iter()
                .filter(|r| !ranked.iter().any(|t| t.symbol == r.symbol))
                .take(n)
                .collect();
            ranked.extend(extra);
            ranked
        }
    }
}

/// Relative change from the first to the last close, as a fraction.
///
/// `None` when fewer than two closes exist, any close is missing, or the
/// first close is zero.
pub fn momentum(closes: &[Option<f64>]) -> Option<f64> {
    if closes.len() < 2 || closes.iter().any(|c| c.is_none()) {
        return None;
    }

    let first = closes.first().copied().flatten()?;
    let last = closes.last().copied().flatten()?;
    if first == 0.0 {
        return None;
    }

    Some(last / first - 1.0)
}

/// Candidate symbols from `source`, or the built-in list when the source
/// fails or returns nothing.
pub async fn load_symbols(source: &dyn SymbolListSource) -> Vec<Symbol> {
    match source.symbols().await {
        Ok(symbols) if !symbols.is_empty() => {
            info!(count = symbols.len(), "Loaded constituent list");
            symbols
        }
        Ok(_) => {
            warn!("Constituent list was empty, using built-in symbols");
            fallback_symbols()
        }
        Err(e) => {
            warn!("Constituent list unavailable, using built-in symbols: {}", e);
            fallback_symbols()
        }
    }
}

fn fallback_symbols() -> Vec<Symbol> {
    FALLBACK_CONSTITUENTS.iter().map(|s| Symbol::new(s)).collect()
}

/// Rank `symbols` by momentum over `lookback_days`. The metric is in percent.
pub async fn momentum_universe(
    prices: &dyn PriceHistorySource,
    symbols: &[Symbol],
    lookback_days: u32,
    selection: Selection,
) -> Vec<RankedSymbol> {
    let candidates: Vec<(Symbol, Option<f64>)> = stream::iter(symbols.iter().cloned())
        .map(|symbol| async move {
            let metric = match prices.daily_closes(&symbol, lookback_days).await {
                Ok(closes) => momentum(&closes).map(|m| m * 100.0),
                Err(e) => {
                    debug!(symbol = %symbol, "No price history: {}", e);
                    None
                }
            };
            (symbol, metric)
        })
        .buffered(MOMENTUM_CONCURRENCY)
        .collect()
        .await;

    let ranked_count = candidates.iter().filter(|(_, m)| m.is_some()).count();
    let selected = select(candidates, selection);

    info!(
        candidates = symbols.len(),
        ranked = ranked_count,
        selected = selected.len(),
        "Momentum universe selected"
    );

    selected
}

/// Rank the provider's prediction table by expected change.
pub async fn prediction_universe(
    source: &dyn PredictionSource,
    selection: Selection,
) -> ScreenerResult<Vec<RankedSymbol>> {
    let rows = source.price_predictions().await?;
    let total = rows.len();

    let selected = select(
        rows.into_iter()
            .map(|row| (row.symbol, row.prediction_diff_pct))
            .collect(),
        selection,
    );

    info!(predictions = total, selected = selected.len(), "Prediction universe selected");

    Ok(selected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use screener_core::{PredictionRow, ScreenerError};
    use std::collections::HashMap;

    fn candidates(items: &[(&str, Option<f64>)]) -> Vec<(Symbol, Option<f64>)> {
        items.iter().map(|(s, m)| (Symbol::new(s), *m)).collect()
    }

    fn symbols(ranked: &[RankedSymbol]) -> Vec<&str> {
        ranked.iter().map(|r| r.symbol.as_str()).collect()
    }

    #[test]
    fn test_select_top_is_stable() {
        let ranked = select(
            candidates(&[
                ("AAA", Some(1.0)),
                ("BBB", Some(3.0)),
                ("CCC", Some(1.0)),
                ("DDD", None),
                ("EEE", Some(f64::NAN)),
                ("FFF", Some(3.0)),
            ]),
            Selection::Top(3),
        );
        assert_eq!(symbols(&ranked), vec!["BBB", "FFF", "AAA"]);
    }

    #[test]
    fn test_select_bottom() {
        let ranked = select(
            candidates(&[("AAA", Some(1.0)), ("BBB", Some(-2.0)), ("CCC", Some(0.5))]),
            Selection::Bottom(2),
        );
        assert_eq!(symbols(&ranked), vec!["BBB", "CCC"]);
    }

    #[test]
    fn test_select_top_and_bottom_has_no_repeats() {
        let ranked = select(
            candidates(&[("AAA", Some(5.0)), ("BBB", Some(-1.0)), ("CCC", Some(2.0))]),
            Selection::TopAndBottom(2),
        );
        assert_eq!(symbols(&ranked), vec!["AAA", "CCC", "BBB"]);
    }

    #[test]
    fn test_select_more_than_available() {
        let ranked = select(candidates(&[("AAA", Some(1.0))]), Selection::Top(30));
        assert_eq!(ranked.len(), 1);
        assert!(select(Vec::new(), Selection::Top(30)).is_empty());
    }

    #[test]
    fn test_momentum() {
        let m = momentum(&[Some(100.0), Some(105.0), Some(110.0)]).unwrap();
        assert!((m - 0.10).abs() < 1e-12);

        assert_eq!(momentum(&[Some(100.0)]), None);
        assert_eq!(momentum(&[]), None);
        assert_eq!(momentum(&[Some(100.0), None, Some(110.0)]), None);
        assert_eq!(momentum(&[Some(0.0), Some(1.0)]), None);
    }

    struct MockPrices {
        closes: HashMap<&'static str, Vec<Option<f64>>>,
    }

    #[async_trait]
    impl PriceHistorySource for MockPrices {
        async fn daily_closes(
            &self,
            symbol: &Symbol,
            _lookback_days: u32,
        ) -> ScreenerResult<Vec<Option<f64>>> {
            self.closes
                .get(symbol.as_str())
                .cloned()
                .ok_or_else(|| ScreenerError::InsufficientData("no chart".to_string()))
        }
    }

    #[tokio::test]
    async fn test_momentum_universe_excludes_missing_history() {
        let prices = MockPrices {
            closes: HashMap::from([
                ("AAPL", vec![Some(100.0), Some(110.0)]),
                ("MSFT", vec![Some(100.0), Some(120.0)]),
                ("TSLA", vec![Some(100.0), None]),
                ("NVDA", vec![Some(100.0), Some(90.0)]),
            ]),
        };
        let universe: Vec<Symbol> = ["AAPL", "MSFT", "TSLA", "NVDA", "GONE"]
            .iter()
            .map(|s| Symbol::new(s))
            .collect();

        let ranked = momentum_universe(&prices, &universe, 15, Selection::Top(2)).await;
        assert_eq!(symbols(&ranked), vec!["MSFT", "AAPL"]);
        assert!((ranked[0].metric - 20.0).abs() < 1e-9);
    }

    struct FailingList;

    #[async_trait]
    impl SymbolListSource for FailingList {
        async fn symbols(&self) -> ScreenerResult<Vec<Symbol>> {
            Err(ScreenerError::ApiError("timed out".to_string()))
        }
    }

    #[tokio::test]
    async fn test_load_symbols_falls_back() {
        let symbols = load_symbols(&FailingList).await;
        assert_eq!(symbols.len(), FALLBACK_CONSTITUENTS.len());
        assert_eq!(symbols[0].as_str(), "AAPL");
    }

    struct StaticPredictions;

    #[async_trait]
    impl PredictionSource for StaticPredictions {
        async fn price_predictions(&self) -> ScreenerResult<Vec<PredictionRow>> {
            Ok(vec![
                PredictionRow { symbol: Symbol::new("AAPL"), prediction_diff_pct: Some(0.5) },
                PredictionRow { symbol: Symbol::new("MSFT"), prediction_diff_pct: None },
                PredictionRow { symbol: Symbol::new("NVDA"), prediction_diff_pct: Some(2.5) },
            ])
        }

        async fn news_sentiment(
            &self,
            _symbols: &[Symbol],
        ) -> ScreenerResult<HashMap<Symbol, f64>> {
            Ok(HashMap::new())
        }
    }

    #[tokio::test]
    async fn test_prediction_universe() {
        let ranked = prediction_universe(&StaticPredictions, Selection::Top(50)).await.unwrap();
        assert_eq!(symbols(&ranked), vec!["NVDA", "AAPL"]);
    }
}
