//! Per-symbol aggregation and long/short bucketing.
//!
//! Everything here is a pure function of its inputs.

use screener_core::{AggregateRecord, RankedSymbol, ScoreScale, ScoredHeadline, Symbol};
use std::collections::{BTreeMap, HashMap};

/// Mean score per symbol, ordered by symbol.
pub fn aggregate(scored: &[ScoredHeadline]) -> Vec<AggregateRecord> {
    let mut groups: BTreeMap<&Symbol, (f64, usize)> = BTreeMap::new();
    for s in scored {
        let entry = groups.entry(&s.record.symbol).or_insert((0.0, 0));
        entry.0 += s.score;
        entry.1 += 1;
    }

    groups
        .into_iter()
        .map(|(symbol, (sum, count))| AggregateRecord {
            symbol: symbol.clone(),
            mean_score: sum / count as f64,
            headline_count: count,
            metric: None,
        })
        .collect()
}

/// Left join an auxiliary metric by symbol. Unmatched symbols keep `None`.
pub fn join_metric(
    aggregates: Vec<AggregateRecord>,
    metrics: &[RankedSymbol],
) -> Vec<AggregateRecord> {
    let lookup: HashMap<&Symbol, f64> = metrics.iter().map(|m| (&m.symbol, m.metric)).collect();

    aggregates
        .into_iter()
        .map(|mut record| {
            record.metric = lookup.get(&record.symbol).copied();
            record
        })
        .collect()
}

/// One record per universe symbol, in universe order, with the ranking
/// metric attached. Symbols without headlines get the neutral score.
pub fn aggregate_universe(
    universe: &[RankedSymbol],
    scored: &[ScoredHeadline],
    scale: ScoreScale,
) -> Vec<AggregateRecord> {
    let by_symbol: HashMap<Symbol, AggregateRecord> = aggregate(scored)
        .into_iter()
        .map(|record| (record.symbol.clone(), record))
        .collect();

    universe
        .iter()
        .map(|ranked| match by_symbol.get(&ranked.symbol) {
            Some(record) => AggregateRecord {
                metric: Some(ranked.metric),
                ..record.clone()
            },
            None => AggregateRecord {
                symbol: ranked.symbol.clone(),
                mean_score: scale.neutral(),
                headline_count: 0,
                metric: Some(ranked.metric),
            },
        })
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Buckets {
    pub longs: Vec<AggregateRecord>,
    pub shorts: Vec<AggregateRecord>,
    pub neutral: Vec<AggregateRecord>,
}

/// Positive mean goes long, negative goes short, zero stays neutral.
pub fn split_buckets(aggregates: Vec<AggregateRecord>) -> Buckets {
    let mut buckets = Buckets::default();
    for record in aggregates {
        if record.mean_score > 0.0 {
            buckets.longs.push(record);
        } else if record.mean_score < 0.0 {
            buckets.shorts.push(record);
        } else {
            buckets.neutral.push(record);
        }
    }
    buckets
}
