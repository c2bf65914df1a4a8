use futures_util::stream::{self, StreamExt};
use screener_core::{HeadlineRecord, ScoreScale, ScoredHeadline};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{MLError, MLResult};
use crate::provider::SentimentClassifier;
use crate::sentiment::{ClassProbabilities, SentimentLabel};

const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);
const DEFAULT_CONCURRENCY: usize = 4;

/// Map classifier output onto a score scale.
///
/// Tri-state takes the most likely label. Continuous uses
/// `(p_pos - p_neg + 1) / 2 * 10`, clipped to 0..=10.
pub fn map_to_scale(scale: ScoreScale, probs: &ClassProbabilities) -> f64 {
    match scale {
        ScoreScale::TriState => match probs.top_label() {
            SentimentLabel::Positive => 1.0,
            SentimentLabel::Negative => -1.0,
            SentimentLabel::Neutral => 0.0,
        },
        ScoreScale::Continuous => {
            scale.clamp((probs.positive - probs.negative + 1.0) / 2.0 * 10.0)
        }
    }
}

/// Turns headlines into scores. Never fails: anything that goes wrong with a
/// single headline yields the scale's neutral value for that headline.
#[derive(Clone)]
pub struct SentimentScorer {
    classifier: Arc<dyn SentimentClassifier>,
    scale: ScoreScale,
    retry_delay: Duration,
    concurrency: usize,
}

impl SentimentScorer {
    pub fn new(classifier: Arc<dyn SentimentClassifier>, scale: ScoreScale) -> Self {
        Self {
            classifier,
            scale,
            retry_delay: DEFAULT_RETRY_DELAY,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    /// Delay before the single retry on a "model not loaded" answer
    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    /// Maximum classifier calls in flight during `score_batch`
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Same classifier and settings, different scale.
    pub fn with_scale(mut self, scale: ScoreScale) -> Self {
        self.scale = scale;
        self
    }

    pub fn scale(&self) -> ScoreScale {
        self.scale
    }

    pub async fn score(&self, text: &str) -> f64 {
        if text.trim().is_empty() {
            return self.scale.neutral();
        }

        match self.classify_with_retry(text).await {
            Ok(probs) => map_to_scale(self.scale, &probs),
            Err(e) => {
                warn!(
                    backend = self.classifier.backend_name(),
                    "Sentiment scoring failed, using neutral: {}", e
                );
                self.scale.neutral()
            }
        }
    }

    /// Score every record. Output order matches input order and the future
    /// resolves only once every headline has a score.
    pub async fn score_batch(&self, records: Vec<HeadlineRecord>) -> Vec<ScoredHeadline> {
        let this = self;
        stream::iter(records)
            .map(move |record| async move {
                let score = this.score(&record.text).await;
                ScoredHeadline { record, score }
            })
            .buffered(self.concurrency)
            .collect()
            .await
    }

    /// At most one retry, and only for the "not ready" condition.
    async fn classify_with_retry(&self, text: &str) -> MLResult<ClassProbabilities> {
        match self.classifier.classify(text).await {
            Err(MLError::ModelNotLoaded) => {
                debug!(
                    "Classifier not ready, retrying once in {}ms",
                    self.retry_delay.as_millis()
                );
                tokio::time::sleep(self.retry_delay).await;
                self.classifier.classify(text).await
            }
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use screener_core::{NewsSource, Symbol};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Positive if the text mentions "soars", negative for "inquiry", else neutral
    struct KeywordClassifier;

    #[async_trait]
    impl SentimentClassifier for KeywordClassifier {
        async fn classify(&self, text: &str) -> MLResult<ClassProbabilities> {
            if text.contains("soars") {
                Ok(ClassProbabilities::new(0.9, 0.02, 0.08))
            } else if text.contains("inquiry") {
                Ok(ClassProbabilities::new(0.05, 0.85, 0.10))
            } else {
                Ok(ClassProbabilities::new(0.1, 0.1, 0.8))
            }
        }

        fn backend_name(&self) -> &'static str {
            "keyword"
        }
    }

    struct FailingClassifier;

    #[async_trait]
    impl SentimentClassifier for FailingClassifier {
        async fn classify(&self, _text: &str) -> MLResult<ClassProbabilities> {
            Err(MLError::InvalidResponse("garbage".to_string()))
        }

        fn backend_name(&self) -> &'static str {
            "failing"
        }
    }

    /// Reports "not loaded" for the first `not_ready_calls` calls
    struct WarmingClassifier {
        calls: AtomicUsize,
        not_ready_calls: usize,
    }

    impl WarmingClassifier {
        fn new(not_ready_calls: usize) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                not_ready_calls,
            }
        }
    }

    #[async_trait]
    impl SentimentClassifier for WarmingClassifier {
        async fn classify(&self, _text: &str) -> MLResult<ClassProbabilities> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.not_ready_calls {
                Err(MLError::ModelNotLoaded)
            } else {
                Ok(ClassProbabilities::new(0.7, 0.1, 0.2))
            }
        }

        fn backend_name(&self) -> &'static str {
            "warming"
        }
    }

    fn scorer(classifier: Arc<dyn SentimentClassifier>, scale: ScoreScale) -> SentimentScorer {
        SentimentScorer::new(classifier, scale).with_retry_delay(Duration::from_millis(1))
    }

    #[test]
    fn test_map_to_scale_tri_state() {
        let pos = ClassProbabilities::new(0.8, 0.1, 0.1);
        let neg = ClassProbabilities::new(0.1, 0.8, 0.1);
        let neu = ClassProbabilities::new(0.1, 0.1, 0.8);
        assert_eq!(map_to_scale(ScoreScale::TriState, &pos), 1.0);
        assert_eq!(map_to_scale(ScoreScale::TriState, &neg), -1.0);
        assert_eq!(map_to_scale(ScoreScale::TriState, &neu), 0.0);
    }

    #[test]
    fn test_map_to_scale_continuous() {
        let all_pos = ClassProbabilities::new(1.0, 0.0, 0.0);
        let all_neg = ClassProbabilities::new(0.0, 1.0, 0.0);
        let even = ClassProbabilities::new(0.3, 0.3, 0.4);
        assert_eq!(map_to_scale(ScoreScale::Continuous, &all_pos), 10.0);
        assert_eq!(map_to_scale(ScoreScale::Continuous, &all_neg), 0.0);
        assert!((map_to_scale(ScoreScale::Continuous, &even) - 5.0).abs() < 1e-9);

        // Out-of-range probabilities are clipped
        let broken = ClassProbabilities::new(3.0, 0.0, 0.0);
        assert_eq!(map_to_scale(ScoreScale::Continuous, &broken), 10.0);
    }

    #[tokio::test]
    async fn test_failure_yields_neutral() {
        let tri = scorer(Arc::new(FailingClassifier), ScoreScale::TriState);
        assert_eq!(tri.score("Stock soars").await, 0.0);

        let cont = tri.with_scale(ScoreScale::Continuous);
        assert_eq!(cont.score("Stock soars").await, 5.0);
    }

    #[tokio::test]
    async fn test_empty_text_is_neutral_without_calling_classifier() {
        let classifier = Arc::new(WarmingClassifier::new(0));
        let s = scorer(classifier.clone(), ScoreScale::TriState);
        assert_eq!(s.score("   ").await, 0.0);
        assert_eq!(classifier.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_not_ready_retries_once() {
        let classifier = Arc::new(WarmingClassifier::new(1));
        let s = scorer(classifier.clone(), ScoreScale::TriState);
        assert_eq!(s.score("Guidance raised").await, 1.0);
        assert_eq!(classifier.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_not_ready_twice_falls_back_to_neutral() {
        let classifier = Arc::new(WarmingClassifier::new(5));
        let s = scorer(classifier.clone(), ScoreScale::Continuous);
        assert_eq!(s.score("Guidance raised").await, 5.0);
        assert_eq!(classifier.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_score_batch_preserves_order() {
        let s = scorer(Arc::new(KeywordClassifier), ScoreScale::TriState).with_concurrency(3);
        let records: Vec<HeadlineRecord> = [
            ("AAPL", "Stock soars on earnings beat"),
            ("MSFT", "Regulators open inquiry"),
            ("GOOG", "Annual meeting scheduled"),
            ("NVDA", "Shares soars again"),
        ]
        .iter()
        .map(|(sym, text)| HeadlineRecord::new(Symbol::new(sym), *text, NewsSource::Finnhub))
        .collect();

        let scored = s.score_batch(records).await;
        let symbols: Vec<&str> = scored.iter().map(|s| s.record.symbol.as_str()).collect();
        let scores: Vec<f64> = scored.iter().map(|s| s.score).collect();
        assert_eq!(symbols, vec!["AAPL", "MSFT", "GOOG", "NVDA"]);
        assert_eq!(scores, vec![1.0, -1.0, 0.0, 1.0]);
    }

    #[tokio::test]
    async fn test_score_batch_empty() {
        let s = scorer(Arc::new(KeywordClassifier), ScoreScale::TriState);
        assert!(s.score_batch(Vec::new()).await.is_empty());
    }
}
