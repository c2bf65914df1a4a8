pub mod error;
pub mod provider;
pub mod scorer;
pub mod sentiment;

pub use error::{MLError, MLResult};
pub use provider::SentimentClassifier;
pub use scorer::{map_to_scale, SentimentScorer};
pub use sentiment::{ClassProbabilities, FinBertClient, SentimentLabel, DEFAULT_FINBERT_URL};

use std::time::Duration;

/// Configuration for the sentiment inference endpoint
#[derive(Debug, Clone)]
pub struct MLConfig {
    pub finbert_url: String,
    pub api_token: Option<String>,
    pub timeout: Duration,
}

impl Default for MLConfig {
    fn default() -> Self {
        Self {
            finbert_url: DEFAULT_FINBERT_URL.to_string(),
            api_token: None,
            timeout: Duration::from_secs(15),
        }
    }
}

impl MLConfig {
    pub fn build_client(&self) -> MLResult<FinBertClient> {
        FinBertClient::new(self.finbert_url.clone(), self.api_token.clone(), self.timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use screener_core::ScoreScale;
    use std::sync::Arc;

    #[test]
    fn test_default_config() {
        let config = MLConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(15));
        assert_eq!(config.finbert_url, DEFAULT_FINBERT_URL);
        assert!(config.api_token.is_none());
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_scores_neutral() {
        // Nothing listens on the discard port locally
        let config = MLConfig {
            finbert_url: "http://127.0.0.1:9/models/finbert".to_string(),
            api_token: Some("hf_test".to_string()),
            timeout: Duration::from_secs(2),
        };
        let client = config.build_client().unwrap();
        let scorer = SentimentScorer::new(Arc::new(client), ScoreScale::TriState)
            .with_retry_delay(Duration::from_millis(1));

        assert_eq!(scorer.score("Stock soars on earnings beat").await, 0.0);
    }
}
