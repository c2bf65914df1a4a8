use async_trait::async_trait;

use crate::error::MLResult;
use crate::sentiment::{ClassProbabilities, FinBertClient};

/// Backend-agnostic interface for three-class sentiment inference.
///
/// Implemented by the hosted FinBERT client; tests plug in scripted classifiers.
#[async_trait]
pub trait SentimentClassifier: Send + Sync {
    async fn classify(&self, text: &str) -> MLResult<ClassProbabilities>;

    fn backend_name(&self) -> &'static str;
}

#[async_trait]
impl SentimentClassifier for FinBertClient {
    async fn classify(&self, text: &str) -> MLResult<ClassProbabilities> {
        FinBertClient::classify(self, text).await
    }

    fn backend_name(&self) -> &'static str {
        "http"
    }
}
