use serde::{Deserialize, Serialize};
use std::time::Duration;
use crate::error::{MLError, MLResult};

/// Hosted FinBERT (ProsusAI) on the Hugging Face inference API
pub const DEFAULT_FINBERT_URL: &str =
    "https://api-inference.huggingface.co/models/ProsusAI/finbert";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SentimentLabel {
    Positive,
    Negative,
    Neutral,
}

impl SentimentLabel {
    /// Case-insensitive label match. Unrecognized labels yield `None`.
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "positive" => Some(SentimentLabel::Positive),
            "negative" => Some(SentimentLabel::Negative),
            "neutral" => Some(SentimentLabel::Neutral),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelScore {
    pub label: String,
    pub score: f64,
}

/// Class probabilities from a three-class classifier
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ClassProbabilities {
    pub positive: f64,
    pub negative: f64,
    pub neutral: f64,
}

impl ClassProbabilities {
    pub fn new(positive: f64, negative: f64, neutral: f64) -> Self {
        Self {
            positive,
            negative,
            neutral,
        }
    }

    /// Collect `{label, score}` pairs. Labels that are missing count as 0;
    /// a list with no recognized label at all is an invalid response.
    pub fn from_label_scores(scores: &[LabelScore]) -> MLResult<Self> {
        let mut probs = Self::default();
        let mut recognized = 0;

        for entry in scores {
            match SentimentLabel::parse(&entry.label) {
                Some(SentimentLabel::Positive) => probs.positive = entry.score,
                Some(SentimentLabel::Negative) => probs.negative = entry.score,
                Some(SentimentLabel::Neutral) => probs.neutral = entry.score,
                None => continue,
            }
            recognized += 1;
        }

        if recognized == 0 {
            return Err(MLError::InvalidResponse(
                "no sentiment labels in classifier output".to_string(),
            ));
        }

        Ok(probs)
    }

    /// Most likely label. Ties resolve toward neutral.
    pub fn top_label(&self) -> SentimentLabel {
        if self.positive > self.negative && self.positive > self.neutral {
            SentimentLabel::Positive
        } else if self.negative > self.positive && self.negative > self.neutral {
            SentimentLabel::Negative
        } else {
            SentimentLabel::Neutral
        }
    }
}

#[derive(Debug, Clone, Serialize)]
struct InferenceRequest<'a> {
    inputs: &'a str,
}

/// The inference API answers either `[[{label, score}, ..]]` or `[{label, score}, ..]`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum InferenceResponse {
    Nested(Vec<Vec<LabelScore>>),
    Flat(Vec<LabelScore>),
}

/// Parse a raw inference response body.
pub fn parse_inference_response(body: &str) -> MLResult<ClassProbabilities> {
    let parsed: InferenceResponse = serde_json::from_str(body)?;

    let scores = match parsed {
        InferenceResponse::Nested(batches) => batches.into_iter().next().unwrap_or_default(),
        InferenceResponse::Flat(scores) => scores,
    };

    ClassProbabilities::from_label_scores(&scores)
}

#[derive(Clone)]
pub struct FinBertClient {
    client: reqwest::Client,
    url: String,
    api_token: Option<String>,
}

impl FinBertClient {
    pub fn new(url: String, api_token: Option<String>, timeout: Duration) -> MLResult<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            url,
            api_token,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Classify a single headline
    pub async fn classify(&self, text: &str) -> MLResult<ClassProbabilities> {
        let mut request = self
            .client
            .post(&self.url)
            .header(reqwest::header::ACCEPT, "application/json")
            .json(&InferenceRequest { inputs: text });

        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;

        let status = response.status();
        if status == reqwest::StatusCode::SERVICE_UNAVAILABLE {
            return Err(MLError::ModelNotLoaded);
        }
        if !status.is_success() {
            return Err(MLError::ServiceUnavailable(format!("Status: {}", status)));
        }

        let body = response.text().await?;
        parse_inference_response(&body)
    }
}
