use thiserror::Error;

#[derive(Error, Debug)]
pub enum MLError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// The inference endpoint is still loading the model (HTTP 503)
    #[error("Model not loaded")]
    ModelNotLoaded,

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type MLResult<T> = Result<T, MLError>;
