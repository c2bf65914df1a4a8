use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum ScreenerError {
    #[error("API error: {0}")]
    ApiError(String),

    /// The provider answered, but with an error payload (bad key, quota, ...).
    #[error("Provider error: {0}")]
    ProviderError(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Insufficient data: {0}")]
    InsufficientData(String),
}

pub type ScreenerResult<T> = Result<T, ScreenerError>;
