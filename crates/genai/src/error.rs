use thiserror::Error;

pub type GenAiResult<T> = Result<T, GenAiError>;

#[derive(Debug, Error)]
pub enum GenAiError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("model API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("model returned no usable content: {0}")]
    EmptyResponse(String),

    #[error("request blocked by the model provider: {0}")]
    Blocked(String),

    #[error("model output did not match the expected shape: {0}")]
    InvalidOutput(String),

    #[error("audio encoding failed: {0}")]
    Audio(String),

    #[error("invalid base64 payload: {0}")]
    Decode(#[from] base64::DecodeError),
}
