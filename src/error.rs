use thiserror::Error;

/// Failures of the indicator evaluation itself.
///
/// Both variants are recoverable from the caller's point of view: the window
/// is skipped and the next scheduled cycle tries again.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("insufficient data: {required} candles required, {available} available")]
    InsufficientData { required: usize, available: usize },
    #[error("data integrity violation: {0}")]
    DataIntegrity(String),
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("api returned status {status}: {body}")]
    Api { status: u16, body: String },
    #[error("json parse error: {0}")]
    JsonParse(String),
    #[error("failed to parse number from {0:?}")]
    FloatStringParse(String),
    #[error("asset {0} not found")]
    AssetNotFound(String),
    #[error("telegram error: {0}")]
    Telegram(String),
    #[error("config error: {0}")]
    Config(String),
    #[error("render error: {0}")]
    Render(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Eval(#[from] EvalError),
}

pub type Result<T> = std::result::Result<T, Error>;
