use thiserror::Error;

/// Failures while loading configuration or resolving paths.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("cannot resolve path: {0}")]
    Path(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("config file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

pub type CoreResult<T> = Result<T, CoreError>;
