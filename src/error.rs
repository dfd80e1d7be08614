use thiserror::Error;

#[derive(Error, Debug)]
pub enum VisionError {
    #[error("config error: {0}")]
    Config(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("file not found: {0}")]
    NotFound(String),

    #[error("image too large: {0}")]
    TooLarge(String),

    #[error("download timed out after {0} ms")]
    Timeout(u64),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("Kimi API error: {0}")]
    RemoteApi(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, VisionError>;
