use thiserror::Error;

#[derive(Error, Debug)]
pub enum SubsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid root directory: {0}")]
    InvalidRoot(String),

    #[error("Transcription failed: {0}")]
    Transcription(String),

    #[error("Malformed segment: {0}")]
    MalformedSegment(String),

    #[error("Subtitle parse error: {0}")]
    SubtitleParse(String),

    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("Render failed: {0}")]
    Render(String),

    #[error("Media processing error: {0}")]
    Media(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Timed out after {0:?}")]
    Timeout(std::time::Duration),
}

pub type Result<T> = std::result::Result<T, SubsError>;
