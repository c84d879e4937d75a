#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Malformed progress line: {0}")]
    MalformedProgress(String),

    #[error("Output sink is empty")]
    EmptySink,

    #[error("Invalid observer message: {0}")]
    InvalidMessage(String),

    #[error("Unsupported platform: {0}")]
    UnsupportedPlatform(String),
}
