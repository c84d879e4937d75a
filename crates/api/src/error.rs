use std::path::PathBuf;

use atelier_core::error::CoreError;

/// Application-level error type.
///
/// None of these ever reach the observer; callers log them and carry on,
/// except at bootstrap where they end the process.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `atelier_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A filesystem operation on one of the job files failed.
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A start request arrived while a job is running.
    #[error("A training job is already running")]
    AlreadyRunning,

    /// The trainer ignored the stop request for longer than the configured limit.
    #[error("Trainer did not stop within {secs}s")]
    StopTimedOut { secs: u64 },

    /// An environment variable held an unusable value.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl AppError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Convenience type alias for fallible application operations.
pub type AppResult<T> = Result<T, AppError>;
