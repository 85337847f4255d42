use thiserror::Error;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("no API key configured")]
    MissingCredential,

    #[error("model request timed out after {ms}ms")]
    Timeout { ms: u64 },

    #[error("model endpoint returned {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("failed to move '{path}': {message}")]
    Move { path: String, message: String },

    #[error("invalid vault path: {0}")]
    InvalidPath(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("watcher error: {0}")]
    Watcher(String),

    #[error("a classification run is already in progress")]
    RunInProgress,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_message_carries_duration() {
        let err = AppError::Timeout { ms: 15_000 };
        assert!(err.to_string().contains("15000ms"));
    }

    #[test]
    fn upstream_message_carries_status_and_body() {
        let err = AppError::Upstream {
            status: 429,
            body: "quota exceeded".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("429"));
        assert!(text.contains("quota exceeded"));
    }
}
