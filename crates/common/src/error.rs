//! Error types shared across Clipforge crates.

use std::path::PathBuf;

/// Top-level error type for Clipforge operations.
#[derive(Debug, thiserror::Error)]
pub enum ClipforgeError {
    #[error("Invalid configuration: {message}")]
    InvalidConfiguration { message: String },

    #[error("Invalid duration: {message}")]
    InvalidDuration { message: String },

    #[error("Engine failure: {diagnostic}")]
    EngineFailure { diagnostic: String },

    #[error("Probe failure: {message}")]
    ProbeFailure { message: String },

    #[error("Fetch failure: {message}")]
    FetchFailure { message: String },

    #[error("Configuration file error: {message}")]
    Config { message: String },

    #[error("File not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    #[error("Unsupported operation: {message}")]
    Unsupported { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using ClipforgeError.
pub type ClipforgeResult<T> = Result<T, ClipforgeError>;

impl ClipforgeError {
    pub fn invalid_configuration(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            message: msg.into(),
        }
    }

    pub fn invalid_duration(msg: impl Into<String>) -> Self {
        Self::InvalidDuration {
            message: msg.into(),
        }
    }

    pub fn engine(diagnostic: impl Into<String>) -> Self {
        Self::EngineFailure {
            diagnostic: diagnostic.into(),
        }
    }

    pub fn probe(msg: impl Into<String>) -> Self {
        Self::ProbeFailure {
            message: msg.into(),
        }
    }

    pub fn fetch(msg: impl Into<String>) -> Self {
        Self::FetchFailure {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported {
            message: msg.into(),
        }
    }

    /// Whether this error was caused by bad caller input rather than a
    /// collaborator failing at runtime.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidConfiguration { .. } | Self::InvalidDuration { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_carries_message() {
        let err = ClipforgeError::engine("exit status 1: broken pipe");
        assert_eq!(
            err.to_string(),
            "Engine failure: exit status 1: broken pipe"
        );
    }

    #[test]
    fn test_input_error_classification() {
        assert!(ClipforgeError::invalid_configuration("speed").is_input_error());
        assert!(ClipforgeError::invalid_duration("NaN").is_input_error());
        assert!(!ClipforgeError::probe("no output").is_input_error());
        assert!(!ClipforgeError::engine("boom").is_input_error());
    }
}
