//! Error types for the Percept library.
//!
//! Every initialization and inference failure carries the identifying tag of
//! the task it came from, so a host application multiplexing several adapters
//! can attribute failures without extra bookkeeping.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for Percept operations.
#[derive(Debug, Error)]
pub enum PerceptError {
    // Resource resolution errors
    #[error("Resolution failed for {path:?}: {message}")]
    Resolution {
        message: String,
        /// The source path or URI that failed to resolve.
        path: Option<PathBuf>,
    },

    #[error("Download failed for {url}: {message}")]
    DownloadFailed { url: String, message: String },

    #[error("Hash mismatch: expected {expected}, got {actual}")]
    HashMismatch { expected: String, actual: String },

    // Module lifecycle errors
    #[error("{task}: initialization failed: {message}")]
    InitializationFailed { task: &'static str, message: String },

    #[error("{task}: not initialized (call initialize first)")]
    NotInitialized { task: &'static str },

    // Inference errors
    #[error("{task}: inference failed: {message}")]
    Inference { task: &'static str, message: String },

    // Session errors
    #[error("Session {id} is closed")]
    SessionClosed { id: String },

    #[error("Session {id} was created without vision modality")]
    VisionModalityDisabled { id: String },

    // File system errors
    #[error("IO error at {path:?}: {message}")]
    Io {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    // Network errors
    #[error("Network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<reqwest::Error>,
    },

    // Serialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    // Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    // Generic errors
    #[error("{0}")]
    Other(String),
}

/// Result type alias for Percept operations.
pub type Result<T> = std::result::Result<T, PerceptError>;

// Conversion implementations for common error types

impl From<std::io::Error> for PerceptError {
    fn from(err: std::io::Error) -> Self {
        PerceptError::Io {
            message: err.to_string(),
            path: None,
            source: Some(err),
        }
    }
}

impl From<reqwest::Error> for PerceptError {
    fn from(err: reqwest::Error) -> Self {
        PerceptError::Network {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<serde_json::Error> for PerceptError {
    fn from(err: serde_json::Error) -> Self {
        PerceptError::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl PerceptError {
    /// Create an IO error with path context.
    pub fn io_with_path(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        PerceptError::Io {
            message: err.to_string(),
            path: Some(path.into()),
            source: Some(err),
        }
    }

    /// Create a resolution error with the failing path or URI.
    pub fn resolution(message: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        PerceptError::Resolution {
            message: message.into(),
            path: Some(path.into()),
        }
    }

    /// Wrap any error as an initialization failure for the given task.
    ///
    /// Both resolution failures and engine construction failures funnel
    /// through here so the caller sees a single error kind per the contract.
    pub fn init_failed(task: &'static str, err: impl std::fmt::Display) -> Self {
        PerceptError::InitializationFailed {
            task,
            message: err.to_string(),
        }
    }

    /// Wrap an engine failure as an inference error for the given task.
    pub fn inference(task: &'static str, err: impl std::fmt::Display) -> Self {
        PerceptError::Inference {
            task,
            message: err.to_string(),
        }
    }

    /// True for errors that indicate API misuse rather than an environment
    /// or engine problem.
    pub fn is_usage_error(&self) -> bool {
        matches!(
            self,
            PerceptError::NotInitialized { .. }
                | PerceptError::SessionClosed { .. }
                | PerceptError::VisionModalityDisabled { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PerceptError::NotInitialized {
            task: "TextClassifier",
        };
        assert_eq!(
            err.to_string(),
            "TextClassifier: not initialized (call initialize first)"
        );
    }

    #[test]
    fn test_init_failed_carries_task_tag() {
        let err = PerceptError::init_failed("ObjectDetector", "bad model format");
        assert_eq!(
            err.to_string(),
            "ObjectDetector: initialization failed: bad model format"
        );
    }

    #[test]
    fn test_usage_errors() {
        assert!(PerceptError::NotInitialized { task: "t" }.is_usage_error());
        assert!(PerceptError::SessionClosed { id: "s".into() }.is_usage_error());
        assert!(!PerceptError::Config {
            message: "x".into()
        }
        .is_usage_error());
    }

    #[test]
    fn test_io_with_path_preserves_source() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = PerceptError::io_with_path(io, "/tmp/x");
        match err {
            PerceptError::Io { path, source, .. } => {
                assert_eq!(path, Some(PathBuf::from("/tmp/x")));
                assert!(source.is_some());
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }
}
