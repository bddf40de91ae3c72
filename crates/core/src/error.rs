//! Error types for eeu-core
//!
//! Provides a unified error type that can be converted to appropriate exit codes.

use thiserror::Error;

use crate::asset::TaskState;

/// Result type alias for eeu-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for eeu-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid asset path, URI or request shape
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Profile not found
    #[error("Profile not found: {0}")]
    ProfileNotFound(String),

    /// Profile already exists
    #[error("Profile already exists: {0}")]
    ProfileExists(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// TOML serialization error
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parsing error
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Authentication error
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Network error (retryable)
    #[error("Network error: {0}")]
    Network(String),

    /// Conflict error
    #[error("Conflict: {0}")]
    Conflict(String),

    /// A task ended in a failed or cancelled state
    #[error("Task {task} ended with state {state}{}", task_message_suffix(.message))]
    TaskFailed {
        task: String,
        state: TaskState,
        message: Option<String>,
    },

    /// Tasks did not finish in time
    #[error("Timed out: {0}")]
    Timeout(String),

    /// General error
    #[error("{0}")]
    General(String),
}

fn task_message_suffix(message: &Option<String>) -> String {
    message
        .as_deref()
        .map(|m| format!(": {m}"))
        .unwrap_or_default()
}

impl Error {
    /// Get the appropriate exit code for this error
    pub const fn exit_code(&self) -> i32 {
        match self {
            Error::InvalidPath(_) => 2,                          // UsageError
            Error::Config(_) => 2,                               // UsageError
            Error::Network(_) => 3,                              // NetworkError
            Error::Auth(_) => 4,                                 // AuthError
            Error::NotFound(_) | Error::ProfileNotFound(_) => 5, // NotFound
            Error::Conflict(_) | Error::ProfileExists(_) => 6,   // Conflict
            Error::TaskFailed { .. } => 7,                       // TaskFailed
            Error::Timeout(_) => 8,                              // Timeout
            _ => 1,                                              // GeneralError
        }
    }

    /// Whether this error means the remote resource does not exist
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_exit_codes() {
        assert_eq!(Error::InvalidPath("test".into()).exit_code(), 2);
        assert_eq!(Error::Config("test".into()).exit_code(), 2);
        assert_eq!(Error::Network("test".into()).exit_code(), 3);
        assert_eq!(Error::Auth("test".into()).exit_code(), 4);
        assert_eq!(Error::NotFound("test".into()).exit_code(), 5);
        assert_eq!(Error::ProfileNotFound("test".into()).exit_code(), 5);
        assert_eq!(Error::Conflict("test".into()).exit_code(), 6);
        assert_eq!(Error::ProfileExists("test".into()).exit_code(), 6);
        assert_eq!(Error::Timeout("test".into()).exit_code(), 8);
        assert_eq!(Error::General("test".into()).exit_code(), 1);
    }

    #[test]
    fn test_task_failed_display() {
        let err = Error::TaskFailed {
            task: "ABC123".into(),
            state: TaskState::Failed,
            message: Some("Invalid GeoTIFF".into()),
        };
        assert_eq!(err.exit_code(), 7);
        assert_eq!(
            err.to_string(),
            "Task ABC123 ended with state FAILED: Invalid GeoTIFF"
        );

        let err = Error::TaskFailed {
            task: "ABC123".into(),
            state: TaskState::Cancelled,
            message: None,
        };
        assert_eq!(err.to_string(), "Task ABC123 ended with state CANCELLED");
    }

    #[test]
    fn test_error_display() {
        let err = Error::ProfileNotFound("work".into());
        assert_eq!(err.to_string(), "Profile not found: work");

        let err = Error::InvalidPath("gs://other/x".into());
        assert_eq!(err.to_string(), "Invalid path: gs://other/x");
        assert!(!err.is_not_found());
        assert!(Error::NotFound("x".into()).is_not_found());
    }
}
