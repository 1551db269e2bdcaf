//! Error types for the Zashterminal core library
//!
//! Each concern gets its own typed error so callers can match on what went
//! wrong instead of inspecting strings. GUI code usually logs these and shows
//! the `Display` text in a dialog or toast.

use std::path::PathBuf;

use thiserror::Error;

/// Errors from the settings store and color scheme registry
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Underlying filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Settings or scheme file could not be (de)serialized
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A value was rejected by a validator
    #[error("Invalid value for setting '{key}': {message}")]
    Validation {
        /// Dotted settings key
        key: String,
        /// The rejected value
        value: serde_json::Value,
        /// Human readable reason
        message: String,
    },

    /// The settings document as a whole failed validation
    #[error("Settings validation failed: {}", .0.join("; "))]
    InvalidSettings(Vec<String>),

    /// No scheme with this name exists
    #[error("Unknown color scheme: {0}")]
    UnknownScheme(String),

    /// Built-in schemes are read-only
    #[error("Built-in color scheme '{0}' cannot be modified")]
    BuiltinScheme(String),
}

impl ConfigError {
    /// Builds a validation error for `key`
    pub fn validation(
        key: impl Into<String>,
        value: serde_json::Value,
        message: impl Into<String>,
    ) -> Self {
        Self::Validation {
            key: key.into(),
            value,
            message: message.into(),
        }
    }
}

/// Result type alias for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors from the sessions file
#[derive(Debug, Error)]
pub enum StorageError {
    /// File exists but could not be read
    #[error("Failed to read {path}: {reason}")]
    Read {
        /// File path
        path: PathBuf,
        /// Reason for failure
        reason: String,
    },

    /// File content is not a valid sessions document
    #[error("Storage file {path} is corrupted: {reason}")]
    Corrupted {
        /// File path
        path: PathBuf,
        /// Reason for failure
        reason: String,
    },

    /// Writing the file failed
    #[error("Failed to write {path}: {reason}")]
    Write {
        /// File path
        path: PathBuf,
        /// Reason for failure
        reason: String,
    },
}

/// Result type alias for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// A session or folder failed model validation
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Validation failed for '{name}': {}", .errors.join(", "))]
pub struct SessionValidationError {
    /// Name of the offending item
    pub name: String,
    /// Individual validation messages
    pub errors: Vec<String>,
}

impl SessionValidationError {
    /// Creates a validation error with a single message
    pub fn single(name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            errors: vec![error.into()],
        }
    }
}

/// Errors from saved layouts and the session state file
#[derive(Debug, Error)]
pub enum LayoutError {
    /// Underlying filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Layout JSON could not be parsed or written
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// No layout file for this name
    #[error("Layout not found: {0}")]
    NotFound(String),

    /// A layout has no tabs to restore
    #[error("Layout '{0}' contains no tabs")]
    Empty(String),
}

/// Result type alias for layout operations
pub type LayoutResult<T> = Result<T, LayoutError>;

/// Errors from highlight rule management
#[derive(Debug, Error)]
pub enum HighlightError {
    /// Underlying filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Rule file could not be parsed or written
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Pattern is empty or does not compile
    #[error("Invalid pattern '{pattern}': {reason}")]
    InvalidPattern {
        /// The offending pattern
        pattern: String,
        /// Compiler message
        reason: String,
    },

    /// No context with this command name
    #[error("Highlight context not found: {0}")]
    ContextNotFound(String),

    /// A context with this command name already exists
    #[error("Highlight context already exists: {0}")]
    ContextExists(String),

    /// Rule index out of range
    #[error("Rule index {index} out of range (have {len})")]
    RuleIndex {
        /// Requested index
        index: usize,
        /// Number of rules
        len: usize,
    },
}

/// Result type alias for highlight operations
pub type HighlightResult<T> = Result<T, HighlightError>;

/// Errors from the AI assistant backend
#[derive(Debug, Error)]
pub enum AiError {
    /// Required provider settings are missing
    #[error("AI assistant is not configured (missing: {})", .0.join(", "))]
    MissingConfiguration(Vec<String>),

    /// Provider returned a non-success status
    #[error("HTTP {status}: {message}")]
    Http {
        /// HTTP status code
        status: u16,
        /// Provider error message or raw body
        message: String,
    },

    /// Request could not be sent or the stream broke
    #[error("Network error: {0}")]
    Network(String),

    /// Provider response did not have the expected shape
    #[error("Unexpected response: {0}")]
    Parse(String),

    /// Provider returned no content
    #[error("The AI provider returned an empty response")]
    EmptyResponse,

    /// Conversation history could not be persisted
    #[error("History I/O error: {0}")]
    History(#[from] std::io::Error),
}

impl From<reqwest::Error> for AiError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network(err.to_string())
    }
}

/// Result type alias for AI operations
pub type AiResult<T> = Result<T, AiError>;

/// Errors from the system keyring
#[derive(Debug, Error)]
pub enum SecretError {
    /// `secret-tool` is not installed
    #[error("Secret backend unavailable: {0}")]
    BackendUnavailable(String),

    /// `secret-tool` could not be spawned or talked to
    #[error("libsecret error: {0}")]
    LibSecret(String),

    /// Storing a secret failed
    #[error("Failed to store secret: {0}")]
    StoreFailed(String),

    /// Clearing a secret failed
    #[error("Failed to delete secret: {0}")]
    DeleteFailed(String),
}

/// Result type alias for keyring operations
pub type SecretResult<T> = Result<T, SecretError>;

/// Errors from configuration backups
#[derive(Debug, Error)]
pub enum BackupError {
    /// Underlying filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Archive could not be read or written
    #[error("Archive error: {0}")]
    Archive(String),

    /// Archive entry would escape the config directory
    #[error("Refusing to extract unsafe path: {0}")]
    UnsafePath(String),

    /// Archive does not look like a Zashterminal backup
    #[error("Backup contains no configuration files")]
    Empty,
}

impl From<zip::result::ZipError> for BackupError {
    fn from(err: zip::result::ZipError) -> Self {
        Self::Archive(err.to_string())
    }
}

/// Result type alias for backup operations
pub type BackupResult<T> = Result<T, BackupError>;

/// Errors from command-line launch arguments and file-manager URIs
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LaunchError {
    /// Option requires a value
    #[error("Option '{0}' requires a value")]
    MissingValue(String),

    /// Unrecognized option
    #[error("Unknown argument: {0}")]
    UnknownArgument(String),

    /// `--ssh` target is malformed
    #[error("Invalid SSH target: {0}")]
    InvalidSshTarget(String),

    /// Remote URI without a host
    #[error("URI has no host: {0}")]
    MissingHost(String),

    /// URI scheme is neither local nor ssh/sftp
    #[error("Unsupported URI scheme: {0}")]
    UnsupportedScheme(String),

    /// URI could not be parsed
    #[error("Invalid URI: {0}")]
    InvalidUri(String),
}

/// Result type alias for launch argument parsing
pub type LaunchResult<T> = Result<T, LaunchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_mentions_key() {
        let err = ConfigError::validation("transparency", serde_json::json!(150), "out of range");
        assert_eq!(
            err.to_string(),
            "Invalid value for setting 'transparency': out of range"
        );
    }

    #[test]
    fn ai_http_error_format() {
        let err = AiError::Http {
            status: 401,
            message: "Invalid API key".into(),
        };
        assert_eq!(err.to_string(), "HTTP 401: Invalid API key");
    }

    #[test]
    fn session_validation_joins_messages() {
        let err = SessionValidationError {
            name: "web".into(),
            errors: vec!["Host is required for SSH sessions.".into(), "bad port".into()],
        };
        assert_eq!(
            err.to_string(),
            "Validation failed for 'web': Host is required for SSH sessions., bad port"
        );
    }
}
