//! Error types for the `Zashterminal` GUI application
//!
//! Startup and state errors are typed so the activation handler can show a
//! meaningful dialog instead of a bare string.

use thiserror::Error;
use zashterminal_core::error::{ConfigError, LayoutError, StorageError};

/// Errors that can occur while building or using the application state
#[derive(Debug, Error)]
pub enum AppStateError {
    /// Failed to initialize a manager component
    #[error("Failed to initialize {component}: {reason}")]
    InitializationFailed {
        /// The component that failed to initialize
        component: &'static str,
        /// The reason for failure
        reason: String,
    },

    /// Session not found by name and folder
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Session file error
    #[error("Session storage error: {0}")]
    StorageError(String),

    /// Layout file error
    #[error("Layout error: {0}")]
    LayoutError(String),

    /// Terminal could not be started
    #[error("Failed to start terminal: {0}")]
    SpawnFailed(String),
}

/// Result type alias for application state operations
pub type AppStateResult<T> = Result<T, AppStateError>;

impl From<std::io::Error> for AppStateError {
    fn from(err: std::io::Error) -> Self {
        Self::ConfigError(err.to_string())
    }
}

impl From<ConfigError> for AppStateError {
    fn from(err: ConfigError) -> Self {
        Self::ConfigError(err.to_string())
    }
}

impl From<StorageError> for AppStateError {
    fn from(err: StorageError) -> Self {
        Self::StorageError(err.to_string())
    }
}

impl From<LayoutError> for AppStateError {
    fn from(err: LayoutError) -> Self {
        Self::LayoutError(err.to_string())
    }
}
