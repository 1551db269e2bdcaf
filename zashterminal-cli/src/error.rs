//! CLI error types and exit codes.

/// Exit codes for CLI operations
pub mod exit_codes {
    /// Configuration, validation, I/O and other general failures
    pub const GENERAL_ERROR: i32 = 1;
    /// The named session, folder or layout does not exist
    pub const NOT_FOUND: i32 = 2;
}

/// CLI error type
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Session operation rejected
    #[error("Session error: {0}")]
    Session(String),

    /// Session not found
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// Folder not found
    #[error("Folder not found: {0}")]
    FolderNotFound(String),

    /// Layout error
    #[error("Layout error: {0}")]
    Layout(String),

    /// Invalid file manager URI
    #[error("Launch error: {0}")]
    Launch(String),

    /// Backup error
    #[error("Backup error: {0}")]
    Backup(String),

    /// Highlight error
    #[error("Highlight error: {0}")]
    Highlight(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<zashterminal_core::ConfigError> for CliError {
    fn from(err: zashterminal_core::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<zashterminal_core::StorageError> for CliError {
    fn from(err: zashterminal_core::StorageError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<zashterminal_core::LayoutError> for CliError {
    fn from(err: zashterminal_core::LayoutError) -> Self {
        Self::Layout(err.to_string())
    }
}

impl From<zashterminal_core::LaunchError> for CliError {
    fn from(err: zashterminal_core::LaunchError) -> Self {
        Self::Launch(err.to_string())
    }
}

impl From<zashterminal_core::BackupError> for CliError {
    fn from(err: zashterminal_core::BackupError) -> Self {
        Self::Backup(err.to_string())
    }
}

impl CliError {
    /// Returns the process exit code for this error.
    ///
    /// - 1: general error (configuration, validation, I/O)
    /// - 2: the named item does not exist
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::SessionNotFound(_) | Self::FolderNotFound(_) => exit_codes::NOT_FOUND,
            Self::Config(_)
            | Self::Session(_)
            | Self::Layout(_)
            | Self::Launch(_)
            | Self::Backup(_)
            | Self::Highlight(_)
            | Self::Io(_) => exit_codes::GENERAL_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_items_use_not_found_code() {
        assert_eq!(
            CliError::SessionNotFound("web".into()).exit_code(),
            exit_codes::NOT_FOUND
        );
        assert_eq!(
            CliError::FolderNotFound("/Work".into()).exit_code(),
            exit_codes::NOT_FOUND
        );
        assert_eq!(
            CliError::Config("bad".into()).exit_code(),
            exit_codes::GENERAL_ERROR
        );
    }
}
