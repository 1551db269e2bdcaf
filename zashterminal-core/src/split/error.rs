//! Error type for pane and tab operations

use super::types::{PaneId, TabId};

/// Errors that can occur while rearranging panes and tabs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PaneError {
    /// The pane is not in any tab.
    #[error("pane not found: {0}")]
    PaneNotFound(PaneId),

    /// The tab does not exist.
    #[error("tab not found: {0}")]
    TabNotFound(TabId),

    /// The pane is alone in its tab and cannot be detached.
    #[error("This is the only pane in the tab.")]
    OnlyPane,

    /// No terminal with this identifier is open.
    #[error("terminal not found: {0}")]
    TerminalNotFound(String),
}

/// Result type for pane operations
pub type PaneResult<T> = std::result::Result<T, PaneError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_pane_message_is_user_facing() {
        assert_eq!(PaneError::OnlyPane.to_string(), "This is the only pane in the tab.");
    }

    #[test]
    fn not_found_mentions_the_id() {
        let id = PaneId::new();
        assert!(PaneError::PaneNotFound(id).to_string().contains(&id.0.to_string()));
    }
}
