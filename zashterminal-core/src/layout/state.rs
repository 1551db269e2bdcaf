//! Tabs saved on exit and offered again on the next start

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::node::LayoutNode;
use crate::config::atomic_write;
use crate::error::LayoutResult;
use crate::split::TabManagerModel;

/// `session_restore_policy` value that disables restoring
pub const RESTORE_NEVER: &str = "never";

/// `session_restore_policy` value that asks before restoring
pub const RESTORE_ASK: &str = "ask";

/// `session_restore_policy` value that restores silently
pub const RESTORE_ALWAYS: &str = "always";

/// Contents of `session_state.json`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SessionStateFile {
    /// One node per tab, in tab order
    #[serde(default)]
    pub tabs: Vec<LayoutNode>,
}

impl SessionStateFile {
    /// Captures every tab of the window
    #[must_use]
    pub fn from_tabs(tabs: &TabManagerModel) -> Self {
        Self {
            tabs: tabs
                .tabs()
                .iter()
                .map(|t| LayoutNode::from_tree(t.panes()))
                .collect(),
        }
    }

    /// Writes the state file
    ///
    /// # Errors
    /// I/O or serialization failures.
    pub fn save(&self, path: &Path) -> LayoutResult<()> {
        atomic_write(path, serde_json::to_string_pretty(self)?.as_bytes())?;
        tracing::info!(tabs = self.tabs.len(), "Session state saved");
        Ok(())
    }

    /// `true` if a state file exists and the policy allows restoring it
    #[must_use]
    pub fn is_pending(path: &Path, policy: &str) -> bool {
        policy != RESTORE_NEVER && path.exists()
    }

    /// Reads the saved tabs for restoring.
    ///
    /// With the `never` policy, or without a file, the file is removed and
    /// `None` returned. A file without tabs is left alone. After a
    /// successful read the file is removed so it is restored only once.
    ///
    /// # Errors
    /// The file exists but cannot be read or parsed.
    pub fn take(path: &Path, policy: &str) -> LayoutResult<Option<Self>> {
        if !Self::is_pending(path, policy) {
            Self::clear(path);
            return Ok(None);
        }
        let state: Self = serde_json::from_str(&fs::read_to_string(path)?)?;
        if state.tabs.is_empty() {
            return Ok(None);
        }
        tracing::info!(tabs = state.tabs.len(), "Restoring tabs from previous session");
        Self::clear(path);
        Ok(Some(state))
    }

    /// Removes the state file; a missing file is not an error
    pub fn clear(path: &Path) {
        if path.exists() {
            match fs::remove_file(path) {
                Ok(()) => tracing::info!("Session state file removed"),
                Err(e) => tracing::error!(error = %e, "Failed to remove session state file"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::split::TerminalRef;
    use tempfile::TempDir;

    fn saved(dir: &TempDir) -> std::path::PathBuf {
        let mut tabs = TabManagerModel::new();
        tabs.add_tab(TerminalRef::local("Local"), None);
        let path = dir.path().join("session_state.json");
        SessionStateFile::from_tabs(&tabs).save(&path).unwrap();
        path
    }

    #[test]
    fn never_policy_discards_state() {
        let dir = TempDir::new().unwrap();
        let path = saved(&dir);
        assert!(!SessionStateFile::is_pending(&path, RESTORE_NEVER));
        assert_eq!(SessionStateFile::take(&path, RESTORE_NEVER).unwrap(), None);
        assert!(!path.exists());
    }

    #[test]
    fn restore_happens_once() {
        let dir = TempDir::new().unwrap();
        let path = saved(&dir);
        assert!(SessionStateFile::is_pending(&path, RESTORE_ASK));
        let state = SessionStateFile::take(&path, RESTORE_ALWAYS).unwrap().unwrap();
        assert_eq!(state.tabs.len(), 1);
        assert!(!path.exists());
        assert_eq!(SessionStateFile::take(&path, RESTORE_ALWAYS).unwrap(), None);
    }

    #[test]
    fn empty_state_is_not_restored() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("session_state.json");
        fs::write(&path, r#"{"tabs": []}"#).unwrap();
        assert_eq!(SessionStateFile::take(&path, RESTORE_ALWAYS).unwrap(), None);
        fs::write(&path, "{broken").unwrap();
        assert!(SessionStateFile::take(&path, RESTORE_ALWAYS).is_err());
    }
}
