//! Identifier types for tabs, panes and terminals

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::SessionType;

/// Unique identifier for a pane.
///
/// A pane keeps its ID while the tree around it is split or collapsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PaneId(pub Uuid);

impl PaneId {
    /// Creates a new random pane ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PaneId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PaneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pane({})", self.0)
    }
}

/// Unique identifier for a tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TabId(pub Uuid);

impl TabId {
    /// Creates a new random tab ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TabId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tab({})", self.0)
    }
}

/// How a split divides its space.
///
/// Named after `GtkOrientation`: a horizontal split puts the panes side by
/// side, a vertical one stacks them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaneOrientation {
    /// Side by side
    #[default]
    Horizontal,
    /// Stacked
    Vertical,
}

impl PaneOrientation {
    /// `"horizontal"` or `"vertical"`, as stored in layout files
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Horizontal => "horizontal",
            Self::Vertical => "vertical",
        }
    }
}

impl fmt::Display for PaneOrientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaneOrientation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "horizontal" => Ok(Self::Horizontal),
            "vertical" => Ok(Self::Vertical),
            other => Err(format!("unknown orientation: {other}")),
        }
    }
}

/// Lifecycle of the process behind a terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TerminalStatus {
    /// Spawned and running
    #[default]
    Running,
    /// The child process exited
    Exited,
    /// The spawn itself failed
    SpawnFailed,
}

/// What a pane is showing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminalRef {
    /// Terminal identifier shared with the widget layer
    pub terminal_id: String,
    /// Session name, or the title of an ad-hoc local terminal
    pub session_name: String,
    /// Local shell or SSH
    pub session_type: SessionType,
    /// Last working directory reported through OSC 7
    pub working_dir: Option<String>,
    /// Process state
    pub status: TerminalStatus,
    /// The SSH layer is retrying the connection
    pub auto_reconnect: bool,
}

impl TerminalRef {
    /// A running terminal with a fresh identifier
    #[must_use]
    pub fn new(session_name: impl Into<String>, session_type: SessionType) -> Self {
        Self {
            terminal_id: Uuid::new_v4().to_string(),
            session_name: session_name.into(),
            session_type,
            working_dir: None,
            status: TerminalStatus::Running,
            auto_reconnect: false,
        }
    }

    /// A local shell
    #[must_use]
    pub fn local(title: impl Into<String>) -> Self {
        Self::new(title, SessionType::Local)
    }

    /// An SSH session
    #[must_use]
    pub fn ssh(session_name: impl Into<String>) -> Self {
        Self::new(session_name, SessionType::Ssh)
    }

    /// Sets the working directory
    #[must_use]
    pub fn with_working_dir(mut self, dir: impl Into<String>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Still counts as open: running, or waiting for a reconnect
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.auto_reconnect || self.status == TerminalStatus::Running
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique() {
        assert_ne!(PaneId::new(), PaneId::new());
        assert_ne!(TabId::new(), TabId::new());
        assert_ne!(TerminalRef::local("a").terminal_id, TerminalRef::local("a").terminal_id);
    }

    #[test]
    fn orientation_strings() {
        assert_eq!("vertical".parse::<PaneOrientation>(), Ok(PaneOrientation::Vertical));
        assert_eq!(PaneOrientation::Horizontal.to_string(), "horizontal");
        assert!("diagonal".parse::<PaneOrientation>().is_err());
    }

    #[test]
    fn reconnecting_terminals_stay_live() {
        let mut t = TerminalRef::ssh("web");
        t.status = TerminalStatus::Exited;
        assert!(!t.is_live());
        t.auto_reconnect = true;
        assert!(t.is_live());
    }
}
