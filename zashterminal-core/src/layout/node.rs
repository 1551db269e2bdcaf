//! Serialized pane trees
//!
//! Layout files and the session state file describe each tab as a tree of
//! nodes:
//!
//! ```json
//! {"type": "paned", "orientation": "horizontal", "position_ratio": 0.5,
//!  "child1": {"type": "terminal", "session_type": "local", "session_name": "Local", "working_dir": "/tmp"},
//!  "child2": {"type": "terminal", "session_type": "ssh", "session_name": "web", "working_dir": null}}
//! ```

use serde::{Deserialize, Serialize};

use crate::models::{SessionItem, SessionType};
use crate::split::{PaneNode, PaneOrientation, PaneTree, TerminalRef, clamp_ratio};

/// One node of a saved tab
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum LayoutNode {
    /// A single terminal
    Terminal {
        /// Local shell or SSH
        #[serde(default = "default_session_type")]
        session_type: SessionType,
        /// Session to reopen, or the title of a plain local shell
        #[serde(default = "default_terminal_name")]
        session_name: String,
        /// Directory to return to
        #[serde(default)]
        working_dir: Option<String>,
    },
    /// Two children split at `position_ratio`
    Paned {
        /// Side by side or stacked
        orientation: PaneOrientation,
        /// Share of the first child
        #[serde(default = "default_ratio")]
        position_ratio: f64,
        /// First child
        child1: Box<LayoutNode>,
        /// Second child. A split without one is restored as its first child.
        #[serde(default)]
        child2: Option<Box<LayoutNode>>,
    },
}

const fn default_session_type() -> SessionType {
    SessionType::Local
}

fn default_terminal_name() -> String {
    "Terminal".to_string()
}

const fn default_ratio() -> f64 {
    crate::split::DEFAULT_SPLIT_RATIO
}

impl LayoutNode {
    /// Serializes a pane tree
    #[must_use]
    pub fn from_pane_node(node: &PaneNode) -> Self {
        match node {
            PaneNode::Leaf(leaf) => Self::Terminal {
                session_type: leaf.terminal.session_type,
                session_name: leaf.terminal.session_name.clone(),
                working_dir: leaf.terminal.working_dir.clone(),
            },
            PaneNode::Split {
                orientation,
                first,
                second,
                ratio,
            } => Self::Paned {
                orientation: *orientation,
                position_ratio: *ratio,
                child1: Box::new(Self::from_pane_node(first)),
                child2: Some(Box::new(Self::from_pane_node(second))),
            },
        }
    }

    /// Serializes the panes of a tab
    #[must_use]
    pub fn from_tree(tree: &PaneTree) -> Self {
        Self::from_pane_node(tree.root())
    }

    /// Number of terminals in this subtree, after collapsing one-sided splits
    #[must_use]
    pub fn terminal_count(&self) -> usize {
        match self {
            Self::Terminal { .. } => 1,
            Self::Paned { child1, child2, .. } => {
                child1.terminal_count() + child2.as_ref().map_or(0, |c| c.terminal_count())
            }
        }
    }

    /// Builds the pane tree for this node, resolving session names against
    /// `sessions`. Every terminal gets a matching [`RestoredTerminal`] in
    /// `launches`, keyed by its terminal id.
    pub fn restore(
        &self,
        sessions: &[SessionItem],
        launches: &mut Vec<RestoredTerminal>,
    ) -> PaneNode {
        match self {
            Self::Terminal {
                session_type,
                session_name,
                working_dir,
            } => {
                let restored = RestoredTerminal::resolve(
                    *session_type,
                    session_name,
                    working_dir.as_deref(),
                    sessions,
                );
                let leaf = crate::split::PaneLeaf::new(restored.terminal.clone());
                launches.push(restored);
                PaneNode::Leaf(leaf)
            }
            Self::Paned {
                orientation,
                position_ratio,
                child1,
                child2,
            } => {
                let first = child1.restore(sessions, launches);
                match child2 {
                    Some(second) => PaneNode::split(
                        *orientation,
                        first,
                        second.restore(sessions, launches),
                        clamp_ratio(*position_ratio),
                    ),
                    None => first,
                }
            }
        }
    }

    /// [`restore`](Self::restore) into a whole tab
    #[must_use]
    pub fn restore_tree(&self, sessions: &[SessionItem]) -> (PaneTree, Vec<RestoredTerminal>) {
        let mut launches = Vec::new();
        let root = self.restore(sessions, &mut launches);
        (PaneTree::from_root(root), launches)
    }
}

/// How to start one terminal of a restored layout
#[derive(Debug, Clone, PartialEq)]
pub struct RestoredTerminal {
    /// Pane contents
    pub terminal: TerminalRef,
    /// Saved session backing the terminal, if it still exists
    pub session: Option<SessionItem>,
    /// Command typed into the remote shell after login
    pub initial_command: Option<String>,
}

impl RestoredTerminal {
    fn resolve(
        session_type: SessionType,
        session_name: &str,
        working_dir: Option<&str>,
        sessions: &[SessionItem],
    ) -> Self {
        match session_type {
            SessionType::Ssh => {
                let found = sessions.iter().find(|s| s.name == session_name && s.is_ssh());
                if let Some(session) = found {
                    let mut terminal = TerminalRef::ssh(session_name);
                    terminal.working_dir = working_dir.map(str::to_string);
                    Self {
                        terminal,
                        session: Some(session.clone()),
                        initial_command: working_dir
                            .filter(|d| !d.is_empty())
                            .map(|d| format!("cd \"{d}\"")),
                    }
                } else {
                    tracing::warn!(session = session_name, "SSH session to restore not found");
                    Self {
                        terminal: TerminalRef::local(format!("Missing: {session_name}")),
                        session: None,
                        initial_command: None,
                    }
                }
            }
            SessionType::Local => {
                let session = sessions
                    .iter()
                    .find(|s| s.name == session_name && s.is_local())
                    .cloned();
                let mut terminal = TerminalRef::local(session_name);
                terminal.working_dir = working_dir.map(str::to_string);
                Self {
                    terminal,
                    session,
                    initial_command: None,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::split::PaneTree;

    fn sample() -> LayoutNode {
        serde_json::from_str(
            r#"{"type":"paned","orientation":"vertical","position_ratio":0.3,
                "child1":{"type":"terminal","session_type":"local","session_name":"Local","working_dir":"/tmp"},
                "child2":{"type":"terminal","session_type":"ssh","session_name":"web","working_dir":"/srv/app"}}"#,
        )
        .unwrap()
    }

    #[test]
    fn parses_nested_nodes() {
        let node = sample();
        assert_eq!(node.terminal_count(), 2);
        let LayoutNode::Paned { orientation, position_ratio, .. } = &node else {
            panic!("expected paned");
        };
        assert_eq!(*orientation, PaneOrientation::Vertical);
        assert!((position_ratio - 0.3).abs() < f64::EPSILON);
    }

    #[test]
    fn restores_ssh_with_cd_and_missing_as_local() {
        let sessions = vec![SessionItem::ssh("web", "web.example.com", "deploy", 22)];
        let (tree, launches) = sample().restore_tree(&sessions);
        assert_eq!(tree.pane_count(), 2);
        assert_eq!(launches.len(), 2);
        assert!(launches[0].session.is_none());
        assert_eq!(launches[0].terminal.working_dir.as_deref(), Some("/tmp"));
        assert_eq!(launches[1].initial_command.as_deref(), Some("cd \"/srv/app\""));
        assert_eq!(launches[1].terminal.terminal_id, tree.panes()[1].terminal.terminal_id);

        let (_, missing) = sample().restore_tree(&[]);
        assert_eq!(missing[1].terminal.session_name, "Missing: web");
        assert_eq!(missing[1].terminal.session_type, SessionType::Local);
    }

    #[test]
    fn one_sided_split_collapses() {
        let node: LayoutNode = serde_json::from_str(
            r#"{"type":"paned","orientation":"horizontal","position_ratio":0.5,
                "child1":{"type":"terminal","session_type":"local","session_name":"Local","working_dir":null}}"#,
        )
        .unwrap();
        let (tree, _) = node.restore_tree(&[]);
        assert!(!tree.is_split());
    }

    #[test]
    fn serializes_pane_trees() {
        let mut tree = PaneTree::new(TerminalRef::local("Local").with_working_dir("/tmp"));
        let first = tree.first_pane().id;
        tree.split(first, PaneOrientation::Horizontal, TerminalRef::ssh("web"))
            .unwrap();
        let value = serde_json::to_value(LayoutNode::from_tree(&tree)).unwrap();
        assert_eq!(value["type"], "paned");
        assert_eq!(value["orientation"], "horizontal");
        assert_eq!(value["child1"]["working_dir"], "/tmp");
        assert_eq!(value["child2"]["session_type"], "ssh");
        assert!(value["child2"]["working_dir"].is_null());
    }
}
