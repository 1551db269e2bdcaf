//! Drag-and-drop model for the session tree
//!
//! Rows are dragged as a plain string `type|name|path` so the payload
//! survives a `gdk::ContentProvider` round trip. The widget layer only
//! resolves the row under the pointer; this module decides what moves where.

use std::fmt;

use crate::layout::LayoutStore;
use crate::sessions::{OperationResult, SessionOperations, TreeNode};

/// Kind of row being dragged
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragKind {
    /// A session row
    Session,
    /// A folder row
    Folder,
    /// A saved layout row
    Layout,
}

impl DragKind {
    /// Payload prefix
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Session => "session",
            Self::Folder => "folder",
            Self::Layout => "layout",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "session" => Some(Self::Session),
            "folder" => Some(Self::Folder),
            "layout" => Some(Self::Layout),
            _ => None,
        }
    }
}

/// What is being dragged
///
/// `path` is the containing folder for sessions and layouts, and the
/// folder's own path for folders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DragPayload {
    /// Row kind
    pub kind: DragKind,
    /// Row name
    pub name: String,
    /// Folder path, see above
    pub path: String,
}

impl DragPayload {
    /// Payload for a tree row
    #[must_use]
    pub fn from_node(node: &TreeNode) -> Self {
        let (kind, path) = match node {
            TreeNode::Session(s) => (DragKind::Session, s.folder_path.clone()),
            TreeNode::Folder(f) => (DragKind::Folder, f.path.clone()),
            TreeNode::Layout(l) => (DragKind::Layout, l.folder_path.clone()),
        };
        Self {
            kind,
            name: node.name().to_string(),
            path,
        }
    }

    /// Parses `type|name|path`. The path may itself contain `|`.
    #[must_use]
    pub fn decode(data: &str) -> Option<Self> {
        let mut parts = data.splitn(3, '|');
        let kind = DragKind::parse(parts.next()?)?;
        let name = parts.next()?.to_string();
        let path = parts.next()?.to_string();
        Some(Self { kind, name, path })
    }
}

impl fmt::Display for DragPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}|{}", self.kind.as_str(), self.name, self.path)
    }
}

/// Folder a drop lands in: the folder row itself, the folder of a session
/// or layout row, or the root for the empty area below the rows
#[must_use]
pub fn drop_target_path(row: Option<&TreeNode>) -> String {
    row.map_or_else(String::new, |n| n.target_folder_path().to_string())
}

/// Moves the dragged item into `target_folder_path`
pub fn perform_move(
    operations: &mut SessionOperations,
    layouts: &LayoutStore,
    payload: &DragPayload,
    target_folder_path: &str,
) -> OperationResult {
    tracing::debug!(payload = %payload, target = target_folder_path, "Drop");
    match payload.kind {
        DragKind::Session => {
            let Some((session, _)) =
                operations.find_session_by_name_and_path(&payload.name, &payload.path)
            else {
                return OperationResult::fail(format!("Session '{}' not found.", payload.name));
            };
            let session = session.clone();
            operations.move_session_to_folder(&session, target_folder_path)
        }
        DragKind::Folder => {
            let Some((folder, _)) = operations.find_folder_by_path(&payload.path) else {
                return OperationResult::fail(format!("Folder '{}' not found.", payload.name));
            };
            let folder = folder.clone();
            operations.move_folder(&folder, target_folder_path)
        }
        DragKind::Layout => {
            match layouts.move_layout(&payload.name, &payload.path, target_folder_path) {
                Ok(()) => OperationResult::ok(format!("Layout '{}' moved.", payload.name)),
                Err(e) => {
                    tracing::error!(layout = %payload.name, error = %e, "Failed to move layout");
                    OperationResult::fail(e.to_string())
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::SavedLayout;
    use crate::models::{LayoutItem, SessionFolder, SessionItem};
    use crate::sessions::SessionStorage;
    use crate::split::{TabManagerModel, TerminalRef};
    use tempfile::TempDir;

    #[test]
    fn payload_text_format() {
        let payload = DragPayload::decode("folder|Work|/Work|odd").unwrap();
        assert_eq!(payload.kind, DragKind::Folder);
        assert_eq!(payload.path, "/Work|odd");
        assert_eq!(payload.to_string(), "folder|Work|/Work|odd");
        assert!(DragPayload::decode("session|only-name").is_none());
        assert!(DragPayload::decode("tab|x|").is_none());
    }

    #[test]
    fn targets() {
        let folder = TreeNode::Folder(SessionFolder::new("Work", ""));
        let mut web = SessionItem::ssh("web", "h", "u", 22);
        web.folder_path = "/Work".into();
        let layout = TreeNode::Layout(LayoutItem::new("dev", "/Home"));
        assert_eq!(drop_target_path(Some(&folder)), "/Work");
        assert_eq!(drop_target_path(Some(&TreeNode::Session(web))), "/Work");
        assert_eq!(drop_target_path(Some(&layout)), "/Home");
        assert_eq!(drop_target_path(None), "");
    }

    #[test]
    fn moves_sessions_and_layouts() {
        let dir = TempDir::new().unwrap();
        let storage = SessionStorage::new(dir.path().join("sessions.json"));
        let mut ops = SessionOperations::new(storage, Vec::new(), Vec::new());
        assert!(ops.add_folder(SessionFolder::new("Work", "")).success);
        let web = SessionItem::ssh("web", "web1", "deploy", 22);
        assert!(ops.add_session(web.clone()).success);

        let layouts = LayoutStore::new(dir.path().join("layouts"));
        let result = perform_move(
            &mut ops,
            &layouts,
            &DragPayload::from_node(&TreeNode::Session(web)),
            "/Work",
        );
        assert!(result.success, "{}", result.message);
        assert_eq!(ops.sessions()[0].folder_path, "/Work");

        let mut tabs = TabManagerModel::new();
        tabs.add_tab(TerminalRef::local("Local"), None);
        layouts.save("dev", &SavedLayout::from_tabs(&tabs, "")).unwrap();
        let payload = DragPayload::decode("layout|dev|").unwrap();
        assert!(perform_move(&mut ops, &layouts, &payload, "/Work").success);
        assert_eq!(layouts.load("dev").unwrap().folder_path, "/Work");

        let missing = DragPayload::decode("session|ghost|").unwrap();
        assert!(!perform_move(&mut ops, &layouts, &missing, "/Work").success);
    }
}
