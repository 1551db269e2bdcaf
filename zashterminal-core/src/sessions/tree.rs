//! Toolkit-independent model behind the session sidebar
//!
//! The tree is not stored: the children of a folder are the sessions, layouts
//! and folders whose parent path equals the folder's path. Children are
//! computed on request and the folders that have been asked for are tracked,
//! so a GTK `TreeListModel` can populate rows lazily.
//!
//! Filtering is a case-insensitive substring match on names. A folder stays
//! visible while anything below it matches, which keeps the ancestors of a
//! matching leaf on screen.

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use serde_json::json;

use super::operations::SessionEntry;
use crate::config::SettingsManager;
use crate::models::{LayoutItem, SessionFolder, SessionItem};

/// Setting holding the expanded folder paths
pub const EXPANDED_FOLDERS_KEY: &str = "tree_expanded_folders";

/// A row in the session tree
#[derive(Debug, Clone, PartialEq)]
pub enum TreeNode {
    /// A folder
    Folder(SessionFolder),
    /// A saved layout
    Layout(LayoutItem),
    /// A session
    Session(SessionItem),
}

impl TreeNode {
    /// Display name
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Folder(f) => &f.name,
            Self::Layout(l) => &l.name,
            Self::Session(s) => &s.name,
        }
    }

    /// Path of the folder containing this node ("" at the root)
    #[must_use]
    pub fn parent_path(&self) -> &str {
        match self {
            Self::Folder(f) => &f.parent_path,
            Self::Layout(l) => &l.folder_path,
            Self::Session(s) => &s.folder_path,
        }
    }

    /// Folder a paste or drop onto this node lands in
    #[must_use]
    pub fn target_folder_path(&self) -> &str {
        match self {
            Self::Folder(f) => &f.path,
            other => other.parent_path(),
        }
    }

    /// `true` for folders
    #[must_use]
    pub const fn is_folder(&self) -> bool {
        matches!(self, Self::Folder(_))
    }

    const fn rank(&self) -> u8 {
        match self {
            Self::Folder(_) => 0,
            Self::Layout(_) => 1,
            Self::Session(_) => 2,
        }
    }

    fn matches(&self, needle: &str) -> bool {
        self.name().to_lowercase().contains(needle)
    }

    /// Sessions and folders can be put on the clipboard; layouts cannot
    #[must_use]
    pub fn to_entry(&self) -> Option<SessionEntry> {
        match self {
            Self::Folder(f) => Some(SessionEntry::Folder(f.clone())),
            Self::Session(s) => Some(SessionEntry::Session(s.clone())),
            Self::Layout(_) => None,
        }
    }
}

/// Folders first, then layouts, then sessions; by name within each group
fn compare_nodes(a: &TreeNode, b: &TreeNode) -> Ordering {
    a.rank().cmp(&b.rank()).then_with(|| a.name().cmp(b.name()))
}

/// Internal copy/cut buffer of the sidebar
#[derive(Debug, Clone, Default)]
pub struct TreeClipboard {
    item: Option<SessionEntry>,
    is_cut: bool,
}

impl TreeClipboard {
    /// Puts a copy of `item` on the clipboard
    pub fn copy(&mut self, item: SessionEntry) {
        self.item = Some(item);
        self.is_cut = false;
    }

    /// Marks `item` to be moved on paste
    pub fn cut(&mut self, item: SessionEntry) {
        self.item = Some(item);
        self.is_cut = true;
    }

    /// `true` when something can be pasted
    #[must_use]
    pub const fn has_content(&self) -> bool {
        self.item.is_some()
    }

    /// Empties the clipboard, returning the item and whether it was cut
    pub fn take(&mut self) -> Option<(SessionEntry, bool)> {
        let is_cut = std::mem::take(&mut self.is_cut);
        self.item.take().map(|item| (item, is_cut))
    }
}

/// Key pressed in the tree, reduced to what the sidebar cares about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeKey {
    /// A key producing a character
    Char(char),
    /// Delete
    Delete,
    /// BackSpace
    BackSpace,
    /// Anything else
    Other,
}

/// Modifier state of a key press
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct KeyModifiers {
    /// Control held
    pub control: bool,
    /// Alt held
    pub alt: bool,
    /// Shift held
    pub shift: bool,
}

/// What a key press in the tree should do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyIntent {
    /// Focus the search entry and start it with this character
    StartSearch(char),
    /// Select every row
    SelectAll,
    /// Copy the selection
    Copy,
    /// Cut the selection
    Cut,
    /// Paste into the selection's folder
    Paste,
    /// Delete the selected items
    DeleteSelected,
    /// Remove the last search character
    TrimSearch,
    /// Not handled
    Propagate,
}

/// Maps a key press to a sidebar action
#[must_use]
pub fn key_intent(key: TreeKey, modifiers: KeyModifiers) -> KeyIntent {
    let plain = !(modifiers.control || modifiers.alt || modifiers.shift);
    match key {
        TreeKey::Char(c) if plain && (c.is_alphanumeric() || matches!(c, ' ' | '-' | '_')) => {
            KeyIntent::StartSearch(c)
        }
        TreeKey::Char(c) if modifiers.control => match c.to_ascii_lowercase() {
            'a' => KeyIntent::SelectAll,
            'c' => KeyIntent::Copy,
            'x' => KeyIntent::Cut,
            'v' => KeyIntent::Paste,
            _ => KeyIntent::Propagate,
        },
        TreeKey::Delete => KeyIntent::DeleteSelected,
        TreeKey::BackSpace => KeyIntent::TrimSearch,
        _ => KeyIntent::Propagate,
    }
}

/// Search text with its last character removed
#[must_use]
pub fn trim_search_text(text: &str) -> String {
    let mut chars = text.chars();
    chars.next_back();
    chars.as_str().to_string()
}

/// Sessions, folders and layouts arranged by path, with filter and
/// expansion state
#[derive(Debug, Default)]
pub struct SessionTree {
    sessions: Vec<SessionItem>,
    folders: Vec<SessionFolder>,
    layouts: Vec<LayoutItem>,
    filter: String,
    expanded: BTreeSet<String>,
    saved_expansion: Option<BTreeSet<String>>,
    populated: HashSet<String>,
    clipboard: TreeClipboard,
    settings: Option<Arc<SettingsManager>>,
}

impl SessionTree {
    /// Builds the tree from the current collections
    #[must_use]
    pub fn build(
        sessions: Vec<SessionItem>,
        folders: Vec<SessionFolder>,
        layouts: Vec<LayoutItem>,
    ) -> Self {
        Self {
            sessions,
            folders,
            layouts,
            ..Self::default()
        }
    }

    /// Reads and persists expansion state through `settings`
    #[must_use]
    pub fn with_settings(mut self, settings: Arc<SettingsManager>) -> Self {
        self.expanded = settings.expanded_folders().into_iter().collect();
        self.settings = Some(settings);
        self
    }

    /// Replaces the collections, keeping filter, expansion and clipboard
    pub fn refresh(
        &mut self,
        sessions: Vec<SessionItem>,
        folders: Vec<SessionFolder>,
        layouts: Vec<LayoutItem>,
    ) {
        self.sessions = sessions;
        self.folders = folders;
        self.layouts = layouts;
        self.populated.clear();
        let known: HashSet<&str> = self.folders.iter().map(|f| f.path.as_str()).collect();
        self.expanded.retain(|p| known.contains(p.as_str()));
    }

    fn all_nodes(&self) -> impl Iterator<Item = TreeNode> + '_ {
        self.folders
            .iter()
            .cloned()
            .map(TreeNode::Folder)
            .chain(self.layouts.iter().cloned().map(TreeNode::Layout))
            .chain(self.sessions.iter().cloned().map(TreeNode::Session))
    }

    fn nodes_under(&self, parent_path: &str) -> Vec<TreeNode> {
        let mut nodes: Vec<TreeNode> = self
            .all_nodes()
            .filter(|n| n.parent_path() == parent_path)
            .collect();
        nodes.sort_by(compare_nodes);
        nodes
    }

    /// Visible root-level nodes, sorted
    #[must_use]
    pub fn root_nodes(&self) -> Vec<TreeNode> {
        self.nodes_under("")
            .into_iter()
            .filter(|n| self.is_visible(n))
            .collect()
    }

    /// Visible children of the folder at `folder_path`, sorted. Marks the
    /// folder as populated.
    pub fn children(&mut self, folder_path: &str) -> Vec<TreeNode> {
        self.populated.insert(folder_path.to_string());
        self.nodes_under(folder_path)
            .into_iter()
            .filter(|n| self.is_visible(n))
            .collect()
    }

    /// Whether [`children`](Self::children) has been asked for this folder
    /// since the last refresh
    #[must_use]
    pub fn is_populated(&self, folder_path: &str) -> bool {
        self.populated.contains(folder_path)
    }

    /// The rows a fully expanded view would show, with their depth
    #[must_use]
    pub fn visible_rows(&self) -> Vec<(usize, TreeNode)> {
        let mut rows = Vec::new();
        self.collect_rows("", 0, &mut rows);
        rows
    }

    fn collect_rows(&self, parent: &str, depth: usize, rows: &mut Vec<(usize, TreeNode)>) {
        for node in self.nodes_under(parent) {
            if !self.is_visible(&node) {
                continue;
            }
            let descend = match &node {
                TreeNode::Folder(f) if self.expanded.contains(&f.path) => Some(f.path.clone()),
                _ => None,
            };
            rows.push((depth, node));
            if let Some(path) = descend {
                self.collect_rows(&path, depth + 1, rows);
            }
        }
    }

    /// Current lowercase filter text
    #[must_use]
    pub fn filter_text(&self) -> &str {
        &self.filter
    }

    /// `true` while a search is active
    #[must_use]
    pub fn is_searching(&self) -> bool {
        !self.filter.is_empty()
    }

    /// `true` if `node` passes the filter
    #[must_use]
    pub fn is_visible(&self, node: &TreeNode) -> bool {
        if self.filter.is_empty() || node.matches(&self.filter) {
            return true;
        }
        match node {
            TreeNode::Folder(f) => self.folder_contains_match(&f.path),
            _ => false,
        }
    }

    fn folder_contains_match(&self, folder_path: &str) -> bool {
        if self.filter.is_empty() {
            return false;
        }
        self.all_nodes()
            .filter(|n| n.parent_path() == folder_path)
            .any(|child| {
                child.matches(&self.filter)
                    || matches!(&child, TreeNode::Folder(f) if self.folder_contains_match(&f.path))
            })
    }

    /// Updates the filter. Starting a search remembers the expansion state;
    /// a new or extended query expands every folder holding a match.
    pub fn set_filter_text(&mut self, text: &str) {
        let previous = std::mem::replace(&mut self.filter, text.to_lowercase());
        if self.filter.is_empty() {
            return;
        }
        if previous.is_empty() {
            self.saved_expansion = Some(self.expanded.clone());
        }
        if previous.is_empty() || self.filter.starts_with(&previous) {
            self.expand_folders_with_matches();
        }
    }

    fn expand_folders_with_matches(&mut self) {
        let matching: Vec<String> = self
            .folders
            .iter()
            .filter(|f| self.folder_contains_match(&f.path))
            .map(|f| f.path.clone())
            .collect();
        tracing::debug!(folders = matching.len(), "Expanding folders with matches");
        self.expanded.extend(matching);
    }

    /// Drops the filter and restores the expansion state from before the
    /// search, or the persisted one.
    pub fn clear_search(&mut self) {
        if self.filter.is_empty() {
            return;
        }
        self.filter.clear();
        self.expanded = match self.saved_expansion.take() {
            Some(saved) => saved,
            None => self
                .settings
                .as_ref()
                .map(|s| s.expanded_folders().into_iter().collect())
                .unwrap_or_default(),
        };
    }

    /// `true` if the folder is expanded
    #[must_use]
    pub fn is_expanded(&self, folder_path: &str) -> bool {
        self.expanded.contains(folder_path)
    }

    /// Expanded folder paths, shallowest first
    #[must_use]
    pub fn expanded_folders(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.expanded.iter().cloned().collect();
        paths.sort_by_key(|p| p.matches('/').count());
        paths
    }

    /// Records a user expansion change
    pub fn set_expanded(&mut self, folder_path: &str, expanded: bool) {
        let changed = if expanded {
            self.expanded.insert(folder_path.to_string())
        } else {
            self.expanded.remove(folder_path)
        };
        if changed && !self.is_searching() {
            self.persist_expansion();
        }
    }

    /// Flips a folder's expansion; returns the new state
    pub fn toggle_expanded(&mut self, folder_path: &str) -> bool {
        let expand = !self.is_expanded(folder_path);
        self.set_expanded(folder_path, expand);
        expand
    }

    fn persist_expansion(&self) {
        let Some(settings) = &self.settings else {
            return;
        };
        if let Err(e) = settings.set(EXPANDED_FOLDERS_KEY, json!(self.expanded_folders())) {
            tracing::warn!(error = %e, "Failed to persist tree expansion state");
        }
    }

    /// The internal clipboard
    #[must_use]
    pub const fn clipboard(&self) -> &TreeClipboard {
        &self.clipboard
    }

    /// Copies `node`; returns `false` for layouts
    pub fn copy_node(&mut self, node: &TreeNode) -> bool {
        node.to_entry().map(|e| self.clipboard.copy(e)).is_some()
    }

    /// Cuts `node`; returns `false` for layouts
    pub fn cut_node(&mut self, node: &TreeNode) -> bool {
        node.to_entry().map(|e| self.clipboard.cut(e)).is_some()
    }

    /// Takes the clipboard content for a paste
    pub fn take_clipboard(&mut self) -> Option<(SessionEntry, bool)> {
        self.clipboard.take()
    }
}

/// Folder a paste lands in given the current selection
#[must_use]
pub fn paste_target(selected: Option<&TreeNode>) -> String {
    selected.map_or_else(String::new, |n| n.target_folder_path().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SessionTree {
        let work = SessionFolder::new("Work", "");
        let db = SessionFolder::new("Databases", "/Work");
        let home = SessionFolder::new("Home", "");
        let mut pg = SessionItem::ssh("postgres-primary", "pg1", "admin", 22);
        pg.folder_path = "/Work/Databases".into();
        let mut web = SessionItem::ssh("web", "web1", "", 22);
        web.folder_path = "/Work".into();
        let shell = SessionItem::local("shell");
        let layout = LayoutItem::new("Dev", "");
        SessionTree::build(vec![shell, web, pg], vec![work, db, home], vec![layout])
    }

    fn names(nodes: &[TreeNode]) -> Vec<&str> {
        nodes.iter().map(TreeNode::name).collect()
    }

    #[test]
    fn root_sorted_folders_layouts_sessions() {
        let tree = sample();
        assert_eq!(names(&tree.root_nodes()), vec!["Home", "Work", "Dev", "shell"]);
    }

    #[test]
    fn children_are_lazy() {
        let mut tree = sample();
        assert!(!tree.is_populated("/Work"));
        assert_eq!(names(&tree.children("/Work")), vec!["Databases", "web"]);
        assert!(tree.is_populated("/Work"));
        tree.refresh(Vec::new(), Vec::new(), Vec::new());
        assert!(!tree.is_populated("/Work"));
    }

    #[test]
    fn filter_keeps_ancestors_of_matches() {
        let mut tree = sample();
        tree.set_filter_text("POSTGRES");
        assert_eq!(names(&tree.root_nodes()), vec!["Work"]);
        assert_eq!(names(&tree.children("/Work")), vec!["Databases"]);
        assert_eq!(names(&tree.children("/Work/Databases")), vec!["postgres-primary"]);
        assert!(tree.is_expanded("/Work"));
        assert!(tree.is_expanded("/Work/Databases"));
        assert!(!tree.is_expanded("/Home"));
    }

    #[test]
    fn clear_search_restores_expansion() {
        let mut tree = sample();
        tree.set_expanded("/Home", true);
        tree.set_filter_text("pg");
        tree.set_filter_text("post");
        assert!(tree.is_expanded("/Work"));
        tree.clear_search();
        assert!(!tree.is_searching());
        assert_eq!(tree.expanded_folders(), vec!["/Home".to_string()]);
    }

    #[test]
    fn narrowing_query_does_not_reexpand() {
        let mut tree = sample();
        tree.set_filter_text("web");
        assert!(tree.is_expanded("/Work"));
        tree.set_expanded("/Work", false);
        tree.set_filter_text("we");
        assert!(!tree.is_expanded("/Work"));
    }

    #[test]
    fn visible_rows_follow_expansion() {
        let mut tree = sample();
        tree.set_expanded("/Work", true);
        let rows: Vec<(usize, String)> = tree
            .visible_rows()
            .into_iter()
            .map(|(depth, node)| (depth, node.name().to_string()))
            .collect();
        let expected = [(0, "Home"), (0, "Work"), (1, "Databases"), (1, "web"), (0, "Dev"), (0, "shell")];
        assert_eq!(rows.len(), expected.len());
        for ((depth, name), (want_depth, want_name)) in rows.iter().zip(expected) {
            assert_eq!((*depth, name.as_str()), (want_depth, want_name));
        }
    }

    #[test]
    fn expanded_folders_shallowest_first() {
        let mut tree = sample();
        tree.set_expanded("/Work/Databases", true);
        tree.set_expanded("/Work", true);
        assert_eq!(tree.expanded_folders(), vec!["/Work", "/Work/Databases"]);
    }

    #[test]
    fn clipboard_rejects_layouts() {
        let mut tree = sample();
        let nodes = tree.root_nodes();
        assert!(!tree.copy_node(&nodes[2]));
        assert!(tree.cut_node(&nodes[3]));
        let (entry, is_cut) = tree.take_clipboard().unwrap();
        assert!(is_cut);
        assert_eq!(entry.name(), "shell");
        assert!(!tree.clipboard().has_content());
    }

    #[test]
    fn paste_target_from_selection() {
        let tree = sample();
        let nodes = tree.root_nodes();
        assert_eq!(paste_target(Some(&nodes[1])), "/Work");
        assert_eq!(paste_target(Some(&nodes[3])), "");
        assert_eq!(paste_target(None), "");
    }

    #[test]
    fn key_intents() {
        let none = KeyModifiers::default();
        let ctrl = KeyModifiers {
            control: true,
            ..KeyModifiers::default()
        };
        assert_eq!(key_intent(TreeKey::Char('a'), none), KeyIntent::StartSearch('a'));
        assert_eq!(key_intent(TreeKey::Char('_'), none), KeyIntent::StartSearch('_'));
        assert_eq!(key_intent(TreeKey::Char('.'), none), KeyIntent::Propagate);
        assert_eq!(key_intent(TreeKey::Char('A'), ctrl), KeyIntent::SelectAll);
        assert_eq!(key_intent(TreeKey::Char('v'), ctrl), KeyIntent::Paste);
        assert_eq!(key_intent(TreeKey::Delete, none), KeyIntent::DeleteSelected);
        assert_eq!(key_intent(TreeKey::BackSpace, none), KeyIntent::TrimSearch);
        assert_eq!(trim_search_text("héllo"), "héll");
        assert_eq!(trim_search_text(""), "");
    }
}
