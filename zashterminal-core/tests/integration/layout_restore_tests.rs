//! Saved layouts and restoring the previous session's tabs

use tempfile::TempDir;
use zashterminal_core::config::ConfigPaths;
use zashterminal_core::layout::{
    LayoutNode, LayoutStore, RESTORE_ASK, RESTORE_NEVER, SavedLayout, SessionStateFile,
};
use zashterminal_core::models::SessionItem;
use zashterminal_core::split::{PaneOrientation, TabManagerModel, TerminalRef};

fn window_with_split() -> TabManagerModel {
    let mut tabs = TabManagerModel::new();
    let first = tabs.add_tab(TerminalRef::local("Local").with_working_dir("/tmp"), None);
    let pane = tabs.tab(first).unwrap().panes().first_pane().id;
    tabs.split_pane(pane, PaneOrientation::Vertical, TerminalRef::ssh("web"))
        .unwrap();
    tabs.add_tab(TerminalRef::ssh("gone"), None);
    tabs
}

#[test]
fn layouts_are_saved_listed_moved_and_deleted() {
    let dir = TempDir::new().unwrap();
    let store = LayoutStore::new(ConfigPaths::with_root(dir.path()).layout_dir());
    assert!(store.list().unwrap().is_empty());

    let layout = SavedLayout::from_tabs(&window_with_split(), "/Work");
    let path = store.save("Morning shift", &layout).unwrap();
    assert_eq!(path.file_name().unwrap(), "Morning_shift.json");
    assert!(store.save("empty", &SavedLayout::default()).is_err());

    let listed = store.list().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].name, "Morning shift");
    assert_eq!(listed[0].folder_path, "/Work");

    store.move_layout("Morning shift", "/Work", "").unwrap();
    let loaded = store.load("Morning shift").unwrap();
    assert_eq!(loaded.folder_path, "");
    assert_eq!(loaded.tabs, layout.tabs);

    store.delete("Morning shift").unwrap();
    assert!(store.load("Morning shift").is_err());
}

#[test]
fn saved_tabs_restore_once_with_missing_sessions_marked() {
    let dir = TempDir::new().unwrap();
    let state_file = ConfigPaths::with_root(dir.path()).state_file();
    SessionStateFile::from_tabs(&window_with_split())
        .save(&state_file)
        .unwrap();

    assert!(!SessionStateFile::is_pending(&state_file, RESTORE_NEVER));
    let state = SessionStateFile::take(&state_file, RESTORE_ASK)
        .unwrap()
        .unwrap();
    assert!(!state_file.exists());
    assert_eq!(state.tabs.len(), 2);
    assert_eq!(state.tabs[0].terminal_count(), 2);

    let sessions = vec![SessionItem::ssh("web", "web.example.com", "deploy", 22)];
    let (tree, launches) = state.tabs[0].restore_tree(&sessions);
    assert_eq!(tree.pane_count(), 2);
    assert_eq!(launches[0].terminal.working_dir.as_deref(), Some("/tmp"));
    assert_eq!(launches[1].session.as_ref().unwrap().host, "web.example.com");

    let (tree, launches) = state.tabs[1].restore_tree(&sessions);
    assert_eq!(tree.pane_count(), 1);
    assert!(launches[0].session.is_none());
    assert_eq!(launches[0].terminal.session_name, "Missing: gone");

    let mut restored = TabManagerModel::new();
    for node in &state.tabs {
        let (panes, _) = node.restore_tree(&sessions);
        restored.add_tab_with_panes("restored", panes);
    }
    assert_eq!(restored.len(), 2);
    assert!(matches!(
        LayoutNode::from_tree(restored.tabs()[0].panes()),
        LayoutNode::Paned {
            orientation: PaneOrientation::Vertical,
            ..
        }
    ));

    assert!(SessionStateFile::take(&state_file, RESTORE_ASK).unwrap().is_none());
}
