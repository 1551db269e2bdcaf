//! Move selected sidebar items into another folder

use std::rc::Rc;

use adw::prelude::*;
use libadwaita as adw;
use zashterminal_core::sessions::TreeNode;
use zashterminal_core::signals::AppEvent;

use super::keyboard::setup_dialog_shortcuts;
use super::widgets::{dialog_header, folder_combo, folder_paths, form_box, form_window, selected_folder};
use crate::state::SharedAppState;
use crate::toast::{ToastType, show_toast_on_widget};

/// Folders `nodes` may move into: none of the moved folders nor anything
/// below them
fn move_targets(all_folders: Vec<String>, nodes: &[TreeNode]) -> Vec<String> {
    all_folders
        .into_iter()
        .filter(|path| {
            !nodes.iter().any(|node| match node {
                TreeNode::Folder(folder) => folder.contains_path(path),
                _ => false,
            })
        })
        .collect()
}

/// Moves every node; returns the failure messages
fn move_nodes(state: &SharedAppState, nodes: &[TreeNode], target: &str) -> Vec<String> {
    let mut failures = Vec::new();
    let mut layouts_moved = false;
    for node in nodes {
        let result = match node {
            TreeNode::Session(session) => {
                let result = state
                    .borrow_mut()
                    .operations_mut()
                    .move_session_to_folder(session, target);
                (!result.success).then_some(result.message)
            }
            TreeNode::Folder(folder) => {
                let result = state.borrow_mut().operations_mut().move_folder(folder, target);
                (!result.success).then_some(result.message)
            }
            TreeNode::Layout(layout) => {
                let moved = state
                    .borrow()
                    .layouts()
                    .move_layout(&layout.name, &layout.folder_path, target);
                layouts_moved |= moved.is_ok();
                moved.err().map(|e| format!("Layout '{}': {e}", layout.name))
            }
        };
        if let Some(message) = result {
            failures.push(message);
        }
    }
    if layouts_moved {
        super::emit(state, &AppEvent::RequestTreeRefresh);
    }
    failures
}

/// Asks for a destination folder and moves `nodes` there
pub fn show_move_to_folder_dialog(parent: Option<&gtk4::Window>, state: &SharedAppState, nodes: Vec<TreeNode>) {
    if nodes.is_empty() {
        return;
    }
    let (header, cancel_btn, move_btn) = dialog_header("Cancel", "Move");
    let content = form_box();

    let description = if nodes.len() == 1 {
        format!("Move '{}' to:", nodes[0].name())
    } else {
        format!("Move {} items to:", nodes.len())
    };
    let current = nodes[0].parent_path().to_string();
    let (folder_row, paths) = folder_combo(
        "Destination",
        &move_targets(folder_paths(state), &nodes),
        &current,
    );
    let group = adw::PreferencesGroup::builder().title(description).build();
    group.add(&folder_row);
    content.append(&group);

    let window = form_window(parent, "Move to Folder", 420, &header, &content);
    setup_dialog_shortcuts(&window, Some(&move_btn));

    let window_weak = window.downgrade();
    cancel_btn.connect_clicked(move |_| {
        if let Some(window) = window_weak.upgrade() {
            window.close();
        }
    });

    let state = Rc::clone(state);
    let window_weak = window.downgrade();
    move_btn.connect_clicked(move |_| {
        let Some(window) = window_weak.upgrade() else {
            return;
        };
        let target = selected_folder(&folder_row, &paths);
        let failures = move_nodes(&state, &nodes, &target);
        if let Some(anchor) = window.transient_for() {
            if failures.is_empty() {
                show_toast_on_widget(&anchor, "Moved successfully", ToastType::Success);
            } else {
                show_toast_on_widget(&anchor, &failures.join("\n"), ToastType::Error);
            }
        }
        window.close();
    });

    window.present();
}

#[cfg(test)]
mod tests {
    use super::*;
    use zashterminal_core::models::{SessionFolder, SessionItem};

    #[test]
    fn moved_folders_and_descendants_are_not_targets() {
        let folders = vec!["/Work".to_string(), "/Work/Db".to_string(), "/Home".to_string()];
        let nodes = vec![
            TreeNode::Folder(SessionFolder::new("Work", "")),
            TreeNode::Session(SessionItem::local("shell")),
        ];
        assert_eq!(move_targets(folders, &nodes), vec!["/Home".to_string()]);
    }
}
