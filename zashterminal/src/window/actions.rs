//! Window actions
//!
//! `win.*` actions used by the sidebar, its context menu, the application
//! menu and the terminal context menu. Sidebar actions work on the current
//! selection.

use std::rc::Rc;

use adw::prelude::*;
use gtk4::{gio, glib};
use zashterminal_core::backup::{create_backup, restore_backup};
use zashterminal_core::sessions::{OperationResult, SessionOperations, TreeNode, paste_target};
use zashterminal_core::signals::AppEvent;

use super::MainWindow;
use crate::dialogs::{
    confirm_destructive, emit, show_ai_settings_dialog, show_folder_dialog, show_highlights_dialog,
    show_move_to_folder_dialog, show_save_layout_dialog, show_scheme_editor, show_session_dialog,
};
use crate::toast::ToastType;

fn add_action(main: &Rc<MainWindow>, name: &str, handler: impl Fn(&Rc<MainWindow>) + 'static) {
    let action = gio::SimpleAction::new(name, None);
    let weak = Rc::downgrade(main);
    action.connect_activate(move |_, _| {
        if let Some(main) = weak.upgrade() {
            handler(&main);
        }
    });
    main.window.add_action(&action);
}

fn report(main: &MainWindow, result: &OperationResult) {
    let kind = if result.success {
        ToastType::Success
    } else {
        ToastType::Error
    };
    main.show_toast(&result.message, kind);
}

/// Folder new items go into: the selected folder, or the selected item's
/// folder
fn selected_folder(main: &MainWindow) -> String {
    main.sidebar
        .selected_node()
        .map(|node| node.target_folder_path().to_string())
        .unwrap_or_default()
}

fn folder_is_empty(operations: &SessionOperations, path: &str) -> bool {
    !operations.sessions().iter().any(|s| s.folder_path == path)
        && !operations.folders().iter().any(|f| f.parent_path == path)
}

/// Registers every `win.*` action on the window
pub fn setup_window_actions(main: &Rc<MainWindow>) {
    setup_item_actions(main);
    setup_clipboard_actions(main);
    setup_tool_actions(main);
    setup_backup_actions(main);

    add_action(main, "move-pane-to-tab", |main| {
        if !main.tabs.move_active_pane_to_new_tab() {
            main.show_toast("The active tab has only one pane", ToastType::Info);
        }
    });
}

fn setup_item_actions(main: &Rc<MainWindow>) {
    add_action(main, "open-item", |main| {
        if let Some(node) = main.sidebar.selected_node() {
            main.open_node(node);
        }
    });

    add_action(main, "new-session", |main| {
        let folder = selected_folder(main);
        show_session_dialog(Some(main.window.upcast_ref()), &main.state, None, &folder);
    });

    add_action(main, "new-folder", |main| {
        let folder = selected_folder(main);
        show_folder_dialog(Some(main.window.upcast_ref()), &main.state, None, &folder);
    });

    add_action(main, "edit-item", |main| match main.sidebar.selected_node() {
        Some(TreeNode::Session(session)) => {
            let folder = session.folder_path.clone();
            show_session_dialog(Some(main.window.upcast_ref()), &main.state, Some(session), &folder);
        }
        Some(TreeNode::Folder(folder)) => {
            let parent = folder.parent_path.clone();
            show_folder_dialog(Some(main.window.upcast_ref()), &main.state, Some(folder), &parent);
        }
        Some(TreeNode::Layout(_)) | None => {}
    });

    add_action(main, "duplicate-session", |main| {
        if let Some(TreeNode::Session(session)) = main.sidebar.selected_node() {
            let result = main.state.borrow_mut().operations_mut().duplicate_session(&session);
            report(main, &result);
        }
    });

    add_action(main, "move-to-folder", |main| {
        let nodes: Vec<TreeNode> = main
            .sidebar
            .selected_nodes()
            .into_iter()
            .filter(|node| !matches!(node, TreeNode::Layout(_)))
            .collect();
        if !nodes.is_empty() {
            show_move_to_folder_dialog(Some(main.window.upcast_ref()), &main.state, nodes);
        }
    });

    add_action(main, "delete-item", |main| {
        if let Some(node) = main.sidebar.selected_node() {
            delete_node(main, node);
        }
    });

    add_action(main, "import-ssh-config", |main| {
        let result = main
            .state
            .borrow_mut()
            .operations_mut()
            .import_sessions_from_ssh_config(None);
        for warning in &result.warnings {
            tracing::warn!(%warning, "SSH config import");
        }
        report(main, &result);
        if !result.warnings.is_empty() {
            main.show_toast(
                &format!("{} host(s) skipped, see the log for details", result.warnings.len()),
                ToastType::Warning,
            );
        }
    });

    add_action(main, "save-layout", |main| {
        if main.tabs.tab_count() == 0 {
            main.show_toast("There are no open tabs to save", ToastType::Info);
            return;
        }
        let folder = selected_folder(main);
        let tabs = Rc::downgrade(&main.tabs);
        show_save_layout_dialog(Some(main.window.upcast_ref()), &main.state, &folder, move |folder| {
            tabs.upgrade()
                .map(|t| t.saved_layout(folder))
                .unwrap_or_default()
        });
    });
}

fn delete_node(main: &Rc<MainWindow>, node: TreeNode) {
    let (heading, body) = match &node {
        TreeNode::Session(session) => (
            "Delete Session?",
            format!("The session '{}' will be removed.", session.name),
        ),
        TreeNode::Folder(folder) => {
            let empty = folder_is_empty(main.state.borrow().operations(), &folder.path);
            if empty {
                ("Delete Folder?", format!("The folder '{}' will be removed.", folder.name))
            } else {
                (
                    "Delete Folder and Contents?",
                    format!(
                        "The folder '{}' is not empty. Every session and subfolder inside it will be removed as well.",
                        folder.name
                    ),
                )
            }
        }
        TreeNode::Layout(layout) => (
            "Delete Layout?",
            format!("The saved layout '{}' will be removed.", layout.name),
        ),
    };

    let weak = Rc::downgrade(main);
    confirm_destructive(&main.window, heading, &body, "Delete", move || {
        let Some(main) = weak.upgrade() else {
            return;
        };
        match node {
            TreeNode::Session(session) => {
                let result = main.state.borrow_mut().operations_mut().remove_session(&session);
                report(&main, &result);
            }
            TreeNode::Folder(folder) => {
                let result = main.state.borrow_mut().operations_mut().remove_folder(&folder, true);
                report(&main, &result);
            }
            TreeNode::Layout(layout) => {
                let deleted = main.state.borrow().layouts().delete(&layout.name);
                match deleted {
                    Ok(()) => {
                        tracing::info!(layout = %layout.name, "Layout deleted");
                        emit(&main.state, &AppEvent::RequestTreeRefresh);
                        main.show_toast(&format!("Layout '{}' deleted", layout.name), ToastType::Success);
                    }
                    Err(e) => {
                        tracing::error!(layout = %layout.name, error = %e, "Failed to delete layout");
                        main.show_toast(&format!("Could not delete layout: {e}"), ToastType::Error);
                    }
                }
            }
        }
    });
}

fn setup_clipboard_actions(main: &Rc<MainWindow>) {
    add_action(main, "copy-item", |main| {
        if let Some(node) = main.sidebar.selected_node()
            && main.state.borrow_mut().tree_mut().copy_node(&node)
        {
            main.show_toast(&format!("Copied '{}'", node.name()), ToastType::Info);
        }
    });

    add_action(main, "cut-item", |main| {
        if let Some(node) = main.sidebar.selected_node()
            && main.state.borrow_mut().tree_mut().cut_node(&node)
        {
            main.show_toast(&format!("Cut '{}'", node.name()), ToastType::Info);
        }
    });

    add_action(main, "paste-item", |main| {
        let target = paste_target(main.sidebar.selected_node().as_ref());
        let mut state = main.state.borrow_mut();
        let Some((entry, is_cut)) = state.tree_mut().take_clipboard() else {
            return;
        };
        let result = state.operations_mut().paste_item(&entry, &target, is_cut);
        drop(state);
        report(main, &result);
    });
}

fn setup_tool_actions(main: &Rc<MainWindow>) {
    add_action(main, "color-schemes", |main| {
        show_scheme_editor(Some(main.window.upcast_ref()), &main.state);
    });
    add_action(main, "highlight-rules", |main| {
        show_highlights_dialog(&main.window, &main.state);
    });
    add_action(main, "ai-settings", |main| {
        show_ai_settings_dialog(&main.window, &main.state);
    });
}

fn zip_filters() -> gio::ListStore {
    let filter = gtk4::FileFilter::new();
    filter.set_name(Some("Zip archives"));
    filter.add_pattern("*.zip");
    let filters = gio::ListStore::new::<gtk4::FileFilter>();
    filters.append(&filter);
    filters
}

fn backup_file_name() -> String {
    let stamp = glib::DateTime::now_local()
        .and_then(|now| now.format("%Y%m%d-%H%M%S"))
        .map(|s| s.to_string())
        .unwrap_or_else(|_| "latest".to_string());
    format!("zashterminal-backup-{stamp}.zip")
}

fn setup_backup_actions(main: &Rc<MainWindow>) {
    add_action(main, "create-backup", |main| {
        let backup_dir = main.state.borrow().paths().backup_dir();
        let dialog = gtk4::FileDialog::builder()
            .title("Create Backup")
            .modal(true)
            .initial_name(backup_file_name())
            .initial_folder(&gio::File::for_path(&backup_dir))
            .filters(&zip_filters())
            .build();

        let weak = Rc::downgrade(main);
        dialog.save(Some(&main.window), gio::Cancellable::NONE, move |result| {
            let (Some(main), Ok(file)) = (weak.upgrade(), result) else {
                return;
            };
            let Some(path) = file.path() else {
                return;
            };
            if let Err(e) = main.state.borrow().flush_persistence() {
                tracing::warn!(error = %e, "Settings not flushed before backup");
            }
            let paths = main.state.borrow().paths().clone();
            match create_backup(&paths, &path) {
                Ok(report) => {
                    tracing::info!(path = %path.display(), files = report.files.len(), "Backup created");
                    main.show_toast(
                        &format!("Backup saved with {} files", report.files.len()),
                        ToastType::Success,
                    );
                }
                Err(e) => {
                    tracing::error!(path = %path.display(), error = %e, "Backup failed");
                    main.show_toast(&format!("Backup failed: {e}"), ToastType::Error);
                }
            }
        });
    });

    add_action(main, "restore-backup", |main| {
        let dialog = gtk4::FileDialog::builder()
            .title("Restore Backup")
            .modal(true)
            .filters(&zip_filters())
            .build();

        let weak = Rc::downgrade(main);
        dialog.open(Some(&main.window), gio::Cancellable::NONE, move |result| {
            let (Some(main), Ok(file)) = (weak.upgrade(), result) else {
                return;
            };
            let Some(path) = file.path() else {
                return;
            };
            let weak = Rc::downgrade(&main);
            confirm_destructive(
                &main.window,
                "Restore Backup?",
                "Sessions, settings, layouts and highlight rules will be replaced by the contents of the backup.",
                "Restore",
                move || {
                    let Some(main) = weak.upgrade() else {
                        return;
                    };
                    let paths = main.state.borrow().paths().clone();
                    match restore_backup(&paths, &path) {
                        Ok(report) => {
                            tracing::info!(path = %path.display(), files = report.files.len(), "Backup restored");
                            main.show_toast(
                                "Backup restored. Restart Zashterminal to load it.",
                                ToastType::Success,
                            );
                        }
                        Err(e) => {
                            tracing::error!(path = %path.display(), error = %e, "Restore failed");
                            main.show_toast(&format!("Restore failed: {e}"), ToastType::Error);
                        }
                    }
                },
            );
        });
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backup_name_is_a_zip() {
        let name = backup_file_name();
        assert!(name.starts_with("zashterminal-backup-"));
        assert!(name.ends_with(".zip"));
    }
}
