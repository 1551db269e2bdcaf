//! Folder add/rename dialog

use std::rc::Rc;

use adw::prelude::*;
use libadwaita as adw;
use zashterminal_core::models::SessionFolder;
use zashterminal_core::sessions::OperationResult;

use super::keyboard::{setup_dialog_shortcuts, setup_entry_activation};
use super::widgets::{
    dialog_header, folder_combo, folder_paths, form_box, form_window, selected_folder,
    show_errors, status_label,
};
use crate::state::SharedAppState;
use crate::toast::{ToastType, show_toast_on_widget};

/// Folder built from the form; an edit keeps the creation time of
/// `existing`
fn folder_from_form(name: &str, parent_path: &str, existing: Option<&SessionFolder>) -> SessionFolder {
    let mut folder = SessionFolder::new(name, parent_path);
    if let Some(existing) = existing {
        folder.created_at = existing.created_at;
    }
    folder
}

/// Opens the folder dialog.
///
/// With `existing` the folder is renamed or moved in place, otherwise a new
/// folder is created under `default_parent`.
pub fn show_folder_dialog(
    parent: Option<&gtk4::Window>,
    state: &SharedAppState,
    existing: Option<SessionFolder>,
    default_parent: &str,
) {
    let is_edit = existing.is_some();
    let (header, cancel_btn, save_btn) =
        dialog_header("Cancel", if is_edit { "Save" } else { "Create" });

    let content = form_box();
    let status = status_label();
    content.append(&status);

    let name_row = adw::EntryRow::builder().title("Name").build();
    let current_parent = existing
        .as_ref()
        .map_or(default_parent, |f| f.parent_path.as_str());
    // A folder cannot become its own descendant
    let choices: Vec<String> = folder_paths(state)
        .into_iter()
        .filter(|path| existing.as_ref().is_none_or(|f| !f.contains_path(path)))
        .collect();
    let (parent_row, parent_paths) = folder_combo("Parent Folder", &choices, current_parent);
    if let Some(folder) = &existing {
        name_row.set_text(&folder.name);
    }

    let group = adw::PreferencesGroup::new();
    group.add(&name_row);
    group.add(&parent_row);
    content.append(&group);

    let title = if is_edit { "Edit Folder" } else { "New Folder" };
    let window = form_window(parent, title, 420, &header, &content);
    setup_dialog_shortcuts(&window, Some(&save_btn));
    setup_entry_activation(&name_row, &save_btn);

    let window_weak = window.downgrade();
    cancel_btn.connect_clicked(move |_| {
        if let Some(window) = window_weak.upgrade() {
            window.close();
        }
    });

    let state = Rc::clone(state);
    let window_weak = window.downgrade();
    save_btn.connect_clicked(move |_| {
        let Some(window) = window_weak.upgrade() else {
            return;
        };
        let folder = folder_from_form(
            &name_row.text(),
            &selected_folder(&parent_row, &parent_paths),
            existing.as_ref(),
        );
        let errors = folder.validation_errors();
        if !errors.is_empty() {
            show_errors(&status, &errors);
            return;
        }

        let result = {
            let mut state_ref = state.borrow_mut();
            let operations = state_ref.operations_mut();
            match &existing {
                Some(original) => {
                    let position = operations
                        .find_folder_by_path(&original.path)
                        .map(|(_, position)| position);
                    match position {
                        Some(position) => operations.update_folder(position, folder),
                        None => OperationResult::fail("Folder not found."),
                    }
                }
                None => operations.add_folder(folder),
            }
        };

        if !result.success {
            show_errors(&status, &[result.message]);
            return;
        }
        if let Some(anchor) = window.transient_for() {
            show_toast_on_widget(&anchor, &result.message, ToastType::Success);
        }
        window.close();
    });

    window.present();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edit_keeps_creation_time() {
        let mut original = SessionFolder::new("Old", "/Work");
        original.created_at = 1.0;
        let renamed = folder_from_form("New", "/Home", Some(&original));
        assert_eq!(renamed.path, "/Home/New");
        assert_eq!(renamed.parent_path, "/Home");
        assert!((renamed.created_at - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn new_folder_at_root() {
        let folder = folder_from_form("Work", "", None);
        assert_eq!(folder.path, "/Work");
        assert!(folder.parent_path.is_empty());
    }
}
