//! Save the window's tabs as a named layout

use std::rc::Rc;

use adw::prelude::*;
use libadwaita as adw;
use zashterminal_core::layout::SavedLayout;
use zashterminal_core::signals::AppEvent;

use super::alerts::confirm_destructive;
use super::keyboard::{setup_dialog_shortcuts, setup_entry_activation};
use super::widgets::{
    dialog_header, folder_combo, folder_paths, form_box, form_window, selected_folder,
    show_errors, status_label,
};
use crate::state::SharedAppState;
use crate::toast::{ToastType, show_toast_on_widget};

fn write_layout(state: &SharedAppState, name: &str, layout: &SavedLayout, anchor: Option<&gtk4::Window>) {
    let saved = state.borrow().layouts().save(name, layout);
    match saved {
        Ok(path) => {
            tracing::info!(layout = name, path = %path.display(), "Layout saved");
            super::emit(state, &AppEvent::RequestTreeRefresh);
            if let Some(anchor) = anchor {
                show_toast_on_widget(anchor, &format!("Layout '{name}' saved"), ToastType::Success);
            }
        }
        Err(e) => {
            tracing::error!(layout = name, error = %e, "Failed to save layout");
            if let Some(anchor) = anchor {
                show_toast_on_widget(anchor, &format!("Failed to save layout: {e}"), ToastType::Error);
            }
        }
    }
}

/// Asks for a name and folder, then stores `snapshot(folder)`.
///
/// An existing layout with the same name is replaced after confirmation.
pub fn show_save_layout_dialog(
    parent: Option<&gtk4::Window>,
    state: &SharedAppState,
    default_folder: &str,
    snapshot: impl Fn(&str) -> SavedLayout + 'static,
) {
    let (header, cancel_btn, save_btn) = dialog_header("Cancel", "Save");
    let content = form_box();
    let status = status_label();
    content.append(&status);

    let name_row = adw::EntryRow::builder().title("Layout Name").build();
    let (folder_row, paths) = folder_combo("Folder", &folder_paths(state), default_folder);
    let group = adw::PreferencesGroup::builder()
        .description("Saves every open tab with its split panes")
        .build();
    group.add(&name_row);
    group.add(&folder_row);
    content.append(&group);

    let window = form_window(parent, "Save Layout", 420, &header, &content);
    setup_dialog_shortcuts(&window, Some(&save_btn));
    setup_entry_activation(&name_row, &save_btn);

    let window_weak = window.downgrade();
    cancel_btn.connect_clicked(move |_| {
        if let Some(window) = window_weak.upgrade() {
            window.close();
        }
    });

    let state = Rc::clone(state);
    let snapshot = Rc::new(snapshot);
    let window_weak = window.downgrade();
    save_btn.connect_clicked(move |_| {
        let Some(window) = window_weak.upgrade() else {
            return;
        };
        let name = name_row.text().trim().to_string();
        if name.is_empty() {
            show_errors(&status, &["Layout name is required.".to_string()]);
            return;
        }
        let layout = snapshot(&selected_folder(&folder_row, &paths));
        if layout.tabs.is_empty() {
            show_errors(&status, &["There are no open tabs to save.".to_string()]);
            return;
        }

        let anchor = window.transient_for();
        let exists = state.borrow().layouts().path_for(&name).exists();
        window.close();
        if exists {
            let Some(confirm_parent) = anchor.clone() else {
                return;
            };
            let state = Rc::clone(&state);
            confirm_destructive(
                &confirm_parent,
                "Replace Layout?",
                &format!("A layout named '{name}' already exists."),
                "Replace",
                move || write_layout(&state, &name, &layout, anchor.as_ref()),
            );
        } else {
            write_layout(&state, &name, &layout, anchor.as_ref());
        }
    });

    window.present();
}
