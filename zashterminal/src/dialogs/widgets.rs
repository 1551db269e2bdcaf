//! Building blocks shared by the form dialogs

use adw::prelude::*;
use gtk4::{Button, Label};
use libadwaita as adw;

use crate::state::SharedAppState;

/// Label of the root entry in folder pickers
pub const ROOT_FOLDER: &str = "(Root)";

/// Header bar with a plain start button and a suggested end button
///
/// Returns `(header, start_button, end_button)`.
#[must_use]
pub fn dialog_header(start_label: &str, end_label: &str) -> (adw::HeaderBar, Button, Button) {
    let header = adw::HeaderBar::new();
    header.set_show_end_title_buttons(false);
    header.set_show_start_title_buttons(false);

    let start_btn = Button::builder().label(start_label).build();
    let end_btn = Button::builder()
        .label(end_label)
        .css_classes(["suggested-action"])
        .build();

    header.pack_start(&start_btn);
    header.pack_end(&end_btn);

    (header, start_btn, end_btn)
}

/// Modal window holding `content` under `header`
#[must_use]
pub fn form_window(
    parent: Option<&gtk4::Window>,
    title: &str,
    width: i32,
    header: &adw::HeaderBar,
    content: &impl IsA<gtk4::Widget>,
) -> adw::Window {
    let window = adw::Window::builder()
        .title(title)
        .modal(true)
        .default_width(width)
        .build();
    window.set_transient_for(parent);

    let clamp = adw::Clamp::builder()
        .maximum_size(width)
        .tightening_threshold(width * 3 / 4)
        .child(content)
        .build();
    let scrolled = gtk4::ScrolledWindow::builder()
        .hscrollbar_policy(gtk4::PolicyType::Never)
        .vexpand(true)
        .child(&clamp)
        .build();

    let toolbar_view = adw::ToolbarView::new();
    toolbar_view.add_top_bar(header);
    toolbar_view.set_content(Some(&scrolled));
    window.set_content(Some(&toolbar_view));
    window
}

/// Vertical box with the standard dialog margins
#[must_use]
pub fn form_box() -> gtk4::Box {
    let content = gtk4::Box::new(gtk4::Orientation::Vertical, 12);
    content.set_margin_top(12);
    content.set_margin_bottom(12);
    content.set_margin_start(12);
    content.set_margin_end(12);
    content
}

/// Hidden label for validation messages
#[must_use]
pub fn status_label() -> Label {
    Label::builder()
        .wrap(true)
        .xalign(0.0)
        .visible(false)
        .css_classes(["error"])
        .build()
}

/// Shows `errors` one per line, or hides the label when empty
pub fn show_errors(label: &Label, errors: &[String]) {
    if errors.is_empty() {
        label.set_visible(false);
    } else {
        label.set_text(&errors.join("\n"));
        label.set_visible(true);
    }
}

/// Combo row listing the root plus every folder path.
///
/// Returns the row and the paths in display order; index 0 is the root
/// (`""`).
#[must_use]
pub fn folder_combo(title: &str, folder_paths: &[String], selected: &str) -> (adw::ComboRow, Vec<String>) {
    let mut paths = vec![String::new()];
    paths.extend(folder_paths.iter().cloned());
    paths.sort();
    paths.dedup();

    let labels: Vec<&str> = paths
        .iter()
        .map(|p| if p.is_empty() { ROOT_FOLDER } else { p.as_str() })
        .collect();
    let row = adw::ComboRow::builder()
        .title(title)
        .model(&gtk4::StringList::new(&labels))
        .build();
    let index = paths.iter().position(|p| p == selected).unwrap_or(0);
    row.set_selected(u32::try_from(index).unwrap_or(0));
    (row, paths)
}

/// Folder path currently selected in a [`folder_combo`] row
#[must_use]
pub fn selected_folder(row: &adw::ComboRow, paths: &[String]) -> String {
    usize::try_from(row.selected())
        .ok()
        .and_then(|i| paths.get(i))
        .cloned()
        .unwrap_or_default()
}

/// Parent window of `widget`, if it is realized inside one
#[must_use]
pub fn parent_window(widget: &impl IsA<gtk4::Widget>) -> Option<gtk4::Window> {
    widget.root().and_downcast::<gtk4::Window>()
}

/// Every folder path, for [`folder_combo`]
#[must_use]
pub fn folder_paths(state: &SharedAppState) -> Vec<String> {
    state
        .borrow()
        .operations()
        .folders()
        .iter()
        .map(|f| f.path.clone())
        .collect()
}
