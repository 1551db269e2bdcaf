//! Color scheme picker and custom scheme editor
//!
//! Built-in schemes are read-only; "Duplicate" turns one into an editable
//! custom scheme. Custom schemes sort after the built-ins, so adding or
//! removing one can move the active scheme to another index. The
//! `color_scheme` setting is re-pointed at the same key after every change.

use std::cell::RefCell;
use std::rc::Rc;

use adw::prelude::*;
use gtk4::gdk;
use libadwaita as adw;
use serde_json::json;
use zashterminal_core::signals::AppEvent;
use zashterminal_core::theme::{ColorScheme, SchemeRegistry};

use super::alerts::confirm_destructive;
use super::keyboard::setup_dialog_shortcuts;
use super::widgets::{dialog_header, form_box, form_window, show_errors, status_label};
use super::{apply_setting_logged, flush_settings};
use crate::state::SharedAppState;

const PALETTE_NAMES: [&str; 16] = [
    "Black",
    "Red",
    "Green",
    "Yellow",
    "Blue",
    "Magenta",
    "Cyan",
    "White",
    "Bright Black",
    "Bright Red",
    "Bright Green",
    "Bright Yellow",
    "Bright Blue",
    "Bright Magenta",
    "Bright Cyan",
    "Bright White",
];

/// `#rrggbb` for a GDK color; alpha is dropped
fn rgba_to_hex(rgba: &gdk::RGBA) -> String {
    let channel = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
    format!(
        "#{:02x}{:02x}{:02x}",
        channel(rgba.red()),
        channel(rgba.green()),
        channel(rgba.blue())
    )
}

/// Registry key for a scheme name: lowercase words joined by `_`
fn scheme_key(name: &str) -> String {
    name.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("_")
}

/// Name for a copy of `name` that is not taken yet
fn copy_name(name: &str, taken: impl Fn(&str) -> bool) -> String {
    let base = format!("{name} Copy");
    if !taken(&scheme_key(&base)) {
        return base;
    }
    (2..)
        .map(|n| format!("{base} {n}"))
        .find(|candidate| !taken(&scheme_key(candidate)))
        .unwrap_or(base)
}

fn color_button(color: &str) -> gtk4::ColorDialogButton {
    let dialog = gtk4::ColorDialog::new();
    dialog.set_with_alpha(false);
    let button = gtk4::ColorDialogButton::new(Some(dialog));
    button.set_valign(gtk4::Align::Center);
    if let Ok(rgba) = gdk::RGBA::parse(color) {
        button.set_rgba(&rgba);
    }
    button
}

fn color_row(title: &str, button: &gtk4::ColorDialogButton) -> adw::ActionRow {
    let row = adw::ActionRow::builder().title(title).build();
    row.add_suffix(button);
    row.set_activatable_widget(Some(button));
    row
}

/// Points `color_scheme` at `key` after the order changed
fn reselect(state: &SharedAppState, key: &str) {
    let index = state
        .borrow()
        .settings()
        .with_schemes(|registry| registry.index_of(key));
    if let Some(index) = index {
        apply_setting_logged(state, "color_scheme", json!(index));
        super::emit(state, &AppEvent::ColorSchemeChanged(index));
    }
}

struct SchemeEditor {
    state: SharedAppState,
    window: adw::Window,
    list: gtk4::ListBox,
}

impl SchemeEditor {
    fn refresh(self: &Rc<Self>) {
        while let Some(child) = self.list.first_child() {
            self.list.remove(&child);
        }

        let (entries, active) = {
            let state_ref = self.state.borrow();
            let settings = state_ref.settings();
            let entries: Vec<(String, ColorScheme)> = settings.with_schemes(|registry| {
                registry
                    .scheme_order()
                    .into_iter()
                    .filter_map(|key| registry.get(&key).cloned().map(|s| (key, s)))
                    .collect()
            });
            (entries, settings.color_scheme_name())
        };

        let mut group: Option<gtk4::CheckButton> = None;
        for (key, scheme) in entries {
            let builtin = SchemeRegistry::is_builtin(&key);
            let row = adw::ActionRow::builder()
                .title(&scheme.name)
                .subtitle(if builtin { "Built-in" } else { "Custom" })
                .build();

            let check = gtk4::CheckButton::new();
            check.set_group(group.as_ref());
            check.set_active(key == active);
            group.get_or_insert_with(|| check.clone());
            row.add_prefix(&check);
            row.set_activatable_widget(Some(&check));

            let swatch = gtk4::Label::builder()
                .label(" Aa ")
                .valign(gtk4::Align::Center)
                .css_classes(["monospace"])
                .build();
            let css = gtk4::CssProvider::new();
            css.load_from_string(&format!(
                "label {{ color: {}; background-color: {}; border-radius: 4px; padding: 2px 6px; }}",
                scheme.foreground, scheme.background
            ));
            #[allow(deprecated)]
            swatch
                .style_context()
                .add_provider(&css, gtk4::STYLE_PROVIDER_PRIORITY_APPLICATION);
            row.add_suffix(&swatch);

            {
                let this = Rc::clone(self);
                let key = key.clone();
                check.connect_toggled(move |check| {
                    if check.is_active() {
                        reselect(&this.state, &key);
                    }
                });
            }

            let duplicate = flat_button("edit-copy-symbolic", "Duplicate");
            {
                let this = Rc::clone(self);
                let scheme = scheme.clone();
                duplicate.connect_clicked(move |_| this.duplicate(&scheme));
            }
            row.add_suffix(&duplicate);

            if !builtin {
                let edit = flat_button("document-edit-symbolic", "Edit");
                let this = Rc::clone(self);
                let edit_key = key.clone();
                let edit_scheme = scheme.clone();
                edit.connect_clicked(move |_| this.edit(Some(edit_key.clone()), edit_scheme.clone()));
                row.add_suffix(&edit);

                let delete = flat_button("user-trash-symbolic", "Delete");
                let this = Rc::clone(self);
                delete.connect_clicked(move |button| this.delete(button, &key));
                row.add_suffix(&delete);
            }
            self.list.append(&row);
        }
    }

    fn duplicate(self: &Rc<Self>, scheme: &ColorScheme) {
        let name = {
            let state_ref = self.state.borrow();
            state_ref
                .settings()
                .with_schemes(|registry| copy_name(&scheme.name, |key| registry.get(key).is_some()))
        };
        let copy = ColorScheme {
            name,
            ..scheme.clone()
        };
        self.edit(None, copy);
    }

    fn delete(self: &Rc<Self>, anchor: &gtk4::Button, key: &str) {
        let this = Rc::clone(self);
        let key = key.to_string();
        confirm_destructive(
            anchor,
            "Delete Color Scheme?",
            &format!("The custom scheme '{key}' will be removed."),
            "Delete",
            move || {
                let active = this.state.borrow().settings().color_scheme_name();
                let removed = this.state.borrow().settings().remove_custom_scheme(&key);
                match removed {
                    Ok(()) => {
                        tracing::info!(scheme = %key, "Custom scheme deleted");
                        // Removing the active scheme already fell back to the first one
                        if active != key {
                            reselect(&this.state, &active);
                        }
                    }
                    Err(e) => tracing::error!(scheme = %key, error = %e, "Failed to delete scheme"),
                }
                this.refresh();
            },
        );
    }

    /// Opens the form for a custom scheme; `original_key` is `None` for a
    /// new scheme
    fn edit(self: &Rc<Self>, original_key: Option<String>, scheme: ColorScheme) {
        let (header, cancel_btn, save_btn) = dialog_header("Cancel", "Save");
        let content = form_box();
        let status = status_label();
        content.append(&status);

        let name_row = adw::EntryRow::builder().title("Name").build();
        name_row.set_text(&scheme.name);
        let foreground = color_button(&scheme.foreground);
        let background = color_button(&scheme.background);
        let cursor = color_button(scheme.cursor());
        let headerbar = color_button(scheme.headerbar_background());

        let general = adw::PreferencesGroup::builder().title("Scheme").build();
        general.add(&name_row);
        general.add(&color_row("Foreground", &foreground));
        general.add(&color_row("Background", &background));
        general.add(&color_row("Cursor", &cursor));
        general.add(&color_row("Header Bar", &headerbar));
        content.append(&general);

        let palette_group = adw::PreferencesGroup::builder().title("Palette").build();
        let palette: Vec<gtk4::ColorDialogButton> = PALETTE_NAMES
            .iter()
            .enumerate()
            .map(|(i, label)| {
                let color = scheme.palette.get(i).map_or("#000000", String::as_str);
                let button = color_button(color);
                palette_group.add(&color_row(label, &button));
                button
            })
            .collect();
        content.append(&palette_group);

        let title = if original_key.is_some() { "Edit Color Scheme" } else { "New Color Scheme" };
        let window = form_window(Some(self.window.upcast_ref::<gtk4::Window>()), title, 460, &header, &content);
        window.set_default_height(620);
        setup_dialog_shortcuts(&window, Some(&save_btn));

        let window_weak = window.downgrade();
        cancel_btn.connect_clicked(move |_| {
            if let Some(window) = window_weak.upgrade() {
                window.close();
            }
        });

        let this = Rc::clone(self);
        let window_weak = window.downgrade();
        save_btn.connect_clicked(move |_| {
            let Some(window) = window_weak.upgrade() else {
                return;
            };
            let name = name_row.text().trim().to_string();
            let key = scheme_key(&name);
            if key.is_empty() {
                show_errors(&status, &["Scheme name is required.".to_string()]);
                return;
            }
            if SchemeRegistry::is_builtin(&key) {
                show_errors(&status, &[format!("'{name}' is the name of a built-in scheme.")]);
                return;
            }

            let edited = ColorScheme {
                name,
                foreground: rgba_to_hex(&foreground.rgba()),
                background: rgba_to_hex(&background.rgba()),
                cursor: Some(rgba_to_hex(&cursor.rgba())),
                headerbar_background: Some(rgba_to_hex(&headerbar.rgba())),
                palette: palette.iter().map(|b| rgba_to_hex(&b.rgba())).collect(),
            };

            let active = this.state.borrow().settings().color_scheme_name();
            let saved = {
                let state_ref = this.state.borrow();
                let settings = state_ref.settings();
                let renamed_from = original_key.as_deref().filter(|old| *old != key);
                settings.upsert_custom_scheme(&key, edited).and_then(|()| match renamed_from {
                    Some(old) => settings.remove_custom_scheme(old),
                    None => Ok(()),
                })
            };
            if let Err(e) = saved {
                show_errors(&status, &[e.to_string()]);
                return;
            }
            tracing::info!(scheme = %key, "Custom scheme saved");

            let edited_active = original_key.as_deref() == Some(active.as_str());
            reselect(&this.state, if edited_active { &key } else { &active });
            this.refresh();
            window.close();
        });

        window.present();
    }
}

fn flat_button(icon: &str, tooltip: &str) -> gtk4::Button {
    gtk4::Button::builder()
        .icon_name(icon)
        .tooltip_text(tooltip)
        .valign(gtk4::Align::Center)
        .css_classes(["flat"])
        .build()
}

/// Opens the color scheme window
pub fn show_scheme_editor(parent: Option<&gtk4::Window>, state: &SharedAppState) {
    let (header, new_btn, done_btn) = dialog_header("New", "Done");
    let list = gtk4::ListBox::builder()
        .selection_mode(gtk4::SelectionMode::None)
        .css_classes(["boxed-list"])
        .build();
    let content = form_box();
    content.append(&list);

    let window = form_window(parent, "Color Schemes", 520, &header, &content);
    window.set_default_height(600);
    setup_dialog_shortcuts(&window, None);

    let editor = Rc::new(SchemeEditor {
        state: Rc::clone(state),
        window: window.clone(),
        list,
    });
    editor.refresh();

    {
        let editor = Rc::clone(&editor);
        new_btn.connect_clicked(move |_| {
            let current = editor.state.borrow().settings().color_scheme();
            editor.duplicate(&current);
        });
    }
    let window_weak = window.downgrade();
    done_btn.connect_clicked(move |_| {
        if let Some(window) = window_weak.upgrade() {
            window.close();
        }
    });

    // The editor holds the window; release it on close
    let holder = RefCell::new(Some(editor));
    let state = Rc::clone(state);
    window.connect_close_request(move |_| {
        holder.borrow_mut().take();
        flush_settings(&state);
        gtk4::glib::Propagation::Proceed
    });

    window.present();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_from_names() {
        assert_eq!(scheme_key("My Dark  Scheme"), "my_dark_scheme");
        assert_eq!(scheme_key("   "), "");
    }

    #[test]
    fn copy_names_skip_taken() {
        assert_eq!(copy_name("Dracula", |_| false), "Dracula Copy");
        let taken = |key: &str| key == "dracula_copy" || key == "dracula_copy_2";
        assert_eq!(copy_name("Dracula", taken), "Dracula Copy 3");
    }

    #[test]
    fn hex_from_rgba() {
        let rgba = gdk::RGBA::new(1.0, 0.0, 0.5, 1.0);
        assert_eq!(rgba_to_hex(&rgba), "#ff0080");
    }
}
