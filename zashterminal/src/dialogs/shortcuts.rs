//! Keyboard shortcuts editor
//!
//! Changes apply to the application immediately. An accelerator can belong
//! to one action only; assigning it elsewhere unbinds the previous owner.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use adw::prelude::*;
use gtk4::glib;
use gtk4::{Button, EventControllerKey, Label};
use libadwaita as adw;
use zashterminal_core::config::keybindings::{accelerator_to_label, is_valid_accelerator};
use zashterminal_core::config::{KeybindingCategory, KeybindingDef, default_keybindings};

use super::keyboard::is_modifier_key;
use crate::state::SharedAppState;

type AccelLabels = Rc<RefCell<HashMap<String, Label>>>;

fn display(accel: &str) -> String {
    if accel.is_empty() {
        "Disabled".to_string()
    } else {
        accelerator_to_label(accel)
    }
}

/// Stores `accel` for `action` and installs it on `app`
fn assign(state: &SharedAppState, app: &gtk4::Application, action: &str, accel: &str) {
    let saved = state.borrow().settings().set_shortcut(action, accel);
    if let Err(e) = saved {
        tracing::warn!(action, accel, error = %e, "Shortcut rejected");
        return;
    }
    let detailed = format!("app.{action}");
    if accel.is_empty() {
        app.set_accels_for_action(&detailed, &[]);
    } else {
        app.set_accels_for_action(&detailed, &[accel]);
    }
    tracing::debug!(action, accel, "Shortcut changed");
}

/// Other action already using `accel`
fn owner_of(state: &SharedAppState, accel: &str, except: &str) -> Option<String> {
    let state_ref = state.borrow();
    let settings = state_ref.settings();
    default_keybindings()
        .into_iter()
        .map(|def| def.action)
        .find(|action| action != except && settings.get_shortcut(action) == accel)
}

struct ShortcutRow {
    state: SharedAppState,
    app: gtk4::Application,
    labels: AccelLabels,
}

impl ShortcutRow {
    fn build(&self, def: &KeybindingDef) -> adw::ActionRow {
        let current = self.state.borrow().settings().get_shortcut(&def.action);
        let row = adw::ActionRow::builder()
            .title(&def.label)
            .subtitle(&def.action)
            .build();

        let accel_label = Label::builder()
            .label(display(&current))
            .css_classes(["dim-label"])
            .valign(gtk4::Align::Center)
            .build();
        let record_btn = Button::builder()
            .label("Record")
            .valign(gtk4::Align::Center)
            .tooltip_text("Press a key combination to set a new shortcut")
            .build();
        let clear_btn = Button::builder()
            .icon_name("edit-clear-symbolic")
            .valign(gtk4::Align::Center)
            .tooltip_text("Disable shortcut")
            .css_classes(["flat"])
            .build();
        let reset_btn = Button::builder()
            .icon_name("edit-undo-symbolic")
            .valign(gtk4::Align::Center)
            .tooltip_text("Reset to default")
            .css_classes(["flat"])
            .build();

        row.add_suffix(&accel_label);
        row.add_suffix(&record_btn);
        row.add_suffix(&clear_btn);
        row.add_suffix(&reset_btn);
        self.labels
            .borrow_mut()
            .insert(def.action.clone(), accel_label.clone());

        {
            let state = Rc::clone(&self.state);
            let app = self.app.clone();
            let labels = Rc::clone(&self.labels);
            let action = def.action.clone();
            record_btn.connect_clicked(move |btn| {
                start_recording(btn, &state, &app, &labels, &action);
            });
        }
        {
            let state = Rc::clone(&self.state);
            let app = self.app.clone();
            let action = def.action.clone();
            let label = accel_label.clone();
            clear_btn.connect_clicked(move |_| {
                assign(&state, &app, &action, "");
                label.set_label(&display(""));
            });
        }
        {
            let state = Rc::clone(&self.state);
            let app = self.app.clone();
            let labels = Rc::clone(&self.labels);
            let action = def.action.clone();
            let default_accel = def.default_accel.clone();
            reset_btn.connect_clicked(move |_| {
                set_with_takeover(&state, &app, &labels, &action, &default_accel);
            });
        }
        row
    }
}

/// Assigns `accel`, first unbinding any other action holding it
fn set_with_takeover(
    state: &SharedAppState,
    app: &gtk4::Application,
    labels: &AccelLabels,
    action: &str,
    accel: &str,
) {
    if !accel.is_empty()
        && let Some(owner) = owner_of(state, accel, action)
    {
        assign(state, app, &owner, "");
        if let Some(label) = labels.borrow().get(&owner) {
            label.set_label(&display(""));
        }
        tracing::info!(action, previous = %owner, accel, "Shortcut moved");
    }
    assign(state, app, action, accel);
    if let Some(label) = labels.borrow().get(action) {
        label.set_label(&display(accel));
    }
}

fn start_recording(
    btn: &Button,
    state: &SharedAppState,
    app: &gtk4::Application,
    labels: &AccelLabels,
    action: &str,
) {
    btn.set_label("Press keys...");
    btn.set_sensitive(false);

    let key_ctrl = EventControllerKey::new();
    let state = Rc::clone(state);
    let app = app.clone();
    let labels = Rc::clone(labels);
    let action = action.to_string();
    let record = btn.clone();

    key_ctrl.connect_key_pressed(move |ctrl, keyval, _keycode, modifier| {
        if is_modifier_key(keyval) {
            return glib::Propagation::Proceed;
        }
        if keyval != gtk4::gdk::Key::Escape {
            let mods = modifier & gtk4::accelerator_get_default_mod_mask();
            let accel = gtk4::accelerator_name(keyval, mods).to_string();
            if is_valid_accelerator(&accel) {
                set_with_takeover(&state, &app, &labels, &action, &accel);
            }
        }
        record.set_label("Record");
        record.set_sensitive(true);
        if let Some(widget) = ctrl.widget() {
            widget.remove_controller(ctrl);
        }
        glib::Propagation::Stop
    });

    if let Some(toplevel) = btn.root() {
        toplevel.add_controller(key_ctrl);
    }
}

/// Opens the shortcut editor over `parent`
pub fn show_shortcuts_dialog(parent: &impl IsA<gtk4::Widget>, state: &SharedAppState, app: &gtk4::Application) {
    let dialog = adw::PreferencesDialog::new();
    dialog.set_title("Keyboard Shortcuts");
    dialog.set_search_enabled(true);

    let page = adw::PreferencesPage::builder()
        .title("Shortcuts")
        .icon_name("preferences-desktop-keyboard-symbolic")
        .build();
    let builder = ShortcutRow {
        state: Rc::clone(state),
        app: app.clone(),
        labels: Rc::new(RefCell::new(HashMap::new())),
    };

    let defaults = default_keybindings();
    for category in KeybindingCategory::all() {
        let defs: Vec<&KeybindingDef> = defaults.iter().filter(|d| d.category == *category).collect();
        if defs.is_empty() {
            continue;
        }
        let group = adw::PreferencesGroup::builder().title(category.label()).build();
        for def in defs {
            group.add(&builder.build(def));
        }
        page.add(&group);
    }

    let reset_all_btn = Button::builder()
        .label("Reset All to Defaults")
        .css_classes(["destructive-action"])
        .halign(gtk4::Align::Center)
        .build();
    {
        let state = Rc::clone(state);
        let app = app.clone();
        let labels = Rc::clone(&builder.labels);
        reset_all_btn.connect_clicked(move |_| {
            if let Err(e) = state.borrow().settings().reset_to_defaults(Some(&["shortcuts"])) {
                tracing::error!(error = %e, "Failed to reset shortcuts");
                return;
            }
            for def in default_keybindings() {
                app.set_accels_for_action(&def.detailed_action(), &[def.default_accel.as_str()]);
                if let Some(label) = labels.borrow().get(&def.action) {
                    label.set_label(&display(&def.default_accel));
                }
            }
        });
    }
    let reset_group = adw::PreferencesGroup::new();
    reset_group.add(&reset_all_btn);
    page.add(&reset_group);

    dialog.add(&page);
    dialog.present(Some(parent));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_accelerator_reads_disabled() {
        assert_eq!(display(""), "Disabled");
        assert_ne!(display("<Control>plus"), "Disabled");
    }
}
