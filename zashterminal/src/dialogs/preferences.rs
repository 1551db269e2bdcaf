//! Preferences dialog
//!
//! Every row writes its setting through [`super::apply_setting`] as soon as
//! it changes, so open windows update live. The file is written when the
//! dialog closes.

use std::rc::Rc;

use adw::prelude::*;
use gtk4::pango;
use libadwaita as adw;
use serde_json::{Value, json};
use zashterminal_core::layout::{RESTORE_ALWAYS, RESTORE_ASK, RESTORE_NEVER};
use zashterminal_core::signals::AppEvent;

use super::alerts::confirm_destructive;
use super::{apply_setting_logged, flush_settings};
use crate::state::SharedAppState;

const THEMES: &[(&str, &str)] = &[
    ("terminal", "Follow Terminal Scheme"),
    ("default", "System Default"),
    ("light", "Light"),
    ("dark", "Dark"),
];
const TAB_ALIGNMENTS: &[(&str, &str)] = &[("center", "Expanded"), ("left", "Left")];
const HEADERBAR_BUTTONS: &[(&str, &str)] = &[
    ("auto", "Automatic"),
    ("always", "Always Hide"),
    ("never", "Never Hide"),
];
const INSTANCE_BEHAVIORS: &[(&str, &str)] = &[
    ("new_tab", "Open a New Tab"),
    ("new_window", "Open a New Window"),
    ("focus_existing", "Focus the Open Window"),
];
const RESTORE_POLICIES: &[(&str, &str)] = &[
    (RESTORE_NEVER, "Never"),
    (RESTORE_ASK, "Ask"),
    (RESTORE_ALWAYS, "Always"),
];
const LOG_LEVELS: &[(&str, &str)] = &[
    ("ERROR", "Error"),
    ("WARNING", "Warning"),
    ("INFO", "Info"),
    ("DEBUG", "Debug"),
];
const CURSOR_SHAPES: &[&str] = &["Block", "I-Beam", "Underline"];
const CURSOR_BLINK: &[&str] = &["Follow System", "On", "Off"];
const TEXT_BLINK: &[&str] = &["When Focused", "When Unfocused"];
const BACKSPACE_BINDINGS: &[&str] = &["Automatic", "ASCII Backspace", "ASCII Delete", "Escape Sequence"];
const DELETE_BINDINGS: &[&str] = &["Automatic", "ASCII Delete", "Escape Sequence"];
const CJK_WIDTHS: &[&str] = &["Narrow", "Wide"];

/// Binds rows to settings keys
struct Binder {
    state: SharedAppState,
}

impl Binder {
    fn switch(&self, key: &str, title: &str, subtitle: Option<&str>) -> adw::SwitchRow {
        let active = self.state.borrow().settings().get_bool(key, false);
        let row = adw::SwitchRow::builder().title(title).active(active).build();
        if let Some(subtitle) = subtitle {
            row.set_subtitle(subtitle);
        }
        let state = Rc::clone(&self.state);
        let key = key.to_string();
        row.connect_active_notify(move |row| {
            apply_setting_logged(&state, &key, Value::Bool(row.is_active()));
        });
        row
    }

    /// Combo over string values; unknown stored values select the first
    /// choice
    fn choice(&self, key: &str, title: &str, choices: &'static [(&'static str, &'static str)]) -> adw::ComboRow {
        let current = self.state.borrow().settings().get_string(key, choices[0].0);
        let labels: Vec<&str> = choices.iter().map(|(_, label)| *label).collect();
        let row = adw::ComboRow::builder()
            .title(title)
            .model(&gtk4::StringList::new(&labels))
            .build();
        let index = choices.iter().position(|(v, _)| *v == current).unwrap_or(0);
        row.set_selected(index as u32);

        let state = Rc::clone(&self.state);
        let key = key.to_string();
        row.connect_selected_notify(move |row| {
            if let Some((value, _)) = choices.get(row.selected() as usize) {
                apply_setting_logged(&state, &key, json!(value));
            }
        });
        row
    }

    /// Combo over an integer-indexed setting
    fn index(&self, key: &str, title: &str, labels: &[&str]) -> adw::ComboRow {
        let current = self.state.borrow().settings().get_i64(key, 0);
        let row = adw::ComboRow::builder()
            .title(title)
            .model(&gtk4::StringList::new(labels))
            .build();
        row.set_selected(u32::try_from(current).unwrap_or(0));

        let state = Rc::clone(&self.state);
        let key = key.to_string();
        row.connect_selected_notify(move |row| {
            apply_setting_logged(&state, &key, json!(row.selected()));
        });
        row
    }

    fn spin(&self, key: &str, title: &str, range: (f64, f64, f64), digits: u32) -> adw::SpinRow {
        let current = self.state.borrow().settings().get_f64(key, range.0);
        let row = adw::SpinRow::with_range(range.0, range.1, range.2);
        row.set_title(title);
        row.set_digits(digits);
        row.set_value(current);

        let state = Rc::clone(&self.state);
        let key = key.to_string();
        row.connect_value_notify(move |row| {
            let value = if digits == 0 {
                json!(row.value().round() as i64)
            } else {
                json!(row.value())
            };
            apply_setting_logged(&state, &key, value);
        });
        row
    }

    fn entry(&self, key: &str, title: &str) -> adw::EntryRow {
        let current = self.state.borrow().settings().get_string(key, "");
        let row = adw::EntryRow::builder()
            .title(title)
            .show_apply_button(true)
            .build();
        row.set_text(&current);

        let state = Rc::clone(&self.state);
        let key = key.to_string();
        row.connect_apply(move |row| {
            apply_setting_logged(&state, &key, Value::String(row.text().to_string()));
        });
        row
    }
}

fn scheme_row(state: &SharedAppState) -> adw::ComboRow {
    let (names, selected) = {
        let state_ref = state.borrow();
        let settings = state_ref.settings();
        let names: Vec<String> = settings.with_schemes(|registry| {
            registry
                .scheme_order()
                .iter()
                .map(|key| registry.get(key).map_or_else(|| key.clone(), |s| s.name.clone()))
                .collect()
        });
        (names, settings.color_scheme_index())
    };
    let labels: Vec<&str> = names.iter().map(String::as_str).collect();
    let row = adw::ComboRow::builder()
        .title("Color Scheme")
        .model(&gtk4::StringList::new(&labels))
        .build();
    row.set_selected(selected as u32);

    let state = Rc::clone(state);
    row.connect_selected_notify(move |row| {
        let index = row.selected() as usize;
        apply_setting_logged(&state, "color_scheme", json!(index));
        super::emit(&state, &AppEvent::ColorSchemeChanged(index));
    });
    row
}

fn font_row(state: &SharedAppState) -> adw::ActionRow {
    let font = state.borrow().settings().font();
    let button = gtk4::FontDialogButton::new(Some(gtk4::FontDialog::new()));
    button.set_level(gtk4::FontLevel::Font);
    button.set_valign(gtk4::Align::Center);
    button.set_font_desc(&pango::FontDescription::from_string(&font));

    let state = Rc::clone(state);
    button.connect_font_desc_notify(move |button| {
        if let Some(desc) = button.font_desc() {
            apply_setting_logged(&state, "font", Value::String(desc.to_string()));
        }
    });

    let row = adw::ActionRow::builder().title("Font").build();
    row.add_suffix(&button);
    row.set_activatable_widget(Some(&button));
    row
}

fn appearance_page(binder: &Binder) -> adw::PreferencesPage {
    let page = adw::PreferencesPage::builder()
        .title("Appearance")
        .icon_name("applications-graphics-symbolic")
        .build();

    let theme = adw::PreferencesGroup::builder().title("Theme").build();
    theme.add(&binder.choice("gtk_theme", "Window Style", THEMES));
    theme.add(&scheme_row(&binder.state));
    theme.add(&binder.spin("transparency", "Terminal Transparency", (0.0, 100.0, 1.0), 0));
    theme.add(&binder.spin("headerbar_transparency", "Header Bar Transparency", (0.0, 100.0, 1.0), 0));
    page.add(&theme);

    let text = adw::PreferencesGroup::builder().title("Text").build();
    text.add(&font_row(&binder.state));
    text.add(&binder.spin("font_scale", "Font Scale", (0.5, 3.0, 0.1), 2));
    text.add(&binder.spin("line_spacing", "Line Spacing", (1.0, 2.0, 0.05), 2));
    text.add(&binder.switch("bold_is_bright", "Bold Text Uses Bright Colors", None));
    page.add(&text);

    let window = adw::PreferencesGroup::builder().title("Window").build();
    window.add(&binder.choice("tab_alignment", "Tabs", TAB_ALIGNMENTS));
    window.add(&binder.choice(
        "hide_headerbar_buttons_when_maximized",
        "Hide Window Buttons When Maximized",
        HEADERBAR_BUTTONS,
    ));
    window.add(&binder.switch("remember_window_state", "Remember Window Size", None));
    window.add(&binder.switch(
        "auto_hide_sidebar",
        "Sessions Panel as Overlay",
        Some("Show the sessions panel over the terminal instead of beside it"),
    ));
    page.add(&window);
    page
}

fn terminal_page(binder: &Binder) -> adw::PreferencesPage {
    let page = adw::PreferencesPage::builder()
        .title("Terminal")
        .icon_name("utilities-terminal-symbolic")
        .build();

    let cursor = adw::PreferencesGroup::builder().title("Cursor").build();
    cursor.add(&binder.index("cursor_shape", "Shape", CURSOR_SHAPES));
    cursor.add(&binder.index("cursor_blink", "Blinking", CURSOR_BLINK));
    cursor.add(&binder.index("text_blink_mode", "Blinking Text", TEXT_BLINK));
    page.add(&cursor);

    let scrolling = adw::PreferencesGroup::builder().title("Scrolling").build();
    scrolling.add(&binder.spin("scrollback_lines", "Scrollback Lines", (0.0, 1_000_000.0, 1000.0), 0));
    scrolling.add(&binder.switch("scroll_on_output", "Scroll on Output", None));
    scrolling.add(&binder.switch("scroll_on_keystroke", "Scroll on Keystroke", None));
    scrolling.add(&binder.switch("scroll_on_insert", "Scroll on Paste", None));
    scrolling.add(&binder.spin(
        "mouse_scroll_sensitivity",
        "Mouse Scroll Sensitivity",
        (1.0, 100.0, 1.0),
        0,
    ));
    scrolling.add(&binder.spin(
        "touchpad_scroll_sensitivity",
        "Touchpad Scroll Sensitivity",
        (1.0, 100.0, 1.0),
        0,
    ));
    page.add(&scrolling);

    let input = adw::PreferencesGroup::builder().title("Input").build();
    input.add(&binder.switch("mouse_autohide", "Hide Mouse Pointer While Typing", None));
    input.add(&binder.switch("bell_sound", "Terminal Bell", None));
    input.add(&binder.index("backspace_binding", "Backspace Key", BACKSPACE_BINDINGS));
    input.add(&binder.index("delete_binding", "Delete Key", DELETE_BINDINGS));
    input.add(&binder.entry("word_char_exceptions", "Word Characters"));
    page.add(&input);

    let text = adw::PreferencesGroup::builder().title("Text Rendering").build();
    text.add(&binder.index("cjk_ambiguous_width", "Ambiguous-Width Characters", CJK_WIDTHS));
    text.add(&binder.switch("bidi_enabled", "Bidirectional Text", None));
    text.add(&binder.switch("enable_shaping", "Arabic Shaping", None));
    text.add(&binder.switch("sixel_enabled", "Sixel Images", None));
    text.add(&binder.switch("accessibility_enabled", "Accessibility Support", None));
    page.add(&text);
    page
}

fn behavior_page(binder: &Binder) -> adw::PreferencesPage {
    let page = adw::PreferencesPage::builder()
        .title("Behavior")
        .icon_name("preferences-system-symbolic")
        .build();

    let startup = adw::PreferencesGroup::builder().title("Startup").build();
    startup.add(&binder.choice("session_restore_policy", "Restore Previous Tabs", RESTORE_POLICIES));
    startup.add(&binder.choice("new_instance_behavior", "When Launched Again", INSTANCE_BEHAVIORS));
    startup.add(&binder.switch("use_login_shell", "Run Shell as Login Shell", None));
    page.add(&startup);

    let ssh = adw::PreferencesGroup::builder().title("SSH").build();
    ssh.add(&binder.spin(
        "ssh_control_persist_duration",
        "Connection Sharing Timeout",
        (0.0, 3600.0, 10.0),
        0,
    ));
    page.add(&ssh);

    let logging = adw::PreferencesGroup::builder().title("Logging").build();
    logging.add(&binder.choice("console_log_level", "Console Log Level", LOG_LEVELS));
    logging.add(&binder.switch("log_to_file", "Write Log File", None));
    page.add(&logging);
    page
}

fn reset_group(state: &SharedAppState, dialog: &adw::PreferencesDialog) -> adw::PreferencesGroup {
    let button = gtk4::Button::builder()
        .label("Reset All Settings")
        .css_classes(["destructive-action", "pill"])
        .halign(gtk4::Align::Center)
        .build();
    let group = adw::PreferencesGroup::new();
    group.add(&button);

    let state = Rc::clone(state);
    let dialog_weak = dialog.downgrade();
    button.connect_clicked(move |button| {
        let state = Rc::clone(&state);
        let dialog_weak = dialog_weak.clone();
        confirm_destructive(
            button,
            "Reset All Settings?",
            "Every preference, shortcut and color choice returns to its default.",
            "Reset",
            move || {
                if let Err(e) = state.borrow().settings().reset_to_defaults(None) {
                    tracing::error!(error = %e, "Failed to reset settings");
                    return;
                }
                if let Some(dialog) = dialog_weak.upgrade() {
                    dialog.close();
                }
            },
        );
    });
    group
}

/// Opens the preferences dialog over `parent`
pub fn show_preferences_dialog(parent: &impl IsA<gtk4::Widget>, state: &SharedAppState) {
    let dialog = adw::PreferencesDialog::new();
    dialog.set_title("Preferences");
    dialog.set_search_enabled(true);

    let binder = Binder {
        state: Rc::clone(state),
    };
    dialog.add(&appearance_page(&binder));
    dialog.add(&terminal_page(&binder));
    let behavior = behavior_page(&binder);
    behavior.add(&reset_group(state, &dialog));
    dialog.add(&behavior);

    let state = Rc::clone(state);
    dialog.connect_closed(move |_| flush_settings(&state));
    dialog.present(Some(parent));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn restore_choices_cover_every_policy() {
        let values: Vec<&str> = RESTORE_POLICIES.iter().map(|(v, _)| *v).collect();
        assert_eq!(values, vec![RESTORE_NEVER, RESTORE_ASK, RESTORE_ALWAYS]);
    }

    #[test]
    fn first_choice_matches_defaults() {
        let defaults = zashterminal_core::config::default_settings("Monospace 10");
        assert_eq!(defaults["gtk_theme"], THEMES[0].0);
        assert_eq!(defaults["tab_alignment"], TAB_ALIGNMENTS[0].0);
        assert_eq!(defaults["new_instance_behavior"], INSTANCE_BEHAVIORS[0].0);
        assert_eq!(defaults["console_log_level"], LOG_LEVELS[0].0);
    }
}
