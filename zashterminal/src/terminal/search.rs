//! In-terminal search bar
//!
//! Sits above the tab view and always searches the focused terminal. The
//! case and regex toggles are remembered across runs.

use std::rc::Rc;
use std::sync::Arc;

use gtk4::prelude::*;
use gtk4::{Box as GtkBox, Button, CheckButton, Label, Orientation, SearchEntry};
use serde_json::json;
use vte4::prelude::*;
use vte4::Terminal;
use zashterminal_core::config::SettingsManager;

use super::widget::{PCRE2_MULTILINE, search_pattern};

type TerminalProvider = Rc<dyn Fn() -> Option<Terminal>>;

/// Search bar for the focused terminal
pub struct TerminalSearchBar {
    bar: gtk4::SearchBar,
    entry: SearchEntry,
    case_sensitive: CheckButton,
    regex_toggle: CheckButton,
    match_label: Label,
    prev_btn: Button,
    next_btn: Button,
    terminal: TerminalProvider,
}

impl TerminalSearchBar {
    /// Creates the bar; `terminal` yields the terminal to search
    pub fn new(
        settings: &Arc<SettingsManager>,
        terminal: impl Fn() -> Option<Terminal> + 'static,
    ) -> Rc<Self> {
        let entry = SearchEntry::builder()
            .placeholder_text("Search text...")
            .hexpand(true)
            .build();

        let case_sensitive = CheckButton::builder()
            .label("Case sensitive")
            .active(settings.get_bool("search_case_sensitive", false))
            .build();
        let regex_toggle = CheckButton::builder()
            .label("Regex")
            .tooltip_text("Use regular expression pattern")
            .active(settings.get_bool("search_use_regex", false))
            .build();

        let prev_btn = Button::builder()
            .icon_name("go-up-symbolic")
            .tooltip_text("Previous match")
            .build();
        let next_btn = Button::builder()
            .icon_name("go-down-symbolic")
            .tooltip_text("Next match")
            .build();
        let match_label = Label::builder()
            .label("")
            .width_chars(16)
            .halign(gtk4::Align::Start)
            .build();
        match_label.add_css_class("dim-label");

        let content = GtkBox::new(Orientation::Horizontal, 6);
        content.append(&entry);
        content.append(&prev_btn);
        content.append(&next_btn);
        content.append(&case_sensitive);
        content.append(&regex_toggle);
        content.append(&match_label);

        let bar = gtk4::SearchBar::builder()
            .child(&content)
            .show_close_button(true)
            .build();
        bar.connect_entry(&entry);

        let search_bar = Rc::new(Self {
            bar,
            entry,
            case_sensitive,
            regex_toggle,
            match_label,
            prev_btn,
            next_btn,
            terminal: Rc::new(terminal),
        });
        search_bar.setup_signals(settings);
        search_bar
    }

    /// Returns the bar widget
    #[must_use]
    pub fn widget(&self) -> &gtk4::SearchBar {
        &self.bar
    }

    /// Shows or hides the bar; hiding clears the search from the terminal
    pub fn toggle(&self) {
        let reveal = !self.bar.is_search_mode();
        self.bar.set_search_mode(reveal);
        if reveal {
            self.entry.grab_focus();
            self.search(true);
        }
    }

    fn setup_signals(self: &Rc<Self>, settings: &Arc<SettingsManager>) {
        let weak = Rc::downgrade(self);
        self.entry.connect_search_changed(move |_| {
            if let Some(bar) = weak.upgrade() {
                bar.search(true);
            }
        });

        let weak = Rc::downgrade(self);
        self.entry.connect_activate(move |_| {
            if let Some(bar) = weak.upgrade() {
                bar.search(true);
            }
        });

        let weak = Rc::downgrade(self);
        self.entry.connect_previous_match(move |_| {
            if let Some(bar) = weak.upgrade() {
                bar.search(false);
            }
        });
        let weak = Rc::downgrade(self);
        self.entry.connect_next_match(move |_| {
            if let Some(bar) = weak.upgrade() {
                bar.search(true);
            }
        });

        let weak = Rc::downgrade(self);
        self.prev_btn.connect_clicked(move |_| {
            if let Some(bar) = weak.upgrade() {
                bar.search(false);
            }
        });
        let weak = Rc::downgrade(self);
        self.next_btn.connect_clicked(move |_| {
            if let Some(bar) = weak.upgrade() {
                bar.search(true);
            }
        });

        for (toggle, key) in [
            (&self.case_sensitive, "search_case_sensitive"),
            (&self.regex_toggle, "search_use_regex"),
        ] {
            let weak = Rc::downgrade(self);
            let settings = Arc::clone(settings);
            toggle.connect_toggled(move |btn| {
                if let Err(e) = settings.set(key, json!(btn.is_active())) {
                    tracing::warn!(key, error = %e, "Failed to save search option");
                }
                if let Some(bar) = weak.upgrade() {
                    bar.search(true);
                }
            });
        }

        let weak = Rc::downgrade(self);
        self.bar.connect_search_mode_enabled_notify(move |bar| {
            if bar.is_search_mode() {
                return;
            }
            if let Some(search) = weak.upgrade()
                && let Some(terminal) = (search.terminal)()
            {
                terminal.search_set_regex(None, 0);
                terminal.grab_focus();
            }
        });
    }

    fn search(&self, forward: bool) {
        let Some(terminal) = (self.terminal)() else {
            self.match_label.set_text("No terminal");
            return;
        };
        let text = self.entry.text();
        if text.is_empty() {
            terminal.search_set_regex(None, 0);
            self.match_label.set_text("");
            return;
        }

        let pattern = search_pattern(
            &text,
            self.case_sensitive.is_active(),
            self.regex_toggle.is_active(),
        );
        match vte4::Regex::for_search(&pattern, PCRE2_MULTILINE) {
            Ok(regex) => {
                terminal.search_set_regex(Some(&regex), 0);
                terminal.search_set_wrap_around(true);
                let found = if forward {
                    terminal.search_find_next()
                } else {
                    terminal.search_find_previous()
                };
                self.match_label.set_text(if found {
                    "Found matches"
                } else {
                    "No matches found"
                });
            }
            Err(e) => {
                tracing::debug!(error = %e, "Invalid search pattern");
                terminal.search_set_regex(None, 0);
                self.match_label.set_text("Invalid regex pattern");
            }
        }
    }
}
