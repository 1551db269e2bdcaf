//! Output highlighting rules editor
//!
//! Three pages: switches for where highlighting applies, the global rules,
//! and per-command contexts with their own rules. Every change is saved by
//! the [`HighlightManager`] right away and announced with
//! `HighlightRulesChanged`.

use std::cell::RefCell;
use std::rc::Rc;

use adw::prelude::*;
use libadwaita as adw;
use serde_json::Value;
use zashterminal_core::error::HighlightResult;
use zashterminal_core::highlights::{
    HighlightContext, HighlightManager, HighlightRule, RuleAction, validate_pattern,
};
use zashterminal_core::signals::AppEvent;

use super::alerts::confirm_destructive;
use super::keyboard::{setup_dialog_shortcuts, setup_entry_activation};
use super::widgets::{dialog_header, form_box, form_window, parent_window, show_errors, status_label};
use super::{apply_setting_logged, flush_settings};
use crate::state::SharedAppState;

/// Color specs as typed in the editor: comma separated, one per capture
/// group, blank for "leave this group alone"
fn parse_colors(text: &str) -> Vec<Option<String>> {
    let colors: Vec<Option<String>> = text
        .split(',')
        .map(|c| {
            let c = c.trim();
            (!c.is_empty()).then(|| c.to_string())
        })
        .collect();
    if colors.iter().all(Option::is_none) {
        vec![Some("white".to_string())]
    } else {
        colors
    }
}

fn format_colors(colors: &[Option<String>]) -> String {
    colors
        .iter()
        .map(|c| c.as_deref().unwrap_or(""))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Which rule list a rule belongs to
#[derive(Clone)]
enum RuleScope {
    Global,
    Context(String),
}

struct HighlightsEditor {
    state: SharedAppState,
    dialog: adw::PreferencesDialog,
    rules_page: adw::PreferencesPage,
    rules_group: RefCell<Option<adw::PreferencesGroup>>,
    contexts_page: adw::PreferencesPage,
    contexts_group: RefCell<Option<adw::PreferencesGroup>>,
}

impl HighlightsEditor {
    /// Runs a change and notifies the window
    fn apply(&self, what: &str, change: impl FnOnce(&mut HighlightManager) -> HighlightResult<()>) {
        let result = change(self.state.borrow_mut().highlights_mut());
        if let Err(e) = result {
            tracing::error!(error = %e, "Failed to {what}");
        }
        super::emit(&self.state, &AppEvent::HighlightRulesChanged);
    }

    /// [`Self::apply`], then rebuilds the lists
    fn mutate(self: &Rc<Self>, what: &str, change: impl FnOnce(&mut HighlightManager) -> HighlightResult<()>) {
        self.apply(what, change);
        self.refresh();
    }

    fn refresh(self: &Rc<Self>) {
        let rules = self.build_rules_group();
        replace_group(&self.rules_page, &self.rules_group, rules);
        let contexts = self.build_contexts_group();
        replace_group(&self.contexts_page, &self.contexts_group, contexts);
    }

    fn add_button(&self, tooltip: &str) -> gtk4::Button {
        gtk4::Button::builder()
            .icon_name("list-add-symbolic")
            .tooltip_text(tooltip)
            .css_classes(["flat"])
            .build()
    }

    fn rule_row(self: &Rc<Self>, scope: &RuleScope, index: usize, rule: &HighlightRule) -> adw::ActionRow {
        let row = adw::ActionRow::builder()
            .title(if rule.name.is_empty() { "Unnamed Rule" } else { rule.name.as_str() })
            .subtitle(&rule.pattern)
            .subtitle_lines(1)
            .build();
        if let Some(color) = rule.primary_color() {
            let color_label = gtk4::Label::builder()
                .label(color)
                .css_classes(["dim-label", "caption"])
                .valign(gtk4::Align::Center)
                .build();
            row.add_suffix(&color_label);
        }
        if !rule.is_valid() {
            row.add_css_class("error");
        }

        let toggle = gtk4::Switch::builder()
            .active(rule.enabled)
            .valign(gtk4::Align::Center)
            .build();
        {
            let this = Rc::clone(self);
            let scope = scope.clone();
            toggle.connect_state_set(move |_, enabled| {
                let scope = scope.clone();
                this.apply("toggle rule", move |manager| match &scope {
                    RuleScope::Global => manager.set_global_rule_enabled(index, enabled),
                    RuleScope::Context(name) => manager.set_context_rule_enabled(name, index, enabled),
                });
                gtk4::glib::Propagation::Proceed
            });
        }
        row.add_suffix(&toggle);

        let edit = icon_button("document-edit-symbolic", "Edit Rule");
        {
            let this = Rc::clone(self);
            let scope = scope.clone();
            let rule = rule.clone();
            edit.connect_clicked(move |_| this.edit_rule(scope.clone(), Some(index), rule.clone()));
        }
        row.add_suffix(&edit);

        let delete = icon_button("user-trash-symbolic", "Delete Rule");
        {
            let this = Rc::clone(self);
            let scope = scope.clone();
            delete.connect_clicked(move |_| {
                let scope = scope.clone();
                this.mutate("remove rule", move |manager| match &scope {
                    RuleScope::Global => manager.remove_global_rule(index).map(|_| ()),
                    RuleScope::Context(name) => manager.remove_context_rule(name, index).map(|_| ()),
                });
            });
        }
        row.add_suffix(&delete);
        row
    }

    fn build_rules_group(self: &Rc<Self>) -> adw::PreferencesGroup {
        let add = self.add_button("Add Rule");
        let group = adw::PreferencesGroup::builder()
            .title("Global Rules")
            .description("Applied to all terminal output, in order")
            .header_suffix(&add)
            .build();
        {
            let this = Rc::clone(self);
            add.connect_clicked(move |_| {
                this.edit_rule(RuleScope::Global, None, HighlightRule::new("", "", "bold red"));
            });
        }
        let rules = self.state.borrow().highlights().global_rules().to_vec();
        for (index, rule) in rules.iter().enumerate() {
            group.add(&self.rule_row(&RuleScope::Global, index, rule));
        }
        group
    }

    fn context_row(self: &Rc<Self>, context: &HighlightContext) -> adw::ExpanderRow {
        let name = context.command_name.clone();
        let expander = adw::ExpanderRow::builder()
            .title(&name)
            .subtitle(context.triggers.join(", "))
            .show_enable_switch(true)
            .enable_expansion(context.enabled)
            .build();
        {
            let this = Rc::clone(self);
            let name = name.clone();
            expander.connect_enable_expansion_notify(move |row| {
                let enabled = row.enables_expansion();
                let name = name.clone();
                this.apply("toggle context", move |manager| manager.set_context_enabled(&name, enabled));
            });
        }

        let use_global = adw::SwitchRow::builder()
            .title("Include Global Rules")
            .active(context.use_global_rules)
            .build();
        {
            let this = Rc::clone(self);
            let name = name.clone();
            use_global.connect_active_notify(move |row| {
                let active = row.is_active();
                let name = name.clone();
                this.apply("update context", move |manager| {
                    manager.set_context_use_global_rules(&name, active)
                });
            });
        }
        expander.add_row(&use_global);

        let scope = RuleScope::Context(name.clone());
        for (index, rule) in context.rules.iter().enumerate() {
            expander.add_row(&self.rule_row(&scope, index, rule));
        }

        let add_rule = adw::ActionRow::builder()
            .title("Add Rule")
            .activatable(true)
            .build();
        add_rule.add_prefix(&gtk4::Image::from_icon_name("list-add-symbolic"));
        {
            let this = Rc::clone(self);
            let scope = scope.clone();
            add_rule.connect_activated(move |_| {
                this.edit_rule(scope.clone(), None, HighlightRule::new("", "", "bold green"));
            });
        }
        expander.add_row(&add_rule);

        let delete = icon_button("user-trash-symbolic", "Delete Context");
        {
            let this = Rc::clone(self);
            delete.connect_clicked(move |button| {
                let this = Rc::clone(&this);
                let name = name.clone();
                confirm_destructive(
                    button,
                    "Delete Command Rules?",
                    &format!("Highlighting rules for '{name}' will be removed."),
                    "Delete",
                    move || {
                        this.mutate("remove context", move |manager| manager.remove_context(&name).map(|_| ()));
                    },
                );
            });
        }
        expander.add_suffix(&delete);
        expander
    }

    fn build_contexts_group(self: &Rc<Self>) -> adw::PreferencesGroup {
        let add = self.add_button("Add Command");
        let group = adw::PreferencesGroup::builder()
            .title("Command Rules")
            .description("Used while one of the trigger commands is running")
            .header_suffix(&add)
            .build();
        {
            let this = Rc::clone(self);
            add.connect_clicked(move |_| this.add_context());
        }
        let contexts: Vec<HighlightContext> = {
            let state_ref = self.state.borrow();
            let highlights = state_ref.highlights();
            highlights
                .context_names()
                .iter()
                .filter_map(|name| highlights.context(name).cloned())
                .collect()
        };
        for context in &contexts {
            group.add(&self.context_row(context));
        }
        group
    }

    fn add_context(self: &Rc<Self>) {
        let (header, cancel_btn, save_btn) = dialog_header("Cancel", "Add");
        let content = form_box();
        let status = status_label();
        content.append(&status);
        let name_row = adw::EntryRow::builder().title("Command").build();
        let triggers_row = adw::EntryRow::builder()
            .title("Trigger Commands (comma separated)")
            .build();
        let group = adw::PreferencesGroup::new();
        group.add(&name_row);
        group.add(&triggers_row);
        content.append(&group);

        let parent = parent_window(&self.dialog);
        let window = form_window(parent.as_ref(), "New Command Rules", 420, &header, &content);
        setup_dialog_shortcuts(&window, Some(&save_btn));
        setup_entry_activation(&name_row, &save_btn);

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
            let name = name_row.text().trim().to_lowercase();
            if name.is_empty() {
                show_errors(&status, &["Command name is required.".to_string()]);
                return;
            }
            let mut context = HighlightContext::new(name.as_str());
            let extra: Vec<String> = triggers_row
                .text()
                .split(',')
                .map(|t| t.trim().to_lowercase())
                .filter(|t| !t.is_empty() && *t != name)
                .collect();
            context.triggers.extend(extra);

            let added = this.state.borrow_mut().highlights_mut().add_context(context);
            if let Err(e) = added {
                show_errors(&status, &[e.to_string()]);
                return;
            }
            super::emit(&this.state, &AppEvent::HighlightRulesChanged);
            this.refresh();
            window.close();
        });
        window.present();
    }

    /// Rule form; `index` is `None` for a new rule
    fn edit_rule(self: &Rc<Self>, scope: RuleScope, index: Option<usize>, rule: HighlightRule) {
        let (header, cancel_btn, save_btn) = dialog_header("Cancel", "Save");
        let content = form_box();
        let status = status_label();
        content.append(&status);

        let name_row = adw::EntryRow::builder().title("Name").build();
        name_row.set_text(&rule.name);
        let pattern_row = adw::EntryRow::builder().title("Regular Expression").build();
        pattern_row.set_text(&rule.pattern);
        let colors_row = adw::EntryRow::builder()
            .title("Colors (one per group, comma separated)")
            .build();
        colors_row.set_text(&format_colors(&rule.colors));
        let action_row = adw::ComboRow::builder()
            .title("After a Match")
            .model(&gtk4::StringList::new(&["Continue With Next Rule", "Stop"]))
            .build();
        action_row.set_selected(u32::from(rule.action == RuleAction::Stop));
        let description_row = adw::EntryRow::builder().title("Description").build();
        description_row.set_text(&rule.description);

        let group = adw::PreferencesGroup::new();
        group.add(&name_row);
        group.add(&pattern_row);
        group.add(&colors_row);
        group.add(&action_row);
        group.add(&description_row);
        content.append(&group);

        {
            let status = status.clone();
            pattern_row.connect_changed(move |row| {
                match validate_pattern(&row.text()) {
                    Ok(()) => show_errors(&status, &[]),
                    Err(e) => show_errors(&status, &[e.to_string()]),
                }
            });
        }

        let parent = parent_window(&self.dialog);
        let title = if index.is_some() { "Edit Rule" } else { "New Rule" };
        let window = form_window(parent.as_ref(), title, 480, &header, &content);
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
            let pattern = pattern_row.text().to_string();
            if let Err(e) = validate_pattern(&pattern) {
                show_errors(&status, &[e.to_string()]);
                return;
            }
            let edited = HighlightRule {
                name: name_row.text().trim().to_string(),
                pattern,
                colors: parse_colors(&colors_row.text()),
                description: description_row.text().trim().to_string(),
                action: if action_row.selected() == 1 { RuleAction::Stop } else { RuleAction::Next },
                ..rule.clone()
            };
            let scope = scope.clone();
            this.mutate("save rule", move |manager| match (&scope, index) {
                (RuleScope::Global, Some(i)) => manager.update_global_rule(i, edited),
                (RuleScope::Global, None) => manager.add_global_rule(edited),
                (RuleScope::Context(name), Some(i)) => manager.update_context_rule(name, i, edited),
                (RuleScope::Context(name), None) => manager.add_context_rule(name, edited),
            });
            window.close();
        });
        window.present();
    }
}

fn icon_button(icon: &str, tooltip: &str) -> gtk4::Button {
    gtk4::Button::builder()
        .icon_name(icon)
        .tooltip_text(tooltip)
        .valign(gtk4::Align::Center)
        .css_classes(["flat"])
        .build()
}

fn replace_group(
    page: &adw::PreferencesPage,
    slot: &RefCell<Option<adw::PreferencesGroup>>,
    group: adw::PreferencesGroup,
) {
    if let Some(old) = slot.borrow_mut().take() {
        page.remove(&old);
    }
    page.add(&group);
    *slot.borrow_mut() = Some(group);
}

fn general_page(state: &SharedAppState) -> adw::PreferencesPage {
    let page = adw::PreferencesPage::builder()
        .title("General")
        .icon_name("preferences-system-symbolic")
        .build();
    let (local, ssh, context_aware) = {
        let state_ref = state.borrow();
        let config = state_ref.highlights().config();
        (config.enabled_for_local, config.enabled_for_ssh, config.context_aware_enabled)
    };

    let group = adw::PreferencesGroup::builder().title("Output Highlighting").build();
    let switches: [(&str, bool, fn(&mut HighlightManager, bool) -> HighlightResult<()>); 3] = [
        ("Local Terminals", local, HighlightManager::set_enabled_for_local),
        ("SSH Sessions", ssh, HighlightManager::set_enabled_for_ssh),
        ("Command-Specific Rules", context_aware, HighlightManager::set_context_aware_enabled),
    ];
    for (title, active, setter) in switches {
        let row = adw::SwitchRow::builder().title(title).active(active).build();
        let state = Rc::clone(state);
        row.connect_active_notify(move |row| {
            let saved = setter(state.borrow_mut().highlights_mut(), row.is_active());
            if let Err(e) = saved {
                tracing::error!(error = %e, "Failed to save highlight settings");
            }
            super::emit(&state, &AppEvent::HighlightRulesChanged);
        });
        group.add(&row);
    }
    page.add(&group);

    let ignored_group = adw::PreferencesGroup::builder()
        .title("Ignored Commands")
        .description("Programs that color their own output are left alone")
        .build();
    let ignored: Vec<String> = state
        .borrow()
        .settings()
        .get_or("ignored_highlight_commands", Vec::new());
    let ignored_row = adw::EntryRow::builder()
        .title("Commands (comma separated)")
        .show_apply_button(true)
        .build();
    ignored_row.set_text(&ignored.join(", "));
    {
        let state = Rc::clone(state);
        ignored_row.connect_apply(move |row| {
            let commands: Vec<Value> = row
                .text()
                .split(',')
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(|c| Value::String(c.to_string()))
                .collect();
            apply_setting_logged(&state, "ignored_highlight_commands", Value::Array(commands));
            super::emit(&state, &AppEvent::HighlightRulesChanged);
        });
    }
    ignored_group.add(&ignored_row);
    page.add(&ignored_group);
    page
}

/// Opens the highlight rules editor over `parent`
pub fn show_highlights_dialog(parent: &impl IsA<gtk4::Widget>, state: &SharedAppState) {
    let dialog = adw::PreferencesDialog::new();
    dialog.set_title("Highlight Rules");
    dialog.add(&general_page(state));

    let rules_page = adw::PreferencesPage::builder()
        .title("Global Rules")
        .icon_name("format-text-highlight-symbolic")
        .build();
    let contexts_page = adw::PreferencesPage::builder()
        .title("Commands")
        .icon_name("utilities-terminal-symbolic")
        .build();
    dialog.add(&rules_page);
    dialog.add(&contexts_page);

    let editor = Rc::new(HighlightsEditor {
        state: Rc::clone(state),
        dialog: dialog.clone(),
        rules_page,
        rules_group: RefCell::new(None),
        contexts_page,
        contexts_group: RefCell::new(None),
    });
    editor.refresh();

    let holder = RefCell::new(Some(editor));
    let state = Rc::clone(state);
    dialog.connect_closed(move |_| {
        holder.borrow_mut().take();
        flush_settings(&state);
    });
    dialog.present(Some(parent));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn colors_keep_blank_groups() {
        assert_eq!(
            parse_colors("bold red, , green"),
            vec![Some("bold red".into()), None, Some("green".into())]
        );
        assert_eq!(format_colors(&parse_colors("bold red, , green")), "bold red, , green");
    }

    #[test]
    fn empty_colors_fall_back_to_white() {
        assert_eq!(parse_colors(" , "), vec![Some("white".to_string())]);
    }
}
