//! AI assistant settings
//!
//! Provider-specific rows are shown only while that provider is selected.

use std::cell::RefCell;
use std::rc::Rc;

use adw::prelude::*;
use gtk4::Button;
use libadwaita as adw;
use serde_json::{Value, json};
use zashterminal_core::ai::{AiClient, AiProvider, ModelInfo};

use super::{apply_setting_logged, flush_settings};
use crate::async_utils::spawn_background;
use crate::state::SharedAppState;
use crate::toast::{ToastType, show_toast_on_widget};

fn provider_index(value: &str) -> u32 {
    AiProvider::ALL
        .iter()
        .position(|p| p.as_str() == value)
        .unwrap_or(0) as u32
}

fn provider_at(index: u32) -> AiProvider {
    AiProvider::ALL
        .get(index as usize)
        .copied()
        .unwrap_or(AiProvider::Groq)
}

/// Rows whose visibility follows the selected provider
struct ProviderRows {
    api_key: adw::PasswordEntryRow,
    site_url: adw::EntryRow,
    site_name: adw::EntryRow,
    models: adw::ActionRow,
    base_url: adw::EntryRow,
}

impl ProviderRows {
    fn show_for(&self, provider: AiProvider) {
        let openrouter = provider == AiProvider::OpenRouter;
        self.api_key.set_visible(provider.requires_api_key());
        self.site_url.set_visible(openrouter);
        self.site_name.set_visible(openrouter);
        self.models.set_visible(openrouter);
        self.base_url.set_visible(provider == AiProvider::Local);
    }
}

fn text_row(state: &SharedAppState, key: &str, title: &str) -> adw::EntryRow {
    let current = state.borrow().settings().get_string(key, "");
    let row = adw::EntryRow::builder()
        .title(title)
        .show_apply_button(true)
        .text(current)
        .build();
    let state = Rc::clone(state);
    let key = key.to_string();
    row.connect_apply(move |row| {
        apply_setting_logged(&state, &key, Value::String(row.text().trim().to_string()));
    });
    row
}

/// Replaces the model picker's choices with `models`
fn fill_models(picker: &adw::ComboRow, holder: &Rc<RefCell<Vec<ModelInfo>>>, models: Vec<ModelInfo>) {
    let labels: Vec<String> = models
        .iter()
        .map(|m| {
            if m.name == m.id {
                m.id.clone()
            } else {
                format!("{} ({})", m.name, m.id)
            }
        })
        .collect();
    let labels: Vec<&str> = labels.iter().map(String::as_str).collect();
    // Swapping the model emits selected-notify; an empty holder ignores it
    holder.borrow_mut().clear();
    picker.set_model(Some(&gtk4::StringList::new(&labels)));
    *holder.borrow_mut() = models;
    picker.set_visible(!labels.is_empty());
}

fn fetch_models(
    button: &Button,
    state: &SharedAppState,
    picker: &adw::ComboRow,
    holder: &Rc<RefCell<Vec<ModelInfo>>>,
) {
    let api_key = state.borrow().settings().get_string("ai_assistant_api_key", "");
    button.set_sensitive(false);
    button.set_label("Loading...");

    let button = button.clone();
    let picker = picker.clone();
    let holder = Rc::clone(holder);
    spawn_background(
        async move {
            let client = AiClient::for_provider(AiProvider::OpenRouter)?;
            client.list_openrouter_models(Some(api_key.as_str())).await
        },
        move |result| {
            button.set_sensitive(true);
            button.set_label("Refresh");
            match result {
                Ok(models) => {
                    tracing::info!(count = models.len(), "OpenRouter models loaded");
                    fill_models(&picker, &holder, models);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to list OpenRouter models");
                    show_toast_on_widget(&button, &format!("Could not load models: {e}"), ToastType::Error);
                }
            }
        },
    );
}

/// Opens the assistant settings over `parent`
pub fn show_ai_settings_dialog(parent: &impl IsA<gtk4::Widget>, state: &SharedAppState) {
    let dialog = adw::PreferencesDialog::new();
    dialog.set_title("AI Assistant");
    let page = adw::PreferencesPage::builder()
        .title("Assistant")
        .icon_name("dialog-information-symbolic")
        .build();

    let (enabled, provider, model, api_key) = {
        let state_ref = state.borrow();
        let settings = state_ref.settings();
        (
            settings.get_bool("ai_assistant_enabled", false),
            settings.get_string("ai_assistant_provider", AiProvider::Groq.as_str()),
            settings.get_string("ai_assistant_model", ""),
            settings.get_string("ai_assistant_api_key", ""),
        )
    };

    let general = adw::PreferencesGroup::new();
    let enabled_row = adw::SwitchRow::builder()
        .title("Enable AI Assistant")
        .subtitle("Adds the assistant panel and its header bar button")
        .active(enabled)
        .build();
    {
        let state = Rc::clone(state);
        enabled_row.connect_active_notify(move |row| {
            apply_setting_logged(&state, "ai_assistant_enabled", Value::Bool(row.is_active()));
        });
    }
    general.add(&enabled_row);
    page.add(&general);

    let provider_group = adw::PreferencesGroup::builder()
        .title("Provider")
        .description("Requests go straight from this computer to the selected service")
        .build();
    let names: Vec<&str> = AiProvider::ALL.iter().map(|p| p.display_name()).collect();
    let provider_row = adw::ComboRow::builder()
        .title("Provider")
        .model(&gtk4::StringList::new(&names))
        .selected(provider_index(&provider))
        .build();
    let model_row = adw::EntryRow::builder()
        .title("Model")
        .show_apply_button(true)
        .text(model)
        .build();
    {
        let state = Rc::clone(state);
        model_row.connect_apply(move |row| {
            apply_setting_logged(&state, "ai_assistant_model", Value::String(row.text().trim().to_string()));
        });
    }

    let key_row = adw::PasswordEntryRow::builder()
        .title("API Key")
        .show_apply_button(true)
        .text(api_key)
        .build();
    {
        let state = Rc::clone(state);
        key_row.connect_apply(move |row| {
            apply_setting_logged(&state, "ai_assistant_api_key", Value::String(row.text().trim().to_string()));
        });
    }

    let models_button = Button::builder()
        .label("Load")
        .valign(gtk4::Align::Center)
        .build();
    let models_row = adw::ActionRow::builder()
        .title("Available Models")
        .subtitle("Fetch the model list from OpenRouter")
        .build();
    models_row.add_suffix(&models_button);
    let model_picker = adw::ComboRow::builder()
        .title("Choose Model")
        .visible(false)
        .build();
    let models: Rc<RefCell<Vec<ModelInfo>>> = Rc::new(RefCell::new(Vec::new()));
    {
        let state = Rc::clone(state);
        let picker = model_picker.clone();
        let holder = Rc::clone(&models);
        models_button.connect_clicked(move |btn| fetch_models(btn, &state, &picker, &holder));
    }
    {
        let state = Rc::clone(state);
        let holder = Rc::clone(&models);
        let model_row = model_row.clone();
        model_picker.connect_selected_notify(move |picker| {
            let Some(id) = holder
                .borrow()
                .get(picker.selected() as usize)
                .map(|m| m.id.clone())
            else {
                return;
            };
            model_row.set_text(&id);
            apply_setting_logged(&state, "ai_assistant_model", json!(id));
        });
    }

    let rows = Rc::new(ProviderRows {
        api_key: key_row.clone(),
        site_url: text_row(state, "ai_openrouter_site_url", "Site URL (optional)"),
        site_name: text_row(state, "ai_openrouter_site_name", "Site Name (optional)"),
        models: models_row.clone(),
        base_url: text_row(state, "ai_local_base_url", "Server URL"),
    });
    rows.show_for(provider_at(provider_row.selected()));

    {
        let state = Rc::clone(state);
        let rows = Rc::clone(&rows);
        let model_row = model_row.clone();
        let picker = model_picker.clone();
        provider_row.connect_selected_notify(move |row| {
            let provider = provider_at(row.selected());
            apply_setting_logged(&state, "ai_assistant_provider", json!(provider.as_str()));
            apply_setting_logged(&state, "ai_assistant_model", json!(provider.default_model()));
            model_row.set_text(provider.default_model());
            rows.show_for(provider);
            picker.set_visible(false);
        });
    }

    provider_group.add(&provider_row);
    provider_group.add(&model_row);
    provider_group.add(&rows.api_key);
    provider_group.add(&rows.base_url);
    page.add(&provider_group);

    let openrouter_group = adw::PreferencesGroup::builder().title("OpenRouter").build();
    openrouter_group.add(&rows.models);
    openrouter_group.add(&model_picker);
    openrouter_group.add(&rows.site_url);
    openrouter_group.add(&rows.site_name);
    openrouter_group.set_visible(provider_at(provider_row.selected()) == AiProvider::OpenRouter);
    page.add(&openrouter_group);
    provider_row.connect_selected_notify(move |row| {
        openrouter_group.set_visible(provider_at(row.selected()) == AiProvider::OpenRouter);
    });

    dialog.add(&page);
    let state = Rc::clone(state);
    dialog.connect_closed(move |_| flush_settings(&state));
    dialog.present(Some(parent));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_lookup_falls_back_to_first() {
        assert_eq!(provider_at(provider_index("local")), AiProvider::Local);
        assert_eq!(provider_index("openrouter"), 2);
        assert_eq!(provider_index("unknown"), 0);
        assert_eq!(provider_at(99), AiProvider::Groq);
    }
}
