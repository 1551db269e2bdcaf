//! Dialog windows for `Zashterminal`
//!
//! Dialogs write straight to the settings store or the session operations.
//! Everything else in the window learns about the change from the signal
//! bus, so no dialog holds a reference to the window's widgets.

mod ai_settings;
mod alerts;
mod folder;
mod highlights;
pub mod keyboard;
mod layout;
mod move_to_folder;
mod preferences;
mod scheme_editor;
mod session;
mod shortcuts;
mod widgets;

pub use ai_settings::show_ai_settings_dialog;
pub use alerts::{ask_restore_session, confirm_destructive, show_error_dialog};
pub use folder::show_folder_dialog;
pub use highlights::show_highlights_dialog;
pub use layout::show_save_layout_dialog;
pub use move_to_folder::show_move_to_folder_dialog;
pub use preferences::show_preferences_dialog;
pub use scheme_editor::show_scheme_editor;
pub use session::show_session_dialog;
pub use shortcuts::show_shortcuts_dialog;

use std::rc::Rc;

use serde_json::Value;
use zashterminal_core::error::ConfigResult;
use zashterminal_core::signals::AppEvent;

use crate::state::SharedAppState;

/// Validates and stores a setting. The store's change listener announces
/// it on the bus.
///
/// The value is not written to disk; dialogs flush the store when they
/// close.
///
/// # Errors
/// The validator rejected the value.
pub fn apply_setting(state: &SharedAppState, key: &str, value: Value) -> ConfigResult<()> {
    state.borrow().settings().set_no_save(key, value)
}

/// [`apply_setting`] for handlers that cannot report errors
pub fn apply_setting_logged(state: &SharedAppState, key: &str, value: Value) {
    if let Err(e) = apply_setting(state, key, value) {
        tracing::warn!(key, error = %e, "Setting rejected");
    }
}

/// Writes pending settings changes
pub fn flush_settings(state: &SharedAppState) {
    if let Err(e) = state.borrow().settings().save(false) {
        tracing::error!(error = %e, "Failed to save settings");
    }
}

/// Emits an event with the state borrow released first
pub fn emit(state: &SharedAppState, event: &AppEvent) {
    let signals = Rc::clone(state.borrow().signals());
    signals.emit(event);
}
