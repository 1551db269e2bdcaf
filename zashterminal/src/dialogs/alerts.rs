//! Alert dialogs: errors, confirmations and the restore prompt

use std::cell::Cell;

use adw::prelude::*;
use libadwaita as adw;

/// Shows an error with a single OK button
pub fn show_error_dialog(parent: &impl IsA<gtk4::Widget>, heading: &str, body: &str) {
    let dialog = adw::AlertDialog::new(Some(heading), Some(body));
    dialog.add_response("ok", "OK");
    dialog.set_default_response(Some("ok"));
    dialog.present(Some(parent));
}

/// Asks before a destructive change; `on_confirm` runs only on confirm
pub fn confirm_destructive(
    parent: &impl IsA<gtk4::Widget>,
    heading: &str,
    body: &str,
    confirm_label: &str,
    on_confirm: impl FnOnce() + 'static,
) {
    let dialog = adw::AlertDialog::new(Some(heading), Some(body));
    dialog.add_response("cancel", "Cancel");
    dialog.add_response("confirm", confirm_label);
    dialog.set_response_appearance("confirm", adw::ResponseAppearance::Destructive);
    dialog.set_default_response(Some("cancel"));
    dialog.set_close_response("cancel");

    let on_confirm = Cell::new(Some(on_confirm));
    dialog.connect_response(None, move |_, response| {
        if response == "confirm"
            && let Some(callback) = on_confirm.take()
        {
            callback();
        }
    });
    dialog.present(Some(parent));
}

/// Offers to reopen the tabs of the previous session.
///
/// `on_answer` gets `true` for restore, `false` for a fresh start or when
/// the dialog is dismissed.
pub fn ask_restore_session(
    parent: &impl IsA<gtk4::Widget>,
    tab_count: usize,
    on_answer: impl FnOnce(bool) + 'static,
) {
    let body = if tab_count == 1 {
        "The previous session had 1 open tab. Restore it?".to_string()
    } else {
        format!("The previous session had {tab_count} open tabs. Restore them?")
    };
    let dialog = adw::AlertDialog::new(Some("Restore Previous Session?"), Some(&body));
    dialog.add_response("fresh", "Start Fresh");
    dialog.add_response("restore", "Restore");
    dialog.set_response_appearance("restore", adw::ResponseAppearance::Suggested);
    dialog.set_default_response(Some("restore"));
    dialog.set_close_response("fresh");

    let on_answer = Cell::new(Some(on_answer));
    dialog.connect_response(None, move |_, response| {
        if let Some(callback) = on_answer.take() {
            callback(response == "restore");
        }
    });
    dialog.present(Some(parent));
}
