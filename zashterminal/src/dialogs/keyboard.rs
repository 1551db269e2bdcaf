//! Keyboard handling shared by dialogs

use gtk4::gdk;
use gtk4::glib;
use gtk4::prelude::*;

/// Standard dialog keys: Escape and Ctrl+W close, Ctrl+S activates
/// `save_button` when it is sensitive.
pub fn setup_dialog_shortcuts<W: IsA<gtk4::Window>>(window: &W, save_button: Option<&gtk4::Button>) {
    let key_controller = gtk4::EventControllerKey::new();
    let window_weak = window.downgrade();
    let save_button_weak = save_button.map(ObjectExt::downgrade);

    key_controller.connect_key_pressed(move |_, key, _, modifiers| {
        let ctrl = modifiers.contains(gdk::ModifierType::CONTROL_MASK);
        match key {
            gdk::Key::Escape => close(&window_weak),
            gdk::Key::w | gdk::Key::W if ctrl => close(&window_weak),
            gdk::Key::s | gdk::Key::S if ctrl => {
                if let Some(weak) = &save_button_weak
                    && let Some(button) = weak.upgrade()
                    && button.is_sensitive()
                {
                    button.emit_clicked();
                    return glib::Propagation::Stop;
                }
                glib::Propagation::Proceed
            }
            _ => glib::Propagation::Proceed,
        }
    });
    window.add_controller(key_controller);
}

fn close<W: IsA<gtk4::Window>>(window: &glib::WeakRef<W>) -> glib::Propagation {
    match window.upgrade() {
        Some(window) => {
            window.close();
            glib::Propagation::Stop
        }
        None => glib::Propagation::Proceed,
    }
}

/// Enter in `entry` presses `button`
pub fn setup_entry_activation(entry: &libadwaita::EntryRow, button: &gtk4::Button) {
    let button_weak = button.downgrade();
    entry.connect_entry_activated(move |_| {
        if let Some(button) = button_weak.upgrade()
            && button.is_sensitive()
        {
            button.emit_clicked();
        }
    });
}

/// `true` for keys that only modify others (Shift, Control, Alt, Super)
pub fn is_modifier_key(keyval: gdk::Key) -> bool {
    matches!(
        keyval,
        gdk::Key::Shift_L
            | gdk::Key::Shift_R
            | gdk::Key::Control_L
            | gdk::Key::Control_R
            | gdk::Key::Alt_L
            | gdk::Key::Alt_R
            | gdk::Key::Super_L
            | gdk::Key::Super_R
            | gdk::Key::Meta_L
            | gdk::Key::Meta_R
            | gdk::Key::Hyper_L
            | gdk::Key::Hyper_R
            | gdk::Key::ISO_Level3_Shift
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modifiers_are_recognized() {
        assert!(is_modifier_key(gdk::Key::Control_L));
        assert!(is_modifier_key(gdk::Key::ISO_Level3_Shift));
        assert!(!is_modifier_key(gdk::Key::a));
        assert!(!is_modifier_key(gdk::Key::Escape));
    }
}
