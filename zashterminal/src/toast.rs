//! In-window notifications
//!
//! Wraps `adw::ToastOverlay`. Session operations report their outcome here
//! instead of opening dialogs.

use adw::prelude::*;
use gtk4 as gui;
use libadwaita as adw;

/// Toast message types for styling and semantic meaning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastType {
    /// Informational message (default)
    Info,
    /// Success message
    Success,
    /// Warning message
    Warning,
    /// Error message
    Error,
}

impl ToastType {
    /// Icon shown next to the title of warnings and errors
    #[must_use]
    pub const fn icon_name(&self) -> &'static str {
        match self {
            Self::Info => "dialog-information-symbolic",
            Self::Success => "object-select-symbolic",
            Self::Warning => "dialog-warning-symbolic",
            Self::Error => "dialog-error-symbolic",
        }
    }

    /// Warnings and errors are shown before queued informational toasts
    #[must_use]
    pub const fn priority(&self) -> adw::ToastPriority {
        match self {
            Self::Info | Self::Success => adw::ToastPriority::Normal,
            Self::Warning | Self::Error => adw::ToastPriority::High,
        }
    }

    #[must_use]
    pub const fn custom_title(&self) -> Option<&'static str> {
        match self {
            Self::Info | Self::Success => None,
            Self::Warning => Some("Warning"),
            Self::Error => Some("Error"),
        }
    }

    /// Picks the type for an operation outcome
    #[must_use]
    pub const fn for_outcome(success: bool) -> Self {
        if success { Self::Success } else { Self::Error }
    }
}

/// Toast overlay placed around the main window content
pub struct ToastOverlay {
    overlay: adw::ToastOverlay,
}

impl ToastOverlay {
    #[must_use]
    pub fn new() -> Self {
        Self {
            overlay: adw::ToastOverlay::new(),
        }
    }

    /// Returns the overlay widget to add to the UI
    #[must_use]
    pub fn widget(&self) -> &adw::ToastOverlay {
        &self.overlay
    }

    /// Sets the main content of the overlay
    pub fn set_child(&self, child: Option<&impl IsA<gui::Widget>>) {
        self.overlay.set_child(child);
    }

    /// Shows a typed toast with the matching priority and title
    pub fn show_toast_with_type(&self, message: &str, toast_type: ToastType) {
        self.overlay.add_toast(build_toast(message, toast_type));
    }

    pub fn show_success(&self, message: &str) {
        self.show_toast_with_type(message, ToastType::Success);
    }

    pub fn show_error(&self, message: &str) {
        self.show_toast_with_type(message, ToastType::Error);
    }
}

impl Default for ToastOverlay {
    fn default() -> Self {
        Self::new()
    }
}

fn build_toast(message: &str, toast_type: ToastType) -> adw::Toast {
    let toast = adw::Toast::new(&gui::glib::markup_escape_text(message));
    toast.set_priority(toast_type.priority());
    if let Some(title) = toast_type.custom_title() {
        let hbox = gui::Box::new(gui::Orientation::Horizontal, 6);
        hbox.set_halign(gui::Align::Center);
        let icon = gui::Image::from_icon_name(toast_type.icon_name());
        icon.set_pixel_size(16);
        hbox.append(&icon);
        hbox.append(&gui::Label::new(Some(&format!("{title}: {message}"))));
        toast.set_custom_title(Some(&hbox));
    }
    toast
}

/// Shows a toast on whatever window `widget` lives in.
///
/// Falls back to an `adw::AlertDialog` when the window has no overlay, so
/// the message is never lost.
pub fn show_toast_on_widget(widget: &impl IsA<gui::Widget>, message: &str, toast_type: ToastType) {
    let root = widget.as_ref().root();
    if let Some(window) = root.as_ref().and_then(|r| r.downcast_ref::<gui::Window>())
        && let Some(child) = window.child()
        && let Some(overlay) = find_toast_overlay(&child)
    {
        overlay.add_toast(build_toast(message, toast_type));
        return;
    }

    tracing::warn!(toast_message = %message, "ToastOverlay not found, falling back to AlertDialog");
    let heading = toast_type.custom_title().unwrap_or("Info");
    let dialog = adw::AlertDialog::new(Some(heading), Some(message));
    dialog.add_response("ok", "OK");
    dialog.set_default_response(Some("ok"));
    dialog.present(Some(widget.as_ref()));
}

// GTK4 children form a first_child / next_sibling list, which also covers
// the internal wrappers of adw::ApplicationWindow
fn find_toast_overlay(widget: &gui::Widget) -> Option<adw::ToastOverlay> {
    if let Some(overlay) = widget.downcast_ref::<adw::ToastOverlay>() {
        return Some(overlay.clone());
    }
    let mut child = widget.first_child();
    while let Some(c) = child {
        if let Some(found) = find_toast_overlay(&c) {
            return Some(found);
        }
        child = c.next_sibling();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_maps_to_type() {
        assert_eq!(ToastType::for_outcome(true), ToastType::Success);
        assert_eq!(ToastType::for_outcome(false), ToastType::Error);
        assert_eq!(ToastType::Error.custom_title(), Some("Error"));
        assert!(ToastType::Success.custom_title().is_none());
    }
}
