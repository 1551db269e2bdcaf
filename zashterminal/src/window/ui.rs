//! Window UI components
//!
//! Header bar and application menu of the main window.

use gtk4::gio;
use gtk4::prelude::*;
use gtk4::{Button, Label, MenuButton};
use libadwaita as adw;
use zashterminal_core::config::AppConstants;

/// The header bar plus the widgets the window updates later
pub struct HeaderBarParts {
    pub header_bar: adw::HeaderBar,
    pub title: Label,
    pub ai_button: Button,
}

fn icon_button(icon: &str, tooltip: &str, action: &str, accessible: &str) -> Button {
    let button = Button::from_icon_name(icon);
    button.set_tooltip_text(Some(tooltip));
    button.set_action_name(Some(action));
    button.update_property(&[gtk4::accessible::Property::Label(accessible)]);
    button
}

/// Creates the header bar with title and controls
///
/// Layout:
/// - Left side (pack_start): Sessions panel, New Tab
/// - Center: Title
/// - Right side (pack_end): Menu, AI Assistant, Search, Split Vertical, Split Horizontal
#[must_use]
pub fn create_header_bar() -> HeaderBarParts {
    let header_bar = adw::HeaderBar::new();

    let title = Label::new(Some(AppConstants::APP_TITLE));
    title.add_css_class("title");
    title.set_ellipsize(gtk4::pango::EllipsizeMode::End);
    header_bar.set_title_widget(Some(&title));

    header_bar.pack_start(&icon_button(
        "sidebar-show-symbolic",
        "Sessions Panel",
        "app.toggle-sidebar",
        "Toggle Sessions Panel",
    ));
    header_bar.pack_start(&icon_button(
        "tab-new-symbolic",
        "New Tab",
        "app.new-local-tab",
        "New Tab",
    ));

    let menu_button = MenuButton::builder()
        .icon_name("open-menu-symbolic")
        .tooltip_text("Menu")
        .build();
    menu_button.update_property(&[gtk4::accessible::Property::Label("Menu")]);
    menu_button.set_menu_model(Some(&create_app_menu()));
    header_bar.pack_end(&menu_button);

    let ai_button = icon_button(
        "starred-symbolic",
        "AI Assistant",
        "app.ai-assistant",
        "AI Assistant",
    );
    header_bar.pack_end(&ai_button);

    header_bar.pack_end(&icon_button(
        "system-search-symbolic",
        "Search in Terminal",
        "app.toggle-search",
        "Search in Terminal",
    ));
    header_bar.pack_end(&icon_button(
        "object-flip-horizontal-symbolic",
        "Split Vertically",
        "app.split-vertical",
        "Split Vertically",
    ));
    header_bar.pack_end(&icon_button(
        "object-flip-vertical-symbolic",
        "Split Horizontally",
        "app.split-horizontal",
        "Split Horizontally",
    ));

    HeaderBarParts {
        header_bar,
        title,
        ai_button,
    }
}

/// Creates the application menu
///
/// Menu sections:
/// 1. Sessions: New Session, New Folder, Save Layout, Import from SSH Config
/// 2. Window: New Tab, New Window
/// 3. Tools: Color Schemes, Highlight Rules, AI Assistant Settings
/// 4. Backup: Create, Restore
/// 5. App: Preferences, Keyboard Shortcuts, About, Quit
#[must_use]
pub fn create_app_menu() -> gio::Menu {
    let menu = gio::Menu::new();

    let sessions_section = gio::Menu::new();
    sessions_section.append(Some("New Session"), Some("win.new-session"));
    sessions_section.append(Some("New Folder"), Some("win.new-folder"));
    sessions_section.append(Some("Save Layout..."), Some("win.save-layout"));
    sessions_section.append(Some("Import from SSH Config"), Some("win.import-ssh-config"));
    menu.append_section(None, &sessions_section);

    let window_section = gio::Menu::new();
    window_section.append(Some("New Tab"), Some("app.new-local-tab"));
    window_section.append(Some("New Window"), Some("app.new-window"));
    menu.append_section(None, &window_section);

    let tools_section = gio::Menu::new();
    tools_section.append(Some("Color Schemes..."), Some("win.color-schemes"));
    tools_section.append(Some("Highlight Rules..."), Some("win.highlight-rules"));
    tools_section.append(Some("AI Assistant Settings..."), Some("win.ai-settings"));
    menu.append_section(None, &tools_section);

    let backup_section = gio::Menu::new();
    backup_section.append(Some("Create Backup..."), Some("win.create-backup"));
    backup_section.append(Some("Restore Backup..."), Some("win.restore-backup"));
    menu.append_section(None, &backup_section);

    let app_section = gio::Menu::new();
    app_section.append(Some("Preferences"), Some("app.preferences"));
    app_section.append(Some("Keyboard Shortcuts"), Some("app.shortcuts"));
    app_section.append(Some("About Zashterminal"), Some("app.about"));
    app_section.append(Some("Quit"), Some("app.quit"));
    menu.append_section(None, &app_section);

    menu
}
