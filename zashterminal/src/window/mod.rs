//! Main application window
//!
//! One window holds a sessions sidebar, a tabbed terminal area with split
//! panes, the in-terminal search bar and the AI assistant panel. Several
//! windows can share one [`SharedAppState`]; each keeps its own tabs.
//!
//! # Module Structure
//!
//! - `actions` - `win.*` actions (sidebar items, tools, backups)
//! - `ui` - header bar and application menu

mod actions;
mod ui;

use std::rc::{Rc, Weak};

use adw::prelude::*;
use gtk4::{Orientation, glib};
use libadwaita as adw;
use serde_json::Value;
use zashterminal_core::config::AppConstants;
use zashterminal_core::launch::LaunchRequest;
use zashterminal_core::sessions::TreeNode;
use zashterminal_core::signals::AppEvent;

use crate::ai_panel::AiPanel;
use crate::dialogs::show_error_dialog;
use crate::sidebar::Sidebar;
use crate::state::SharedAppState;
use crate::terminal::{TabManager, TerminalSearchBar};
use crate::toast::{ToastOverlay, ToastType};
use ui::{HeaderBarParts, create_header_bar};

/// Narrowest the sessions sidebar gets
const MIN_SIDEBAR_WIDTH: f64 = 200.0;

/// Widest the AI panel gets
const AI_PANEL_WIDTH: f64 = 420.0;

/// Settings that change how terminals or the tab bar look
const TERMINAL_SETTINGS: &[&str] = &[
    "font",
    "font_scale",
    "line_spacing",
    "transparency",
    "cursor_shape",
    "cursor_blink",
    "text_blink_mode",
    "bold_is_bright",
    "scrollback_lines",
    "scroll_on_output",
    "scroll_on_keystroke",
    "scroll_on_insert",
    "mouse_autohide",
    "bell_sound",
    "backspace_binding",
    "delete_binding",
    "word_char_exceptions",
    "bidi_enabled",
    "enable_shaping",
    "sixel_enabled",
    "tab_alignment",
    "color_scheme",
];

/// `true` if a change to `key` has to be pushed to open terminals
#[must_use]
pub fn affects_terminals(key: &str) -> bool {
    TERMINAL_SETTINGS.contains(&key)
}

/// Decides whether a maximized window hides its title buttons.
///
/// `setting` is `hide_headerbar_buttons_when_maximized`. In `auto` mode
/// the buttons are hidden when the window manager's decoration layout has
/// no window controls at all, or when KWin draws maximized windows
/// borderless.
#[must_use]
pub fn should_hide_title_buttons(setting: &str, decoration_layout: &str, kde_borderless: bool) -> bool {
    match setting {
        "always" => true,
        "never" => false,
        _ => {
            kde_borderless
                || !decoration_layout
                    .split([':', ','])
                    .map(str::trim)
                    .any(|button| matches!(button, "minimize" | "maximize" | "close"))
        }
    }
}

/// Reads `BorderlessMaximizedWindows` from the `[Windows]` group of a
/// `kwinrc`
#[must_use]
pub fn kwin_borderless_maximized(kwinrc: &str) -> bool {
    let mut in_windows = false;
    for line in kwinrc.lines().map(str::trim) {
        if line.starts_with('[') {
            in_windows = line == "[Windows]";
        } else if in_windows
            && let Some((key, value)) = line.split_once('=')
            && key.trim() == "BorderlessMaximizedWindows"
        {
            return value.trim().eq_ignore_ascii_case("true");
        }
    }
    false
}

fn kde_borderless_enabled() -> bool {
    let on_kde = std::env::var("XDG_CURRENT_DESKTOP")
        .is_ok_and(|desktop| desktop.to_uppercase().contains("KDE"));
    if !on_kde {
        return false;
    }
    dirs::config_dir()
        .map(|dir| dir.join("kwinrc"))
        .and_then(|path| std::fs::read_to_string(path).ok())
        .is_some_and(|contents| kwin_borderless_maximized(&contents))
}

/// Main application window
pub struct MainWindow {
    window: adw::ApplicationWindow,
    split_view: adw::OverlaySplitView,
    ai_split: adw::OverlaySplitView,
    header: HeaderBarParts,
    toast_overlay: ToastOverlay,
    sidebar: Rc<Sidebar>,
    tabs: Rc<TabManager>,
    search_bar: Rc<TerminalSearchBar>,
    ai_panel: Rc<AiPanel>,
    state: SharedAppState,
}

impl MainWindow {
    /// Creates a window with no tabs open
    #[must_use]
    pub fn new(app: &adw::Application, state: SharedAppState) -> Rc<Self> {
        let settings = std::sync::Arc::clone(state.borrow().settings());
        let remember = settings.get_bool("remember_window_state", true);
        let (width, height) = if remember {
            (
                settings.get_i64("window_width", 1200),
                settings.get_i64("window_height", 700),
            )
        } else {
            (1200, 700)
        };

        let window = adw::ApplicationWindow::builder()
            .application(app)
            .title(AppConstants::APP_TITLE)
            .default_width(i32::try_from(width).unwrap_or(1200))
            .default_height(i32::try_from(height).unwrap_or(700))
            .build();
        if remember && settings.get_bool("window_maximized", false) {
            window.maximize();
        }

        let header = create_header_bar();
        header
            .ai_button
            .set_visible(settings.get_bool("ai_assistant_enabled", false));

        let tabs = TabManager::new(Rc::clone(&state));
        let search_bar = {
            let tabs = Rc::downgrade(&tabs);
            TerminalSearchBar::new(&settings, move || {
                tabs.upgrade().and_then(|t| t.active_terminal())
            })
        };
        let terminal_area = gtk4::Box::new(Orientation::Vertical, 0);
        terminal_area.append(search_bar.widget());
        terminal_area.append(tabs.widget());

        let ai_panel = {
            let tabs = Rc::downgrade(&tabs);
            AiPanel::new(Rc::clone(&state), move |command| {
                tabs.upgrade().is_some_and(|t| t.run_command(command))
            })
        };
        let ai_split = adw::OverlaySplitView::builder()
            .sidebar_position(gtk4::PackType::End)
            .max_sidebar_width(AI_PANEL_WIDTH)
            .show_sidebar(false)
            .build();
        ai_split.set_sidebar(Some(ai_panel.widget()));
        ai_split.set_content(Some(&terminal_area));

        let sidebar = Sidebar::new(Rc::clone(&state));
        let sidebar_width = settings.get_f64("sidebar_width", 300.0).max(MIN_SIDEBAR_WIDTH);
        let split_view = adw::OverlaySplitView::builder()
            .min_sidebar_width(MIN_SIDEBAR_WIDTH)
            .max_sidebar_width(sidebar_width)
            .show_sidebar(settings.sidebar_visible())
            .build();
        split_view.set_sidebar(Some(sidebar.widget()));
        split_view.set_content(Some(&ai_split));

        let toolbar = adw::ToolbarView::new();
        toolbar.add_top_bar(&header.header_bar);
        toolbar.set_content(Some(&split_view));

        let toast_overlay = ToastOverlay::new();
        toast_overlay.set_child(Some(&toolbar));
        window.set_content(Some(toast_overlay.widget()));

        let main_window = Rc::new(Self {
            window,
            split_view,
            ai_split,
            header,
            toast_overlay,
            sidebar,
            tabs,
            search_bar,
            ai_panel,
            state,
        });
        main_window.setup_signals();
        actions::setup_window_actions(&main_window);
        main_window.update_title_buttons();
        main_window
    }

    fn setup_signals(self: &Rc<Self>) {
        let weak = Rc::downgrade(self);
        self.sidebar.set_on_activate(move |node| {
            if let Some(window) = weak.upgrade() {
                window.open_node(node);
            }
        });

        let window = self.window.downgrade();
        self.tabs.set_on_last_tab_closed(move || {
            if let Some(window) = window.upgrade() {
                window.close();
            }
        });

        let weak = Rc::downgrade(self);
        self.tabs.tab_view().connect_selected_page_notify(move |_| {
            if let Some(window) = weak.upgrade() {
                window.update_title();
            }
        });

        let weak = Rc::downgrade(self);
        self.window.connect_maximized_notify(move |_| {
            if let Some(window) = weak.upgrade() {
                window.update_title_buttons();
            }
        });

        let weak = Rc::downgrade(self);
        self.window.connect_close_request(move |_| {
            if let Some(window) = weak.upgrade() {
                window.save_window_state();
            }
            glib::Propagation::Proceed
        });

        let signals = Rc::clone(self.state.borrow().signals());
        let weak: Weak<Self> = Rc::downgrade(self);
        let id = signals.connect(move |event| {
            // Emitters may still hold the state borrowed
            let event = event.clone();
            let weak = weak.clone();
            glib::idle_add_local_once(move || {
                if let Some(window) = weak.upgrade() {
                    window.handle_event(&event);
                }
            });
        });
        self.window.connect_destroy(move |_| {
            signals.disconnect(id);
        });
    }

    fn handle_event(&self, event: &AppEvent) {
        match event {
            AppEvent::SessionCreated(_)
            | AppEvent::SessionUpdated(_)
            | AppEvent::SessionDeleted(_)
            | AppEvent::FolderCreated(_)
            | AppEvent::FolderUpdated(_)
            | AppEvent::FolderDeleted(_)
            | AppEvent::RequestTreeRefresh => self.sidebar.refresh(),
            AppEvent::RequestSessionSelect(name) => self.sidebar.select_session(name),
            AppEvent::SettingsChanged(key, value) => self.on_setting_changed(key, value),
            AppEvent::ColorSchemeChanged(_) => self.tabs.apply_settings(),
            AppEvent::TerminalCreated(_)
            | AppEvent::TerminalClosed(_)
            | AppEvent::TerminalTitleChanged(..) => self.update_title(),
            AppEvent::HighlightRulesChanged => {}
        }
    }

    fn on_setting_changed(&self, key: &str, value: &Value) {
        if affects_terminals(key) {
            self.tabs.apply_settings();
            return;
        }
        match key {
            "ai_assistant_enabled" => {
                let enabled = value.as_bool().unwrap_or(false);
                self.header.ai_button.set_visible(enabled);
                if !enabled {
                    self.ai_split.set_show_sidebar(false);
                }
            }
            "hide_headerbar_buttons_when_maximized" => self.update_title_buttons(),
            "sidebar_width" => {
                if let Some(width) = value.as_f64() {
                    self.split_view
                        .set_max_sidebar_width(width.max(MIN_SIDEBAR_WIDTH));
                }
            }
            _ => {}
        }
    }

    /// Shows the window
    pub fn present(&self) {
        self.window.present();
    }

    #[must_use]
    pub const fn gtk_window(&self) -> &adw::ApplicationWindow {
        &self.window
    }

    #[must_use]
    pub const fn tabs(&self) -> &Rc<TabManager> {
        &self.tabs
    }

    pub fn show_toast(&self, message: &str, toast_type: ToastType) {
        self.toast_overlay.show_toast_with_type(message, toast_type);
    }

    /// Opens the tab a command line asked for
    pub fn open_launch(&self, request: &LaunchRequest) {
        if let Some(target) = &request.ssh {
            let initial = request.execute.clone().or_else(|| target.initial_command());
            self.tabs.open_session(&target.to_session(), initial.as_deref());
            return;
        }
        let working_dir = request
            .working_directory
            .as_ref()
            .map(|p| p.to_string_lossy().into_owned());
        self.tabs.open_local(
            working_dir.as_deref(),
            request.execute.as_deref(),
            request.close_after_execute,
        );
    }

    /// Connects a session or restores a layout from the sidebar
    pub fn open_node(&self, node: TreeNode) {
        match node {
            TreeNode::Session(session) => {
                let errors = session.validation_errors();
                if !errors.is_empty() {
                    show_error_dialog(&self.window, "Invalid Session", &errors.join("\n"));
                    return;
                }
                tracing::info!(session = %session.name, "Opening session");
                self.tabs.open_session(&session, None);
            }
            TreeNode::Layout(layout) => {
                let loaded = self.state.borrow().layouts().load(&layout.name);
                match loaded {
                    Ok(saved) => {
                        tracing::info!(layout = %layout.name, tabs = saved.tabs.len(), "Restoring layout");
                        self.tabs.restore_tabs(&saved.tabs);
                    }
                    Err(e) => {
                        tracing::error!(layout = %layout.name, error = %e, "Failed to load layout");
                        self.show_toast(&format!("Could not load layout: {e}"), ToastType::Error);
                        return;
                    }
                }
            }
            TreeNode::Folder(_) => return,
        }
        let auto_hide = self.state.borrow().settings().get_bool("auto_hide_sidebar", true);
        if auto_hide {
            self.split_view.set_show_sidebar(false);
        }
    }

    /// Shows or hides the sessions sidebar
    pub fn toggle_sidebar(&self) {
        let show = !self.split_view.shows_sidebar();
        self.split_view.set_show_sidebar(show);
        if show {
            self.sidebar.focus_search();
        }
    }

    /// Shows or hides the AI panel; refuses while the assistant is off
    pub fn toggle_ai_panel(&self) {
        let enabled = self.state.borrow().settings().get_bool("ai_assistant_enabled", false);
        if !enabled {
            self.show_toast(
                "The AI assistant is disabled. Enable it in AI Assistant Settings.",
                ToastType::Info,
            );
            return;
        }
        let show = !self.ai_split.shows_sidebar();
        self.ai_split.set_show_sidebar(show);
        if show {
            self.ai_panel.reload_history();
            self.ai_panel.focus_input();
        }
    }

    pub fn toggle_search(&self) {
        self.search_bar.toggle();
    }

    fn update_title(&self) {
        let title = self
            .tabs
            .tab_view()
            .selected_page()
            .map(|page| page.title().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| AppConstants::APP_TITLE.to_string());
        self.header.title.set_label(&title);
        self.window.set_title(Some(&title));
    }

    fn update_title_buttons(&self) {
        let setting = self
            .state
            .borrow()
            .settings()
            .get_string("hide_headerbar_buttons_when_maximized", "auto");
        let layout = gtk4::Settings::default()
            .and_then(|s| s.gtk_decoration_layout())
            .map(|l| l.to_string())
            .unwrap_or_default();
        let hide = self.window.is_maximized()
            && should_hide_title_buttons(&setting, &layout, setting == "auto" && kde_borderless_enabled());
        self.header.header_bar.set_show_start_title_buttons(!hide);
        self.header.header_bar.set_show_end_title_buttons(!hide);
    }

    fn save_window_state(&self) {
        let settings = std::sync::Arc::clone(self.state.borrow().settings());
        let mut changes = vec![(
            "sidebar_visible",
            Value::Bool(self.split_view.shows_sidebar()),
        )];
        if settings.get_bool("remember_window_state", true) {
            let maximized = self.window.is_maximized();
            changes.push(("window_maximized", Value::Bool(maximized)));
            if !maximized {
                let (width, height) = self.window.default_size();
                changes.push(("window_width", Value::from(width)));
                changes.push(("window_height", Value::from(height)));
            }
        }
        for (key, value) in changes {
            if let Err(e) = settings.set_no_save(key, value) {
                tracing::warn!(key, error = %e, "Window state not stored");
            }
        }
        if let Err(e) = settings.save(false) {
            tracing::error!(error = %e, "Failed to save window state");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_buttons_follow_setting() {
        assert!(should_hide_title_buttons("always", "close", false));
        assert!(!should_hide_title_buttons("never", ":", true));
    }

    #[test]
    fn auto_hides_without_window_controls() {
        assert!(should_hide_title_buttons("auto", "", false));
        assert!(should_hide_title_buttons("auto", ":", false));
        assert!(should_hide_title_buttons("auto", "menu:", false));
        assert!(!should_hide_title_buttons("auto", "menu:minimize,maximize,close", false));
        assert!(!should_hide_title_buttons("auto", "close:", false));
        assert!(should_hide_title_buttons("auto", "icon:close", true));
    }

    #[test]
    fn kwinrc_borderless_flag() {
        let rc = "[Plugins]\nBorderlessMaximizedWindows=false\n\n[Windows]\nBorderlessMaximizedWindows=true\n";
        assert!(kwin_borderless_maximized(rc));
        assert!(!kwin_borderless_maximized("[Plugins]\nBorderlessMaximizedWindows=true\n"));
        assert!(!kwin_borderless_maximized("[Windows]\nBorderlessMaximizedWindows=false\n"));
    }

    #[test]
    fn terminal_settings_are_recognized() {
        assert!(affects_terminals("font"));
        assert!(affects_terminals("tab_alignment"));
        assert!(!affects_terminals("ai_assistant_enabled"));
        assert!(!affects_terminals("window_width"));
    }
}
