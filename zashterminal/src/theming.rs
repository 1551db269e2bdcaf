//! Window chrome theming
//!
//! Installs the stylesheets generated by `zashterminal_core::theme` as
//! display-wide CSS providers. One [`ThemeManager`] serves every window of
//! the process; calling [`ThemeManager::apply`] again after a settings
//! change only reloads providers whose stylesheet actually changed.

use std::cell::RefCell;
use std::sync::Arc;

use adw::prelude::*;
use gtk4::{CssProvider, gdk};
use libadwaita as adw;
use zashterminal_core::theme::{
    ColorScheme, Rgb, ThemeCssParams, dynamic_dialog_css, headerbar_base_color,
    headerbar_transparency_css, terminal_transparency_css,
};

use crate::state::SharedAppState;

/// CSS class of the AI panel and other scheme-following side panels
pub const PANEL_CSS_CLASS: &str = "zashterminal-panel";

/// Maps the `gtk_theme` setting onto libadwaita's color scheme.
///
/// `"terminal"` follows the brightness of the active terminal scheme so
/// the chrome around the terminal never clashes with it.
pub fn apply_color_scheme(gtk_theme: &str, scheme: &ColorScheme) {
    let style_manager = adw::StyleManager::default();
    let adw_scheme = match gtk_theme {
        "light" => adw::ColorScheme::ForceLight,
        "dark" => adw::ColorScheme::ForceDark,
        "terminal" => {
            if Rgb::parse(&scheme.background).is_none_or(Rgb::is_dark) {
                adw::ColorScheme::ForceDark
            } else {
                adw::ColorScheme::ForceLight
            }
        }
        _ => adw::ColorScheme::Default,
    };
    style_manager.set_color_scheme(adw_scheme);
}

/// Loads the static application stylesheet
pub fn load_base_css() {
    let provider = CssProvider::new();
    provider.load_from_string(include_str!("../assets/style.css"));
    if !add_provider(&provider, gtk4::STYLE_PROVIDER_PRIORITY_APPLICATION) {
        tracing::warn!("Failed to add CSS provider - no display available");
    }
}

pub(crate) fn add_provider(provider: &CssProvider, priority: u32) -> bool {
    let Some(display) = gdk::Display::default() else {
        return false;
    };
    gtk4::style_context_add_provider_for_display(&display, provider, priority);
    true
}

/// A provider plus the stylesheet last loaded into it
struct ManagedProvider {
    provider: CssProvider,
    loaded: RefCell<Option<Arc<str>>>,
}

impl ManagedProvider {
    fn new(priority: u32) -> Self {
        let provider = CssProvider::new();
        if !add_provider(&provider, priority) {
            tracing::warn!("No display available for theme provider");
        }
        Self {
            provider,
            loaded: RefCell::new(None),
        }
    }

    fn load(&self, css: Arc<str>) {
        let mut loaded = self.loaded.borrow_mut();
        if loaded.as_ref().is_some_and(|current| Arc::ptr_eq(current, &css) || **current == *css) {
            return;
        }
        self.provider.load_from_string(&css);
        *loaded = Some(css);
    }

    fn clear(&self) {
        if self.loaded.borrow_mut().take().is_some() {
            self.provider.load_from_string("");
        }
    }
}

/// Display-wide theme providers
pub struct ThemeManager {
    theme: ManagedProvider,
    headerbar: ManagedProvider,
    transparency: ManagedProvider,
    panel: ManagedProvider,
}

impl ThemeManager {
    /// Creates and registers the (empty) providers
    #[must_use]
    pub fn new() -> Self {
        // Above the base stylesheet so generated rules win
        let priority = gtk4::STYLE_PROVIDER_PRIORITY_APPLICATION + 1;
        Self {
            theme: ManagedProvider::new(priority),
            headerbar: ManagedProvider::new(priority + 1),
            transparency: ManagedProvider::new(priority),
            panel: ManagedProvider::new(priority),
        }
    }

    /// Applies `gtk_theme`, the active color scheme and both transparency
    /// settings to every window
    pub fn apply(&self, state: &SharedAppState) {
        let mut state_ref = state.borrow_mut();
        let settings = Arc::clone(state_ref.settings());
        let scheme = settings.color_scheme();
        let gtk_theme = settings.get_string("gtk_theme", "terminal");
        let headerbar_transparency = settings.headerbar_transparency();

        apply_color_scheme(&gtk_theme, &scheme);

        if gtk_theme == "terminal" {
            let params = ThemeCssParams::from_scheme(&scheme, headerbar_transparency);
            let css = state_ref.css_cache_mut().get_or_build(&params);
            self.theme.load(css);
            self.panel.load(Arc::from(dynamic_dialog_css(
                PANEL_CSS_CLASS,
                &scheme,
                headerbar_transparency,
            )));
        } else {
            self.theme.clear();
            self.panel.clear();
        }
        drop(state_ref);

        let system_dark = adw::StyleManager::default().is_dark();
        let base = headerbar_base_color(&gtk_theme, &scheme, system_dark);
        match headerbar_transparency_css(&base, headerbar_transparency) {
            Some(css) => self.headerbar.load(Arc::from(css)),
            None => self.headerbar.clear(),
        }

        if settings.transparency() > 0.0 {
            self.transparency.load(Arc::from(terminal_transparency_css()));
        } else {
            self.transparency.clear();
        }

        tracing::debug!(
            gtk_theme = %gtk_theme,
            scheme = %scheme.name,
            headerbar_transparency,
            "Theme applied"
        );
    }
}

impl Default for ThemeManager {
    fn default() -> Self {
        Self::new()
    }
}
