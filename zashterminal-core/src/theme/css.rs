//! CSS generation for the "terminal" GTK theme mode
//!
//! When `gtk_theme` is `"terminal"` the whole window chrome (headerbar, tab
//! bar, sidebar, popovers, dialogs) is recolored from the active terminal
//! scheme. Building that stylesheet is pure string work, so it lives here and
//! the GUI only loads the result into a `gtk::CssProvider`.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::Arc;

use super::color::{Rgb, transparency_curve};
use super::scheme::ColorScheme;

/// Luminance below which sidebar, popover and dialog backgrounds are left to
/// the system theme.
pub const MIN_STYLED_LUMINANCE: f64 = 0.05;

/// Everything the terminal theme stylesheet depends on; used as cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ThemeCssParams {
    /// Scheme background
    pub bg: String,
    /// Scheme foreground
    pub fg: String,
    /// Scheme headerbar background
    pub header_bg: String,
    /// `headerbar_transparency` setting, 0-100
    pub transparency: u8,
    /// Background luminance below one half
    pub is_dark: bool,
}

impl ThemeCssParams {
    /// Derives the parameters from a scheme and the headerbar transparency.
    #[must_use]
    pub fn from_scheme(scheme: &ColorScheme, headerbar_transparency: u8) -> Self {
        let is_dark = Rgb::parse(&scheme.background).is_none_or(Rgb::is_dark);
        Self {
            bg: scheme.background.clone(),
            fg: scheme.foreground.clone(),
            header_bg: scheme.headerbar_background().to_string(),
            transparency: headerbar_transparency.min(100),
            is_dark,
        }
    }

    fn luminance(&self) -> f64 {
        Rgb::parse(&self.bg).map_or(0.0, Rgb::yiq_luminance)
    }
}

/// Cache of built stylesheets keyed by [`ThemeCssParams`].
///
/// A hit returns a clone of the same `Arc`, so callers can compare with
/// [`Arc::ptr_eq`] to skip reloading a provider.
#[derive(Debug, Default)]
pub struct ThemeCssCache {
    entries: HashMap<ThemeCssParams, Arc<str>>,
}

impl ThemeCssCache {
    /// Creates an empty cache
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached stylesheet or builds and stores it.
    pub fn get_or_build(&mut self, params: &ThemeCssParams) -> Arc<str> {
        if let Some(css) = self.entries.get(params) {
            return Arc::clone(css);
        }
        tracing::debug!(
            bg = %params.bg,
            fg = %params.fg,
            dark = params.is_dark,
            "Building terminal theme CSS"
        );
        let css: Arc<str> = Arc::from(build_terminal_theme_css(params));
        self.entries.insert(params.clone(), Arc::clone(&css));
        css
    }

    /// Number of cached stylesheets
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` if nothing is cached
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops every cached stylesheet
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Builds the full chrome stylesheet for the terminal theme mode.
#[must_use]
#[allow(clippy::too_many_lines)]
pub fn build_terminal_theme_css(params: &ThemeCssParams) -> String {
    let ThemeCssParams {
        bg,
        fg,
        header_bg,
        transparency,
        is_dark,
    } = params;
    let (hover, selected) = if *is_dark { ("10%", "15%") } else { ("8%", "12%") };
    // With transparency the background comes from headerbar_transparency_css.
    let solid_header = if *transparency > 0 {
        String::new()
    } else {
        format!("background-color: {header_bg};")
    };
    let mut css = String::new();

    let _ = write!(
        css,
        "
.main-header-bar, .main-header-bar:backdrop,
.terminal-pane .header-bar, .terminal-pane .header-bar:backdrop,
.top-bar, .top-bar:backdrop {{ {solid_header} color: {fg}; }}
headerbar.main-header-bar button,
headerbar.main-header-bar button:hover,
headerbar.main-header-bar button:active,
headerbar.main-header-bar button:checked,
headerbar.main-header-bar togglebutton,
headerbar.main-header-bar togglebutton:checked,
.terminal-pane headerbar button {{ color: {fg}; }}
headerbar.main-header-bar button image,
headerbar.main-header-bar togglebutton image,
headerbar.main-header-bar image.icon-symbolic,
.terminal-pane headerbar button image {{ color: {fg}; -gtk-icon-style: symbolic; }}
"
    );

    let _ = write!(
        css,
        "
.scrolled-tab-bar viewport {{ {solid_header} color: {fg}; }}
.scrolled-tab-bar viewport box .horizontal.active {{
    background-color: color-mix(in srgb, {fg}, transparent 78%);
}}
"
    );

    let _ = write!(
        css,
        "
searchbar, searchbar > box,
searchbar.broadcast-bar, searchbar.broadcast-bar > box {{ {solid_header} color: {fg}; }}
searchbar > revealer, searchbar > revealer > box,
searchbar.broadcast-bar > revealer,
searchbar.broadcast-bar > revealer > box {{ background-color: transparent; }}
searchbar entry, searchbar.broadcast-bar entry {{ background-color: {bg}; color: {fg}; }}
searchbar button, searchbar label, searchbar switch,
searchbar.broadcast-bar button, searchbar.broadcast-bar label {{ color: {fg}; }}
searchbar button image, searchbar.broadcast-bar button image {{
    color: {fg}; -gtk-icon-style: symbolic;
}}
.command-toolbar {{ {solid_header} color: {fg}; }}
.command-toolbar button, .command-toolbar button label,
.command-toolbar button image {{ color: {fg}; }}
.command-toolbar button image {{ -gtk-icon-style: symbolic; }}
"
    );

    if params.luminance() >= MIN_STYLED_LUMINANCE {
        for scope in ["", "popover.sidebar-popover "] {
            let _ = write!(
                css,
                "
{scope}.sidebar-container, {scope}.sidebar-toolbar {{
    background: {bg}; background-color: {bg}; color: {fg};
}}
{scope}.sidebar-toolbar {{ padding-top: 2px; }}
{scope}.sidebar-session-tree, {scope}.sidebar-session-tree viewport {{
    background-color: {bg}; color: {fg};
}}
{scope}.sidebar-search {{ background-color: {bg}; color: {fg}; padding: 8px 12px 12px 12px; }}
{scope}.sidebar-session-tree listview, {scope}.sidebar-session-tree listview > row {{
    background: {bg}; background-color: {bg}; color: {fg};
}}
{scope}.sidebar-session-tree listview > row:hover {{
    background-color: color-mix(in srgb, {fg} {hover}, {bg});
}}
{scope}.sidebar-session-tree listview > row:selected {{
    background-color: color-mix(in srgb, {fg} {selected}, {bg});
}}
{scope}.sidebar-session-tree listview > row:selected:hover {{
    background-color: color-mix(in srgb, {fg} 18%, {bg});
}}
{scope}.inline-context-menu {{ background: {bg}; background-color: {bg}; color: {fg}; }}
{scope}.inline-context-menu label {{ color: {fg}; }}
{scope}.inline-context-menu button {{ color: {fg}; background: transparent; }}
{scope}.inline-context-menu button:hover {{
    background-color: color-mix(in srgb, {fg} {hover}, {bg});
}}
{scope}.inline-context-menu button:active {{
    background-color: color-mix(in srgb, {fg} {selected}, {bg});
}}
{scope}.inline-context-menu button.destructive-action {{ color: @destructive_color; }}
"
            );
        }
        let _ = write!(
            css,
            "
popover.sidebar-popover > contents, popover.sidebar-popover > arrow {{
    background-color: {bg};
}}
popover.sidebar-popover > contents {{ padding: 0; }}
popover.sidebar-popover .sidebar-search entry {{
    background-color: alpha({fg}, 0.1); color: {fg};
}}
popover > contents, popover > contents > box {{ background-color: {header_bg}; color: {fg}; }}
popover > arrow {{ background: {header_bg}; }}
popover label {{ color: {fg}; }}
popover button:not(.suggested-action):not(.destructive-action) {{
    color: {fg}; background: transparent;
}}
popover button:not(.suggested-action):not(.destructive-action):hover,
popover modelbutton:hover {{
    background-color: color-mix(in srgb, {fg} {hover}, {header_bg});
}}
popover modelbutton:active {{
    background-color: color-mix(in srgb, {fg} {selected}, {header_bg});
}}
popover entry, popover entry text {{
    color: {fg}; background-color: color-mix(in srgb, {fg} 8%, {header_bg});
}}
popover modelbutton, popover modelbutton label {{ color: {fg}; }}
dropdown > popover, dropdown > popover > contents, dropdown > popover listview {{
    background-color: {header_bg}; color: {fg};
}}
dropdown > popover row, dropdown > popover row label, dropdown > popover cell label {{
    color: {fg};
}}
dropdown > popover row:selected {{
    background-color: color-mix(in srgb, {fg} {selected}, {header_bg});
}}
dropdown > popover row:hover {{
    background-color: color-mix(in srgb, {fg} {hover}, {header_bg});
}}
popover.zashterminal-popover > contents {{ background-color: {header_bg}; color: {fg}; }}
popover.zashterminal-popover > arrow {{ background: {header_bg}; }}
.tooltip-popover > contents {{ background-color: {header_bg}; color: {fg}; }}
popover.tooltip-popover arrow {{ background: {header_bg}; }}
.tooltip-popover label {{ color: {fg}; }}
.zashterminal-dialog, messagedialog {{ background-color: {bg}; color: {fg}; }}
.zashterminal-dialog > toolbarview,
.zashterminal-dialog > toolbarview > contents,
.zashterminal-dialog scrolledwindow,
.zashterminal-dialog scrolledwindow > viewport {{ background-color: {bg}; }}
.zashterminal-dialog .preferences-page {{ background-color: {bg}; color: {fg}; }}
.zashterminal-dialog .preferences-group {{ background-color: {header_bg}; color: {fg}; }}
.zashterminal-dialog row label, .zashterminal-dialog .title, .zashterminal-dialog .subtitle,
.zashterminal-dialog button:not(.suggested-action):not(.destructive-action),
.zashterminal-dialog entry, .zashterminal-dialog row, .zashterminal-dialog switch,
.zashterminal-dialog spinbutton, .zashterminal-dialog dropdown,
messagedialog > box label, messagedialog .title, messagedialog button {{ color: {fg}; }}
dialog.alert, dialog.alert .dialog-contents, dialog.alert label {{ color: {fg}; }}
dialog.alert, dialog.alert .dialog-contents {{ background-color: {bg}; }}
dialog.alert .response-area {{ background-color: {header_bg}; }}
.zashterminal-dialog actionbar, .zashterminal-dialog actionbar > revealer > box {{
    background-color: {header_bg}; color: {fg};
}}
.zashterminal-dialog button.destructive-action {{
    background-color: #c01c28; background-image: none; color: #ffffff; border: none;
}}
.zashterminal-dialog button.destructive-action:hover {{ background-color: #a51d2d; }}
"
        );
    } else {
        tracing::debug!(
            luminance = params.luminance(),
            "Skipping sidebar, popover and dialog styling for very dark background"
        );
    }

    let _ = write!(
        css,
        "
paned > separator {{ background-color: color-mix(in srgb, {fg} 20%, {bg}); }}
"
    );
    css
}

/// Headerbar background with transparency, or `None` at 0.
///
/// `base` is the scheme headerbar background in terminal theme mode, or
/// the toolkit default (`#303030` dark, `#f0f0f0` light) otherwise.
#[must_use]
pub fn headerbar_transparency_css(base: &str, transparency: u8) -> Option<String> {
    if transparency == 0 {
        return None;
    }
    let opacity = 100 - u32::from(transparency.min(100));
    let mix = format!("color-mix(in srgb, {base} {opacity}%, transparent)");
    Some(format!(
        "
.header-bar, .header-bar:backdrop,
.main-header-bar, .main-header-bar:backdrop,
.terminal-pane .header-bar, .terminal-pane .top-bar:backdrop,
searchbar, searchbar > box,
searchbar.broadcast-bar, searchbar.broadcast-bar > box,
.scrolled-tab-bar viewport,
.command-toolbar {{ background-color: {mix}; }}
searchbar > revealer, searchbar > revealer > box,
searchbar.broadcast-bar > revealer,
searchbar.broadcast-bar > revealer > box {{ background-color: transparent; }}
"
    ))
}

/// Base color for [`headerbar_transparency_css`].
#[must_use]
pub fn headerbar_base_color(gtk_theme: &str, scheme: &ColorScheme, system_dark: bool) -> String {
    if gtk_theme == "terminal" {
        scheme.headerbar_background().to_string()
    } else if system_dark {
        "#303030".to_string()
    } else {
        "#f0f0f0".to_string()
    }
}

/// Makes the tab view and window background transparent so the VTE
/// background alpha shows through.
#[must_use]
pub fn terminal_transparency_css() -> &'static str {
    ".terminal-tab-view > .view { background-color: transparent; } .background { background: transparent; }"
}

/// Stylesheet scoped to `.{css_class}` for dialogs and panels (the AI panel,
/// editors) that follow the active scheme.
#[must_use]
#[allow(clippy::too_many_lines)]
pub fn dynamic_dialog_css(css_class: &str, scheme: &ColorScheme, transparency: u8) -> String {
    let fg = &scheme.foreground;
    let bg_hex = &scheme.background;
    let header_bg = scheme.headerbar_background();
    let accent = scheme.accent();
    let rgb = Rgb::parse(bg_hex).unwrap_or_default();
    let bg = if transparency > 0 {
        rgb.to_rgba_css(transparency_curve(f64::from(transparency)))
    } else {
        rgb.to_rgb_css()
    };
    let input_bg = format!("color-mix(in srgb, {fg} 10%, transparent)");
    let border = format!("color-mix(in srgb, {fg} 15%, transparent)");
    let (dim, subtitle) = if rgb.is_dark() {
        (
            format!("color-mix(in srgb, {fg} 70%, transparent)"),
            format!("color-mix(in srgb, {fg} 65%, transparent)"),
        )
    } else {
        (
            format!("color-mix(in srgb, {fg} 90%, transparent)"),
            format!("color-mix(in srgb, {fg} 85%, transparent)"),
        )
    };
    let c = css_class;
    format!(
        "
.{c} {{ background-color: {bg}; color: {fg}; }}
.{c} headerbar {{ background-color: {header_bg}; color: {fg}; }}
.{c} label, .{c} row .title, .{c} image, .{c} .monospace {{ color: {fg}; }}
.{c} .subtitle, .{c} row .subtitle, .{c} row .body,
.{c} .preferences-group description {{ color: {subtitle}; }}
.{c} .dim-label, .{c} .caption {{ color: {dim}; }}
.{c} entry, .{c} entry text, .{c} spinbutton, .{c} spinbutton text {{
    background: {input_bg}; color: {fg}; border-color: {border}; outline-color: {border};
}}
.{c} entry:focus, .{c} entry:focus-within {{ border-color: {accent}; outline-color: {accent}; }}
.{c} textview, .{c} textview text {{ background: {input_bg}; color: {fg}; }}
.{c} dropdown > button, .{c} dropdown > button label {{ color: {fg}; }}
.{c} dropdown > popover contents {{ background: {bg_hex}; color: {fg}; }}
.{c} checkbutton, .{c} checkbutton label {{ color: {fg}; }}
.{c} row, .{c} .entry-row, .{c} .action-row, .{c} .switch-row,
.{c} .combo-row, .{c} .expander-row {{ border-color: {border}; }}
.{c} .card {{ background: {input_bg}; color: {fg}; border-color: {border}; }}
.{c} list, .{c} listbox, .{c} row {{ background: transparent; }}
.{c} .suggested-action, .{c} .execute-button {{ background: {accent}; color: #ffffff; }}
.{c} .execute-button label {{ color: #ffffff; }}
.{c} .command-button, .{c} .command-button label {{ color: {fg}; }}
.{c} .command-input-frame {{ background: {input_bg}; border-color: {border}; }}
.{c} .command-input-frame:focus-within {{ border-color: {accent}; }}
"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::theme::scheme::builtin_schemes;

    fn params(name: &str, transparency: u8) -> ThemeCssParams {
        ThemeCssParams::from_scheme(&builtin_schemes()[name], transparency)
    }

    #[test]
    fn cache_hit_returns_same_arc() {
        let mut cache = ThemeCssCache::new();
        let first = cache.get_or_build(&params("dracula", 0));
        let second = cache.get_or_build(&params("dracula", 0));
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);

        let other = cache.get_or_build(&params("dracula", 20));
        assert!(!Arc::ptr_eq(&first, &other));
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn solid_header_only_without_transparency() {
        let solid = build_terminal_theme_css(&params("nord", 0));
        assert!(solid.contains(".top-bar:backdrop { background-color: #3b4252; color: #d8dee9; }"));
        let see_through = build_terminal_theme_css(&params("nord", 30));
        assert!(see_through.contains(".top-bar:backdrop {  color: #d8dee9; }"));
    }

    #[test]
    fn very_dark_schemes_skip_sidebar_and_dialogs() {
        let css = build_terminal_theme_css(&params("system_default", 0));
        assert!(!css.contains(".sidebar-container"));
        assert!(!css.contains(".zashterminal-dialog"));
        assert!(css.contains("paned > separator"));

        let css = build_terminal_theme_css(&params("nord", 0));
        assert!(css.contains(".sidebar-container"));
        assert!(css.contains("dialog.alert"));
    }

    #[test]
    fn hover_alpha_depends_on_darkness() {
        assert!(build_terminal_theme_css(&params("nord", 0)).contains("#d8dee9 10%"));
        assert!(build_terminal_theme_css(&params("light", 0)).contains("#000000 8%"));
    }

    #[test]
    fn headerbar_mix() {
        assert!(headerbar_transparency_css("#1a1a1a", 0).is_none());
        let css = headerbar_transparency_css("#1a1a1a", 25).expect("css");
        assert!(css.contains("color-mix(in srgb, #1a1a1a 75%, transparent)"));
    }

    #[test]
    fn headerbar_base_follows_theme_mode() {
        let scheme = &builtin_schemes()["nord"];
        assert_eq!(headerbar_base_color("terminal", scheme, true), "#3b4252");
        assert_eq!(headerbar_base_color("default", scheme, true), "#303030");
        assert_eq!(headerbar_base_color("default", scheme, false), "#f0f0f0");
    }

    #[test]
    fn dialog_css_is_scoped() {
        let scheme = &builtin_schemes()["dracula"];
        let css = dynamic_dialog_css("ai-chat-panel", scheme, 0);
        assert!(css.contains(".ai-chat-panel { background-color: rgb(40, 42, 54);"));
        assert!(css.contains("#bd93f9"));
        let css = dynamic_dialog_css("ai-chat-panel", scheme, 50);
        assert!(css.contains("rgba(40, 42, 54, "));
    }
}
