//! Application constants and the default settings table

use serde_json::{Map, Value, json};

/// Application metadata
pub struct AppConstants;

impl AppConstants {
    /// D-Bus / desktop application id
    pub const APP_ID: &'static str = "org.leoberbert.zashterminal";
    /// Window title and binary display name
    pub const APP_TITLE: &'static str = "Zashterminal";
    /// Version string, shared with the workspace version
    pub const APP_VERSION: &'static str = env!("CARGO_PKG_VERSION");
    /// Primary developer
    pub const DEVELOPER_NAME: &'static str = "Leonardo Berbert";
    /// Copyright line for the about dialog
    pub const COPYRIGHT: &'static str = "© 2025 Leonardo Berbert";
    /// Project homepage
    pub const WEBSITE: &'static str = "https://github.com/leoberbert/zashterminal/";
    /// Issue tracker
    pub const ISSUE_URL: &'static str = "https://github.com/leoberbert/zashterminal/issues";
}

/// Font used when no preferred monospace family is installed
pub const FALLBACK_FONT: &str = "Monospace 10";

/// Preferred fonts, tried in order by [`pick_default_font`]
pub const FONT_CANDIDATES: &[&str] = &[
    "Noto Mono Nerd Font Medium 12",
    "JetBrains Mono 12",
    "Ubuntu Mono 12",
    "DejaVu Sans Mono 12",
    "Liberation Mono 12",
    "Source Code Pro 12",
];

/// Picks the first candidate whose family `is_installed` reports as present.
///
/// The family is the description minus its trailing size, compared
/// case-insensitively by the callback.
pub fn pick_default_font(is_installed: impl Fn(&str) -> bool) -> String {
    FONT_CANDIDATES
        .iter()
        .find(|candidate| {
            let family = crate::config::validator::font_family(candidate);
            family.is_some_and(|f| is_installed(&f))
        })
        .map_or_else(|| FALLBACK_FONT.to_string(), |s| (*s).to_string())
}

/// Keys whose values must be JSON booleans
pub const BOOLEAN_SETTINGS: &[&str] = &[
    "sidebar_visible",
    "auto_hide_sidebar",
    "scroll_on_output",
    "scroll_on_keystroke",
    "mouse_autohide",
    "bell_sound",
    "log_to_file",
    "ai_assistant_enabled",
];

/// Keys that must be present after load
pub const REQUIRED_SETTINGS: &[&str] = &["color_scheme", "font", "shortcuts"];

/// Commands whose output is never run through the output highlighter
pub const IGNORED_HIGHLIGHT_COMMANDS: &[&str] = &[
    "grep", "egrep", "fgrep", "rg", "rga", "awk", "sed", "sd", "bat", "ls", "git", "vim", "nano",
    "nvim", "emacs", "htop", "btop", "top", "less", "more", "man", "info", "diff", "colordiff",
    "delta", "jq", "yq", "grc",
];

/// Default keyboard shortcuts, keyed by action name
#[must_use]
pub fn default_shortcuts() -> Map<String, Value> {
    let pairs = [
        ("new-local-tab", "<Control><Shift>t"),
        ("close-tab", "<Control><Shift>w"),
        ("copy", "<Control><Shift>Insert"),
        ("paste", "<Control><Shift>v"),
        ("select-all", "<Control><Shift>a"),
        ("clear-session", "<Control><Shift>l"),
        ("preferences", "<Control><Shift>comma"),
        ("quit", "<Control><Shift>q"),
        ("new-window", "<Control><Shift>n"),
        ("toggle-sidebar", "<Control><Shift>h"),
        ("zoom-in", "<Control>plus"),
        ("zoom-out", "<Control>minus"),
        ("zoom-reset", "<Control>0"),
        ("split-horizontal", "<Control><Shift>parenleft"),
        ("split-vertical", "<Control><Shift>parenright"),
        ("close-pane", "<Control><Shift>k"),
        ("next-tab", "<Alt>Page_Down"),
        ("previous-tab", "<Alt>Page_Up"),
        ("toggle-search", "<Control><Shift>f"),
        ("ai-assistant", "<Control><Shift>i"),
    ];
    pairs
        .into_iter()
        .map(|(action, accel)| (action.to_string(), Value::String(accel.to_string())))
        .collect()
}

/// The complete default settings table.
///
/// `font` is passed in because detecting installed fonts needs the toolkit.
#[must_use]
#[allow(clippy::too_many_lines)]
pub fn default_settings(font: &str) -> Map<String, Value> {
    let value = json!({
        // General appearance
        "gtk_theme": "terminal",
        "color_scheme": 1,
        "transparency": 16,
        "headerbar_transparency": 12,
        "font": font,
        "font_scale": 1.0,
        "line_spacing": 1.0,
        "bold_is_bright": false,
        "tab_alignment": "center",
        // Window state
        "window_width": 1200,
        "window_height": 700,
        "window_maximized": false,
        "remember_window_state": true,
        "hide_headerbar_buttons_when_maximized": "auto",
        // Behavior
        "sidebar_visible": false,
        "auto_hide_sidebar": true,
        "sidebar_width": 300,
        "scroll_on_output": true,
        "scroll_on_keystroke": true,
        "scroll_on_insert": true,
        "mouse_autohide": true,
        "bell_sound": false,
        "cursor_blink": 0,
        "new_instance_behavior": "new_tab",
        "use_login_shell": false,
        "session_restore_policy": "never",
        "tree_expanded_folders": [],
        "ignored_ssh_config_hosts": [],
        // VTE features
        "scrollback_lines": 10000,
        "mouse_scroll_sensitivity": 30.0,
        "touchpad_scroll_sensitivity": 30.0,
        "cursor_shape": 0,
        "bidi_enabled": false,
        "enable_shaping": false,
        "sixel_enabled": true,
        "text_blink_mode": 0,
        "accessibility_enabled": true,
        // Compatibility
        "backspace_binding": 0,
        "delete_binding": 0,
        "cjk_ambiguous_width": 1,
        "word_char_exceptions": "-_.:/~",
        "ssh_control_persist_duration": 60,
        // Logging
        "log_to_file": false,
        "console_log_level": "ERROR",
        // AI assistant
        "ai_assistant_enabled": false,
        "ai_assistant_provider": "groq",
        "ai_assistant_model": "llama-3.1-8b-instant",
        "ai_assistant_api_key": "",
        "ai_openrouter_site_url": "",
        "ai_openrouter_site_name": "",
        "ai_local_base_url": "http://localhost:11434/v1",
        "ai_custom_quick_prompts": [],
        // Search
        "search_case_sensitive": false,
        "search_use_regex": false,
        // Highlighting
        "ignored_highlight_commands": IGNORED_HIGHLIGHT_COMMANDS,
        "shortcuts": Value::Object(default_shortcuts()),
    });

    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_contain_required_keys() {
        let defaults = default_settings(FALLBACK_FONT);
        for key in REQUIRED_SETTINGS {
            assert!(defaults.contains_key(*key), "missing {key}");
        }
        assert_eq!(defaults["font"], FALLBACK_FONT);
        assert_eq!(defaults["color_scheme"], 1);
    }

    #[test]
    fn boolean_defaults_are_booleans() {
        let defaults = default_settings(FALLBACK_FONT);
        for key in BOOLEAN_SETTINGS {
            assert!(defaults[*key].is_boolean(), "{key} is not a bool");
        }
    }

    #[test]
    fn pick_font_prefers_first_installed() {
        let font = pick_default_font(|family| family.eq_ignore_ascii_case("ubuntu mono"));
        assert_eq!(font, "Ubuntu Mono 12");
        assert_eq!(pick_default_font(|_| false), FALLBACK_FONT);
    }
}
