//! Keyboard shortcut registry
//!
//! Provides [`KeybindingDef`] for the default shortcut table shown in the
//! shortcuts editor, and [`accelerator_to_label`] for rendering accelerators.
//! The user's bindings live in the `shortcuts` object of the settings store.

use super::defaults::default_shortcuts;
use super::validator::parse_accelerator;

/// A single keybinding definition with its default accelerator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeybindingDef {
    /// Action name as stored in settings (e.g. `"new-local-tab"`)
    pub action: String,
    /// Default accelerator, empty when unbound
    pub default_accel: String,
    /// Human-readable label for the shortcuts editor
    pub label: String,
    /// Group in the shortcuts editor
    pub category: KeybindingCategory,
}

/// Groups used by the shortcuts editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeybindingCategory {
    /// Tabs and panes lifecycle
    TabsAndPanes,
    /// Splitting the active pane
    Splitting,
    /// Clipboard, search and the assistant
    TerminalInteraction,
    /// Font zoom
    Zoom,
    /// Window-level actions
    ApplicationAndWindow,
}

impl KeybindingCategory {
    /// Returns the display label for this category.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::TabsAndPanes => "Tab & Pane Management",
            Self::Splitting => "Splitting",
            Self::TerminalInteraction => "Terminal Interaction",
            Self::Zoom => "Zoom",
            Self::ApplicationAndWindow => "Application & Window",
        }
    }

    /// Returns all categories in display order.
    #[must_use]
    pub fn all() -> &'static [Self] {
        &[
            Self::TabsAndPanes,
            Self::Splitting,
            Self::TerminalInteraction,
            Self::Zoom,
            Self::ApplicationAndWindow,
        ]
    }
}

impl KeybindingDef {
    fn new(action: &str, label: &str, category: KeybindingCategory) -> Self {
        let default_accel = default_shortcuts()
            .get(action)
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
        Self {
            action: action.to_string(),
            default_accel,
            label: label.to_string(),
            category,
        }
    }

    /// GTK action name registered on the application (`app.<action>`)
    #[must_use]
    pub fn detailed_action(&self) -> String {
        format!("app.{}", self.action)
    }
}

/// Returns the complete list of keybinding definitions in editor order.
#[must_use]
pub fn default_keybindings() -> Vec<KeybindingDef> {
    use KeybindingCategory::{
        ApplicationAndWindow, Splitting, TabsAndPanes, TerminalInteraction, Zoom,
    };
    vec![
        KeybindingDef::new("new-local-tab", "New Tab", TabsAndPanes),
        KeybindingDef::new("close-tab", "Close Tab", TabsAndPanes),
        KeybindingDef::new("next-tab", "Next Tab", TabsAndPanes),
        KeybindingDef::new("previous-tab", "Previous Tab", TabsAndPanes),
        KeybindingDef::new("split-horizontal", "Split Horizontally", Splitting),
        KeybindingDef::new("split-vertical", "Split Vertically", Splitting),
        KeybindingDef::new("close-pane", "Close Active Pane", Splitting),
        KeybindingDef::new("copy", "Copy", TerminalInteraction),
        KeybindingDef::new("paste", "Paste", TerminalInteraction),
        KeybindingDef::new("select-all", "Select All", TerminalInteraction),
        KeybindingDef::new("clear-session", "Clear Session", TerminalInteraction),
        KeybindingDef::new("toggle-search", "Search in Terminal", TerminalInteraction),
        KeybindingDef::new("ai-assistant", "Ask AI Assistant", TerminalInteraction),
        KeybindingDef::new("zoom-in", "Zoom In", Zoom),
        KeybindingDef::new("zoom-out", "Zoom Out", Zoom),
        KeybindingDef::new("zoom-reset", "Reset Zoom", Zoom),
        KeybindingDef::new("toggle-sidebar", "Sessions Panel", ApplicationAndWindow),
        KeybindingDef::new("new-window", "New Window", ApplicationAndWindow),
        KeybindingDef::new("preferences", "Preferences", ApplicationAndWindow),
        KeybindingDef::new("quit", "Quit Application", ApplicationAndWindow),
    ]
}

/// Validates a GTK accelerator string.
///
/// Returns `true` if the string has a key name, optionally with known modifiers.
#[must_use]
pub fn is_valid_accelerator(accel: &str) -> bool {
    parse_accelerator(accel).is_some()
}

/// Renders an accelerator as a short label, e.g. `<Control><Shift>t` as
/// `Ctrl+Shift+T`. Returns an empty string for an empty accelerator.
#[must_use]
pub fn accelerator_to_label(accel: &str) -> String {
    if accel.trim().is_empty() {
        return String::new();
    }
    let Some(parsed) = parse_accelerator(accel) else {
        return accel.replace('<', "").replace('>', "+");
    };
    let mut parts: Vec<String> = parsed
        .modifiers
        .iter()
        .map(|m| {
            match m.as_str() {
                "control" | "ctrl" | "ctl" | "primary" => "Ctrl",
                "shift" | "shft" => "Shift",
                "alt" | "mod1" => "Alt",
                "super" | "mod4" => "Super",
                "meta" => "Meta",
                "hyper" => "Hyper",
                other => other,
            }
            .to_string()
        })
        .collect();
    parts.push(key_label(&parsed.key));
    parts.join("+")
}

fn key_label(key: &str) -> String {
    let named = match key.to_lowercase().as_str() {
        "plus" => "+",
        "minus" => "-",
        "return" => "Enter",
        "backspace" => "Backspace",
        "delete" => "Del",
        "insert" => "Ins",
        "space" => "Space",
        "tab" => "Tab",
        "escape" => "Esc",
        "comma" => ",",
        "period" => ".",
        "slash" => "/",
        "backslash" => "\\",
        "semicolon" => ";",
        "apostrophe" => "'",
        "grave" => "`",
        "bracketleft" => "[",
        "bracketright" => "]",
        "parenleft" => "(",
        "parenright" => ")",
        "equal" => "=",
        "page_up" => "Page Up",
        "page_down" => "Page Down",
        _ => "",
    };
    if !named.is_empty() {
        return named.to_string();
    }
    if key.chars().count() == 1 {
        key.to_uppercase()
    } else {
        key.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_default_shortcut_has_a_definition() {
        let defs = default_keybindings();
        for action in default_shortcuts().keys() {
            assert!(
                defs.iter().any(|d| &d.action == action),
                "no definition for {action}"
            );
        }
    }

    #[test]
    fn all_defaults_have_valid_accelerators() {
        for def in default_keybindings() {
            assert!(
                is_valid_accelerator(&def.default_accel),
                "Invalid accelerator '{}' for action '{}'",
                def.default_accel,
                def.action
            );
        }
    }

    #[test]
    fn all_actions_are_unique() {
        let defs = default_keybindings();
        let mut seen = std::collections::HashSet::new();
        for def in &defs {
            assert!(seen.insert(&def.action), "Duplicate action: {}", def.action);
        }
    }

    #[test]
    fn all_categories_have_at_least_one_binding() {
        let defs = default_keybindings();
        for cat in KeybindingCategory::all() {
            assert!(
                defs.iter().any(|d| d.category == *cat),
                "Category {cat:?} has no bindings"
            );
        }
    }

    #[test]
    fn labels() {
        assert_eq!(accelerator_to_label("<Control><Shift>t"), "Ctrl+Shift+T");
        assert_eq!(accelerator_to_label("<Control>plus"), "Ctrl++");
        assert_eq!(accelerator_to_label("<Alt>Page_Down"), "Alt+Page Down");
        assert_eq!(accelerator_to_label("F11"), "F11");
        assert_eq!(accelerator_to_label(""), "");
    }

    #[test]
    fn detailed_action_name() {
        let def = &default_keybindings()[0];
        assert_eq!(def.detailed_action(), "app.new-local-tab");
    }
}
