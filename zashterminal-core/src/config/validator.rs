//! Per-key validators for the settings store

use std::collections::HashSet;
use std::fmt;

use serde_json::{Map, Value};

use super::defaults::{BOOLEAN_SETTINGS, REQUIRED_SETTINGS};

/// Modifier names accepted inside `<...>` in an accelerator
const MODIFIERS: &[&str] = &[
    "control", "ctrl", "ctl", "primary", "shift", "shft", "alt", "mod1", "mod2", "mod3", "mod4",
    "mod5", "super", "hyper", "meta", "release",
];

/// Style words Pango strips from the end of a font description
const FONT_STYLE_WORDS: &[&str] = &[
    "normal", "roman", "oblique", "italic", "small-caps", "thin", "ultra-light", "extra-light",
    "light", "semi-light", "demi-light", "book", "regular", "medium", "semi-bold", "demi-bold",
    "bold", "ultra-bold", "extra-bold", "heavy", "black", "ultra-condensed", "extra-condensed",
    "condensed", "semi-condensed", "semi-expanded", "expanded", "extra-expanded",
    "ultra-expanded",
];

/// A single problem found in a settings document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingsIssue {
    /// Required key is absent
    Missing(String),
    /// Key has a value its validator rejects
    InvalidValue(String),
    /// Boolean key holds a non-boolean
    NotBoolean(String),
    /// `shortcuts` is not an object
    ShortcutsNotObject,
    /// Two actions share an accelerator
    DuplicateShortcuts,
    /// Accelerator for an action does not parse
    InvalidShortcut {
        /// Action name
        action: String,
        /// Offending accelerator
        accel: String,
    },
}

impl SettingsIssue {
    /// The top-level key a repair would reset, if any
    #[must_use]
    pub fn repair_key(&self) -> Option<&str> {
        match self {
            Self::Missing(key) | Self::InvalidValue(key) | Self::NotBoolean(key) => Some(key),
            Self::ShortcutsNotObject => Some("shortcuts"),
            Self::DuplicateShortcuts | Self::InvalidShortcut { .. } => None,
        }
    }
}

impl fmt::Display for SettingsIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing(key) => write!(f, "Missing required setting: {key}"),
            Self::InvalidValue(key) => write!(f, "Invalid value for setting '{key}'"),
            Self::NotBoolean(key) => write!(f, "Setting '{key}' must be boolean"),
            Self::ShortcutsNotObject => write!(f, "Shortcuts must be a dictionary"),
            Self::DuplicateShortcuts => write!(f, "Duplicate keyboard shortcuts detected"),
            Self::InvalidShortcut { action, accel } => {
                write!(f, "Invalid shortcut for action '{action}': {accel}")
            }
        }
    }
}

/// Color scheme index must be an integer in `[0, num_schemes)`
#[must_use]
pub fn validate_color_scheme(value: &Value, num_schemes: usize) -> bool {
    value
        .as_u64()
        .is_some_and(|index| usize::try_from(index).is_ok_and(|i| i < num_schemes))
}

/// Transparency must be a number between 0 and 100 inclusive
#[must_use]
pub fn validate_transparency(value: &Value) -> bool {
    value.as_f64().is_some_and(|t| (0.0..=100.0).contains(&t))
}

/// Font must be a non-empty description with a family
#[must_use]
pub fn validate_font(value: &Value) -> bool {
    value
        .as_str()
        .is_some_and(|s| !s.trim().is_empty() && font_family(s).is_some())
}

/// Extracts the family from a Pango-style description ("Family [Style...] [Size]").
#[must_use]
pub fn font_family(description: &str) -> Option<String> {
    let mut words: Vec<&str> = description.split_whitespace().collect();
    if words
        .last()
        .is_some_and(|w| w.trim_end_matches("px").parse::<f64>().is_ok())
    {
        words.pop();
    }
    while words.len() > 1
        && words
            .last()
            .is_some_and(|w| FONT_STYLE_WORDS.contains(&w.to_lowercase().as_str()))
    {
        words.pop();
    }
    let family = words.join(" ");
    let family = family.trim_end_matches(',').trim();
    if family.is_empty() {
        None
    } else {
        Some(family.to_string())
    }
}

/// Parsed form of a GTK accelerator string such as `<Control><Shift>t`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Accelerator {
    /// Lowercased modifier names in the order written
    pub modifiers: Vec<String>,
    /// Key name after the modifiers
    pub key: String,
}

/// Parses an accelerator. Returns `None` for unknown modifiers, unbalanced
/// brackets or a missing key.
#[must_use]
pub fn parse_accelerator(accel: &str) -> Option<Accelerator> {
    let mut rest = accel.trim();
    let mut modifiers = Vec::new();
    while let Some(stripped) = rest.strip_prefix('<') {
        let end = stripped.find('>')?;
        let name = stripped[..end].to_lowercase();
        if !MODIFIERS.contains(&name.as_str()) {
            return None;
        }
        modifiers.push(name);
        rest = &stripped[end + 1..];
    }
    if rest.is_empty() || rest.contains(['<', '>']) || rest.contains(char::is_whitespace) {
        return None;
    }
    Some(Accelerator {
        modifiers,
        key: rest.to_string(),
    })
}

/// Shortcut must be a string that is empty (disabled) or parses
#[must_use]
pub fn validate_shortcut(value: &Value) -> bool {
    match value.as_str() {
        Some("") => true,
        Some(accel) => parse_accelerator(accel).is_some(),
        None => false,
    }
}

/// Checks the shortcuts table for duplicates and unparseable entries
#[must_use]
pub fn validate_shortcuts(shortcuts: &Value) -> Vec<SettingsIssue> {
    let Some(map) = shortcuts.as_object() else {
        return vec![SettingsIssue::ShortcutsNotObject];
    };
    let mut issues = Vec::new();
    let assigned: Vec<&str> = map
        .values()
        .filter_map(Value::as_str)
        .filter(|s| !s.is_empty())
        .collect();
    let unique: HashSet<&str> = assigned.iter().copied().collect();
    if unique.len() != assigned.len() {
        issues.push(SettingsIssue::DuplicateShortcuts);
    }
    for (action, accel) in map {
        if !validate_shortcut(accel) {
            issues.push(SettingsIssue::InvalidShortcut {
                action: action.clone(),
                accel: accel.as_str().map_or_else(|| accel.to_string(), str::to_string),
            });
        }
    }
    issues
}

/// Validates an entire settings map
#[must_use]
pub fn validate_settings_structure(
    settings: &Map<String, Value>,
    num_schemes: usize,
) -> Vec<SettingsIssue> {
    let mut issues: Vec<SettingsIssue> = REQUIRED_SETTINGS
        .iter()
        .filter(|key| !settings.contains_key(**key))
        .map(|key| SettingsIssue::Missing((*key).to_string()))
        .collect();

    if let Some(v) = settings.get("color_scheme")
        && !validate_color_scheme(v, num_schemes)
    {
        issues.push(SettingsIssue::InvalidValue("color_scheme".into()));
    }
    if let Some(v) = settings.get("transparency")
        && !validate_transparency(v)
    {
        issues.push(SettingsIssue::InvalidValue("transparency".into()));
    }
    if let Some(v) = settings.get("font")
        && !validate_font(v)
    {
        issues.push(SettingsIssue::InvalidValue("font".into()));
    }
    if let Some(shortcuts) = settings.get("shortcuts") {
        issues.extend(validate_shortcuts(shortcuts));
    }
    for key in BOOLEAN_SETTINGS {
        if settings.get(*key).is_some_and(|v| !v.is_boolean()) {
            issues.push(SettingsIssue::NotBoolean((*key).to_string()));
        }
    }
    issues
}

/// Validates a single value about to be stored under `key`.
///
/// # Errors
/// Returns a human readable message when the value is rejected.
pub fn validate_setting_value(key: &str, value: &Value, num_schemes: usize) -> Result<(), String> {
    let base = key.split('.').next().unwrap_or(key);
    let ok = match base {
        "color_scheme" => validate_color_scheme(value, num_schemes),
        "transparency" | "headerbar_transparency" => validate_transparency(value),
        "font" => validate_font(value),
        _ => true,
    };
    if !ok {
        return Err(format!("Invalid value for {base}"));
    }
    if key.starts_with("shortcuts.") && !validate_shortcut(value) {
        return Err("Invalid keyboard shortcut".into());
    }
    if key == "shortcuts" {
        let issues = validate_shortcuts(value);
        if !issues.is_empty() {
            return Err(issues
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; "));
        }
    }
    if BOOLEAN_SETTINGS.contains(&key) && !value.is_boolean() {
        return Err(format!("Setting '{key}' must be boolean"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn color_scheme_bounds() {
        assert!(validate_color_scheme(&json!(0), 13));
        assert!(validate_color_scheme(&json!(12), 13));
        assert!(!validate_color_scheme(&json!(13), 13));
        assert!(!validate_color_scheme(&json!(-1), 13));
        assert!(!validate_color_scheme(&json!("1"), 13));
    }

    #[test]
    fn transparency_bounds() {
        assert!(validate_transparency(&json!(0)));
        assert!(validate_transparency(&json!(100)));
        assert!(validate_transparency(&json!(42.5)));
        assert!(!validate_transparency(&json!(101)));
        assert!(!validate_transparency(&json!(true)));
    }

    #[test]
    fn font_family_parsing() {
        assert_eq!(font_family("Monospace 10").as_deref(), Some("Monospace"));
        assert_eq!(
            font_family("Noto Mono Nerd Font Medium 12").as_deref(),
            Some("Noto Mono Nerd Font")
        );
        assert_eq!(font_family("Bold").as_deref(), Some("Bold"));
        assert!(font_family("12").is_none());
        assert!(!validate_font(&json!("   ")));
    }

    #[test]
    fn accelerator_parsing() {
        let accel = parse_accelerator("<Control><Shift>t").expect("parses");
        assert_eq!(accel.modifiers, vec!["control", "shift"]);
        assert_eq!(accel.key, "t");
        assert!(parse_accelerator("F11").is_some());
        assert!(parse_accelerator("<Control>").is_none());
        assert!(parse_accelerator("<Banana>x").is_none());
        assert!(parse_accelerator("<Control x").is_none());
        assert!(validate_shortcut(&json!("")));
    }

    #[test]
    fn duplicate_shortcuts_detected() {
        let issues = validate_shortcuts(&json!({"copy": "<Control>c", "paste": "<Control>c"}));
        assert!(issues.contains(&SettingsIssue::DuplicateShortcuts));
        let issues = validate_shortcuts(&json!({"copy": "", "paste": ""}));
        assert!(issues.is_empty());
    }

    #[test]
    fn structure_reports_missing_and_bools() {
        let mut map = Map::new();
        map.insert("sidebar_visible".into(), json!("yes"));
        let issues = validate_settings_structure(&map, 13);
        assert!(issues.contains(&SettingsIssue::Missing("font".into())));
        assert!(issues.contains(&SettingsIssue::NotBoolean("sidebar_visible".into())));
    }

    #[test]
    fn single_value_validation() {
        assert!(validate_setting_value("transparency", &json!(50), 13).is_ok());
        assert!(validate_setting_value("transparency", &json!(500), 13).is_err());
        assert!(validate_setting_value("shortcuts.copy", &json!("<Ctrl>"), 13).is_err());
        assert!(validate_setting_value("window_width", &json!(10), 13).is_ok());
    }
}
