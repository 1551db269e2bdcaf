//! Terminal color schemes: the built-in set plus user-defined schemes

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::config::atomic_write;
use crate::error::{ConfigError, ConfigResult};

/// Built-in scheme keys in preferences combo order.
pub const SCHEME_ORDER: [&str; 13] = [
    "system_default",
    "biglinux",
    "light",
    "dark",
    "solarized_light",
    "solarized_dark",
    "monokai",
    "dracula",
    "nord",
    "tokyonight",
    "catppuccin",
    "rose_pine",
    "pink_light",
];

const BUILTIN_SCHEMES_JSON: &str = include_str!("../../assets/schemes.json");

/// A terminal color scheme
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorScheme {
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Default text color
    pub foreground: String,
    /// Terminal background
    pub background: String,
    /// Headerbar / tab bar background, defaults to `background`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headerbar_background: Option<String>,
    /// Cursor color, defaults to `foreground`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
    /// 16 ANSI colors
    #[serde(default)]
    pub palette: Vec<String>,
}

impl ColorScheme {
    /// Headerbar background, falling back to the terminal background
    #[must_use]
    pub fn headerbar_background(&self) -> &str {
        self.headerbar_background
            .as_deref()
            .unwrap_or(&self.background)
    }

    /// Cursor color, falling back to the foreground
    #[must_use]
    pub fn cursor(&self) -> &str {
        self.cursor.as_deref().unwrap_or(&self.foreground)
    }

    /// Palette entry 4 (blue), used as accent color in dialogs
    #[must_use]
    pub fn accent(&self) -> &str {
        self.palette.get(4).map_or("#3584e4", String::as_str)
    }
}

/// The built-in schemes keyed by [`SCHEME_ORDER`] names.
pub fn builtin_schemes() -> &'static BTreeMap<String, ColorScheme> {
    static SCHEMES: OnceLock<BTreeMap<String, ColorScheme>> = OnceLock::new();
    SCHEMES.get_or_init(|| {
        serde_json::from_str(BUILTIN_SCHEMES_JSON).unwrap_or_else(|e| {
            tracing::error!(error = %e, "Built-in color schemes failed to parse");
            BTreeMap::new()
        })
    })
}

/// Built-in and custom schemes, indexable by the `color_scheme` setting.
#[derive(Debug, Clone, Default)]
pub struct SchemeRegistry {
    custom: BTreeMap<String, ColorScheme>,
    custom_file: Option<PathBuf>,
}

impl SchemeRegistry {
    /// Registry with only built-in schemes
    #[must_use]
    pub fn builtin_only() -> Self {
        Self::default()
    }

    /// Loads custom schemes from `path`. A missing or malformed file yields no
    /// custom schemes; entries without `foreground`/`background` are skipped.
    #[must_use]
    pub fn load(path: &Path) -> Self {
        let mut registry = Self {
            custom: BTreeMap::new(),
            custom_file: Some(path.to_path_buf()),
        };
        let Ok(content) = std::fs::read_to_string(path) else {
            return registry;
        };
        let raw: serde_json::Value = match serde_json::from_str(&content) {
            Ok(v) => v,
            Err(e) => {
                tracing::error!(
                    path = %path.display(),
                    error = %e,
                    "Failed to load custom color schemes"
                );
                return registry;
            }
        };
        let Some(entries) = raw.as_object() else {
            tracing::warn!("Custom schemes file is not a valid dictionary");
            return registry;
        };
        for (key, value) in entries {
            match serde_json::from_value::<ColorScheme>(value.clone()) {
                Ok(mut scheme) => {
                    if scheme.name.is_empty() {
                        scheme.name.clone_from(key);
                    }
                    registry.custom.insert(key.clone(), scheme);
                }
                Err(_) => tracing::warn!(scheme = %key, "Invalid custom scheme, skipping"),
            }
        }
        registry
    }

    /// Writes custom schemes back to the file they were loaded from.
    ///
    /// # Errors
    /// Returns an error on serialization or I/O failure.
    pub fn save(&self) -> ConfigResult<()> {
        let Some(path) = &self.custom_file else {
            return Ok(());
        };
        let json = serde_json::to_string_pretty(&self.custom)?;
        atomic_write(path, json.as_bytes())?;
        tracing::info!(count = self.custom.len(), "Saved custom schemes");
        Ok(())
    }

    /// Scheme keys in index order: built-ins, then custom names sorted
    #[must_use]
    pub fn scheme_order(&self) -> Vec<String> {
        SCHEME_ORDER
            .iter()
            .map(|s| (*s).to_string())
            .chain(
                self.custom
                    .keys()
                    .filter(|k| !SCHEME_ORDER.contains(&k.as_str()))
                    .cloned(),
            )
            .collect()
    }

    /// Number of selectable schemes
    #[must_use]
    pub fn len(&self) -> usize {
        self.scheme_order().len()
    }

    /// Always false: built-ins are present
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Scheme key for a `color_scheme` index, falling back to the first
    #[must_use]
    pub fn scheme_name_for_index(&self, index: usize) -> String {
        let order = self.scheme_order();
        order
            .get(index)
            .or_else(|| order.first())
            .cloned()
            .unwrap_or_default()
    }

    /// Index of a scheme key, if present
    #[must_use]
    pub fn index_of(&self, key: &str) -> Option<usize> {
        self.scheme_order().iter().position(|k| k == key)
    }

    /// Looks a scheme up by key; custom schemes shadow built-ins
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&ColorScheme> {
        self.custom.get(key).or_else(|| builtin_schemes().get(key))
    }

    /// Scheme for a `color_scheme` index, falling back to the first built-in
    #[must_use]
    pub fn scheme_for_index(&self, index: usize) -> ColorScheme {
        let key = self.scheme_name_for_index(index);
        self.get(&key)
            .or_else(|| builtin_schemes().get(SCHEME_ORDER[0]))
            .cloned()
            .unwrap_or_else(|| ColorScheme {
                name: "System Default".into(),
                foreground: "#ffffff".into(),
                background: "#000000".into(),
                headerbar_background: None,
                cursor: None,
                palette: Vec::new(),
            })
    }

    /// `true` if `key` names a built-in scheme
    #[must_use]
    pub fn is_builtin(key: &str) -> bool {
        SCHEME_ORDER.contains(&key)
    }

    /// Custom schemes only
    #[must_use]
    pub fn custom(&self) -> &BTreeMap<String, ColorScheme> {
        &self.custom
    }

    /// Adds or replaces a custom scheme.
    ///
    /// # Errors
    /// Built-in keys are read-only.
    pub fn upsert_custom(&mut self, key: &str, scheme: ColorScheme) -> ConfigResult<()> {
        if Self::is_builtin(key) {
            return Err(ConfigError::BuiltinScheme(key.to_string()));
        }
        self.custom.insert(key.to_string(), scheme);
        Ok(())
    }

    /// Removes a custom scheme.
    ///
    /// # Errors
    /// Built-in keys cannot be removed; unknown keys are reported.
    pub fn remove_custom(&mut self, key: &str) -> ConfigResult<ColorScheme> {
        if Self::is_builtin(key) {
            return Err(ConfigError::BuiltinScheme(key.to_string()));
        }
        self.custom
            .remove(key)
            .ok_or_else(|| ConfigError::UnknownScheme(key.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_are_complete() {
        let schemes = builtin_schemes();
        assert_eq!(schemes.len(), SCHEME_ORDER.len());
        for key in SCHEME_ORDER {
            let scheme = &schemes[key];
            assert_eq!(scheme.palette.len(), 16, "{key}");
        }
        assert_eq!(schemes["dracula"].background, "#282a36");
    }

    #[test]
    fn order_appends_sorted_custom() {
        let mut registry = SchemeRegistry::builtin_only();
        let custom = ColorScheme {
            name: "Mine".into(),
            foreground: "#eeeeee".into(),
            background: "#101010".into(),
            headerbar_background: None,
            cursor: None,
            palette: Vec::new(),
        };
        registry.upsert_custom("zeta", custom.clone()).expect("insert");
        registry.upsert_custom("alpha", custom).expect("insert");
        let order = registry.scheme_order();
        assert_eq!(order.len(), 15);
        assert_eq!(order[13], "alpha");
        assert_eq!(order[14], "zeta");
        assert_eq!(registry.scheme_name_for_index(99), "system_default");
    }

    #[test]
    fn builtins_are_read_only() {
        let mut registry = SchemeRegistry::builtin_only();
        assert!(matches!(
            registry.remove_custom("nord"),
            Err(ConfigError::BuiltinScheme(_))
        ));
    }

    #[test]
    fn load_skips_invalid_entries() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("custom_schemes.json");
        std::fs::write(
            &path,
            r##"{"good": {"foreground": "#fff", "background": "#000"}, "bad": {"name": "x"}}"##,
        )
        .expect("write");
        let registry = SchemeRegistry::load(&path);
        assert_eq!(registry.custom().len(), 1);
        assert_eq!(registry.get("good").map(|s| s.name.as_str()), Some("good"));
        assert_eq!(registry.get("good").map(ColorScheme::headerbar_background), Some("#000"));
    }

    #[test]
    fn save_round_trips_custom_schemes() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("custom_schemes.json");
        let mut registry = SchemeRegistry::load(&path);
        registry
            .upsert_custom(
                "ocean",
                ColorScheme {
                    name: "Ocean".into(),
                    foreground: "#c0c5ce".into(),
                    background: "#2b303b".into(),
                    headerbar_background: Some("#343d46".into()),
                    cursor: None,
                    palette: Vec::new(),
                },
            )
            .expect("insert");
        registry.save().expect("save");
        let reloaded = SchemeRegistry::load(&path);
        assert_eq!(reloaded.index_of("ocean"), Some(13));
    }
}
