//! Settings store
//!
//! [`SettingsManager`] owns the `settings.json` document: a JSON object of
//! settings wrapped with integrity metadata. It validates and repairs the
//! document on load, merges new defaults, validates every write, notifies
//! change listeners and persists atomically. It also owns the color scheme
//! registry, since the valid range of `color_scheme` depends on it.

use std::fmt::Write as _;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::defaults::{AppConstants, FALLBACK_FONT, default_settings};
use super::paths::{ConfigPaths, atomic_write};
use super::validator::{
    SettingsIssue, validate_setting_value, validate_settings_structure, validate_shortcuts,
};
use crate::error::{ConfigError, ConfigResult};
use crate::theme::{ColorScheme, SchemeRegistry};

/// Integrity metadata stored next to the settings object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingsMetadata {
    /// Application version that last wrote the file
    #[serde(default)]
    pub version: String,
    /// Unix time the file was first written
    #[serde(default)]
    pub created_at: f64,
    /// Unix time of the last write
    #[serde(default)]
    pub modified_at: f64,
    /// MD5 of the settings object serialized with sorted keys, compact
    #[serde(default)]
    pub checksum: Option<String>,
}

impl SettingsMetadata {
    fn new_now() -> Self {
        let now = unix_now();
        Self {
            version: AppConstants::APP_VERSION.to_string(),
            created_at: now,
            modified_at: now,
            checksum: None,
        }
    }
}

#[derive(Serialize, Deserialize)]
struct SettingsDocument {
    metadata: SettingsMetadata,
    settings: Map<String, Value>,
}

/// Change listener: `(key, old, new)`. An `Err` is logged and ignored.
pub type ChangeListener = Arc<dyn Fn(&str, &Value, &Value) -> Result<(), String> + Send + Sync>;

/// Handle returned by [`SettingsManager::add_change_listener`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

struct Inner {
    settings: Map<String, Value>,
    defaults: Map<String, Value>,
    metadata: Option<SettingsMetadata>,
    dirty: bool,
    schemes: SchemeRegistry,
}

/// Thread-safe settings store, shared as `Arc<SettingsManager>`.
pub struct SettingsManager {
    settings_file: PathBuf,
    inner: Mutex<Inner>,
    listeners: Mutex<Vec<(ListenerId, ChangeListener)>>,
    next_listener: AtomicU64,
}

impl std::fmt::Debug for SettingsManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettingsManager")
            .field("settings_file", &self.settings_file)
            .finish_non_exhaustive()
    }
}

/// MD5 hex digest of a settings object in canonical form: sorted keys,
/// compact separators and non-ASCII written as `\uXXXX` escapes, so files
/// written by earlier releases verify byte for byte.
#[must_use]
pub fn settings_checksum(settings: &Map<String, Value>) -> String {
    let canonical = escape_non_ascii(&serde_json::to_string(settings).unwrap_or_default());
    format!("{:x}", md5::compute(canonical.as_bytes()))
}

// Outside string literals serde_json output is pure ASCII, so escaping every
// non-ASCII char yields a valid JSON document.
fn escape_non_ascii(json: &str) -> String {
    if json.is_ascii() {
        return json.to_string();
    }
    let mut out = String::with_capacity(json.len() + 16);
    let mut units = [0u16; 2];
    for c in json.chars() {
        if c.is_ascii() {
            out.push(c);
        } else {
            for unit in c.encode_utf16(&mut units) {
                let _ = write!(out, "\\u{unit:04x}");
            }
        }
    }
    out
}

#[allow(clippy::cast_precision_loss)]
fn unix_now() -> f64 {
    chrono::Utc::now().timestamp_millis() as f64 / 1000.0
}

fn get_path<'a>(settings: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    let mut parts = key.split('.');
    let mut current = settings.get(parts.next()?)?;
    for part in parts {
        current = current.as_object()?.get(part)?;
    }
    Some(current)
}

// A single shortcut write must leave the whole table valid, or `save` would
// refuse to persist it.
fn check_shortcut_conflict(
    settings: &Map<String, Value>,
    key: &str,
    value: &Value,
) -> Result<(), String> {
    let Some(action) = key.strip_prefix("shortcuts.") else {
        return Ok(());
    };
    let mut table = settings
        .get("shortcuts")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();
    table.insert(action.to_string(), value.clone());
    match validate_shortcuts(&Value::Object(table)).into_iter().next() {
        Some(issue) => Err(issue.to_string()),
        None => Ok(()),
    }
}

fn set_path(settings: &mut Map<String, Value>, key: &str, value: Value) {
    let parts: Vec<&str> = key.split('.').collect();
    let Some((last, parents)) = parts.split_last() else {
        return;
    };
    let mut current = settings;
    for part in parents {
        let entry = current
            .entry((*part).to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        let Value::Object(next) = entry else {
            return;
        };
        current = next;
    }
    current.insert((*last).to_string(), value);
}

impl SettingsManager {
    /// Loads settings with [`FALLBACK_FONT`] as the default font.
    #[must_use]
    pub fn load(paths: &ConfigPaths) -> Self {
        Self::load_with_default_font(paths, FALLBACK_FONT)
    }

    /// Loads, validates, repairs and merges settings, writing the file back
    /// if anything changed. Never fails: unreadable files yield defaults.
    #[must_use]
    pub fn load_with_default_font(paths: &ConfigPaths, default_font: &str) -> Self {
        let _span = tracing::info_span!(crate::tracing::span_names::SETTINGS_LOAD).entered();
        let defaults = default_settings(default_font);
        let schemes = SchemeRegistry::load(&paths.custom_schemes_file());
        let settings_file = paths.settings_file();

        let (settings, metadata, mut dirty) = read_settings_file(&settings_file, &defaults);
        let mut inner = Inner {
            settings,
            defaults,
            metadata,
            dirty: false,
            schemes,
        };
        dirty |= inner.validate_and_repair();
        dirty |= inner.merge_with_defaults();
        inner.dirty = dirty;

        let manager = Self {
            settings_file,
            inner: Mutex::new(inner),
            listeners: Mutex::new(Vec::new()),
            next_listener: AtomicU64::new(1),
        };
        manager.apply_log_settings();
        if dirty && let Err(e) = manager.save(false) {
            tracing::error!(error = %e, "Failed to persist repaired settings");
        }
        tracing::info!("Settings manager initialized");
        manager
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn apply_log_settings(&self) {
        let (to_file, level) = {
            let inner = self.lock();
            (
                inner.settings.get("log_to_file").and_then(Value::as_bool),
                inner
                    .settings
                    .get("console_log_level")
                    .and_then(Value::as_str)
                    .map(str::to_string),
            )
        };
        crate::tracing::set_log_to_file_enabled(to_file.unwrap_or(false));
        if let Some(level) = level {
            crate::tracing::set_console_log_level(&level);
        }
    }

    /// Path of the backing file
    #[must_use]
    pub fn settings_file(&self) -> &std::path::Path {
        &self.settings_file
    }

    /// `true` if there are unsaved changes
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.lock().dirty
    }

    /// Persists the settings if dirty (or always with `force`).
    ///
    /// Invalid settings are never written; the store stays dirty.
    ///
    /// # Errors
    /// Returns [`ConfigError::InvalidSettings`] or an I/O/JSON error.
    pub fn save(&self, force: bool) -> ConfigResult<()> {
        let _span = tracing::debug_span!(crate::tracing::span_names::SETTINGS_SAVE).entered();
        let mut inner = self.lock();
        if !inner.dirty && !force {
            return Ok(());
        }
        let issues = validate_settings_structure(&inner.settings, inner.schemes.len());
        if !issues.is_empty() {
            inner.dirty = true;
            let messages: Vec<String> = issues.iter().map(ToString::to_string).collect();
            tracing::error!(issues = ?messages, "Refusing to save invalid settings");
            return Err(ConfigError::InvalidSettings(messages));
        }

        let mut metadata = inner.metadata.clone().unwrap_or_else(SettingsMetadata::new_now);
        metadata.modified_at = unix_now();
        metadata.version = AppConstants::APP_VERSION.to_string();
        metadata.checksum = Some(settings_checksum(&inner.settings));
        let document = SettingsDocument {
            metadata: metadata.clone(),
            settings: inner.settings.clone(),
        };
        let json = serde_json::to_string_pretty(&document)?;
        if let Err(e) = atomic_write(&self.settings_file, json.as_bytes()) {
            inner.dirty = true;
            return Err(e.into());
        }
        inner.metadata = Some(metadata);
        inner.dirty = false;
        tracing::debug!(path = %self.settings_file.display(), "Settings saved");
        Ok(())
    }

    /// Saves on a background thread, logging any failure.
    pub fn save_in_background(self: &Arc<Self>) -> std::thread::JoinHandle<()> {
        let manager = Arc::clone(self);
        std::thread::spawn(move || {
            if let Err(e) = manager.save(false) {
                tracing::error!(error = %e, "Background settings save failed");
            }
        })
    }

    /// Value at a dotted key (`"shortcuts.copy"`)
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Value> {
        get_path(&self.lock().settings, key).cloned()
    }

    /// Value at `key` deserialized as `T`, or `default` when missing or
    /// of the wrong type.
    pub fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        self.get(key)
            .and_then(|v| serde_json::from_value(v).ok())
            .unwrap_or(default)
    }

    /// Boolean setting
    #[must_use]
    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        self.get(key).and_then(|v| v.as_bool()).unwrap_or(default)
    }

    /// String setting
    #[must_use]
    pub fn get_string(&self, key: &str, default: &str) -> String {
        self.get(key)
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_else(|| default.to_string())
    }

    /// Numeric setting as `f64`
    #[must_use]
    pub fn get_f64(&self, key: &str, default: f64) -> f64 {
        self.get(key).and_then(|v| v.as_f64()).unwrap_or(default)
    }

    /// Integer setting
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn get_i64(&self, key: &str, default: i64) -> i64 {
        self.get(key)
            .and_then(|v| v.as_i64().or_else(|| v.as_f64().map(|f| f.round() as i64)))
            .unwrap_or(default)
    }

    /// Validates and stores `value` at `key`, notifies listeners and saves.
    ///
    /// # Errors
    /// Returns [`ConfigError::Validation`] if a validator rejects the value;
    /// save failures are logged, the value stays set and the store dirty.
    pub fn set(&self, key: &str, value: Value) -> ConfigResult<()> {
        self.set_no_save(key, value)?;
        if let Err(e) = self.save(false) {
            tracing::error!(key, error = %e, "Failed to save settings");
        }
        Ok(())
    }

    /// Like [`set`](Self::set) without saving.
    ///
    /// # Errors
    /// Returns [`ConfigError::Validation`] if a validator rejects the value.
    pub fn set_no_save(&self, key: &str, value: Value) -> ConfigResult<()> {
        let old = {
            let mut inner = self.lock();
            let checked = validate_setting_value(key, &value, inner.schemes.len())
                .and_then(|()| check_shortcut_conflict(&inner.settings, key, &value));
            if let Err(message) = checked {
                tracing::error!(key, %message, "Failed to set setting");
                return Err(ConfigError::validation(key, value, message));
            }
            let old = get_path(&inner.settings, key).cloned().unwrap_or(Value::Null);
            set_path(&mut inner.settings, key, value.clone());
            inner.dirty = true;
            old
        };

        match key {
            "console_log_level" => {
                if let Some(level) = value.as_str() {
                    crate::tracing::set_console_log_level(level);
                }
            }
            "log_to_file" => {
                crate::tracing::set_log_to_file_enabled(value.as_bool().unwrap_or(false));
            }
            _ => {}
        }
        self.notify(key, &old, &value);
        Ok(())
    }

    fn notify(&self, key: &str, old: &Value, new: &Value) {
        let listeners: Vec<ChangeListener> = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect();
        for listener in listeners {
            if let Err(e) = listener(key, old, new) {
                tracing::error!(key, error = %e, "Change listener failed");
            }
        }
    }

    /// Registers a change listener
    pub fn add_change_listener(&self, listener: ChangeListener) -> ListenerId {
        let id = ListenerId(self.next_listener.fetch_add(1, Ordering::Relaxed));
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, listener));
        id
    }

    /// Removes a listener; returns `false` if it was not registered
    pub fn remove_change_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.lock().unwrap_or_else(PoisonError::into_inner);
        let before = listeners.len();
        listeners.retain(|(lid, _)| *lid != id);
        listeners.len() != before
    }

    /// Resets the given keys, or everything when `keys` is `None`, and saves.
    ///
    /// # Errors
    /// Propagates validation errors from resetting individual keys.
    pub fn reset_to_defaults(&self, keys: Option<&[&str]>) -> ConfigResult<()> {
        match keys {
            None => {
                let (old, new) = {
                    let mut guard = self.lock();
                    let inner = &mut *guard;
                    let old = std::mem::replace(&mut inner.settings, inner.defaults.clone());
                    inner.dirty = true;
                    (old, inner.settings.clone())
                };
                tracing::info!("All settings reset to defaults");
                for (key, value) in &new {
                    let previous = old.get(key).unwrap_or(&Value::Null);
                    if previous != value {
                        self.notify(key, previous, value);
                    }
                }
            }
            Some(keys) => {
                for key in keys {
                    let default = self.lock().defaults.get(*key).cloned();
                    if let Some(default) = default {
                        self.set_no_save(key, default)?;
                    }
                }
                tracing::info!(count = keys.len(), "Settings reset to defaults");
            }
        }
        if let Err(e) = self.save(true) {
            tracing::error!(error = %e, "Failed to save settings after reset");
        }
        Ok(())
    }

    /// Default value for a key
    #[must_use]
    pub fn default_value(&self, key: &str) -> Option<Value> {
        get_path(&self.lock().defaults, key).cloned()
    }

    /// Copy of the whole settings object
    #[must_use]
    pub fn snapshot(&self) -> Map<String, Value> {
        self.lock().settings.clone()
    }

    /// Accelerator for an action, empty if unbound
    #[must_use]
    pub fn get_shortcut(&self, action: &str) -> String {
        self.get_string(&format!("shortcuts.{action}"), "")
    }

    /// Binds an accelerator to an action.
    ///
    /// # Errors
    /// Returns a validation error for unparseable accelerators.
    pub fn set_shortcut(&self, action: &str, accel: &str) -> ConfigResult<()> {
        self.set(&format!("shortcuts.{action}"), Value::String(accel.to_string()))
    }

    /// Whether the sessions sidebar is shown
    #[must_use]
    pub fn sidebar_visible(&self) -> bool {
        self.get_bool("sidebar_visible", true)
    }

    /// Shows or hides the sessions sidebar.
    ///
    /// # Errors
    /// Never fails for a boolean; kept fallible like [`set`](Self::set).
    pub fn set_sidebar_visible(&self, visible: bool) -> ConfigResult<()> {
        self.set("sidebar_visible", Value::Bool(visible))
    }

    /// Pango font description
    #[must_use]
    pub fn font(&self) -> String {
        self.get_string("font", FALLBACK_FONT)
    }

    /// Terminal transparency, 0-100
    #[must_use]
    pub fn transparency(&self) -> f64 {
        self.get_f64("transparency", 0.0).clamp(0.0, 100.0)
    }

    /// Headerbar transparency, 0-100
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn headerbar_transparency(&self) -> u8 {
        self.get_f64("headerbar_transparency", 0.0).clamp(0.0, 100.0).round() as u8
    }

    /// `"never"`, `"always"` or `"ask"`
    #[must_use]
    pub fn session_restore_policy(&self) -> String {
        self.get_string("session_restore_policy", "never")
    }

    /// Folder paths expanded in the session tree
    #[must_use]
    pub fn expanded_folders(&self) -> Vec<String> {
        self.get_or("tree_expanded_folders", Vec::new())
    }

    /// `user@host:port` keys of ssh_config hosts the user removed
    #[must_use]
    pub fn ignored_ssh_config_hosts(&self) -> Vec<String> {
        self.get_or("ignored_ssh_config_hosts", Vec::new())
    }

    /// Index into [`scheme_order`](Self::scheme_order)
    #[must_use]
    pub fn color_scheme_index(&self) -> usize {
        usize::try_from(self.get_i64("color_scheme", 0)).unwrap_or(0)
    }

    /// Scheme keys in index order
    #[must_use]
    pub fn scheme_order(&self) -> Vec<String> {
        self.lock().schemes.scheme_order()
    }

    /// Key of the active scheme, first scheme when out of range
    #[must_use]
    pub fn color_scheme_name(&self) -> String {
        let index = self.color_scheme_index();
        self.lock().schemes.scheme_name_for_index(index)
    }

    /// The active scheme
    #[must_use]
    pub fn color_scheme(&self) -> ColorScheme {
        let index = self.color_scheme_index();
        self.lock().schemes.scheme_for_index(index)
    }

    /// Runs `f` with the scheme registry
    pub fn with_schemes<R>(&self, f: impl FnOnce(&SchemeRegistry) -> R) -> R {
        f(&self.lock().schemes)
    }

    /// Adds or replaces a custom scheme and saves the schemes file.
    ///
    /// # Errors
    /// Built-in keys are read-only; save failures are returned.
    pub fn upsert_custom_scheme(&self, key: &str, scheme: ColorScheme) -> ConfigResult<()> {
        let mut inner = self.lock();
        inner.schemes.upsert_custom(key, scheme)?;
        inner.schemes.save()
    }

    /// Removes a custom scheme and saves. If it was active, the first scheme
    /// becomes active.
    ///
    /// # Errors
    /// Built-in or unknown keys are rejected; save failures are returned.
    pub fn remove_custom_scheme(&self, key: &str) -> ConfigResult<()> {
        let was_active = self.color_scheme_name() == key;
        {
            let mut inner = self.lock();
            inner.schemes.remove_custom(key)?;
            inner.schemes.save()?;
        }
        if was_active {
            self.set("color_scheme", Value::from(0))?;
        }
        Ok(())
    }
}

impl Inner {
    fn validate_and_repair(&mut self) -> bool {
        let issues = validate_settings_structure(&self.settings, self.schemes.len());
        if issues.is_empty() {
            return false;
        }
        let messages: Vec<String> = issues.iter().map(ToString::to_string).collect();
        tracing::warn!(issues = ?messages, "Settings validation failed");
        let mut repaired = false;
        for issue in &issues {
            let key = match issue {
                SettingsIssue::DuplicateShortcuts | SettingsIssue::InvalidShortcut { .. } => {
                    Some("shortcuts")
                }
                other => other.repair_key(),
            };
            if let Some(key) = key
                && let Some(default) = self.defaults.get(key)
            {
                self.settings.insert(key.to_string(), default.clone());
                repaired = true;
            }
        }
        if repaired {
            tracing::info!("Settings automatically repaired");
        }
        repaired
    }

    fn merge_with_defaults(&mut self) -> bool {
        let mut updated = false;
        for (key, default) in &self.defaults {
            match (self.settings.get_mut(key), default) {
                (None, _) => {
                    self.settings.insert(key.clone(), default.clone());
                    updated = true;
                }
                (Some(Value::Object(current)), Value::Object(default_map)) => {
                    for (sub_key, sub_default) in default_map {
                        if !current.contains_key(sub_key) {
                            current.insert(sub_key.clone(), sub_default.clone());
                            updated = true;
                        }
                    }
                }
                _ => {}
            }
        }
        updated
    }
}

/// Reads the file, returning (settings, metadata, needs_rewrite).
fn read_settings_file(
    path: &std::path::Path,
    defaults: &Map<String, Value>,
) -> (Map<String, Value>, Option<SettingsMetadata>, bool) {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::info!("Settings file not found, using defaults");
            return (defaults.clone(), None, true);
        }
        Err(e) => {
            tracing::error!(path = %path.display(), error = %e, "Failed to load settings");
            return (defaults.clone(), None, false);
        }
    };
    let root: Value = match serde_json::from_str(&content) {
        Ok(v) => v,
        Err(e) => {
            tracing::error!(error = %e, "Settings file is corrupted");
            return (defaults.clone(), None, false);
        }
    };
    let Value::Object(mut root) = root else {
        tracing::error!("Settings file must contain a JSON object at the root");
        return (defaults.clone(), None, false);
    };

    if root.contains_key("settings") && root.contains_key("metadata") {
        let metadata = root
            .remove("metadata")
            .and_then(|m| serde_json::from_value::<SettingsMetadata>(m).ok());
        let Some(Value::Object(settings)) = root.remove("settings") else {
            tracing::error!("Settings file has invalid structure");
            return (defaults.clone(), None, false);
        };
        if let Some(expected) = metadata.as_ref().and_then(|m| m.checksum.as_deref())
            && settings_checksum(&settings) != expected
        {
            tracing::warn!("Settings checksum mismatch - file may be corrupted");
        }
        (settings, metadata, false)
    } else {
        tracing::info!("Loaded legacy settings format");
        (root, None, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;

    fn manager() -> (tempfile::TempDir, ConfigPaths, SettingsManager) {
        let dir = tempfile::tempdir().expect("tempdir");
        let paths = ConfigPaths::with_root(dir.path());
        let manager = SettingsManager::load(&paths);
        (dir, paths, manager)
    }

    #[test]
    fn missing_file_gives_defaults_and_writes_wrapper() {
        let (_dir, paths, manager) = manager();
        assert_eq!(manager.get("color_scheme"), Some(json!(1)));
        let written: Value =
            serde_json::from_str(&std::fs::read_to_string(paths.settings_file()).expect("read"))
                .expect("json");
        assert!(written["metadata"]["checksum"].is_string());
        assert_eq!(written["settings"]["transparency"], json!(16));
    }

    #[test]
    fn dotted_get_and_set() {
        let (_dir, _paths, manager) = manager();
        assert_eq!(manager.get_shortcut("copy"), "<Control><Shift>Insert");
        manager.set_shortcut("copy", "<Control><Shift>c").expect("set");
        assert_eq!(manager.get("shortcuts.copy"), Some(json!("<Control><Shift>c")));
        manager.set("custom.nested.value", json!(3)).expect("set");
        assert_eq!(manager.get("custom.nested.value"), Some(json!(3)));
        assert_eq!(manager.get("custom.missing"), None);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let (_dir, _paths, manager) = manager();
        let err = manager.set("transparency", json!(150)).expect_err("rejected");
        assert!(matches!(err, ConfigError::Validation { ref key, .. } if key == "transparency"));
        assert!(manager.set("color_scheme", json!(13)).is_err());
        assert!(manager.set("shortcuts.copy", json!("<Control>")).is_err());
        assert!(manager.set("sidebar_visible", json!("yes")).is_err());
        assert_eq!(manager.get("transparency"), Some(json!(16)));
    }

    #[test]
    fn listeners_receive_old_and_new() {
        let (_dir, _paths, manager) = manager();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let id = manager.add_change_listener(Arc::new(move |key, old, new| {
            assert_eq!(key, "transparency");
            assert_eq!(old, &json!(16));
            assert_eq!(new, &json!(40));
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }));
        manager.add_change_listener(Arc::new(|_, _, _| Err("boom".into())));
        manager.set("transparency", json!(40)).expect("set");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(manager.remove_change_listener(id));
        assert!(!manager.remove_change_listener(id));
    }

    #[test]
    fn persisted_values_survive_reload() {
        let (_dir, paths, manager) = manager();
        manager.set("font", json!("JetBrains Mono 13")).expect("set");
        drop(manager);
        let reloaded = SettingsManager::load(&paths);
        assert_eq!(reloaded.font(), "JetBrains Mono 13");
        assert!(!reloaded.is_dirty());
    }

    #[test]
    fn legacy_format_is_migrated() {
        let dir = tempfile::tempdir().expect("tempdir");
        let paths = ConfigPaths::with_root(dir.path());
        std::fs::write(paths.settings_file(), r#"{"transparency": 33}"#).expect("write");
        let manager = SettingsManager::load(&paths);
        assert!((manager.transparency() - 33.0).abs() < f64::EPSILON);
        let written: Value =
            serde_json::from_str(&std::fs::read_to_string(paths.settings_file()).expect("read"))
                .expect("json");
        assert_eq!(written["settings"]["transparency"], json!(33));
    }

    #[test]
    fn corrupted_file_gives_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let paths = ConfigPaths::with_root(dir.path());
        std::fs::write(paths.settings_file(), "{not json").expect("write");
        let manager = SettingsManager::load(&paths);
        assert_eq!(manager.get("color_scheme"), Some(json!(1)));
    }

    #[test]
    fn invalid_values_are_repaired_on_load() {
        let dir = tempfile::tempdir().expect("tempdir");
        let paths = ConfigPaths::with_root(dir.path());
        let doc = json!({
            "color_scheme": 99,
            "transparency": -5,
            "font": "",
            "sidebar_visible": "no",
            "shortcuts": {"copy": "<Control>c", "paste": "<Control>c"}
        });
        std::fs::write(paths.settings_file(), doc.to_string()).expect("write");
        let manager = SettingsManager::load(&paths);
        assert_eq!(manager.get("color_scheme"), Some(json!(1)));
        assert_eq!(manager.get("transparency"), Some(json!(16)));
        assert_eq!(manager.font(), FALLBACK_FONT);
        assert_eq!(manager.get("sidebar_visible"), Some(json!(false)));
        assert_eq!(manager.get_shortcut("paste"), "<Control><Shift>v");
    }

    #[test]
    fn second_repair_pass_changes_nothing() {
        let (_dir, _paths, manager) = manager();
        let mut inner = manager.lock();
        inner.settings.insert("transparency".into(), json!("opaque"));
        inner.settings.remove("font");
        assert!(inner.validate_and_repair());
        inner.dirty = false;
        let repaired = inner.settings.clone();
        assert!(!inner.validate_and_repair());
        assert!(!inner.merge_with_defaults());
        assert_eq!(inner.settings, repaired);
        assert!(!inner.dirty);
    }

    #[test]
    fn nested_defaults_are_merged() {
        let dir = tempfile::tempdir().expect("tempdir");
        let paths = ConfigPaths::with_root(dir.path());
        let doc = json!({
            "color_scheme": 2,
            "font": "Monospace 12",
            "shortcuts": {"copy": "<Control><Shift>c"}
        });
        std::fs::write(paths.settings_file(), doc.to_string()).expect("write");
        let manager = SettingsManager::load(&paths);
        assert_eq!(manager.get_shortcut("copy"), "<Control><Shift>c");
        assert_eq!(manager.get_shortcut("quit"), "<Control><Shift>q");
        assert_eq!(manager.color_scheme_name(), "light");
    }

    #[test]
    fn reset_selected_keys() {
        let (_dir, _paths, manager) = manager();
        manager.set("transparency", json!(70)).expect("set");
        manager.set("bell_sound", json!(true)).expect("set");
        manager.reset_to_defaults(Some(&["transparency"])).expect("reset");
        assert_eq!(manager.get("transparency"), Some(json!(16)));
        assert_eq!(manager.get("bell_sound"), Some(json!(true)));
        manager.reset_to_defaults(None).expect("reset");
        assert_eq!(manager.get("bell_sound"), Some(json!(false)));
    }

    #[test]
    fn checksum_is_key_order_independent() {
        let mut a = Map::new();
        a.insert("b".into(), json!(1));
        a.insert("a".into(), json!({"y": 1, "x": 2}));
        let b: Map<String, Value> =
            serde_json::from_str(r#"{"a": {"x": 2, "y": 1}, "b": 1}"#).expect("json");
        assert_eq!(settings_checksum(&a), settings_checksum(&b));
        assert_eq!(settings_checksum(&Map::new()), "99914b932bd37a50b983c5e7c90ae93b");
    }

    #[test]
    fn checksum_escapes_non_ascii_like_python_json() {
        let settings: Map<String, Value> =
            serde_json::from_value(json!({"path": "~/\u{1F600}", "font": "Fira C\u{f3}digo 12"}))
                .expect("json");
        assert_eq!(settings_checksum(&settings), "3790b034915bb321b93767036c61f253");
    }

    #[test]
    fn duplicate_shortcut_is_rejected_before_it_reaches_memory() {
        let (_dir, paths, manager) = manager();
        let paste = manager.get_shortcut("paste");
        let err = manager.set_shortcut("copy", &paste).expect_err("duplicate");
        assert!(matches!(err, ConfigError::Validation { ref key, .. } if key == "shortcuts.copy"));
        assert_eq!(manager.get_shortcut("copy"), "<Control><Shift>Insert");
        assert!(!manager.is_dirty());

        manager.set_shortcut("paste", "").expect("clear");
        manager.set_shortcut("copy", &paste).expect("move");
        let reloaded = SettingsManager::load(&paths);
        assert_eq!(reloaded.get_shortcut("copy"), paste);
    }

    #[test]
    fn full_reset_notifies_changed_keys() {
        let (_dir, _paths, manager) = manager();
        manager.set("transparency", json!(70)).expect("set");
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        manager.add_change_listener(Arc::new(move |key, old, new| {
            sink.lock().expect("lock").push((key.to_string(), old.clone(), new.clone()));
            Ok(())
        }));
        manager.reset_to_defaults(None).expect("reset");
        let seen = seen.lock().expect("lock");
        assert_eq!(*seen, vec![("transparency".to_string(), json!(70), json!(16))]);
    }
}
