//! Layered highlight configuration
//!
//! Contexts come from three layers, later ones replacing earlier ones by
//! context name: the rules bundled with the application, an optional system
//! directory, and the user's `highlights/` directory. The context named
//! `global` holds the global rules. Enabled flags and disabled rule/context
//! names live separately in `highlights_settings.json` so that toggling a
//! bundled rule does not require copying it into the user directory.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::{ConfigPaths, atomic_write};
use crate::error::{HighlightError, HighlightResult};
use crate::models::SessionType;

use super::rules::{HighlightConfig, HighlightContext, HighlightRule, validate_pattern};

/// Name of the context that carries the global rules
pub const GLOBAL_CONTEXT: &str = "global";

const GLOBAL_DESCRIPTION: &str = "Global highlight rules applied to all terminal output";

/// Where distributions may install additional contexts
pub const SYSTEM_HIGHLIGHTS_DIR: &str = "/usr/share/zashterminal/highlights";

const BUNDLED: &[(&str, &str)] = &[
    ("global", include_str!("../../assets/highlights/global.json")),
    ("ping", include_str!("../../assets/highlights/ping.json")),
    ("systemctl", include_str!("../../assets/highlights/systemctl.json")),
];

#[derive(Debug, Default, Serialize, Deserialize)]
struct HighlightSettingsFile {
    #[serde(default)]
    enabled_for_local: bool,
    #[serde(default)]
    enabled_for_ssh: bool,
    #[serde(default = "default_context_aware")]
    context_aware_enabled: bool,
    #[serde(default)]
    disabled_global_rules: Vec<String>,
    #[serde(default)]
    disabled_contexts: Vec<String>,
}

const fn default_context_aware() -> bool {
    true
}

/// Loads, edits and persists highlight rules
#[derive(Debug)]
pub struct HighlightManager {
    user_dir: PathBuf,
    settings_file: PathBuf,
    system_dir: Option<PathBuf>,
    config: HighlightConfig,
    triggers: HashMap<String, String>,
}

impl HighlightManager {
    /// Manager over an explicit user directory and settings file. Call
    /// [`load`](Self::load) before use.
    #[must_use]
    pub fn new(user_dir: impl Into<PathBuf>, settings_file: impl Into<PathBuf>) -> Self {
        Self {
            user_dir: user_dir.into(),
            settings_file: settings_file.into(),
            system_dir: None,
            config: HighlightConfig {
                context_aware_enabled: true,
                ..HighlightConfig::default()
            },
            triggers: HashMap::new(),
        }
    }

    /// Loaded manager for the standard locations, including
    /// [`SYSTEM_HIGHLIGHTS_DIR`]
    #[must_use]
    pub fn from_paths(paths: &ConfigPaths) -> Self {
        let mut manager = Self::new(paths.highlights_dir(), paths.highlight_settings_file())
            .with_system_dir(SYSTEM_HIGHLIGHTS_DIR);
        manager.load();
        manager
    }

    /// Adds a system directory layered between the bundled rules and the
    /// user directory
    #[must_use]
    pub fn with_system_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.system_dir = Some(dir.into());
        self
    }

    /// User override directory
    #[must_use]
    pub fn user_dir(&self) -> &Path {
        &self.user_dir
    }

    /// (Re)loads every layer. Unreadable files are logged and skipped.
    pub fn load(&mut self) {
        let settings = self.read_settings();

        let mut contexts: BTreeMap<String, HighlightContext> = BTreeMap::new();
        for (name, data) in BUNDLED {
            match HighlightContext::from_json(data) {
                Ok(ctx) => {
                    contexts.insert(ctx.command_name.clone(), ctx);
                }
                Err(e) => tracing::error!(context = name, error = %e, "Bundled highlights invalid"),
            }
        }
        if let Some(dir) = &self.system_dir {
            contexts.extend(load_dir(dir));
        }
        contexts.extend(load_dir(&self.user_dir));

        let disabled_rules: BTreeSet<String> = settings.disabled_global_rules.into_iter().collect();
        let mut global_rules = contexts
            .remove(GLOBAL_CONTEXT)
            .map(|g| g.rules)
            .unwrap_or_default();
        for rule in &mut global_rules {
            if disabled_rules.contains(&rule.name) {
                rule.enabled = false;
            }
        }
        for name in &settings.disabled_contexts {
            if let Some(ctx) = contexts.get_mut(name) {
                ctx.enabled = false;
            }
        }

        self.config = HighlightConfig {
            enabled_for_local: settings.enabled_for_local,
            enabled_for_ssh: settings.enabled_for_ssh,
            context_aware_enabled: settings.context_aware_enabled,
            global_rules,
            contexts,
        };
        self.rebuild_triggers();
        tracing::info!(
            contexts = self.config.contexts.len(),
            global_rules = self.config.global_rules.len(),
            "Highlight rules loaded"
        );
    }

    fn read_settings(&self) -> HighlightSettingsFile {
        let defaults = HighlightSettingsFile {
            context_aware_enabled: true,
            ..HighlightSettingsFile::default()
        };
        match fs::read_to_string(&self.settings_file) {
            Ok(data) => serde_json::from_str(&data).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Invalid highlight settings, using defaults");
                defaults
            }),
            Err(_) => defaults,
        }
    }

    fn rebuild_triggers(&mut self) {
        self.triggers = self
            .config
            .contexts
            .values()
            .flat_map(|ctx| {
                ctx.triggers
                    .iter()
                    .map(|t| (t.to_lowercase(), ctx.command_name.clone()))
            })
            .collect();
    }

    /// Current configuration
    #[must_use]
    pub const fn config(&self) -> &HighlightConfig {
        &self.config
    }

    /// Global rules in order
    #[must_use]
    pub fn global_rules(&self) -> &[HighlightRule] {
        &self.config.global_rules
    }

    /// Context by name
    #[must_use]
    pub fn context(&self, name: &str) -> Option<&HighlightContext> {
        self.config.contexts.get(name)
    }

    /// Context names, sorted
    #[must_use]
    pub fn context_names(&self) -> Vec<String> {
        self.config.contexts.keys().cloned().collect()
    }

    /// Every command that selects a context (lowercased)
    #[must_use]
    pub fn all_triggers(&self) -> BTreeSet<String> {
        self.triggers.keys().cloned().collect()
    }

    /// Context selected by `command`, matched case-insensitively
    #[must_use]
    pub fn context_for_command(&self, command: &str) -> Option<&str> {
        self.triggers.get(&command.to_lowercase()).map(String::as_str)
    }

    /// Rules to apply while `command` runs.
    ///
    /// An enabled context contributes its own active rules, preceded by the
    /// global ones when it asks for them. Otherwise, or when context
    /// awareness is off, only the active global rules apply.
    #[must_use]
    pub fn rules_for_command(&self, command: Option<&str>) -> Vec<HighlightRule> {
        let globals = || {
            self.config
                .global_rules
                .iter()
                .filter(|r| r.enabled && r.is_valid())
                .cloned()
        };
        let context = command
            .filter(|_| self.config.context_aware_enabled)
            .and_then(|c| self.context_for_command(c))
            .and_then(|name| self.config.contexts.get(name))
            .filter(|ctx| ctx.enabled);

        match context {
            Some(ctx) if ctx.use_global_rules => {
                globals().chain(ctx.active_rules().cloned()).collect()
            }
            Some(ctx) => ctx.active_rules().cloned().collect(),
            None => globals().collect(),
        }
    }

    /// Whether output of this kind of terminal is highlighted
    #[must_use]
    pub const fn is_enabled_for(&self, session_type: SessionType) -> bool {
        match session_type {
            SessionType::Local => self.config.enabled_for_local,
            SessionType::Ssh => self.config.enabled_for_ssh,
        }
    }

    /// Toggles highlighting for local shells
    ///
    /// # Errors
    /// Settings file write failures.
    pub fn set_enabled_for_local(&mut self, enabled: bool) -> HighlightResult<()> {
        self.config.enabled_for_local = enabled;
        self.save_settings()
    }

    /// Toggles highlighting for SSH sessions
    ///
    /// # Errors
    /// Settings file write failures.
    pub fn set_enabled_for_ssh(&mut self, enabled: bool) -> HighlightResult<()> {
        self.config.enabled_for_ssh = enabled;
        self.save_settings()
    }

    /// Toggles per-command rule selection
    ///
    /// # Errors
    /// Settings file write failures.
    pub fn set_context_aware_enabled(&mut self, enabled: bool) -> HighlightResult<()> {
        self.config.context_aware_enabled = enabled;
        self.save_settings()
    }

    /// Writes `highlights_settings.json`
    ///
    /// # Errors
    /// Serialization or write failures.
    pub fn save_settings(&self) -> HighlightResult<()> {
        let file = HighlightSettingsFile {
            enabled_for_local: self.config.enabled_for_local,
            enabled_for_ssh: self.config.enabled_for_ssh,
            context_aware_enabled: self.config.context_aware_enabled,
            disabled_global_rules: self
                .config
                .global_rules
                .iter()
                .filter(|r| !r.enabled)
                .map(|r| r.name.clone())
                .collect(),
            disabled_contexts: self
                .config
                .contexts
                .values()
                .filter(|c| !c.enabled)
                .map(|c| c.command_name.clone())
                .collect(),
        };
        atomic_write(&self.settings_file, serde_json::to_string_pretty(&file)?.as_bytes())?;
        Ok(())
    }

    fn user_file(&self, name: &str) -> PathBuf {
        self.user_dir.join(format!("{name}.json"))
    }

    /// Writes a context to the user directory
    ///
    /// # Errors
    /// [`HighlightError::ContextNotFound`] or write failures.
    pub fn save_context(&self, name: &str) -> HighlightResult<()> {
        let ctx = self
            .config
            .contexts
            .get(name)
            .ok_or_else(|| HighlightError::ContextNotFound(name.to_string()))?;
        atomic_write(&self.user_file(name), serde_json::to_string_pretty(ctx)?.as_bytes())?;
        Ok(())
    }

    /// Writes the global rules to the user's `global.json`
    ///
    /// # Errors
    /// Write failures.
    pub fn save_global_rules(&self) -> HighlightResult<()> {
        let global = HighlightContext {
            command_name: GLOBAL_CONTEXT.to_string(),
            triggers: Vec::new(),
            rules: self.config.global_rules.clone(),
            enabled: true,
            description: GLOBAL_DESCRIPTION.to_string(),
            use_global_rules: false,
        };
        atomic_write(
            &self.user_file(GLOBAL_CONTEXT),
            serde_json::to_string_pretty(&global)?.as_bytes(),
        )?;
        Ok(())
    }

    /// Whether the user directory overrides this context
    #[must_use]
    pub fn has_user_override(&self, name: &str) -> bool {
        self.user_file(name).is_file()
    }

    /// Drops the user override of a context and reloads.
    ///
    /// Returns whether a file was removed.
    ///
    /// # Errors
    /// Deletion failures.
    pub fn delete_user_context(&mut self, name: &str) -> HighlightResult<bool> {
        let path = self.user_file(name);
        if !path.is_file() {
            return Ok(false);
        }
        fs::remove_file(path)?;
        self.load();
        Ok(true)
    }

    fn rule_index(rules: &[HighlightRule], index: usize) -> HighlightResult<()> {
        if index < rules.len() {
            Ok(())
        } else {
            Err(HighlightError::RuleIndex {
                index,
                len: rules.len(),
            })
        }
    }

    fn context_mut(&mut self, name: &str) -> HighlightResult<&mut HighlightContext> {
        self.config
            .contexts
            .get_mut(name)
            .ok_or_else(|| HighlightError::ContextNotFound(name.to_string()))
    }

    /// Appends a global rule and saves
    ///
    /// # Errors
    /// Invalid pattern or write failures.
    pub fn add_global_rule(&mut self, rule: HighlightRule) -> HighlightResult<()> {
        validate_pattern(&rule.pattern)?;
        self.config.global_rules.push(rule);
        self.save_global_rules()
    }

    /// Replaces a global rule and saves
    ///
    /// # Errors
    /// Bad index, invalid pattern or write failures.
    pub fn update_global_rule(&mut self, index: usize, rule: HighlightRule) -> HighlightResult<()> {
        Self::rule_index(&self.config.global_rules, index)?;
        validate_pattern(&rule.pattern)?;
        self.config.global_rules[index] = rule;
        self.save_global_rules()
    }

    /// Removes a global rule and saves
    ///
    /// # Errors
    /// Bad index or write failures.
    pub fn remove_global_rule(&mut self, index: usize) -> HighlightResult<HighlightRule> {
        Self::rule_index(&self.config.global_rules, index)?;
        let rule = self.config.global_rules.remove(index);
        self.save_global_rules()?;
        Ok(rule)
    }

    /// Enables or disables a global rule
    ///
    /// # Errors
    /// Bad index or write failures.
    pub fn set_global_rule_enabled(&mut self, index: usize, enabled: bool) -> HighlightResult<()> {
        Self::rule_index(&self.config.global_rules, index)?;
        self.config.global_rules[index].enabled = enabled;
        self.save_settings()
    }

    /// Appends a rule to a context and saves the context
    ///
    /// # Errors
    /// Unknown context, invalid pattern or write failures.
    pub fn add_context_rule(&mut self, context: &str, rule: HighlightRule) -> HighlightResult<()> {
        validate_pattern(&rule.pattern)?;
        self.context_mut(context)?.rules.push(rule);
        self.save_context(context)
    }

    /// Replaces a context rule and saves the context
    ///
    /// # Errors
    /// Unknown context, bad index, invalid pattern or write failures.
    pub fn update_context_rule(
        &mut self,
        context: &str,
        index: usize,
        rule: HighlightRule,
    ) -> HighlightResult<()> {
        validate_pattern(&rule.pattern)?;
        let ctx = self.context_mut(context)?;
        Self::rule_index(&ctx.rules, index)?;
        ctx.rules[index] = rule;
        self.save_context(context)
    }

    /// Removes a context rule and saves the context
    ///
    /// # Errors
    /// Unknown context, bad index or write failures.
    pub fn remove_context_rule(
        &mut self,
        context: &str,
        index: usize,
    ) -> HighlightResult<HighlightRule> {
        let ctx = self.context_mut(context)?;
        Self::rule_index(&ctx.rules, index)?;
        let rule = ctx.rules.remove(index);
        self.save_context(context)?;
        Ok(rule)
    }

    /// Enables or disables a context rule and saves the context
    ///
    /// # Errors
    /// Unknown context, bad index or write failures.
    pub fn set_context_rule_enabled(
        &mut self,
        context: &str,
        index: usize,
        enabled: bool,
    ) -> HighlightResult<()> {
        let ctx = self.context_mut(context)?;
        Self::rule_index(&ctx.rules, index)?;
        ctx.rules[index].enabled = enabled;
        self.save_context(context)
    }

    /// Moves a context rule from one position to another. Both indices must
    /// be in range.
    ///
    /// # Errors
    /// Unknown context, bad index or write failures.
    pub fn move_context_rule(
        &mut self,
        context: &str,
        from: usize,
        to: usize,
    ) -> HighlightResult<()> {
        let ctx = self.context_mut(context)?;
        Self::rule_index(&ctx.rules, from)?;
        Self::rule_index(&ctx.rules, to)?;
        let rule = ctx.rules.remove(from);
        ctx.rules.insert(to, rule);
        self.save_context(context)
    }

    /// Adds a new context and saves it
    ///
    /// # Errors
    /// [`HighlightError::ContextExists`] or write failures.
    pub fn add_context(&mut self, context: HighlightContext) -> HighlightResult<()> {
        let name = context.command_name.clone();
        if name == GLOBAL_CONTEXT || self.config.contexts.contains_key(&name) {
            return Err(HighlightError::ContextExists(name));
        }
        self.config.contexts.insert(name.clone(), context);
        self.rebuild_triggers();
        self.save_context(&name)
    }

    /// Removes a context and its user file. A bundled or system context of
    /// the same name comes back on the next [`load`](Self::load).
    ///
    /// # Errors
    /// [`HighlightError::ContextNotFound`] or deletion failures.
    pub fn remove_context(&mut self, name: &str) -> HighlightResult<HighlightContext> {
        let ctx = self
            .config
            .contexts
            .remove(name)
            .ok_or_else(|| HighlightError::ContextNotFound(name.to_string()))?;
        let path = self.user_file(name);
        if path.is_file() {
            fs::remove_file(path)?;
        }
        self.rebuild_triggers();
        Ok(ctx)
    }

    /// Enables or disables a context
    ///
    /// # Errors
    /// Unknown context or write failures.
    pub fn set_context_enabled(&mut self, name: &str, enabled: bool) -> HighlightResult<()> {
        self.context_mut(name)?.enabled = enabled;
        self.save_settings()
    }

    /// Sets whether a context applies the global rules first
    ///
    /// # Errors
    /// Unknown context or write failures.
    pub fn set_context_use_global_rules(
        &mut self,
        name: &str,
        use_global: bool,
    ) -> HighlightResult<()> {
        self.context_mut(name)?.use_global_rules = use_global;
        self.save_context(name)
    }

    fn remove_user_files(&self, keep: impl Fn(&str) -> bool) {
        for path in json_files(&self.user_dir) {
            let stem = path.file_stem().map(|s| s.to_string_lossy().into_owned());
            if stem.as_deref().is_some_and(&keep) {
                continue;
            }
            if let Err(e) = fs::remove_file(&path) {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Failed to delete highlight file"
                );
            }
        }
    }

    /// Deletes every user override and reloads
    pub fn reset_all(&mut self) {
        self.remove_user_files(|_| false);
        self.load();
    }

    /// Deletes the user's global rules and reloads
    pub fn reset_global_rules(&mut self) {
        self.remove_user_files(|stem| stem != GLOBAL_CONTEXT);
        self.load();
    }

    /// Deletes every user context except the global rules and reloads
    pub fn reset_contexts(&mut self) {
        self.remove_user_files(|stem| stem == GLOBAL_CONTEXT);
        self.load();
    }
}

fn json_files(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut files: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| p.is_file() && p.extension().is_some_and(|e| e == "json"))
        .collect();
    files.sort();
    files
}

fn load_dir(dir: &Path) -> BTreeMap<String, HighlightContext> {
    let mut contexts = BTreeMap::new();
    for path in json_files(dir) {
        match fs::read_to_string(&path)
            .map_err(HighlightError::from)
            .and_then(|data| HighlightContext::from_json(&data))
        {
            Ok(ctx) => {
                tracing::debug!(
                    context = %ctx.command_name,
                    path = %path.display(),
                    "Loaded highlight context"
                );
                contexts.insert(ctx.command_name.clone(), ctx);
            }
            Err(e) => tracing::warn!(path = %path.display(), error = %e, "Skipping highlight file"),
        }
    }
    contexts
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn manager(dir: &TempDir) -> HighlightManager {
        let mut m = HighlightManager::new(
            dir.path().join("highlights"),
            dir.path().join("highlights_settings.json"),
        );
        m.load();
        m
    }

    #[test]
    fn bundled_rules_load() {
        let dir = TempDir::new().unwrap();
        let m = manager(&dir);
        assert!(!m.global_rules().is_empty());
        assert!(m.context("global").is_none());
        assert_eq!(m.context_for_command("PING6"), Some("ping"));
        assert!(m.config().context_aware_enabled);
        assert!(!m.is_enabled_for(SessionType::Local));
        assert!(!m.is_enabled_for(SessionType::Ssh));
    }

    #[test]
    fn user_files_override_bundled() {
        let dir = TempDir::new().unwrap();
        let user = dir.path().join("highlights");
        fs::create_dir_all(&user).unwrap();
        fs::write(
            user.join("ping.json"),
            r#"{"name":"ping","triggers":["fping"],"rules":[{"name":"n","pattern":"x","colors":["red"]}]}"#,
        )
        .unwrap();
        fs::write(user.join("broken.json"), "{not json").unwrap();
        let m = manager(&dir);
        let ping = m.context("ping").unwrap();
        assert_eq!(ping.rules.len(), 1);
        assert_eq!(m.context_for_command("fping"), Some("ping"));
        assert_eq!(m.context_for_command("ping"), None);
        assert!(m.has_user_override("ping"));
    }

    #[test]
    fn rule_selection() {
        let dir = TempDir::new().unwrap();
        let mut m = manager(&dir);
        let globals = m.global_rules().len();

        let ping = m.rules_for_command(Some("ping"));
        let own = m.context("ping").unwrap().rules.len();
        assert_eq!(ping.len(), globals + own);
        assert_eq!(ping[0].name, m.global_rules()[0].name);

        m.set_context_use_global_rules("ping", false).unwrap();
        assert_eq!(m.rules_for_command(Some("ping")).len(), own);

        m.set_context_enabled("ping", false).unwrap();
        assert_eq!(m.rules_for_command(Some("ping")).len(), globals);

        m.set_context_enabled("ping", true).unwrap();
        m.set_context_aware_enabled(false).unwrap();
        assert_eq!(m.rules_for_command(Some("ping")).len(), globals);
        assert_eq!(m.rules_for_command(None).len(), globals);
    }

    #[test]
    fn settings_persist_disabled_state() {
        let dir = TempDir::new().unwrap();
        let mut m = manager(&dir);
        m.set_enabled_for_ssh(true).unwrap();
        m.set_global_rule_enabled(0, false).unwrap();
        m.set_context_enabled("systemctl", false).unwrap();
        let first = m.global_rules()[0].name.clone();

        let reloaded = manager(&dir);
        assert!(reloaded.is_enabled_for(SessionType::Ssh));
        assert!(!reloaded.global_rules()[0].enabled);
        assert_eq!(reloaded.global_rules()[0].name, first);
        assert!(!reloaded.context("systemctl").unwrap().enabled);
        assert!(!dir.path().join("highlights/global.json").exists());
    }

    #[test]
    fn rule_crud_and_reorder() {
        let dir = TempDir::new().unwrap();
        let mut m = manager(&dir);
        assert!(matches!(
            m.add_global_rule(HighlightRule::new("bad", "(", "red")),
            Err(HighlightError::InvalidPattern { .. })
        ));
        m.add_global_rule(HighlightRule::new("todo", "TODO", "yellow"))
            .unwrap();
        assert!(m.has_user_override(GLOBAL_CONTEXT));

        m.add_context(HighlightContext::new("make")).unwrap();
        assert!(matches!(
            m.add_context(HighlightContext::new("make")),
            Err(HighlightError::ContextExists(_))
        ));
        m.add_context_rule("make", HighlightRule::new("a", "a", "red"))
            .unwrap();
        m.add_context_rule("make", HighlightRule::new("b", "b", "red"))
            .unwrap();
        m.move_context_rule("make", 1, 0).unwrap();
        assert_eq!(m.context("make").unwrap().rules[0].name, "b");
        assert!(matches!(
            m.move_context_rule("make", 0, 5),
            Err(HighlightError::RuleIndex { index: 5, len: 2 })
        ));
        m.remove_context_rule("make", 0).unwrap();
        assert!(matches!(
            m.add_context_rule("nope", HighlightRule::new("a", "a", "red")),
            Err(HighlightError::ContextNotFound(_))
        ));

        let reloaded = manager(&dir);
        assert_eq!(reloaded.context("make").unwrap().rules.len(), 1);
        assert_eq!(reloaded.context_for_command("make"), Some("make"));
        assert!(reloaded.global_rules().iter().any(|r| r.name == "todo"));

        m.remove_context("make").unwrap();
        assert!(!m.has_user_override("make"));
        assert_eq!(m.context_for_command("make"), None);
    }

    #[test]
    fn resets() {
        let dir = TempDir::new().unwrap();
        let mut m = manager(&dir);
        let bundled_globals = m.global_rules().len();
        m.add_global_rule(HighlightRule::new("x", "x", "red"))
            .unwrap();
        m.add_context_rule("ping", HighlightRule::new("y", "y", "red"))
            .unwrap();

        m.reset_contexts();
        assert!(m.has_user_override(GLOBAL_CONTEXT));
        assert!(!m.has_user_override("ping"));

        m.reset_global_rules();
        assert_eq!(m.global_rules().len(), bundled_globals);

        m.add_context_rule("ping", HighlightRule::new("y", "y", "red"))
            .unwrap();
        m.reset_all();
        assert!(json_files(m.user_dir()).is_empty());
        assert!(!m.delete_user_context("ping").unwrap());
    }

    #[test]
    fn system_layer_sits_between() {
        let dir = TempDir::new().unwrap();
        let system = dir.path().join("system");
        fs::create_dir_all(&system).unwrap();
        fs::write(system.join("df.json"), r#"{"name":"df","rules":[]}"#).unwrap();
        let mut m = HighlightManager::new(
            dir.path().join("highlights"),
            dir.path().join("highlights_settings.json"),
        )
        .with_system_dir(&system);
        m.load();
        assert!(m.context("df").is_some());
        assert!(m.context("ping").is_some());
    }
}
