//! Highlight rule data model

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{HighlightError, HighlightResult};

/// What happens after a rule matched a line
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleAction {
    /// Keep applying the remaining rules
    #[default]
    Next,
    /// Skip the remaining rules for this line
    Stop,
}

impl RuleAction {
    const fn is_next(&self) -> bool {
        matches!(self, Self::Next)
    }
}

// Unknown actions fall back to `next` instead of failing the whole file.
impl<'de> Deserialize<'de> for RuleAction {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(match raw.as_deref().map(str::trim) {
            Some(a) if a.eq_ignore_ascii_case("stop") => Self::Stop,
            _ => Self::Next,
        })
    }
}

fn default_colors() -> Vec<Option<String>> {
    vec![Some("white".to_string())]
}

const fn default_true() -> bool {
    true
}

/// A single pattern and the colors applied to its matches.
///
/// With capture groups, `colors[n - 1]` colors group `n` and a `null` entry
/// leaves that group alone. Without groups the whole match takes `colors[0]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighlightRule {
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Regular expression
    #[serde(default)]
    pub pattern: String,
    /// Color specs such as `"bold red"` or `"on_blue white"`
    #[serde(default = "default_colors")]
    pub colors: Vec<Option<String>>,
    /// Disabled rules are kept but never applied
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Shown in the editor
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Free-form note shown in the editor
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub comment: String,
    /// Continue or stop after a match
    #[serde(default, skip_serializing_if = "RuleAction::is_next")]
    pub action: RuleAction,
}

impl HighlightRule {
    /// Enabled rule coloring every match with `color`
    #[must_use]
    pub fn new(name: impl Into<String>, pattern: impl Into<String>, color: &str) -> Self {
        Self {
            name: name.into(),
            pattern: pattern.into(),
            colors: vec![Some(color.to_string())],
            enabled: true,
            description: String::new(),
            comment: String::new(),
            action: RuleAction::Next,
        }
    }

    /// Sets the action
    #[must_use]
    pub const fn with_action(mut self, action: RuleAction) -> Self {
        self.action = action;
        self
    }

    /// Non-empty pattern that compiles
    #[must_use]
    pub fn is_valid(&self) -> bool {
        validate_pattern(&self.pattern).is_ok()
    }

    /// First non-empty color, used for swatches in the editor
    #[must_use]
    pub fn primary_color(&self) -> Option<&str> {
        self.colors
            .iter()
            .flatten()
            .map(String::as_str)
            .find(|c| !c.trim().is_empty())
    }
}

/// Checks that `pattern` is non-empty and compiles.
///
/// # Errors
/// [`HighlightError::InvalidPattern`] with the compiler message.
pub fn validate_pattern(pattern: &str) -> HighlightResult<()> {
    if pattern.trim().is_empty() {
        return Err(HighlightError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: "Pattern cannot be empty".to_string(),
        });
    }
    regex::Regex::new(pattern)
        .map(|_| ())
        .map_err(|e| HighlightError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })
}

/// Rules that apply while a particular command runs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighlightContext {
    /// Context key, also the user file stem
    #[serde(rename = "name", alias = "command_name")]
    pub command_name: String,
    /// Command names that select this context
    #[serde(default)]
    pub triggers: Vec<String>,
    /// Rules in application order
    #[serde(default)]
    pub rules: Vec<HighlightRule>,
    /// Disabled contexts fall back to the global rules
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Shown in the editor
    #[serde(default)]
    pub description: String,
    /// Apply the global rules before this context's own
    #[serde(default)]
    pub use_global_rules: bool,
}

impl HighlightContext {
    /// Empty enabled context triggered by its own name
    #[must_use]
    pub fn new(command_name: impl Into<String>) -> Self {
        let command_name = command_name.into();
        Self {
            triggers: vec![command_name.clone()],
            command_name,
            rules: Vec::new(),
            enabled: true,
            description: String::new(),
            use_global_rules: false,
        }
    }

    /// Parses a context file, defaulting the triggers to the context name
    ///
    /// # Errors
    /// Invalid JSON.
    pub fn from_json(data: &str) -> HighlightResult<Self> {
        let mut context: Self = serde_json::from_str(data)?;
        if context.triggers.is_empty() {
            context.triggers.push(context.command_name.clone());
        }
        Ok(context)
    }

    /// Enabled rules whose pattern compiles
    pub fn active_rules(&self) -> impl Iterator<Item = &HighlightRule> {
        self.rules.iter().filter(|r| r.enabled && r.is_valid())
    }
}

/// Everything the highlighter needs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HighlightConfig {
    /// Highlight output of local shells
    pub enabled_for_local: bool,
    /// Highlight output of SSH sessions
    pub enabled_for_ssh: bool,
    /// Select rules by the running command
    pub context_aware_enabled: bool,
    /// Rules applied everywhere
    pub global_rules: Vec<HighlightRule>,
    /// Per-command contexts keyed by name
    pub contexts: std::collections::BTreeMap<String, HighlightContext>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rule_defaults_and_lenient_action() {
        let rule: HighlightRule =
            serde_json::from_str(r#"{"name":"x","pattern":"a+","action":"jump"}"#).unwrap();
        assert_eq!(rule.colors, vec![Some("white".to_string())]);
        assert!(rule.enabled);
        assert_eq!(rule.action, RuleAction::Next);

        let stop: HighlightRule =
            serde_json::from_str(r#"{"pattern":"a","action":" STOP "}"#).unwrap();
        assert_eq!(stop.action, RuleAction::Stop);
    }

    #[test]
    fn compact_serialization() {
        let rule = HighlightRule::new("n", "p", "red");
        let value = serde_json::to_value(&rule).unwrap();
        assert!(value.get("action").is_none());
        assert!(value.get("description").is_none());
        let value = serde_json::to_value(rule.with_action(RuleAction::Stop)).unwrap();
        assert_eq!(value["action"], "stop");
    }

    #[test]
    fn pattern_validation() {
        let err = validate_pattern("  ").unwrap_err();
        assert!(err.to_string().contains("Pattern cannot be empty"));
        assert!(validate_pattern("(unclosed").is_err());
        assert!(validate_pattern(r"\d+ms").is_ok());
        assert!(!HighlightRule::new("bad", "[", "red").is_valid());
    }

    #[test]
    fn context_names_and_triggers() {
        let ctx = HighlightContext::from_json(r#"{"command_name":"ping","rules":[]}"#).unwrap();
        assert_eq!(ctx.command_name, "ping");
        assert_eq!(ctx.triggers, vec!["ping"]);
        assert!(ctx.enabled);
        assert!(!ctx.use_global_rules);

        let mut ctx = HighlightContext::new("df");
        ctx.rules.push(HighlightRule::new("ok", "ok", "green"));
        ctx.rules.push(HighlightRule::new("broken", "(", "red"));
        let mut off = HighlightRule::new("off", "x", "red");
        off.enabled = false;
        ctx.rules.push(off);
        assert_eq!(ctx.active_rules().count(), 1);
    }

    #[test]
    fn primary_color_skips_gaps() {
        let mut rule = HighlightRule::new("n", "(a)(b)", "red");
        rule.colors = vec![None, Some(" ".into()), Some("blue".into())];
        assert_eq!(rule.primary_color(), Some("blue"));
    }
}
