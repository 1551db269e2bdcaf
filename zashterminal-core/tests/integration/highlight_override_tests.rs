//! Highlight rules: bundled defaults, user overrides and command contexts

use std::collections::BTreeSet;

use tempfile::TempDir;
use zashterminal_core::config::ConfigPaths;
use zashterminal_core::highlights::{
    HighlightContext, HighlightManager, HighlightRule, OutputHighlighter, RuleAction,
};
use zashterminal_core::models::SessionType;

fn manager(paths: &ConfigPaths) -> HighlightManager {
    let mut manager = HighlightManager::new(paths.highlights_dir(), paths.highlight_settings_file());
    manager.load();
    manager
}

#[test]
fn user_contexts_persist_and_drive_highlighting() {
    let dir = TempDir::new().unwrap();
    let paths = ConfigPaths::with_root(dir.path());
    let mut highlights = manager(&paths);
    assert!(highlights.context("ping").is_some());
    assert!(!highlights.global_rules().is_empty());

    let mut make = HighlightContext::new("make");
    make.triggers.push("ninja".to_string());
    make.rules.push(HighlightRule::new("failure", r"\berror\b", "red"));
    make.rules
        .push(HighlightRule::new("halt", "Stop", "yellow").with_action(RuleAction::Stop));
    make.rules.push(HighlightRule::new("never", "Stop", "blue"));
    highlights.add_context(make).unwrap();
    assert!(highlights.has_user_override("make"));

    let reloaded = manager(&paths);
    assert_eq!(reloaded.context_for_command("ninja"), Some("make"));
    let rules = reloaded.rules_for_command(Some("ninja"));
    assert_eq!(rules.len(), 3);

    let h = OutputHighlighter::for_command(&reloaded, Some("make"), &BTreeSet::new());
    assert_eq!(
        h.highlight_line("an error: Stop."),
        "an \x1b[31merror\x1b[0m: \x1b[33mStop\x1b[0m."
    );

    let ignored: BTreeSet<String> = ["make".to_string()].into();
    let h = OutputHighlighter::for_command(&reloaded, Some("make"), &ignored);
    assert_eq!(h.rule_count(), 0);
}

#[test]
fn disabled_state_survives_reload_and_reset() {
    let dir = TempDir::new().unwrap();
    let paths = ConfigPaths::with_root(dir.path());
    let mut highlights = manager(&paths);

    highlights.set_context_enabled("ping", false).unwrap();
    highlights.set_global_rule_enabled(0, false).unwrap();
    highlights.set_enabled_for_ssh(true).unwrap();

    let mut reloaded = manager(&paths);
    assert!(!reloaded.context("ping").unwrap().enabled);
    assert!(!reloaded.global_rules()[0].enabled);
    assert!(reloaded.is_enabled_for(SessionType::Ssh));
    let global_only = reloaded.rules_for_command(None).len();
    assert_eq!(reloaded.rules_for_command(Some("ping")).len(), global_only);

    reloaded.add_global_rule(HighlightRule::new("todo", "TODO", "magenta")).unwrap();
    assert!(reloaded.has_user_override("global"));
    reloaded.reset_all();
    assert!(!reloaded.has_user_override("global"));

    // Overrides are gone; enabled flags live in the settings file and stay
    let fresh = manager(&paths);
    assert!(fresh.global_rules().iter().all(|r| r.name != "todo"));
    assert!(!fresh.global_rules()[0].enabled);
    assert!(!fresh.context("ping").unwrap().enabled);
}
