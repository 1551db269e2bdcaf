//! Settings persistence and whole-configuration backups

use serde_json::json;
use tempfile::TempDir;
use zashterminal_core::backup::{create_backup, restore_backup};
use zashterminal_core::config::{ConfigPaths, SettingsManager};
use zashterminal_core::highlights::{HighlightManager, HighlightRule};
use zashterminal_core::models::SessionItem;
use zashterminal_core::sessions::{SessionOperations, SessionStorage};

fn load_sessions(paths: &ConfigPaths) -> SessionOperations {
    SessionOperations::load(SessionStorage::new(paths.sessions_file())).unwrap()
}

#[test]
fn settings_are_repaired_and_persisted() {
    let dir = TempDir::new().unwrap();
    let paths = ConfigPaths::with_root(dir.path());

    let settings = SettingsManager::load(&paths);
    assert!(paths.settings_file().exists());
    settings.set_sidebar_visible(false).unwrap();
    assert!(settings.set("transparency", json!("opaque")).is_err());

    let reloaded = SettingsManager::load(&paths);
    assert!(!reloaded.sidebar_visible());
    assert_eq!(reloaded.transparency(), settings.transparency());

    reloaded.reset_to_defaults(Some(&["sidebar_visible"])).unwrap();
    assert!(SettingsManager::load(&paths).sidebar_visible());
}

#[test]
fn backup_restores_sessions_settings_and_highlights() {
    let dir = TempDir::new().unwrap();
    let paths = ConfigPaths::with_root(dir.path().join("config"));
    let archive = dir.path().join("exports").join("zashterminal-backup.zip");

    let settings = SettingsManager::load(&paths);
    settings.set_sidebar_visible(false).unwrap();
    let mut sessions = load_sessions(&paths);
    assert!(sessions.add_session(SessionItem::ssh("web", "web.example.com", "deploy", 22)).success);
    let mut highlights =
        HighlightManager::new(paths.highlights_dir(), paths.highlight_settings_file());
    highlights.load();
    highlights
        .add_global_rule(HighlightRule::new("ticket", r"JIRA-\d+", "cyan"))
        .unwrap();

    let report = create_backup(&paths, &archive).unwrap();
    assert!(report.files.contains(&"sessions.json".to_string()));
    assert!(report.files.contains(&"highlights/global.json".to_string()));

    // Change everything after the backup
    let mut sessions = load_sessions(&paths);
    let web = sessions.find_session_by_name("web").unwrap().clone();
    assert!(sessions.remove_session(&web).success);
    SettingsManager::load(&paths).set_sidebar_visible(true).unwrap();
    highlights.reset_all();

    restore_backup(&paths, &archive).unwrap();

    assert!(load_sessions(&paths).find_session_by_name("web").is_some());
    assert!(!SettingsManager::load(&paths).sidebar_visible());
    let mut highlights =
        HighlightManager::new(paths.highlights_dir(), paths.highlight_settings_file());
    highlights.load();
    assert!(highlights.global_rules().iter().any(|r| r.name == "ticket"));
}
