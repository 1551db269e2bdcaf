//! Shared utility functions used across command modules.

use std::path::Path;
use std::sync::Arc;

use serde_json::Value;
use zashterminal_core::config::{ConfigPaths, SettingsManager};
use zashterminal_core::models::{SessionItem, normalize_folder_path};
use zashterminal_core::sessions::{OperationResult, SessionOperations, SessionStorage};

use crate::error::CliError;

/// Config paths rooted at `--config-dir` when given
pub fn config_paths(config_dir: Option<&Path>) -> ConfigPaths {
    config_dir.map_or_else(ConfigPaths::from_environment, ConfigPaths::with_root)
}

/// Loads the settings store
pub fn load_settings(paths: &ConfigPaths) -> Arc<SettingsManager> {
    Arc::new(SettingsManager::load(paths))
}

/// Loads sessions and folders for editing
pub fn load_operations(paths: &ConfigPaths) -> Result<SessionOperations, CliError> {
    let operations = SessionOperations::load(SessionStorage::new(paths.sessions_file()))?;
    Ok(operations.with_settings(load_settings(paths)))
}

/// Turns a failed [`OperationResult`] into an error and prints successful
/// ones unless `quiet`
pub fn finish(result: &OperationResult, quiet: bool) -> Result<(), CliError> {
    if !result.success {
        return Err(CliError::Session(result.message.clone()));
    }
    if !quiet {
        println!("{}", result.message);
    }
    Ok(())
}

/// Finds a session by name, optionally within one folder.
///
/// Exact names win, then a case-insensitive match, then a unique prefix.
pub fn find_session<'a>(
    sessions: &'a [SessionItem],
    name: &str,
    folder: Option<&str>,
) -> Result<&'a SessionItem, CliError> {
    let folder = folder.map(normalize_folder_path);
    let candidates: Vec<&SessionItem> = sessions
        .iter()
        .filter(|s| folder.as_deref().is_none_or(|f| s.folder_path == f))
        .collect();

    let exact: Vec<&SessionItem> = candidates.iter().copied().filter(|s| s.name == name).collect();
    if let [only] = exact.as_slice() {
        return Ok(*only);
    }
    if exact.len() > 1 {
        return Err(ambiguous(name, &exact));
    }

    if let Some(session) = candidates.iter().find(|s| s.name.eq_ignore_ascii_case(name)) {
        return Ok(*session);
    }

    let lower = name.to_lowercase();
    let matches: Vec<&SessionItem> = candidates
        .into_iter()
        .filter(|s| s.name.to_lowercase().starts_with(&lower))
        .collect();
    match matches.as_slice() {
        [] => Err(CliError::SessionNotFound(name.to_string())),
        [only] => Ok(*only),
        _ => Err(ambiguous(name, &matches)),
    }
}

fn ambiguous(name: &str, matches: &[&SessionItem]) -> CliError {
    let names: Vec<String> = matches.iter().map(|s| display_path(s)).collect();
    CliError::Session(format!(
        "Ambiguous session name '{name}'. Matches: {} (use --folder)",
        names.join(", ")
    ))
}

/// `folder/name` as shown in listings
pub fn display_path(session: &SessionItem) -> String {
    format!("{}/{}", session.folder_path, session.name)
}

/// Parses a settings value given on the command line. Valid JSON is used
/// as is; anything else is taken as a plain string.
pub fn parse_setting_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sessions() -> Vec<SessionItem> {
        let mut db = SessionItem::ssh("db", "db.example.com", "root", 22);
        db.folder_path = "/Work".to_string();
        vec![
            SessionItem::ssh("web-prod", "web1", "deploy", 22),
            SessionItem::ssh("web-staging", "web2", "deploy", 22),
            SessionItem::local("Local"),
            SessionItem::ssh("db", "db.local", "", 22),
            db,
        ]
    }

    #[test]
    fn exact_name_in_folder() {
        let sessions = sessions();
        let found = find_session(&sessions, "db", Some("/Work")).unwrap();
        assert_eq!(found.host, "db.example.com");
        let found = find_session(&sessions, "db", Some("")).unwrap();
        assert_eq!(found.host, "db.local");
    }

    #[test]
    fn same_name_in_two_folders_is_ambiguous() {
        let sessions = sessions();
        let err = find_session(&sessions, "db", None).unwrap_err();
        assert!(matches!(err, CliError::Session(_)));
    }

    #[test]
    fn case_insensitive_then_prefix() {
        let sessions = sessions();
        assert_eq!(find_session(&sessions, "local", None).unwrap().name, "Local");
        assert_eq!(find_session(&sessions, "web-p", None).unwrap().name, "web-prod");
        assert!(matches!(
            find_session(&sessions, "web", None),
            Err(CliError::Session(_))
        ));
        assert!(matches!(
            find_session(&sessions, "mail", None),
            Err(CliError::SessionNotFound(_))
        ));
    }

    #[test]
    fn setting_values_fall_back_to_strings() {
        assert_eq!(parse_setting_value("true"), Value::Bool(true));
        assert_eq!(parse_setting_value("42"), serde_json::json!(42));
        assert_eq!(parse_setting_value("[\"a\"]"), serde_json::json!(["a"]));
        assert_eq!(parse_setting_value("DEBUG"), Value::String("DEBUG".into()));
    }
}
