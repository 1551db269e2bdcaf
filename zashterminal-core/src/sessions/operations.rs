//! Session and folder CRUD with validation, persistence and rollback
//!
//! Every mutation is applied in memory, saved, and undone if the save fails,
//! so the in-memory collections always match the file on disk. Results are
//! reported as [`OperationResult`]s for the UI to show; nothing here panics
//! or propagates errors past the caller.

use std::collections::{BTreeSet, HashSet};
use std::path::Path;
use std::rc::Rc;
use std::sync::Arc;

use serde_json::json;

use super::storage::SessionStorage;
use crate::config::{SettingsManager, expand_home};
use crate::error::StorageResult;
use crate::helpers::generate_unique_name;
use crate::models::{
    AuthType, SessionFolder, SessionItem, SessionSource, SessionType, normalize_folder_path,
};
use crate::secret::SecretStore;
use crate::signals::{AppEvent, SignalBus};
use crate::ssh_config::{default_ssh_config_path, parse_ssh_config};
use crate::tracing::span_names::SSH_CONFIG_IMPORT;

/// A session or a folder, as carried by results and the clipboard
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEntry {
    /// A session
    Session(SessionItem),
    /// A folder
    Folder(SessionFolder),
}

impl SessionEntry {
    /// Display name
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Session(s) => &s.name,
            Self::Folder(f) => &f.name,
        }
    }
}

/// Outcome of a session operation
#[derive(Debug, Clone, PartialEq)]
pub struct OperationResult {
    /// Whether the change was applied and saved
    pub success: bool,
    /// Message for the user
    pub message: String,
    /// The affected item after the change
    pub item: Option<SessionEntry>,
    /// Non-fatal problems (import skips, ...)
    pub warnings: Vec<String>,
}

impl OperationResult {
    /// Successful result
    #[must_use]
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            item: None,
            warnings: Vec::new(),
        }
    }

    /// Failed result
    #[must_use]
    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            success: false,
            ..Self::ok(message)
        }
    }

    /// Attaches the affected item
    #[must_use]
    pub fn with_item(mut self, item: SessionEntry) -> Self {
        self.item = Some(item);
        self
    }

    /// Attaches warnings
    #[must_use]
    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings = warnings;
        self
    }
}

/// Owns the session and folder collections
pub struct SessionOperations {
    sessions: Vec<SessionItem>,
    folders: Vec<SessionFolder>,
    storage: SessionStorage,
    signals: Option<Rc<SignalBus>>,
    settings: Option<Arc<SettingsManager>>,
    secrets: Option<Box<dyn SecretStore>>,
    ignored_ssh_config_hosts: BTreeSet<String>,
}

impl std::fmt::Debug for SessionOperations {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionOperations")
            .field("sessions", &self.sessions.len())
            .field("folders", &self.folders.len())
            .field("storage", &self.storage.path())
            .finish_non_exhaustive()
    }
}

impl SessionOperations {
    /// Wraps already-loaded collections
    #[must_use]
    pub fn new(
        storage: SessionStorage,
        sessions: Vec<SessionItem>,
        folders: Vec<SessionFolder>,
    ) -> Self {
        Self {
            sessions,
            folders,
            storage,
            signals: None,
            settings: None,
            secrets: None,
            ignored_ssh_config_hosts: BTreeSet::new(),
        }
    }

    /// Loads the collections from `storage`.
    ///
    /// # Errors
    /// Propagates storage read and corruption errors.
    pub fn load(storage: SessionStorage) -> StorageResult<Self> {
        let (sessions, folders) = storage.load()?;
        Ok(Self::new(storage, sessions, folders))
    }

    /// Announces changes on `bus`
    #[must_use]
    pub fn with_signals(mut self, bus: Rc<SignalBus>) -> Self {
        self.signals = Some(bus);
        self
    }

    /// Persists ignored ssh_config hosts in `settings`
    #[must_use]
    pub fn with_settings(mut self, settings: Arc<SettingsManager>) -> Self {
        self.ignored_ssh_config_hosts = settings.ignored_ssh_config_hosts().into_iter().collect();
        self.settings = Some(settings);
        self
    }

    /// Moves keyring passwords along with session renames
    #[must_use]
    pub fn with_secrets(mut self, secrets: Box<dyn SecretStore>) -> Self {
        self.secrets = Some(secrets);
        self
    }

    /// All sessions
    #[must_use]
    pub fn sessions(&self) -> &[SessionItem] {
        &self.sessions
    }

    /// All folders
    #[must_use]
    pub fn folders(&self) -> &[SessionFolder] {
        &self.folders
    }

    /// Hosts skipped by ssh_config import
    #[must_use]
    pub fn ignored_ssh_config_hosts(&self) -> &BTreeSet<String> {
        &self.ignored_ssh_config_hosts
    }

    fn emit(&self, event: AppEvent) {
        if let Some(bus) = &self.signals {
            bus.emit(&event);
        }
    }

    fn save(&self) -> bool {
        match self.storage.save(&self.sessions, &self.folders) {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(error = %e, "Failed to save sessions");
                false
            }
        }
    }

    fn folder_exists(&self, path: &str) -> bool {
        self.folders.iter().any(|f| f.path == path)
    }

    fn session_names_in_folder(&self, folder_path: &str) -> HashSet<String> {
        self.sessions
            .iter()
            .filter(|s| s.folder_path == folder_path)
            .map(|s| s.name.clone())
            .collect()
    }

    fn position_of(&self, session: &SessionItem) -> Option<usize> {
        self.sessions
            .iter()
            .position(|s| s.name == session.name && s.folder_path == session.folder_path)
    }

    fn validate_new_session(
        &self,
        session: &SessionItem,
        skip: Option<usize>,
    ) -> Result<(), String> {
        let errors = session.validation_errors();
        if !errors.is_empty() {
            return Err(format!("Session validation failed: {}", errors.join(", ")));
        }
        let duplicate = self.sessions.iter().enumerate().any(|(i, s)| {
            Some(i) != skip && s.name == session.name && s.folder_path == session.folder_path
        });
        if duplicate {
            return Err(format!(
                "A session with the name '{}' already exists in this folder.",
                session.name
            ));
        }
        if !session.folder_path.is_empty() && !self.folder_exists(&session.folder_path) {
            return Err(format!(
                "The target folder '{}' does not exist.",
                session.folder_path
            ));
        }
        Ok(())
    }

    /// Adds a session after validating it
    pub fn add_session(&mut self, session: SessionItem) -> OperationResult {
        if let Err(message) = self.validate_new_session(&session, None) {
            return OperationResult::fail(message);
        }
        self.sessions.push(session.clone());
        if !self.save() {
            self.sessions.pop();
            return OperationResult::fail("Failed to save session data.");
        }
        tracing::info!(session = %session.name, "Session added");
        let message = format!("Session '{}' added successfully.", session.name);
        self.emit(AppEvent::SessionCreated(session.clone()));
        OperationResult::ok(message).with_item(SessionEntry::Session(session))
    }

    /// Replaces the session at `position`
    pub fn update_session(&mut self, position: usize, updated: SessionItem) -> OperationResult {
        let Some(original) = self.sessions.get(position).cloned() else {
            return OperationResult::fail("Item at position is not a session.");
        };
        if let Err(message) = self.validate_new_session(&updated, Some(position)) {
            return OperationResult::fail(message);
        }
        let mut updated = updated;
        updated.touch();
        self.sessions[position] = updated.clone();
        if !self.save() {
            self.sessions[position] = original;
            return OperationResult::fail("Failed to save updated session data.");
        }
        self.sync_password(&original, &updated);
        tracing::info!(session = %updated.name, "Session updated");
        let message = format!("Session '{}' updated successfully.", updated.name);
        self.emit(AppEvent::SessionUpdated(updated.name.clone()));
        OperationResult::ok(message).with_item(SessionEntry::Session(updated))
    }

    fn sync_password(&self, original: &SessionItem, updated: &SessionItem) {
        let Some(secrets) = &self.secrets else {
            return;
        };
        let result = if original.uses_password_auth() && !updated.uses_password_auth() {
            secrets.clear(&original.name)
        } else if updated.uses_password_auth() {
            secrets.rename(&original.name, &updated.name)
        } else {
            Ok(())
        };
        if let Err(e) = result {
            tracing::warn!(session = %updated.name, error = %e, "Failed to update keyring entry");
        }
    }

    /// Removes a session. Imported sessions are remembered so the next
    /// ssh_config import does not bring them back.
    pub fn remove_session(&mut self, session: &SessionItem) -> OperationResult {
        let Some(position) = self.position_of(session) else {
            return OperationResult::fail("Session not found.");
        };
        let removed = self.sessions.remove(position);
        if !self.save() {
            self.sessions.insert(position, removed);
            return OperationResult::fail("Failed to save after session removal.");
        }
        if removed.source == SessionSource::SshConfig
            && self.ignored_ssh_config_hosts.insert(removed.ssh_config_key())
        {
            self.persist_ignored_hosts();
        }
        tracing::info!(session = %removed.name, "Session removed");
        self.emit(AppEvent::SessionDeleted(removed.name.clone()));
        OperationResult::ok(format!("Session '{}' removed successfully.", removed.name))
    }

    /// Adds a folder after validating it
    pub fn add_folder(&mut self, folder: SessionFolder) -> OperationResult {
        let errors = folder.validation_errors();
        if !errors.is_empty() {
            return OperationResult::fail(format!(
                "Folder validation failed: {}",
                errors.join(", ")
            ));
        }
        if self.folder_exists(&folder.path) {
            return OperationResult::fail(format!(
                "A folder with the path '{}' already exists.",
                folder.path
            ));
        }
        if !folder.parent_path.is_empty() && !self.folder_exists(&folder.parent_path) {
            return OperationResult::fail(format!(
                "The parent folder '{}' does not exist.",
                folder.parent_path
            ));
        }
        self.folders.push(folder.clone());
        if !self.save() {
            self.folders.pop();
            return OperationResult::fail("Failed to save folder data.");
        }
        tracing::info!(folder = %folder.path, "Folder added");
        let message = format!("Folder '{}' added successfully.", folder.name);
        self.emit(AppEvent::FolderCreated(folder.clone()));
        OperationResult::ok(message).with_item(SessionEntry::Folder(folder))
    }

    /// Replaces the folder at `position`. A path change rewrites every
    /// descendant session and folder; the whole change is undone if saving
    /// fails.
    pub fn update_folder(&mut self, position: usize, updated: SessionFolder) -> OperationResult {
        let Some(original) = self.folders.get(position).cloned() else {
            return OperationResult::fail("Item at position is not a folder.");
        };
        let mut updated = updated;
        updated.path = normalize_folder_path(&updated.path);
        updated.parent_path = normalize_folder_path(&updated.parent_path);
        let errors = updated.validation_errors();
        if !errors.is_empty() {
            return OperationResult::fail(format!(
                "Folder validation failed: {}",
                errors.join(", ")
            ));
        }
        let path_changed = original.path != updated.path;
        if path_changed && self.folder_exists(&updated.path) {
            return OperationResult::fail(format!(
                "A folder with the path '{}' already exists.",
                updated.path
            ));
        }

        let snapshot = (self.sessions.clone(), self.folders.clone());
        updated.touch();
        self.folders[position] = updated.clone();
        if path_changed {
            self.rewrite_descendant_paths(&original.path, &updated.path);
        }
        if !self.save() {
            (self.sessions, self.folders) = snapshot;
            return OperationResult::fail("Failed to save updated folder data.");
        }
        tracing::info!(from = %original.path, to = %updated.path, "Folder updated");
        let message = format!("Folder '{}' updated successfully.", updated.name);
        self.emit(AppEvent::FolderUpdated(updated.path.clone()));
        OperationResult::ok(message).with_item(SessionEntry::Folder(updated))
    }

    fn rewrite_descendant_paths(&mut self, old: &str, new: &str) {
        let prefix = format!("{old}/");
        let rebase = |path: &str| -> Option<String> {
            if path == old {
                Some(new.to_string())
            } else {
                path.strip_prefix(&prefix).map(|rest| format!("{new}/{rest}"))
            }
        };
        for session in &mut self.sessions {
            if let Some(path) = rebase(&session.folder_path) {
                session.folder_path = path;
            }
        }
        for folder in &mut self.folders {
            if let Some(parent) = rebase(&folder.parent_path) {
                folder.parent_path = parent;
                folder.path = SessionFolder::child_path(&folder.parent_path, &folder.name);
            }
        }
    }

    fn folder_has_children(&self, path: &str) -> bool {
        self.sessions.iter().any(|s| s.folder_path == path)
            || self.folders.iter().any(|f| f.parent_path == path)
    }

    /// Removes a folder. Non-empty folders need `force`, which also removes
    /// everything below it.
    pub fn remove_folder(&mut self, folder: &SessionFolder, force: bool) -> OperationResult {
        let Some(position) = self.folders.iter().position(|f| f.path == folder.path) else {
            return OperationResult::fail("Folder not found.");
        };
        if !force && self.folder_has_children(&folder.path) {
            return OperationResult::fail("Cannot remove a non-empty folder.");
        }
        let snapshot = (self.sessions.clone(), self.folders.clone());
        let removed = self.folders.remove(position);
        if force {
            self.sessions.retain(|s| !removed.contains_path(&s.folder_path));
            self.folders.retain(|f| !removed.contains_path(&f.path));
        }
        if !self.save() {
            (self.sessions, self.folders) = snapshot;
            return OperationResult::fail("Failed to save after folder removal.");
        }
        tracing::info!(folder = %removed.path, force, "Folder removed");
        self.emit(AppEvent::FolderDeleted(removed.path.clone()));
        OperationResult::ok(format!("Folder '{}' removed successfully.", removed.name))
    }

    /// Moves a session into `target_folder_path`
    pub fn move_session_to_folder(
        &mut self,
        session: &SessionItem,
        target_folder_path: &str,
    ) -> OperationResult {
        let target = normalize_folder_path(target_folder_path);
        let Some(position) = self.position_of(session) else {
            return OperationResult::fail("Session not found.");
        };
        if self.sessions[position].folder_path == target {
            return OperationResult::ok("Session already in target folder.");
        }
        if !target.is_empty() && !self.folder_exists(&target) {
            return OperationResult::fail(format!("The target folder '{target}' does not exist."));
        }
        if self.session_names_in_folder(&target).contains(&session.name) {
            return OperationResult::fail(format!(
                "A session with the name '{}' already exists in this folder.",
                session.name
            ));
        }
        let original = self.sessions[position].clone();
        self.sessions[position].set_folder_path(&target);
        if !self.save() {
            self.sessions[position] = original;
            return OperationResult::fail("Failed to save after moving session.");
        }
        let moved = self.sessions[position].clone();
        tracing::info!(session = %moved.name, folder = %target, "Session moved");
        self.emit(AppEvent::SessionUpdated(moved.name.clone()));
        OperationResult::ok("Session moved successfully.").with_item(SessionEntry::Session(moved))
    }

    /// Moves a folder under `target_parent_path`
    pub fn move_folder(
        &mut self,
        folder: &SessionFolder,
        target_parent_path: &str,
    ) -> OperationResult {
        let target = normalize_folder_path(target_parent_path);
        if folder.parent_path == target {
            return OperationResult::ok("Folder already in target parent.");
        }
        if folder.contains_path(&target) {
            return OperationResult::fail("Cannot move a folder into itself.");
        }
        let Some((_, position)) = self.find_folder_by_path(&folder.path) else {
            return OperationResult::fail("Folder not found.");
        };
        let mut updated = self.folders[position].clone();
        updated.path = SessionFolder::child_path(&target, &updated.name);
        updated.parent_path = target;
        self.update_folder(position, updated)
    }

    /// Copies a session into its own folder under a free name
    pub fn duplicate_session(&mut self, session: &SessionItem) -> OperationResult {
        let mut copy = session.clone();
        let existing = self.session_names_in_folder(&copy.folder_path);
        copy.name = generate_unique_name(&copy.name, &existing);
        let now = crate::models::unix_now();
        copy.created_at = now;
        copy.modified_at = now;
        if session.uses_password_auth()
            && let Some(secrets) = &self.secrets
            && let Ok(Some(password)) = secrets.lookup(&session.name)
            && let Err(e) = secrets.store(&copy.name, &password)
        {
            tracing::warn!(session = %copy.name, error = %e, "Failed to copy keyring entry");
        }
        self.add_session(copy)
    }

    /// Pastes a clipboard item into `target_folder_path`. Cut moves the item;
    /// copy duplicates sessions. Copying folders is not supported.
    pub fn paste_item(
        &mut self,
        item: &SessionEntry,
        target_folder_path: &str,
        is_cut: bool,
    ) -> OperationResult {
        match (item, is_cut) {
            (SessionEntry::Session(session), true) => {
                self.move_session_to_folder(session, target_folder_path)
            }
            (SessionEntry::Folder(folder), true) => self.move_folder(folder, target_folder_path),
            (SessionEntry::Session(session), false) => {
                let mut copy = session.clone();
                copy.folder_path = normalize_folder_path(target_folder_path);
                self.duplicate_session(&copy)
            }
            (SessionEntry::Folder(_), false) => {
                OperationResult::fail("Unsupported item type for paste operation.")
            }
        }
    }

    /// Finds a session and its position
    #[must_use]
    pub fn find_session_by_name_and_path(
        &self,
        name: &str,
        folder_path: &str,
    ) -> Option<(&SessionItem, usize)> {
        self.sessions
            .iter()
            .enumerate()
            .find(|(_, s)| s.name == name && s.folder_path == folder_path)
            .map(|(i, s)| (s, i))
    }

    /// Finds a folder and its position
    #[must_use]
    pub fn find_folder_by_path(&self, path: &str) -> Option<(&SessionFolder, usize)> {
        self.folders
            .iter()
            .enumerate()
            .find(|(_, f)| f.path == path)
            .map(|(i, f)| (f, i))
    }

    /// First session with this name in any folder
    #[must_use]
    pub fn find_session_by_name(&self, name: &str) -> Option<&SessionItem> {
        self.sessions.iter().find(|s| s.name == name)
    }

    /// Imports `Host` entries from an ssh_config file (`~/.ssh/config` by
    /// default) as root-level SSH sessions.
    pub fn import_sessions_from_ssh_config(
        &mut self,
        config_path: Option<&Path>,
    ) -> OperationResult {
        let _span = tracing::info_span!(SSH_CONFIG_IMPORT).entered();
        let path = config_path
            .map_or_else(default_ssh_config_path, |p| expand_home(&p.to_string_lossy()));
        if !path.exists() {
            let message = format!("SSH config file not found at {}", path.display());
            tracing::warn!("{message}");
            return OperationResult::fail(message);
        }
        let entries = parse_ssh_config(&path);
        if entries.is_empty() {
            return OperationResult::fail("No host entries found in SSH config.");
        }

        let mut imported = 0_usize;
        let mut warnings = Vec::new();
        let mut existing_names = self.session_names_in_folder("");
        for entry in entries {
            let hostname = entry.hostname.clone().unwrap_or_else(|| entry.alias.clone());
            if hostname.is_empty() {
                warnings.push(format!("Skipped host '{}': missing hostname.", entry.alias));
                continue;
            }
            let user = entry.user.clone().unwrap_or_default();
            let port = entry.port.unwrap_or(22);
            let key = format!("{user}@{hostname}:{port}");
            if self.ignored_ssh_config_hosts.contains(&key) {
                tracing::debug!(host = %key, "Skipping ignored ssh_config host");
                continue;
            }
            let already_present = self.sessions.iter().any(|s| {
                s.session_type == SessionType::Ssh
                    && s.host == hostname
                    && s.user == user
                    && s.port == port
            });
            if already_present {
                continue;
            }

            let name = generate_unique_name(&entry.alias, &existing_names);
            let mut session = SessionItem::ssh(&name, &hostname, &user, port);
            session.auth_type = AuthType::Key;
            session.auth_value = entry
                .identity_file
                .as_deref()
                .map(|f| expand_home(f).to_string_lossy().into_owned())
                .unwrap_or_default();
            session.x11_forwarding = entry.forward_x11.unwrap_or(false);
            session.source = SessionSource::SshConfig;

            let result = self.add_session(session);
            if result.success {
                imported += 1;
                existing_names.insert(name);
            } else {
                warnings.push(format!("Skipped host '{}': {}", entry.alias, result.message));
            }
        }

        if imported == 0 {
            return OperationResult::fail(format!(
                "No sessions were imported from {}.",
                path.display()
            ))
            .with_warnings(warnings);
        }
        let message = format!("Imported {imported} session(s) from {}.", path.display());
        tracing::info!("{message}");
        OperationResult::ok(message).with_warnings(warnings)
    }

    fn persist_ignored_hosts(&self) {
        let Some(settings) = &self.settings else {
            return;
        };
        let hosts: Vec<&String> = self.ignored_ssh_config_hosts.iter().collect();
        if let Err(e) = settings.set("ignored_ssh_config_hosts", json!(hosts)) {
            tracing::warn!(error = %e, "Failed to persist ignored SSH config hosts");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secret::MemorySecretStore;
    use secrecy::{ExposeSecret, SecretString};

    fn ops() -> (tempfile::TempDir, SessionOperations) {
        let dir = tempfile::tempdir().unwrap();
        let storage = SessionStorage::new(dir.path().join("sessions.json"));
        (dir, SessionOperations::new(storage, Vec::new(), Vec::new()))
    }

    /// Makes every following save fail by turning the file path into a directory
    fn break_storage(dir: &tempfile::TempDir) {
        let path = dir.path().join("sessions.json");
        let _ = std::fs::remove_file(&path);
        std::fs::create_dir(&path).unwrap();
        std::fs::write(path.join("keep"), "x").unwrap();
    }

    #[test]
    fn add_session_validates() {
        let (_dir, mut ops) = ops();
        assert!(ops.add_session(SessionItem::local("shell")).success);
        let dup = ops.add_session(SessionItem::local("shell"));
        assert!(!dup.success);
        assert_eq!(dup.message, "A session with the name 'shell' already exists in this folder.");

        let mut orphan = SessionItem::local("orphan");
        orphan.folder_path = "/Missing".into();
        assert_eq!(
            ops.add_session(orphan).message,
            "The target folder '/Missing' does not exist."
        );
        let invalid = ops.add_session(SessionItem::ssh("nohost", "", "", 22));
        assert!(invalid.message.starts_with("Session validation failed:"));
    }

    #[test]
    fn failed_save_rolls_back() {
        let (dir, mut ops) = ops();
        assert!(ops.add_session(SessionItem::local("a")).success);
        break_storage(&dir);
        let result = ops.add_session(SessionItem::local("b"));
        assert!(!result.success);
        assert_eq!(result.message, "Failed to save session data.");
        assert_eq!(ops.sessions().len(), 1);

        let a = ops.sessions()[0].clone();
        assert!(!ops.remove_session(&a).success);
        assert_eq!(ops.sessions().len(), 1);
    }

    #[test]
    fn folder_rename_rewrites_descendants() {
        let (_dir, mut ops) = ops();
        assert!(ops.add_folder(SessionFolder::new("Work", "")).success);
        assert!(ops.add_folder(SessionFolder::new("Db", "/Work")).success);
        assert!(ops.add_folder(SessionFolder::new("Replicas", "/Work/Db")).success);
        let mut s = SessionItem::local("psql");
        s.folder_path = "/Work/Db/Replicas".into();
        assert!(ops.add_session(s).success);

        let (_, pos) = ops.find_folder_by_path("/Work").unwrap();
        let mut renamed = ops.folders()[pos].clone();
        renamed.name = "Job".into();
        renamed.path = "/Job".into();
        assert!(ops.update_folder(pos, renamed).success);

        let paths: Vec<_> = ops.folders().iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["/Job", "/Job/Db", "/Job/Db/Replicas"]);
        assert_eq!(ops.folders()[2].parent_path, "/Job/Db");
        assert_eq!(ops.sessions()[0].folder_path, "/Job/Db/Replicas");
    }

    #[test]
    fn folder_rename_failure_restores_everything() {
        let (dir, mut ops) = ops();
        assert!(ops.add_folder(SessionFolder::new("Work", "")).success);
        let mut s = SessionItem::local("psql");
        s.folder_path = "/Work".into();
        assert!(ops.add_session(s).success);
        break_storage(&dir);
        let mut renamed = ops.folders()[0].clone();
        renamed.name = "Job".into();
        renamed.path = "/Job".into();
        assert!(!ops.update_folder(0, renamed).success);
        assert_eq!(ops.folders()[0].path, "/Work");
        assert_eq!(ops.sessions()[0].folder_path, "/Work");
    }

    #[test]
    fn remove_folder_requires_force_when_not_empty() {
        let (_dir, mut ops) = ops();
        ops.add_folder(SessionFolder::new("Work", ""));
        ops.add_folder(SessionFolder::new("Db", "/Work"));
        let work = ops.folders()[0].clone();
        let result = ops.remove_folder(&work, false);
        assert_eq!(result.message, "Cannot remove a non-empty folder.");
        assert!(ops.remove_folder(&work, true).success);
        assert!(ops.folders().is_empty());
    }

    #[test]
    fn move_folder_refuses_descendants() {
        let (_dir, mut ops) = ops();
        ops.add_folder(SessionFolder::new("Work", ""));
        ops.add_folder(SessionFolder::new("Db", "/Work"));
        ops.add_folder(SessionFolder::new("Home", ""));
        let work = ops.folders()[0].clone();
        assert_eq!(ops.move_folder(&work, "/Work/Db").message, "Cannot move a folder into itself.");
        assert_eq!(ops.move_folder(&work, "/Work").message, "Cannot move a folder into itself.");
        assert!(ops.move_folder(&work, "/Home").success);
        assert!(ops.find_folder_by_path("/Home/Work/Db").is_some());
    }

    #[test]
    fn copy_paste_duplicates_with_unique_name() {
        let (_dir, mut ops) = ops();
        ops.add_session(SessionItem::local("shell"));
        let item = SessionEntry::Session(ops.sessions()[0].clone());
        let result = ops.paste_item(&item, "", false);
        assert!(result.success);
        assert_eq!(ops.sessions()[1].name, "shell (1)");
        let folder = SessionEntry::Folder(SessionFolder::new("F", ""));
        assert!(!ops.paste_item(&folder, "", false).success);
    }

    #[test]
    fn rename_moves_keyring_password() {
        let (_dir, ops) = ops();
        let secrets = MemorySecretStore::default();
        secrets.store("db", &SecretString::from("pw")).unwrap();
        let mut ops = ops.with_secrets(Box::new(secrets));
        let mut session = SessionItem::ssh("db", "db.local", "root", 22);
        session.auth_type = AuthType::Password;
        assert!(ops.add_session(session.clone()).success);
        session.set_name("database");
        assert!(ops.update_session(0, session).success);
        let secrets = ops.secrets.as_ref().unwrap();
        assert_eq!(
            secrets.lookup("database").unwrap().unwrap().expose_secret(),
            "pw"
        );
        assert!(secrets.lookup("db").unwrap().is_none());
    }

    #[test]
    fn ssh_config_import_skips_known_and_ignored() {
        let (dir, mut ops) = ops();
        let config = dir.path().join("ssh_config");
        std::fs::write(
            &config,
            "Host web\n  HostName web.example\n  User deploy\nHost db\n  HostName db.example\nHost dup\n  HostName web.example\n  User deploy\n",
        )
        .unwrap();
        ops.ignored_ssh_config_hosts.insert("@db.example:22".into());
        let result = ops.import_sessions_from_ssh_config(Some(&config));
        assert!(result.success, "{}", result.message);
        assert_eq!(
            result.message,
            format!("Imported 1 session(s) from {}.", config.display())
        );
        assert_eq!(ops.sessions().len(), 1);
        assert_eq!(ops.sessions()[0].source, SessionSource::SshConfig);

        let imported = ops.sessions()[0].clone();
        assert!(ops.remove_session(&imported).success);
        assert!(ops.ignored_ssh_config_hosts().contains("deploy@web.example:22"));
        let again = ops.import_sessions_from_ssh_config(Some(&config));
        assert!(!again.success);
    }
}
