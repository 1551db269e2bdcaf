//! `sessions.json` persistence
//!
//! The file holds `{"sessions": [...], "folders": [...]}`. Loading is
//! lenient per entry (bad entries are skipped with a warning) but strict about
//! the document itself; saving writes atomically and verifies the result.

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;

use crate::config::atomic_write;
use crate::error::{StorageError, StorageResult};
use crate::models::{SessionFolder, SessionItem};
use crate::tracing::span_names::{SESSIONS_LOAD, SESSIONS_SAVE};

/// Largest sessions file that will be read
pub const MAX_SESSIONS_FILE_SIZE: u64 = 50 * 1024 * 1024;

/// Reads and writes the sessions file
#[derive(Debug, Clone)]
pub struct SessionStorage {
    path: PathBuf,
}

#[derive(Serialize)]
struct SessionsDocument<'a> {
    sessions: Vec<SessionItem>,
    folders: &'a [SessionFolder],
}

/// Serializes with four-space indentation
pub(crate) fn to_json_pretty4<T: Serialize>(value: &T) -> serde_json::Result<Vec<u8>> {
    let mut out = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
    value.serialize(&mut serializer)?;
    Ok(out)
}

fn section<'a>(root: &'a serde_json::Map<String, Value>, key: &str) -> &'a [Value] {
    match root.get(key) {
        Some(Value::Array(items)) => items,
        Some(_) => {
            tracing::warn!(section = key, "Section is not a list, treating as empty");
            &[]
        }
        None => &[],
    }
}

fn parse_sessions(entries: &[Value]) -> Vec<SessionItem> {
    entries
        .iter()
        .enumerate()
        .filter_map(|(i, entry)| {
            let Some(obj) = entry.as_object() else {
                tracing::warn!(index = i, "Session entry is not an object, skipping");
                return None;
            };
            if !obj.contains_key("name") || !obj.contains_key("session_type") {
                tracing::warn!(index = i, "Session entry missing required fields, skipping");
                return None;
            }
            match serde_json::from_value::<SessionItem>(entry.clone()) {
                Ok(session) if session.is_valid() => Some(session),
                Ok(session) => {
                    tracing::warn!(
                        session = %session.name,
                        errors = ?session.validation_errors(),
                        "Session validation failed, skipping"
                    );
                    None
                }
                Err(e) => {
                    tracing::warn!(
                        index = i,
                        error = %e,
                        "Session entry could not be read, skipping"
                    );
                    None
                }
            }
        })
        .collect()
}

fn parse_folders(entries: &[Value]) -> Vec<SessionFolder> {
    entries
        .iter()
        .enumerate()
        .filter_map(|(i, entry)| {
            if !entry.as_object().is_some_and(|o| o.contains_key("name")) {
                tracing::warn!(index = i, "Folder entry missing name, skipping");
                return None;
            }
            match serde_json::from_value::<SessionFolder>(entry.clone()) {
                Ok(folder) if folder.is_valid() => Some(folder),
                Ok(folder) => {
                    tracing::warn!(
                        folder = %folder.name,
                        errors = ?folder.validation_errors(),
                        "Folder validation failed, skipping"
                    );
                    None
                }
                Err(e) => {
                    tracing::warn!(
                        index = i,
                        error = %e,
                        "Folder entry could not be read, skipping"
                    );
                    None
                }
            }
        })
        .collect()
}

impl SessionStorage {
    /// Storage backed by `path`
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The sessions file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads sessions and folders.
    ///
    /// A missing or empty file yields empty lists.
    ///
    /// # Errors
    /// [`StorageError::Read`] for unreadable or oversized files,
    /// [`StorageError::Corrupted`] for invalid JSON or a non-object root.
    pub fn load(&self) -> StorageResult<(Vec<SessionItem>, Vec<SessionFolder>)> {
        let _span = tracing::info_span!(SESSIONS_LOAD).entered();
        let read_err = |reason: String| StorageError::Read {
            path: self.path.clone(),
            reason,
        };

        let metadata = match std::fs::metadata(&self.path) {
            Ok(m) => m,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("Sessions file does not exist, starting empty");
                return Ok((Vec::new(), Vec::new()));
            }
            Err(e) => return Err(read_err(e.to_string())),
        };
        if metadata.len() == 0 {
            return Ok((Vec::new(), Vec::new()));
        }
        if metadata.len() > MAX_SESSIONS_FILE_SIZE {
            return Err(read_err("File too large (>50MB)".into()));
        }

        let bytes = std::fs::read(&self.path).map_err(|e| read_err(e.to_string()))?;
        let text = String::from_utf8(bytes).map_err(|e| read_err(format!("Encoding error: {e}")))?;
        let root: Value = serde_json::from_str(&text).map_err(|e| StorageError::Corrupted {
            path: self.path.clone(),
            reason: format!("Invalid JSON: {e}"),
        })?;
        let Value::Object(root) = root else {
            return Err(StorageError::Corrupted {
                path: self.path.clone(),
                reason: "Root data is not a dictionary".into(),
            });
        };

        let sessions = parse_sessions(section(&root, "sessions"));
        let folders = parse_folders(section(&root, "folders"));
        tracing::info!(
            sessions = sessions.len(),
            folders = folders.len(),
            "Loaded sessions and folders"
        );
        Ok((sessions, folders))
    }

    /// Saves sessions and folders, skipping invalid items.
    ///
    /// # Errors
    /// [`StorageError::Write`] if serialization, the write or the post-write
    /// verification fails.
    pub fn save(&self, sessions: &[SessionItem], folders: &[SessionFolder]) -> StorageResult<()> {
        let _span = tracing::info_span!(SESSIONS_SAVE).entered();
        let write_err = |reason: String| StorageError::Write {
            path: self.path.clone(),
            reason,
        };

        let valid_sessions: Vec<SessionItem> = sessions
            .iter()
            .filter(|s| {
                let ok = s.is_valid();
                if !ok {
                    tracing::warn!(session = %s.name, "Skipping invalid session on save");
                }
                ok
            })
            .map(SessionItem::for_storage)
            .collect();
        let valid_folders: Vec<SessionFolder> = folders
            .iter()
            .filter(|f| {
                let ok = f.is_valid();
                if !ok {
                    tracing::warn!(folder = %f.name, "Skipping invalid folder on save");
                }
                ok
            })
            .cloned()
            .collect();

        if valid_sessions.iter().any(|s| s.name.is_empty())
            || valid_folders.iter().any(|f| f.name.is_empty())
        {
            return Err(write_err("Data validation failed".into()));
        }

        let document = SessionsDocument {
            sessions: valid_sessions,
            folders: &valid_folders,
        };
        let bytes = to_json_pretty4(&document).map_err(|e| write_err(e.to_string()))?;
        atomic_write(&self.path, &bytes).map_err(|e| write_err(format!("File write failed: {e}")))?;

        self.verify(document.sessions.len(), document.folders.len())
            .map_err(|reason| write_err(reason))?;
        tracing::info!(
            sessions = document.sessions.len(),
            folders = document.folders.len(),
            "Saved sessions and folders"
        );
        Ok(())
    }

    fn verify(&self, sessions: usize, folders: usize) -> Result<(), String> {
        let text = std::fs::read_to_string(&self.path).map_err(|e| e.to_string())?;
        let saved: Value = serde_json::from_str(&text).map_err(|e| e.to_string())?;
        let count = |key: &str| saved.get(key).and_then(Value::as_array).map_or(0, Vec::len);
        if count("sessions") != sessions || count("folders") != folders {
            return Err("Save verification failed".into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AuthType, SessionType};

    fn storage() -> (tempfile::TempDir, SessionStorage) {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = SessionStorage::new(dir.path().join("sessions.json"));
        (dir, storage)
    }

    #[test]
    fn missing_and_empty_files_are_empty() {
        let (_dir, storage) = storage();
        assert_eq!(storage.load().unwrap().0.len(), 0);
        std::fs::write(storage.path(), "").unwrap();
        assert_eq!(storage.load().unwrap().1.len(), 0);
    }

    #[test]
    fn corrupted_file_is_reported() {
        let (_dir, storage) = storage();
        std::fs::write(storage.path(), "{not json").unwrap();
        assert!(matches!(storage.load(), Err(StorageError::Corrupted { .. })));
        std::fs::write(storage.path(), "[1, 2]").unwrap();
        assert!(matches!(storage.load(), Err(StorageError::Corrupted { .. })));
    }

    #[test]
    fn invalid_entries_are_skipped() {
        let (_dir, storage) = storage();
        std::fs::write(
            storage.path(),
            r#"{
                "sessions": [
                    {"name": "ok", "session_type": "local"},
                    {"name": "no-host", "session_type": "ssh"},
                    {"session_type": "local"},
                    "junk"
                ],
                "folders": {"not": "a list"}
            }"#,
        )
        .unwrap();
        let (sessions, folders) = storage.load().unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].name, "ok");
        assert!(folders.is_empty());
    }

    #[test]
    fn save_strips_passwords_and_round_trips() {
        let (_dir, storage) = storage();
        let mut ssh = SessionItem::ssh("db", "db.internal", "admin", 22);
        ssh.auth_type = AuthType::Password;
        ssh.auth_value = "secret".into();
        ssh.folder_path = "/Work".into();
        let local = SessionItem::new("shell", SessionType::Local);
        let folder = SessionFolder::new("Work", "");
        storage
            .save(&[ssh, local], std::slice::from_ref(&folder))
            .unwrap();

        let text = std::fs::read_to_string(storage.path()).unwrap();
        assert!(!text.contains("secret"));
        assert!(text.contains("\n    \"sessions\""));

        let (sessions, folders) = storage.load().unwrap();
        assert_eq!(sessions.len(), 2);
        assert_eq!(folders, vec![folder]);
    }

    #[test]
    fn oversized_file_is_refused() {
        let (_dir, storage) = storage();
        let file = std::fs::File::create(storage.path()).unwrap();
        file.set_len(MAX_SESSIONS_FILE_SIZE + 1).unwrap();
        assert!(matches!(storage.load(), Err(StorageError::Read { .. })));
    }
}
