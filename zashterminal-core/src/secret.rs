//! Session passwords in the system keyring via `secret-tool`
//! (libsecret Secret Service API: GNOME Keyring, KDE Wallet, ...).
//!
//! Entries carry the attributes `application=zashterminal` and
//! `session_name=<name>`. Session operations talk to the keyring through the
//! [`SecretStore`] trait so they can be exercised without a running secret
//! service.

use std::io::Write;
use std::process::{Command, Stdio};

use secrecy::{ExposeSecret, SecretString};

use crate::error::{SecretError, SecretResult};

/// Value of the `application` attribute
const APP_ATTRIBUTE: &str = "zashterminal";

/// Password storage keyed by session name
pub trait SecretStore {
    /// `true` when the backend can be used
    fn is_available(&self) -> bool;

    /// Stores `password` for `session_name`, replacing any previous value.
    ///
    /// # Errors
    /// Returns an error if the backend rejects the value.
    fn store(&self, session_name: &str, password: &SecretString) -> SecretResult<()>;

    /// Looks up the password; `Ok(None)` when there is none.
    ///
    /// # Errors
    /// Returns an error if the backend cannot be queried.
    fn lookup(&self, session_name: &str) -> SecretResult<Option<SecretString>>;

    /// Removes the password for `session_name`.
    ///
    /// # Errors
    /// Returns an error if the backend cannot be queried.
    fn clear(&self, session_name: &str) -> SecretResult<()>;

    /// Moves a password to a new session name. Missing passwords are not an
    /// error.
    ///
    /// # Errors
    /// Returns an error if storing under the new name fails.
    fn rename(&self, old_name: &str, new_name: &str) -> SecretResult<()> {
        if old_name == new_name {
            return Ok(());
        }
        if let Some(password) = self.lookup(old_name)? {
            self.store(new_name, &password)?;
            self.clear(old_name)?;
        }
        Ok(())
    }
}

/// The `secret-tool` command-line backend
#[derive(Debug, Clone, Copy, Default)]
pub struct SecretTool;

fn attributes(session_name: &str) -> [&str; 4] {
    ["application", APP_ATTRIBUTE, "session_name", session_name]
}

impl SecretStore for SecretTool {
    fn is_available(&self) -> bool {
        Command::new("secret-tool")
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .is_ok_and(|s| s.success())
    }

    fn store(&self, session_name: &str, password: &SecretString) -> SecretResult<()> {
        if !self.is_available() {
            return Err(SecretError::BackendUnavailable(
                "secret-tool not found. Install libsecret-tools.".into(),
            ));
        }
        let label = format!("Zashterminal: {session_name}");
        let mut child = Command::new("secret-tool")
            .args(["store", "--label", &label])
            .args(attributes(session_name))
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| SecretError::LibSecret(format!("Failed to spawn secret-tool: {e}")))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(password.expose_secret().as_bytes())
                .map_err(|e| SecretError::LibSecret(format!("Failed to write secret: {e}")))?;
        }

        let output = child
            .wait_with_output()
            .map_err(|e| SecretError::LibSecret(format!("Failed to wait for secret-tool: {e}")))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SecretError::StoreFailed(format!(
                "secret-tool store failed: {stderr}"
            )));
        }
        tracing::debug!(session = session_name, "Stored password in keyring");
        Ok(())
    }

    fn lookup(&self, session_name: &str) -> SecretResult<Option<SecretString>> {
        let output = Command::new("secret-tool")
            .arg("lookup")
            .args(attributes(session_name))
            .output()
            .map_err(|e| SecretError::LibSecret(format!("Failed to run secret-tool: {e}")))?;
        if !output.status.success() {
            return Ok(None);
        }
        let value = String::from_utf8_lossy(&output.stdout)
            .trim_end_matches('\n')
            .to_string();
        Ok((!value.is_empty()).then(|| SecretString::from(value)))
    }

    fn clear(&self, session_name: &str) -> SecretResult<()> {
        let output = Command::new("secret-tool")
            .arg("clear")
            .args(attributes(session_name))
            .output()
            .map_err(|e| SecretError::LibSecret(format!("Failed to run secret-tool: {e}")))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SecretError::DeleteFailed(format!(
                "secret-tool clear failed: {stderr}"
            )));
        }
        Ok(())
    }
}

/// Looks a password up without blocking the async runtime.
///
/// # Errors
/// Returns an error if `secret-tool` cannot be run.
pub async fn lookup_password(session_name: String) -> SecretResult<Option<SecretString>> {
    tokio::task::spawn_blocking(move || SecretTool.lookup(&session_name))
        .await
        .map_err(|e| SecretError::LibSecret(e.to_string()))?
}

/// Stores a password without blocking the async runtime.
///
/// # Errors
/// Returns an error if `secret-tool` is missing or rejects the value.
pub async fn store_password(session_name: String, password: SecretString) -> SecretResult<()> {
    tokio::task::spawn_blocking(move || SecretTool.store(&session_name, &password))
        .await
        .map_err(|e| SecretError::LibSecret(e.to_string()))?
}

/// In-memory store for tests and for running without a keyring
#[derive(Debug, Default)]
pub struct MemorySecretStore {
    entries: std::sync::Mutex<std::collections::HashMap<String, String>>,
}

impl MemorySecretStore {
    fn entries(&self) -> std::sync::MutexGuard<'_, std::collections::HashMap<String, String>> {
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl SecretStore for MemorySecretStore {
    fn is_available(&self) -> bool {
        true
    }

    fn store(&self, session_name: &str, password: &SecretString) -> SecretResult<()> {
        self.entries()
            .insert(session_name.to_string(), password.expose_secret().to_string());
        Ok(())
    }

    fn lookup(&self, session_name: &str) -> SecretResult<Option<SecretString>> {
        Ok(self
            .entries()
            .get(session_name)
            .map(|p| SecretString::from(p.clone())))
    }

    fn clear(&self, session_name: &str) -> SecretResult<()> {
        self.entries().remove(session_name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rename_moves_password() {
        let store = MemorySecretStore::default();
        store.store("old", &SecretString::from("pw")).unwrap();
        store.rename("old", "new").unwrap();
        let moved = store.lookup("new").unwrap().expect("password");
        assert_eq!(moved.expose_secret(), "pw");
        assert!(store.lookup("old").unwrap().is_none());
    }

    #[test]
    fn rename_without_password_is_noop() {
        let store = MemorySecretStore::default();
        store.rename("a", "b").unwrap();
        assert!(store.lookup("b").unwrap().is_none());
    }

    #[test]
    fn attributes_use_session_name() {
        assert_eq!(
            attributes("web"),
            ["application", "zashterminal", "session_name", "web"]
        );
    }
}
