//! Filesystem locations for configuration, state and logs

use std::path::{Path, PathBuf};

/// Application directory name under the XDG config and cache roots
pub const APP_DIR_NAME: &str = "zashterminal";

/// All files and directories Zashterminal reads or writes.
///
/// Production code uses [`ConfigPaths::from_environment`]; tests build an
/// isolated tree with [`ConfigPaths::with_root`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigPaths {
    /// Root configuration directory
    pub config_dir: PathBuf,
    /// Cache directory
    pub cache_dir: PathBuf,
}

impl ConfigPaths {
    /// Resolves paths from `$XDG_CONFIG_HOME` / `$XDG_CACHE_HOME`,
    /// falling back to `~/.config` and `~/.cache`.
    #[must_use]
    pub fn from_environment() -> Self {
        let config_root = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .filter(|p| p.is_absolute())
            .or_else(dirs::config_dir)
            .unwrap_or_else(|| home_dir().join(".config"));
        let cache_root = std::env::var_os("XDG_CACHE_HOME")
            .map(PathBuf::from)
            .filter(|p| p.is_absolute())
            .or_else(dirs::cache_dir)
            .unwrap_or_else(|| home_dir().join(".cache"));

        Self {
            config_dir: config_root.join(APP_DIR_NAME),
            cache_dir: cache_root.join(APP_DIR_NAME),
        }
    }

    /// Places every path under `root` (config in `root`, cache in `root/cache`).
    #[must_use]
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            cache_dir: root.join("cache"),
            config_dir: root,
        }
    }

    /// `sessions.json`
    #[must_use]
    pub fn sessions_file(&self) -> PathBuf {
        self.config_dir.join("sessions.json")
    }

    /// `settings.json`
    #[must_use]
    pub fn settings_file(&self) -> PathBuf {
        self.config_dir.join("settings.json")
    }

    /// `session_state.json`, written on exit for session restore
    #[must_use]
    pub fn state_file(&self) -> PathBuf {
        self.config_dir.join("session_state.json")
    }

    /// `custom_schemes.json`
    #[must_use]
    pub fn custom_schemes_file(&self) -> PathBuf {
        self.config_dir.join("custom_schemes.json")
    }

    /// `ai_history.json`
    #[must_use]
    pub fn ai_history_file(&self) -> PathBuf {
        self.config_dir.join("ai_history.json")
    }

    /// `highlights_settings.json`
    #[must_use]
    pub fn highlight_settings_file(&self) -> PathBuf {
        self.config_dir.join("highlights_settings.json")
    }

    /// Directory of saved layouts
    #[must_use]
    pub fn layout_dir(&self) -> PathBuf {
        self.config_dir.join("layouts")
    }

    /// Directory of user highlight rule files
    #[must_use]
    pub fn highlights_dir(&self) -> PathBuf {
        self.config_dir.join("highlights")
    }

    /// Log directory
    #[must_use]
    pub fn log_dir(&self) -> PathBuf {
        self.config_dir.join("logs")
    }

    /// Default directory for manual backups
    #[must_use]
    pub fn backup_dir(&self) -> PathBuf {
        self.config_dir.join("backups")
    }

    /// Creates the config tree. Failures for secondary directories are logged
    /// and ignored.
    ///
    /// # Errors
    /// Returns an error if the root config directory cannot be created.
    pub fn ensure_directories(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.config_dir)?;
        for dir in [
            self.cache_dir.clone(),
            self.log_dir(),
            self.layout_dir(),
            self.backup_dir(),
        ] {
            if let Err(e) = std::fs::create_dir_all(&dir) {
                tracing::warn!(path = %dir.display(), error = %e, "Failed to create directory");
            }
        }
        Ok(())
    }
}

impl Default for ConfigPaths {
    fn default() -> Self {
        Self::from_environment()
    }
}

/// Home directory, `/` if it cannot be determined
#[must_use]
pub fn home_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from("/"))
}

/// Expands a leading `~` and returns an owned path
#[must_use]
pub fn expand_home(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).as_ref())
}

/// Restricts a file to the owner (0600). No-op on failure apart from a log line.
pub fn secure_file_permissions(path: &Path) {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Err(e) = std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600)) {
            tracing::warn!(path = %path.display(), error = %e, "Failed to set secure permissions");
        }
    }
    #[cfg(not(unix))]
    let _ = path;
}

/// Writes `contents` to `path` atomically: temp file in the same directory,
/// fsync, then rename over the target.
///
/// # Errors
/// Returns the underlying I/O error; the temp file is removed on failure.
pub fn atomic_write(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    use std::io::Write;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("tmp");
    let result = (|| {
        let mut file = std::fs::File::create(&tmp)?;
        file.write_all(contents)?;
        file.flush()?;
        file.sync_all()?;
        std::fs::rename(&tmp, path)
    })();
    if result.is_err() {
        let _ = std::fs::remove_file(&tmp);
    }
    result?;
    secure_file_permissions(path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_root_layout() {
        let paths = ConfigPaths::with_root("/tmp/zt");
        assert_eq!(paths.settings_file(), PathBuf::from("/tmp/zt/settings.json"));
        assert_eq!(paths.layout_dir(), PathBuf::from("/tmp/zt/layouts"));
        assert_eq!(paths.cache_dir, PathBuf::from("/tmp/zt/cache"));
    }

    #[test]
    fn atomic_write_replaces_content() {
        let dir = tempfile::tempdir().expect("tempdir");
        let file = dir.path().join("nested").join("data.json");
        atomic_write(&file, b"one").expect("first write");
        atomic_write(&file, b"two").expect("second write");
        assert_eq!(std::fs::read_to_string(&file).expect("read"), "two");
        assert!(!file.with_extension("tmp").exists());
    }

    #[test]
    fn ensure_directories_creates_tree() {
        let dir = tempfile::tempdir().expect("tempdir");
        let paths = ConfigPaths::with_root(dir.path().join("cfg"));
        paths.ensure_directories().expect("create");
        assert!(paths.layout_dir().is_dir());
        assert!(paths.log_dir().is_dir());
    }
}
