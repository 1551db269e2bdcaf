//! Zip backups of the configuration directory
//!
//! A backup holds the session, settings, scheme and highlight files plus the
//! `layouts/` and `highlights/` directories. Passwords stay in the keyring
//! and are not part of the archive.

use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Component, Path, PathBuf};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::config::{ConfigPaths, atomic_write};
use crate::error::{BackupError, BackupResult};

/// Directories copied recursively
const BACKUP_DIRS: &[&str] = &["layouts", "highlights"];

fn backup_files(paths: &ConfigPaths) -> Vec<PathBuf> {
    vec![
        paths.sessions_file(),
        paths.settings_file(),
        paths.custom_schemes_file(),
        paths.highlight_settings_file(),
    ]
}

/// Top-level names a backup may contain
fn allowed_roots(paths: &ConfigPaths) -> BTreeSet<String> {
    backup_files(paths)
        .iter()
        .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        .chain(BACKUP_DIRS.iter().map(|d| (*d).to_string()))
        .collect()
}

/// Summary of a backup or restore
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackupReport {
    /// Archive-relative paths of the files written
    pub files: Vec<String>,
}

fn add_dir(
    zip: &mut ZipWriter<File>,
    dir: &Path,
    prefix: &str,
    options: SimpleFileOptions,
    report: &mut BackupReport,
) -> BackupResult<()> {
    let mut entries: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(Result::ok)
        .map(|e| e.path())
        .collect();
    entries.sort();
    for path in entries {
        let Some(name) = path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
            continue;
        };
        let entry_name = format!("{prefix}/{name}");
        if path.is_dir() {
            add_dir(zip, &path, &entry_name, options, report)?;
        } else if path.is_file() {
            zip.start_file(entry_name.clone(), options)?;
            zip.write_all(&fs::read(&path)?)?;
            report.files.push(entry_name);
        }
    }
    Ok(())
}

/// Writes a backup of the configuration to `target`
///
/// # Errors
/// I/O or archive failures, or [`BackupError::Empty`] when there is nothing
/// to back up.
pub fn create_backup(paths: &ConfigPaths, target: &Path) -> BackupResult<BackupReport> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut zip = ZipWriter::new(File::create(target)?);
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .unix_permissions(0o600);
    let mut report = BackupReport::default();

    for file in backup_files(paths) {
        if !file.is_file() {
            continue;
        }
        let Some(name) = file.file_name().map(|n| n.to_string_lossy().into_owned()) else {
            continue;
        };
        zip.start_file(name.clone(), options)?;
        zip.write_all(&fs::read(&file)?)?;
        report.files.push(name);
    }
    for dir in BACKUP_DIRS {
        let source = paths.config_dir.join(dir);
        if source.is_dir() {
            add_dir(&mut zip, &source, dir, options, &mut report)?;
        }
    }
    zip.finish()?;

    if report.files.is_empty() {
        let _ = fs::remove_file(target);
        return Err(BackupError::Empty);
    }
    tracing::info!(target = %target.display(), files = report.files.len(), "Backup created");
    Ok(report)
}

/// Checks an entry name and returns its path relative to the config dir
fn safe_relative_path(name: &str, roots: &BTreeSet<String>) -> BackupResult<PathBuf> {
    let unsafe_path = || BackupError::UnsafePath(name.to_string());
    let path = Path::new(name);
    let mut relative = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => relative.push(part),
            Component::CurDir => {}
            _ => return Err(unsafe_path()),
        }
    }
    let root = relative
        .components()
        .next()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .ok_or_else(unsafe_path)?;
    if !roots.contains(&root) {
        return Err(unsafe_path());
    }
    Ok(relative)
}

/// Restores a backup into the configuration directory.
///
/// Every entry is checked before anything is written. Directories present in
/// the archive replace the existing ones.
///
/// # Errors
/// Unreadable archives, entries outside the known configuration files
/// ([`BackupError::UnsafePath`]), archives with no known files
/// ([`BackupError::Empty`]) and write failures.
pub fn restore_backup(paths: &ConfigPaths, source: &Path) -> BackupResult<BackupReport> {
    let mut archive = ZipArchive::new(File::open(source)?)?;
    let roots = allowed_roots(paths);
    let mut entries: Vec<(PathBuf, String, Vec<u8>)> = Vec::new();

    for i in 0..archive.len() {
        let mut file = archive.by_index(i)?;
        if file.is_dir() {
            continue;
        }
        let name = file.name().to_string();
        if file.enclosed_name().is_none() {
            return Err(BackupError::UnsafePath(name));
        }
        let relative = safe_relative_path(&name, &roots)?;
        let mut contents = Vec::new();
        file.read_to_end(&mut contents)?;
        entries.push((relative, name, contents));
    }
    if entries.is_empty() {
        return Err(BackupError::Empty);
    }

    for dir in BACKUP_DIRS {
        let replaced = entries
            .iter()
            .any(|(rel, _, _)| rel.components().count() > 1 && rel.starts_with(dir));
        let existing = paths.config_dir.join(dir);
        if replaced && existing.is_dir() {
            fs::remove_dir_all(&existing)?;
        }
    }

    let mut report = BackupReport::default();
    for (relative, name, contents) in entries {
        atomic_write(&paths.config_dir.join(&relative), &contents)?;
        report.files.push(name);
    }
    tracing::info!(source = %source.display(), files = report.files.len(), "Backup restored");
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn populated() -> (TempDir, ConfigPaths) {
        let dir = TempDir::new().unwrap();
        let paths = ConfigPaths::with_root(dir.path().join("config"));
        fs::create_dir_all(paths.layout_dir()).unwrap();
        fs::write(paths.sessions_file(), r#"{"sessions":[],"folders":[]}"#).unwrap();
        fs::write(paths.settings_file(), "{}").unwrap();
        fs::write(paths.layout_dir().join("dev.json"), r#"{"tabs":[]}"#).unwrap();
        (dir, paths)
    }

    #[test]
    fn backup_and_restore() {
        let (dir, paths) = populated();
        let archive = dir.path().join("backup.zip");
        let report = create_backup(&paths, &archive).unwrap();
        assert_eq!(
            report.files,
            vec!["sessions.json", "settings.json", "layouts/dev.json"]
        );

        fs::write(paths.sessions_file(), "changed").unwrap();
        fs::write(paths.layout_dir().join("extra.json"), "{}").unwrap();
        restore_backup(&paths, &archive).unwrap();
        assert_eq!(
            fs::read_to_string(paths.sessions_file()).unwrap(),
            r#"{"sessions":[],"folders":[]}"#
        );
        assert!(!paths.layout_dir().join("extra.json").exists());
        assert!(paths.layout_dir().join("dev.json").exists());
    }

    #[test]
    fn empty_config_has_nothing_to_back_up() {
        let dir = TempDir::new().unwrap();
        let paths = ConfigPaths::with_root(dir.path().join("config"));
        let archive = dir.path().join("backup.zip");
        assert!(matches!(create_backup(&paths, &archive), Err(BackupError::Empty)));
        assert!(!archive.exists());
    }

    #[test]
    fn rejects_foreign_entries() {
        let dir = TempDir::new().unwrap();
        let paths = ConfigPaths::with_root(dir.path().join("config"));
        let archive = dir.path().join("evil.zip");
        let mut zip = ZipWriter::new(File::create(&archive).unwrap());
        zip.start_file("../outside.json", SimpleFileOptions::default())
            .unwrap();
        zip.write_all(b"{}").unwrap();
        zip.finish().unwrap();
        assert!(matches!(
            restore_backup(&paths, &archive),
            Err(BackupError::UnsafePath(_))
        ));
        assert!(!dir.path().join("outside.json").exists());

        let roots = allowed_roots(&paths);
        assert!(safe_relative_path("layouts/a.json", &roots).is_ok());
        assert!(safe_relative_path("/etc/passwd", &roots).is_err());
        assert!(safe_relative_path("random.txt", &roots).is_err());
    }
}
