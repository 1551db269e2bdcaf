//! Folders and saved-layout entries in the session tree

use serde::{Deserialize, Deserializer, Serialize};

use super::{normalize_folder_path, unix_now};
use crate::helpers::sanitize_name;

fn de_name<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(sanitize_name(&Option::<String>::deserialize(d)?.unwrap_or_default()))
}

fn de_path<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(normalize_folder_path(
        &Option::<String>::deserialize(d)?.unwrap_or_default(),
    ))
}

/// A folder grouping sessions, layouts and other folders.
///
/// The tree is encoded in strings: `path` is `"{parent_path}/{name}"` and
/// children point back through their own `folder_path` / `parent_path`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionFolder {
    /// Display name
    #[serde(deserialize_with = "de_name")]
    pub name: String,
    /// Full path, e.g. `/Work/Servers`
    #[serde(default, deserialize_with = "de_path")]
    pub path: String,
    /// Parent path, `""` at the root
    #[serde(default, deserialize_with = "de_path")]
    pub parent_path: String,
    /// Unix timestamp of creation
    #[serde(default = "unix_now")]
    pub created_at: f64,
    /// Unix timestamp of the last change
    #[serde(default = "unix_now")]
    pub modified_at: f64,
}

impl SessionFolder {
    /// Creates a folder named `name` under `parent_path`
    #[must_use]
    pub fn new(name: &str, parent_path: &str) -> Self {
        let name = sanitize_name(name);
        let parent_path = normalize_folder_path(parent_path);
        let now = unix_now();
        Self {
            path: Self::child_path(&parent_path, &name),
            name,
            parent_path,
            created_at: now,
            modified_at: now,
        }
    }

    /// `"{parent}/{name}"`, or `"/{name}"` at the root
    #[must_use]
    pub fn child_path(parent: &str, name: &str) -> String {
        if parent.is_empty() {
            format!("/{name}")
        } else {
            format!("{parent}/{name}")
        }
    }

    /// `true` if `path` is this folder or inside it
    #[must_use]
    pub fn contains_path(&self, path: &str) -> bool {
        path == self.path || path.starts_with(&format!("{}/", self.path))
    }

    /// Updates `modified_at`
    pub fn touch(&mut self) {
        self.modified_at = unix_now();
    }

    /// Human-readable problems; empty when the folder is valid
    #[must_use]
    pub fn validation_errors(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.name.is_empty() {
            errors.push("Folder name is required.".to_string());
        }
        if !self.path.is_empty()
            && !self.parent_path.is_empty()
            && !self.path.starts_with(&format!("{}/", self.parent_path))
        {
            errors.push("Folder path is not consistent with its parent path.".to_string());
        }
        errors
    }

    /// `true` when [`Self::validation_errors`] is empty
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.validation_errors().is_empty()
    }
}

/// A saved layout as shown in the tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutItem {
    /// Layout name
    pub name: String,
    /// Containing folder path, `""` at the root
    #[serde(default, deserialize_with = "de_path")]
    pub folder_path: String,
}

impl LayoutItem {
    /// Creates a layout entry
    #[must_use]
    pub fn new(name: impl Into<String>, folder_path: &str) -> Self {
        Self {
            name: name.into(),
            folder_path: normalize_folder_path(folder_path),
        }
    }
}
