//! Named layouts under `layouts/`

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::node::LayoutNode;
use crate::config::atomic_write;
use crate::error::{LayoutError, LayoutResult};
use crate::helpers::sanitize_name;
use crate::models::{LayoutItem, normalize_folder_path};
use crate::split::TabManagerModel;

/// Contents of a layout file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SavedLayout {
    /// One node per tab, in tab order
    #[serde(default)]
    pub tabs: Vec<LayoutNode>,
    /// Sidebar folder the layout is shown in
    #[serde(default)]
    pub folder_path: String,
}

impl SavedLayout {
    /// Captures every tab of the window
    #[must_use]
    pub fn from_tabs(tabs: &TabManagerModel, folder_path: &str) -> Self {
        Self {
            tabs: tabs
                .tabs()
                .iter()
                .map(|t| LayoutNode::from_tree(t.panes()))
                .collect(),
            folder_path: normalize_folder_path(folder_path),
        }
    }
}

/// File stem for a layout name
#[must_use]
pub fn layout_file_stem(name: &str) -> String {
    sanitize_name(name).replace(' ', "_")
}

/// Reads and writes layout files in one directory
#[derive(Debug, Clone)]
pub struct LayoutStore {
    dir: PathBuf,
}

impl LayoutStore {
    /// Store backed by `dir`; the directory is created on first save
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory holding the layout files
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file for `name`
    #[must_use]
    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.json", layout_file_stem(name)))
    }

    /// Saved layouts sorted by file name. Unreadable files are listed in the
    /// root folder.
    ///
    /// # Errors
    /// Fails only if the directory exists but cannot be read.
    pub fn list(&self) -> LayoutResult<Vec<LayoutItem>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }
        let mut files: Vec<PathBuf> = fs::read_dir(&self.dir)?
            .filter_map(Result::ok)
            .map(|e| e.path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
            .collect();
        files.sort();

        Ok(files
            .iter()
            .filter_map(|path| {
                let stem = path.file_stem()?.to_string_lossy().replace('_', " ");
                let folder_path = fs::read_to_string(path)
                    .ok()
                    .and_then(|text| serde_json::from_str::<serde_json::Value>(&text).ok())
                    .and_then(|v| v.get("folder_path")?.as_str().map(str::to_string))
                    .unwrap_or_default();
                Some(LayoutItem::new(stem, &folder_path))
            })
            .collect())
    }

    /// Writes a layout, replacing any file with the same name
    ///
    /// # Errors
    /// I/O or serialization failures.
    pub fn save(&self, name: &str, layout: &SavedLayout) -> LayoutResult<PathBuf> {
        if layout.tabs.is_empty() {
            return Err(LayoutError::Empty(name.to_string()));
        }
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(name);
        if path.exists() {
            tracing::warn!(layout = name, "Overwriting existing layout");
        }
        atomic_write(&path, serde_json::to_string_pretty(layout)?.as_bytes())?;
        tracing::info!(layout = name, tabs = layout.tabs.len(), "Layout saved");
        Ok(path)
    }

    /// Reads a layout
    ///
    /// # Errors
    /// [`LayoutError::NotFound`] if there is no file for `name`.
    pub fn load(&self, name: &str) -> LayoutResult<SavedLayout> {
        let path = self.path_for(name);
        if !path.exists() {
            return Err(LayoutError::NotFound(name.to_string()));
        }
        let layout: SavedLayout = serde_json::from_str(&fs::read_to_string(&path)?)?;
        Ok(layout)
    }

    /// Deletes a layout file
    ///
    /// # Errors
    /// [`LayoutError::NotFound`] if there is no file for `name`.
    pub fn delete(&self, name: &str) -> LayoutResult<()> {
        let path = self.path_for(name);
        if !path.exists() {
            return Err(LayoutError::NotFound(name.to_string()));
        }
        fs::remove_file(&path)?;
        tracing::info!(layout = name, "Layout deleted");
        Ok(())
    }

    /// Shows a layout in another sidebar folder. Other keys of the file are
    /// kept as they are.
    ///
    /// # Errors
    /// I/O or JSON failures while rewriting the file.
    pub fn move_layout(&self, name: &str, old_folder: &str, new_folder: &str) -> LayoutResult<()> {
        if old_folder == new_folder {
            return Ok(());
        }
        let path = self.path_for(name);
        let mut state = if path.exists() {
            serde_json::from_str::<serde_json::Value>(&fs::read_to_string(&path)?)?
        } else {
            serde_json::Value::Object(serde_json::Map::new())
        };
        let Some(object) = state.as_object_mut() else {
            return Err(LayoutError::NotFound(name.to_string()));
        };
        object.insert(
            "folder_path".to_string(),
            serde_json::Value::String(new_folder.to_string()),
        );
        fs::create_dir_all(&self.dir)?;
        atomic_write(&path, serde_json::to_string_pretty(&state)?.as_bytes())?;
        tracing::info!(layout = name, folder = new_folder, "Layout moved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::split::TerminalRef;
    use tempfile::TempDir;

    fn window() -> TabManagerModel {
        let mut tabs = TabManagerModel::new();
        tabs.add_tab(TerminalRef::local("Local"), None);
        tabs.add_tab(TerminalRef::ssh("web"), None);
        tabs
    }

    #[test]
    fn file_names_replace_spaces() {
        assert_eq!(layout_file_stem("My Dev Setup"), "My_Dev_Setup");
        assert_eq!(layout_file_stem("a/b"), "a_b");
    }

    #[test]
    fn save_list_load_delete() {
        let dir = TempDir::new().unwrap();
        let store = LayoutStore::new(dir.path().join("layouts"));
        assert!(store.list().unwrap().is_empty());

        let layout = SavedLayout::from_tabs(&window(), "Work");
        store.save("My Dev Setup", &layout).unwrap();
        store.save("alpha", &SavedLayout::from_tabs(&window(), "")).unwrap();

        let names: Vec<(String, String)> = store
            .list()
            .unwrap()
            .into_iter()
            .map(|l| (l.name, l.folder_path))
            .collect();
        assert_eq!(
            names,
            vec![
                ("My Dev Setup".to_string(), "/Work".to_string()),
                ("alpha".to_string(), String::new()),
            ]
        );

        assert_eq!(store.load("My Dev Setup").unwrap(), layout);
        store.delete("alpha").unwrap();
        assert!(matches!(store.load("alpha"), Err(LayoutError::NotFound(_))));
    }

    #[test]
    fn empty_layouts_are_refused() {
        let dir = TempDir::new().unwrap();
        let store = LayoutStore::new(dir.path());
        assert!(matches!(
            store.save("x", &SavedLayout::default()),
            Err(LayoutError::Empty(_))
        ));
    }

    #[test]
    fn move_rewrites_folder_only() {
        let dir = TempDir::new().unwrap();
        let store = LayoutStore::new(dir.path());
        let layout = SavedLayout::from_tabs(&window(), "");
        store.save("dev", &layout).unwrap();

        store.move_layout("dev", "", "/Work").unwrap();
        let moved = store.load("dev").unwrap();
        assert_eq!(moved.folder_path, "/Work");
        assert_eq!(moved.tabs, layout.tabs);

        store.move_layout("dev", "/Work", "/Work").unwrap();
        assert_eq!(store.list().unwrap()[0].folder_path, "/Work");
    }
}
