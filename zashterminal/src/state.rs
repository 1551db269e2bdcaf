//! Application state management
//!
//! Holds every manager from the core crate behind one `Rc<RefCell<_>>`
//! shared by the window, sidebar, dialogs and terminal manager. All of it
//! lives on the GTK main thread.
//!
//! The [`SignalBus`] fires synchronously while a session operation still
//! holds the state mutably borrowed, so bus handlers must defer any state
//! access with `glib::idle_add_local_once`.
//!
//! Settings changes reach the bus through one change listener registered
//! at load. Listeners must be `Send + Sync` and the bus is not, so the
//! listener only queues `(key, value)` pairs; [`forward_setting_changes`]
//! drains the queue on the main loop and emits `SettingsChanged`.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::{Arc, mpsc};

use serde_json::Value;

use zashterminal_core::ai::AiHistoryManager;
use zashterminal_core::config::{ConfigPaths, SettingsManager};
use zashterminal_core::highlights::HighlightManager;
use zashterminal_core::layout::LayoutStore;
use zashterminal_core::models::{LayoutItem, SessionItem};
use zashterminal_core::secret::SecretTool;
use zashterminal_core::sessions::{SessionOperations, SessionStorage, SessionTree};
use zashterminal_core::signals::{AppEvent, SignalBus};
use zashterminal_core::theme::ThemeCssCache;

use crate::async_utils::poll_channel;
use crate::error::{AppStateError, AppStateResult};

/// Central application state
pub struct AppState {
    paths: ConfigPaths,
    settings: Arc<SettingsManager>,
    signals: Rc<SignalBus>,
    operations: SessionOperations,
    tree: SessionTree,
    layouts: LayoutStore,
    highlights: HighlightManager,
    ai_history: AiHistoryManager,
    css_cache: ThemeCssCache,
    setting_changes: Option<mpsc::Receiver<(String, Value)>>,
}

impl AppState {
    /// Loads everything from the user's configuration directory.
    ///
    /// `default_font` seeds the `font` setting on first run.
    pub fn new(default_font: &str) -> AppStateResult<Self> {
        Self::with_paths(ConfigPaths::from_environment(), default_font)
    }

    /// Loads everything from `paths`
    pub fn with_paths(paths: ConfigPaths, default_font: &str) -> AppStateResult<Self> {
        paths
            .ensure_directories()
            .map_err(|e| AppStateError::InitializationFailed {
                component: "configuration directory",
                reason: e.to_string(),
            })?;

        let settings = Arc::new(SettingsManager::load_with_default_font(&paths, default_font));
        let signals = Rc::new(SignalBus::new());
        let setting_changes = queue_setting_changes(&settings);

        let operations = SessionOperations::load(SessionStorage::new(paths.sessions_file()))?
            .with_signals(Rc::clone(&signals))
            .with_settings(Arc::clone(&settings))
            .with_secrets(Box::new(SecretTool));

        let layouts = LayoutStore::new(paths.layout_dir());
        let tree = SessionTree::build(
            operations.sessions().to_vec(),
            operations.folders().to_vec(),
            list_layouts(&layouts),
        )
        .with_settings(Arc::clone(&settings));

        let highlights = HighlightManager::from_paths(&paths);
        let ai_history = AiHistoryManager::load(paths.ai_history_file());

        tracing::info!(
            sessions = operations.sessions().len(),
            folders = operations.folders().len(),
            "Application state loaded"
        );

        Ok(Self {
            paths,
            settings,
            signals,
            operations,
            tree,
            layouts,
            highlights,
            ai_history,
            css_cache: ThemeCssCache::new(),
            setting_changes: Some(setting_changes),
        })
    }

    pub const fn paths(&self) -> &ConfigPaths {
        &self.paths
    }

    pub const fn settings(&self) -> &Arc<SettingsManager> {
        &self.settings
    }

    pub const fn signals(&self) -> &Rc<SignalBus> {
        &self.signals
    }

    pub const fn operations(&self) -> &SessionOperations {
        &self.operations
    }

    pub fn operations_mut(&mut self) -> &mut SessionOperations {
        &mut self.operations
    }

    pub const fn tree(&self) -> &SessionTree {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut SessionTree {
        &mut self.tree
    }

    pub const fn layouts(&self) -> &LayoutStore {
        &self.layouts
    }

    pub const fn highlights(&self) -> &HighlightManager {
        &self.highlights
    }

    pub fn highlights_mut(&mut self) -> &mut HighlightManager {
        &mut self.highlights
    }

    pub const fn ai_history(&self) -> &AiHistoryManager {
        &self.ai_history
    }

    pub fn ai_history_mut(&mut self) -> &mut AiHistoryManager {
        &mut self.ai_history
    }

    pub fn css_cache_mut(&mut self) -> &mut ThemeCssCache {
        &mut self.css_cache
    }

    /// Saved layouts; an unreadable layout directory shows as empty
    pub fn layout_items(&self) -> Vec<LayoutItem> {
        list_layouts(&self.layouts)
    }

    /// Rebuilds the sidebar tree from the current sessions, folders and
    /// layouts
    pub fn refresh_tree(&mut self) {
        let layouts = self.layout_items();
        self.tree.refresh(
            self.operations.sessions().to_vec(),
            self.operations.folders().to_vec(),
            layouts,
        );
    }

    /// Looks up a saved session by name and folder
    pub fn session(&self, name: &str, folder_path: &str) -> AppStateResult<SessionItem> {
        self.operations
            .find_session_by_name_and_path(name, folder_path)
            .map(|(s, _)| s.clone())
            .ok_or_else(|| AppStateError::SessionNotFound(name.to_string()))
    }

    /// Hands out the queue of settings changes; `None` once taken
    pub fn take_setting_changes(&mut self) -> Option<mpsc::Receiver<(String, Value)>> {
        self.setting_changes.take()
    }

    /// Writes pending settings changes
    pub fn flush_persistence(&self) -> AppStateResult<()> {
        self.settings.save(false)?;
        Ok(())
    }
}

fn queue_setting_changes(settings: &SettingsManager) -> mpsc::Receiver<(String, Value)> {
    let (tx, rx) = mpsc::channel();
    settings.add_change_listener(Arc::new(move |key, _old, new| {
        tx.send((key.to_string(), new.clone()))
            .map_err(|_| "settings change queue closed".to_string())
    }));
    rx
}

/// Emits `SettingsChanged` on the bus for every change made through the
/// settings store, from any caller. Call once after the window is built.
pub fn forward_setting_changes(state: &SharedAppState) {
    let (changes, signals) = {
        let mut state_ref = state.borrow_mut();
        (state_ref.take_setting_changes(), Rc::clone(state_ref.signals()))
    };
    let Some(changes) = changes else {
        tracing::debug!("Settings changes already forwarded");
        return;
    };
    poll_channel(changes, move |(key, value)| {
        signals.emit(&AppEvent::SettingsChanged(key, value));
    });
}

fn list_layouts(store: &LayoutStore) -> Vec<LayoutItem> {
    store.list().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to list layouts");
        Vec::new()
    })
}

/// Shared application state
pub type SharedAppState = Rc<RefCell<AppState>>;

/// Creates the shared application state
pub fn create_shared_state(default_font: &str) -> AppStateResult<SharedAppState> {
    AppState::new(default_font).map(|state| Rc::new(RefCell::new(state)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use zashterminal_core::models::SessionFolder;

    #[test]
    fn loads_from_empty_directory() {
        let dir = tempfile::tempdir().unwrap();
        let state = AppState::with_paths(ConfigPaths::with_root(dir.path()), "Monospace 10").unwrap();
        assert!(state.operations().sessions().is_empty());
        assert!(state.tree().root_nodes().is_empty());
        assert_eq!(state.settings().font(), "Monospace 10");
    }

    #[test]
    fn refresh_picks_up_new_items() {
        let dir = tempfile::tempdir().unwrap();
        let mut state =
            AppState::with_paths(ConfigPaths::with_root(dir.path()), "Monospace 10").unwrap();
        let result = state
            .operations_mut()
            .add_folder(SessionFolder::new("Servers", ""));
        assert!(result.success);
        assert!(state.tree().root_nodes().is_empty());
        state.refresh_tree();
        assert_eq!(state.tree().root_nodes().len(), 1);
        assert!(state.session("missing", "").is_err());
    }

    #[test]
    fn every_settings_write_is_queued_for_the_bus() {
        let dir = tempfile::tempdir().unwrap();
        let mut state =
            AppState::with_paths(ConfigPaths::with_root(dir.path()), "Monospace 10").unwrap();
        state
            .settings()
            .set_no_save("auto_hide_sidebar", Value::Bool(true))
            .unwrap();
        state.settings().set_shortcut("quit", "").unwrap();

        let changes = state.take_setting_changes().unwrap();
        let queued: Vec<(String, Value)> = changes.try_iter().collect();
        assert_eq!(
            queued,
            vec![
                ("auto_hide_sidebar".to_string(), Value::Bool(true)),
                ("shortcuts.quit".to_string(), Value::String(String::new())),
            ]
        );
        assert!(state.take_setting_changes().is_none());
    }
}
