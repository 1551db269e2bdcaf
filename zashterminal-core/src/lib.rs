//! `Zashterminal` Core Library
//!
//! This crate holds everything in the `Zashterminal` terminal emulator that
//! does not need a widget toolkit: settings, color schemes, saved SSH and
//! local sessions, the split-pane and tab models, layouts, output
//! highlighting and the AI assistant backend.
//!
//! # Crate Structure
//!
//! - [`config`] - Paths, default settings, validation and the settings store
//! - [`theme`] - Color schemes, palette helpers and generated CSS
//! - [`models`] / [`sessions`] - Saved sessions, folders, storage and the sidebar tree
//! - [`split`] / [`layout`] - Pane trees, tabs, saved layouts and session restore
//! - [`highlights`] - Regex output coloring with per-command contexts
//! - [`ai`] - Provider requests, reply parsing and chat history
//! - [`launch`] / [`ssh_config`] / [`osc7`] - Command line, SSH and cwd tracking helpers
//! - [`secret`] / [`backup`] - Password storage and configuration backups
//! - [`signals`] - Application event bus

// Enable missing_docs warning for public API documentation
#![warn(missing_docs)]
#![recursion_limit = "256"]

pub mod ai;
pub mod backup;
pub mod config;
pub mod drag_drop;
pub mod error;
pub mod helpers;
pub mod highlights;
pub mod launch;
pub mod layout;
pub mod models;
pub mod osc7;
pub mod secret;
pub mod sessions;
pub mod signals;
pub mod split;
pub mod ssh_config;
pub mod theme;
pub mod tracing;

// =============================================================================
// Convenience re-exports
//
// The GUI and CLI crates mostly import through module paths; the flat names
// below cover the types nearly every caller touches.
// =============================================================================

pub use config::{APP_DIR_NAME, ConfigPaths, SettingsManager};
pub use error::{
    AiError, BackupError, ConfigError, HighlightError, LaunchError, LayoutError, SecretError,
    StorageError,
};
pub use highlights::{HighlightManager, OutputHighlighter};
pub use layout::{LayoutStore, SessionStateFile};
pub use models::{SessionFolder, SessionItem, SessionType};
pub use sessions::{SessionOperations, SessionStorage, SessionTree};
pub use signals::{AppEvent, SignalBus};
pub use split::{PaneTree, TabManagerModel};
pub use theme::{ColorScheme, SchemeRegistry};
pub use tracing::{TracingConfig, init_tracing};
