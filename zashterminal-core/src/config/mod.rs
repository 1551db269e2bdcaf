//! Application configuration: paths, defaults, validation and the settings store

pub mod defaults;
pub mod keybindings;
mod paths;
mod settings;
pub mod validator;

pub use defaults::{AppConstants, default_settings, default_shortcuts};
pub use keybindings::{KeybindingCategory, KeybindingDef, default_keybindings};
pub use paths::{
    APP_DIR_NAME, ConfigPaths, atomic_write, expand_home, home_dir, secure_file_permissions,
};
pub use settings::{
    ChangeListener, ListenerId, SettingsManager, SettingsMetadata, settings_checksum,
};
