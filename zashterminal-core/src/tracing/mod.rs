//! Tracing integration for structured logging
//!
//! This module sets up the `tracing` subscriber for Zashterminal. The console
//! filter follows the `console_log_level` setting and can be changed while the
//! application runs; the `log_to_file` setting attaches or detaches a file
//! layer writing `zashterminal.log` and `zashterminal_errors.log` in the log
//! directory.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, OnceLock};
use std::time::{Duration, SystemTime};

use thiserror::Error;
use tracing::Level;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::{Layered, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry, reload};

/// Global flag indicating whether tracing has been initialized
static TRACING_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Global tracing configuration
static TRACING_CONFIG: OnceLock<TracingConfig> = OnceLock::new();

type FileSlot = Option<Box<dyn Layer<Registry> + Send + Sync>>;
type ConsoleSubscriber = Layered<reload::Layer<FileSlot, Registry>, Registry>;

static CONSOLE_FILTER: OnceLock<reload::Handle<EnvFilter, ConsoleSubscriber>> = OnceLock::new();
static FILE_LAYER: OnceLock<reload::Handle<FileSlot, Registry>> = OnceLock::new();

/// Main log file name
pub const LOG_FILE_NAME: &str = "zashterminal.log";
/// Error-only log file name
pub const ERROR_LOG_FILE_NAME: &str = "zashterminal_errors.log";

/// Errors that can occur during tracing initialization
#[derive(Debug, Error)]
pub enum TracingError {
    /// Failed to initialize tracing subscriber
    #[error("Failed to initialize tracing: {0}")]
    InitializationFailed(String),

    /// Tracing already initialized
    #[error("Tracing has already been initialized")]
    AlreadyInitialized,

    /// Failed to create log file
    #[error("Failed to create log file: {0}")]
    FileCreationFailed(String),
}

/// Result type for tracing operations
pub type TracingResult<T> = Result<T, TracingError>;

/// Tracing log level configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TracingLevel {
    /// Error level - only errors
    #[default]
    Error,
    /// Warn level - errors and warnings
    Warn,
    /// Info level - errors, warnings, and info
    Info,
    /// Debug level - all above plus debug messages
    Debug,
    /// Trace level - all messages including trace
    Trace,
}

impl TracingLevel {
    /// Converts to tracing crate's Level
    #[must_use]
    pub const fn to_tracing_level(self) -> Level {
        match self {
            Self::Error => Level::ERROR,
            Self::Warn => Level::WARN,
            Self::Info => Level::INFO,
            Self::Debug => Level::DEBUG,
            Self::Trace => Level::TRACE,
        }
    }

    /// Name used by the `console_log_level` setting
    #[must_use]
    pub const fn setting_name(self) -> &'static str {
        match self {
            Self::Error => "ERROR",
            Self::Warn => "WARNING",
            Self::Info => "INFO",
            Self::Debug | Self::Trace => "DEBUG",
        }
    }
}

impl std::str::FromStr for TracingLevel {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "error" | "critical" => Ok(Self::Error),
            "warn" | "warning" => Ok(Self::Warn),
            "info" => Ok(Self::Info),
            "debug" => Ok(Self::Debug),
            "trace" => Ok(Self::Trace),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for TracingLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warn => write!(f, "warn"),
            Self::Info => write!(f, "info"),
            Self::Debug => write!(f, "debug"),
            Self::Trace => write!(f, "trace"),
        }
    }
}

/// Output destination for console logs
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TracingOutput {
    /// Output to stdout
    Stdout,
    /// Output to stderr
    #[default]
    Stderr,
}

/// Configuration for tracing initialization
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Console log level
    pub level: TracingLevel,
    /// Console output destination
    pub output: TracingOutput,
    /// Directory for log files
    pub log_dir: Option<PathBuf>,
    /// Start with the file layer attached
    pub log_to_file: bool,
    /// Custom filter string (overrides level if set)
    pub filter: Option<String>,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            level: TracingLevel::Error,
            output: TracingOutput::Stderr,
            log_dir: None,
            log_to_file: false,
            filter: None,
        }
    }
}

impl TracingConfig {
    /// Creates a new tracing configuration with default values
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the log level
    #[must_use]
    pub const fn with_level(mut self, level: TracingLevel) -> Self {
        self.level = level;
        self
    }

    /// Sets the output destination
    #[must_use]
    pub fn with_output(mut self, output: TracingOutput) -> Self {
        self.output = output;
        self
    }

    /// Sets the log directory
    #[must_use]
    pub fn with_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = Some(dir.into());
        self
    }

    /// Attaches the file layer at startup
    #[must_use]
    pub const fn with_log_to_file(mut self, enabled: bool) -> Self {
        self.log_to_file = enabled;
        self
    }

    /// Sets a custom filter string
    #[must_use]
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// Configuration for `--debug` runs (debug level, stderr)
    #[must_use]
    pub const fn development() -> Self {
        Self {
            level: TracingLevel::Debug,
            output: TracingOutput::Stderr,
            log_dir: None,
            log_to_file: false,
            filter: None,
        }
    }

    /// Default configuration for the GUI (errors only, stderr)
    #[must_use]
    pub const fn production() -> Self {
        Self {
            level: TracingLevel::Error,
            output: TracingOutput::Stderr,
            log_dir: None,
            log_to_file: false,
            filter: None,
        }
    }
}

fn console_filter(level: TracingLevel) -> EnvFilter {
    EnvFilter::try_new(format!("zashterminal={level},zashterminal_core={level},zashterminal_cli={level}"))
        .unwrap_or_else(|_| EnvFilter::new("error"))
}

/// Initializes the tracing subscriber with the given configuration
///
/// This function should be called once at application startup.
/// Subsequent calls will return an error.
///
/// # Errors
///
/// Returns an error if:
/// - Tracing has already been initialized
/// - The subscriber fails to initialize
pub fn init_tracing(config: &TracingConfig) -> TracingResult<()> {
    if TRACING_INITIALIZED.swap(true, Ordering::SeqCst) {
        return Err(TracingError::AlreadyInitialized);
    }
    let _ = TRACING_CONFIG.set(config.clone());

    let filter = if let Some(ref custom_filter) = config.filter {
        EnvFilter::try_new(custom_filter)
            .map_err(|e| TracingError::InitializationFailed(e.to_string()))?
    } else {
        console_filter(config.level)
    };
    let (filter, filter_handle) = reload::Layer::new(filter);
    let (file_slot, file_handle) = reload::Layer::new(FileSlot::None);

    let console = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_level(true);
    let console = match config.output {
        TracingOutput::Stdout => console.with_writer(std::io::stdout).boxed(),
        TracingOutput::Stderr => console.with_writer(std::io::stderr).boxed(),
    };

    tracing_subscriber::registry()
        .with(file_slot)
        .with(console.with_filter(filter))
        .try_init()
        .map_err(|e| TracingError::InitializationFailed(e.to_string()))?;

    let _ = CONSOLE_FILTER.set(filter_handle);
    let _ = FILE_LAYER.set(file_handle);

    if config.log_to_file {
        set_log_to_file_enabled(true);
    }

    tracing::info!(level = %config.level, "Tracing initialized");
    Ok(())
}

/// Checks if tracing has been initialized
#[must_use]
pub fn is_tracing_initialized() -> bool {
    TRACING_INITIALIZED.load(Ordering::SeqCst)
}

/// Gets the current tracing configuration (if initialized)
#[must_use]
pub fn get_tracing_config() -> Option<&'static TracingConfig> {
    TRACING_CONFIG.get()
}

/// Changes the console level at runtime. Accepts the setting names
/// (`DEBUG`, `INFO`, `WARNING`, `ERROR`, `CRITICAL`); unknown names are
/// ignored. No-op before [`init_tracing`].
pub fn set_console_log_level(level: &str) {
    let Ok(level) = level.parse::<TracingLevel>() else {
        tracing::warn!(level, "Unknown console log level");
        return;
    };
    if let Some(handle) = CONSOLE_FILTER.get()
        && let Err(e) = handle.reload(console_filter(level))
    {
        tracing::warn!(error = %e, "Failed to change console log level");
    }
}

fn open_log(path: &Path) -> TracingResult<std::fs::File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| TracingError::FileCreationFailed(format!("{}: {e}", path.display())))
}

fn build_file_layer(dir: &Path) -> TracingResult<Box<dyn Layer<Registry> + Send + Sync>> {
    std::fs::create_dir_all(dir)
        .map_err(|e| TracingError::FileCreationFailed(format!("{}: {e}", dir.display())))?;
    let main = open_log(&dir.join(LOG_FILE_NAME))?;
    let errors = open_log(&dir.join(ERROR_LOG_FILE_NAME))?;
    let layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_target(true)
        .with_writer(Mutex::new(main))
        .with_filter(LevelFilter::DEBUG)
        .and_then(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_target(true)
                .with_writer(Mutex::new(errors))
                .with_filter(LevelFilter::ERROR),
        );
    Ok(layer.boxed())
}

/// Attaches or detaches the file layer. No-op before [`init_tracing`] or
/// without a configured log directory.
pub fn set_log_to_file_enabled(enabled: bool) {
    let (Some(handle), Some(config)) = (FILE_LAYER.get(), TRACING_CONFIG.get()) else {
        return;
    };
    let Some(dir) = config.log_dir.as_deref() else {
        return;
    };
    let layer = if enabled {
        match build_file_layer(dir) {
            Ok(layer) => Some(layer),
            Err(e) => {
                tracing::error!(error = %e, "Failed to enable file logging");
                return;
            }
        }
    } else {
        None
    };
    if let Err(e) = handle.reload(layer) {
        tracing::warn!(error = %e, "Failed to toggle file logging");
    }
}

/// Removes `*.log*` files older than `days` from `dir`. Returns the number
/// of files removed.
pub fn cleanup_old_logs(dir: &Path, days: u64) -> usize {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return 0;
    };
    let max_age = Duration::from_secs(days * 24 * 60 * 60);
    let now = SystemTime::now();
    let mut removed = 0;
    for entry in entries.flatten() {
        let path = entry.path();
        let is_log = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.contains(".log"));
        if !is_log || !path.is_file() {
            continue;
        }
        let too_old = entry
            .metadata()
            .and_then(|m| m.modified())
            .ok()
            .and_then(|modified| now.duration_since(modified).ok())
            .is_some_and(|age| age > max_age);
        if too_old && std::fs::remove_file(&path).is_ok() {
            removed += 1;
        }
    }
    if removed > 0 {
        tracing::info!(removed, dir = %dir.display(), "Removed old log files");
    }
    removed
}

/// Macro for creating operation spans with standard fields
///
/// # Examples
///
/// ```ignore
/// use zashterminal_core::trace_operation;
///
/// let _span = trace_operation!("sessions.save", item_count = sessions.len());
/// ```
#[macro_export]
macro_rules! trace_operation {
    ($name:expr) => {
        tracing::info_span!($name)
    };
    ($name:expr, $($field:tt)*) => {
        tracing::info_span!($name, $($field)*)
    };
}

/// Standard span names for Zashterminal operations
pub mod span_names {
    /// Settings load span
    pub const SETTINGS_LOAD: &str = "settings.load";
    /// Settings save span
    pub const SETTINGS_SAVE: &str = "settings.save";
    /// Sessions file load span
    pub const SESSIONS_LOAD: &str = "sessions.load";
    /// Sessions file save span
    pub const SESSIONS_SAVE: &str = "sessions.save";
    /// ssh_config import span
    pub const SSH_CONFIG_IMPORT: &str = "sessions.import_ssh_config";
    /// Layout restore span
    pub const LAYOUT_RESTORE: &str = "layout.restore";
    /// AI request span
    pub const AI_REQUEST: &str = "ai.request";
    /// Backup span
    pub const BACKUP: &str = "backup";
}

/// Standard field names for tracing spans
pub mod field_names {
    /// Session name field
    pub const SESSION: &str = "session";
    /// Folder path field
    pub const FOLDER: &str = "folder";
    /// Host field
    pub const HOST: &str = "host";
    /// Item count field
    pub const ITEM_COUNT: &str = "item_count";
    /// AI provider field
    pub const PROVIDER: &str = "provider";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracing_level_from_str() {
        assert_eq!("error".parse::<TracingLevel>(), Ok(TracingLevel::Error));
        assert_eq!("CRITICAL".parse::<TracingLevel>(), Ok(TracingLevel::Error));
        assert_eq!("WARNING".parse::<TracingLevel>(), Ok(TracingLevel::Warn));
        assert_eq!("Info".parse::<TracingLevel>(), Ok(TracingLevel::Info));
        assert_eq!("debug".parse::<TracingLevel>(), Ok(TracingLevel::Debug));
        assert!("invalid".parse::<TracingLevel>().is_err());
    }

    #[test]
    fn test_setting_names_round_trip() {
        for level in [
            TracingLevel::Error,
            TracingLevel::Warn,
            TracingLevel::Info,
            TracingLevel::Debug,
        ] {
            assert_eq!(level.setting_name().parse::<TracingLevel>(), Ok(level));
        }
    }

    #[test]
    fn test_tracing_config_builder() {
        let config = TracingConfig::new()
            .with_level(TracingLevel::Debug)
            .with_output(TracingOutput::Stdout)
            .with_log_dir("/tmp/logs")
            .with_log_to_file(true)
            .with_filter("zashterminal=debug");

        assert_eq!(config.level, TracingLevel::Debug);
        assert_eq!(config.output, TracingOutput::Stdout);
        assert_eq!(config.log_dir, Some(PathBuf::from("/tmp/logs")));
        assert!(config.log_to_file);
        assert_eq!(config.filter.as_deref(), Some("zashterminal=debug"));
    }

    #[test]
    fn test_production_config() {
        let config = TracingConfig::production();
        assert_eq!(config.level, TracingLevel::Error);
        assert_eq!(config.output, TracingOutput::Stderr);
    }

    #[test]
    fn test_cleanup_keeps_recent_logs() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join(LOG_FILE_NAME), "x").expect("write");
        std::fs::write(dir.path().join("notes.txt"), "x").expect("write");
        assert_eq!(cleanup_old_logs(dir.path(), 7), 0);
        assert!(dir.path().join(LOG_FILE_NAME).exists());
        assert_eq!(cleanup_old_logs(&dir.path().join("missing"), 7), 0);
    }

    #[test]
    fn test_level_setters_are_noops_before_init() {
        set_console_log_level("DEBUG");
        set_console_log_level("bogus");
        set_log_to_file_enabled(true);
    }
}
