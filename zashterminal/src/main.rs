//! `Zashterminal` - GTK4 terminal emulator
//!
//! A VTE based terminal with split panes, saved SSH and local sessions
//! organized in folders, saved layouts, output highlighting and an AI
//! command assistant.
//!
//! # GTK Widget Lifecycle Pattern
//!
//! Signal handlers throughout this crate capture `Weak` references to the
//! `Rc` wrappers (`MainWindow`, `TabManager`, `Sidebar`) so that closing a
//! window drops it. Widgets themselves are reference counted by GTK and are
//! cloned into closures freely.
//!
//! # Startup
//!
//! The command line is parsed before GTK starts so `--help`, `--version`
//! and invalid options never reach a running instance. Valid invocations
//! are forwarded by `GApplication` to the primary instance, which decides
//! between a new tab and a new window.

#![allow(clippy::too_many_lines)] // GUI setup functions are inherently long
#![allow(clippy::type_complexity)] // GTK callback types are complex by design
#![allow(clippy::significant_drop_tightening)] // GTK widget drops are managed by GTK
#![allow(clippy::missing_errors_doc)] // Internal GUI functions don't need error docs
#![allow(clippy::missing_panics_doc)] // Internal GUI functions don't need panic docs

mod ai_panel;
mod app;
pub mod async_utils;
pub mod dialogs;
pub mod error;
mod sidebar;
mod state;
mod terminal;
mod theming;
pub mod toast;
mod window;

use zashterminal_core::config::{AppConstants, ConfigPaths, SettingsManager};
use zashterminal_core::launch::{LaunchRequest, USAGE};
use zashterminal_core::tracing::{TracingConfig, TracingLevel, cleanup_old_logs, init_tracing};

/// Log files older than this are removed at startup
const LOG_RETENTION_DAYS: u64 = 7;

/// Handles `--help`, `--version` and invalid options locally
fn check_command_line() {
    match LaunchRequest::parse(std::env::args().skip(1)) {
        Ok(request) if request.help => {
            println!("{USAGE}");
            std::process::exit(0);
        }
        Ok(request) if request.version => {
            println!("{} {}", AppConstants::APP_TITLE, AppConstants::APP_VERSION);
            std::process::exit(0);
        }
        Ok(_) => {}
        Err(e) => {
            eprintln!("zashterminal: {e}\n\n{USAGE}");
            std::process::exit(2);
        }
    }
}

/// Starts logging with the level and file logging chosen in settings.
/// `RUST_LOG` overrides the level.
fn init_logging() {
    let paths = ConfigPaths::from_environment();
    let settings = SettingsManager::load(&paths);
    let level = settings
        .get_string("console_log_level", "ERROR")
        .parse::<TracingLevel>()
        .unwrap_or_default();

    let mut config = TracingConfig::new()
        .with_level(level)
        .with_log_dir(paths.log_dir())
        .with_log_to_file(settings.get_bool("log_to_file", false));
    if let Ok(filter) = std::env::var("RUST_LOG") {
        config = config.with_filter(filter);
    }
    if let Err(e) = init_tracing(&config) {
        eprintln!("zashterminal: logging disabled: {e}");
        return;
    }

    let removed = cleanup_old_logs(&paths.log_dir(), LOG_RETENTION_DAYS);
    if removed > 0 {
        tracing::info!(removed, "Old log files removed");
    }
}

fn main() -> gtk4::glib::ExitCode {
    check_command_line();
    init_logging();

    // Note: Runtime creation failure at startup is unrecoverable
    let runtime = tokio::runtime::Runtime::new().expect("tokio runtime required for async ops");
    let _guard = runtime.enter();

    app::run()
}
