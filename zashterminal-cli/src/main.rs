//! `Zashterminal` CLI - Command-line interface for the `Zashterminal` terminal
//!
//! Manages saved sessions, folders, layouts, settings and backups without
//! starting the GUI, translates file manager locations into launch
//! arguments, and runs text through the output highlighter.

mod cli;
mod commands;
mod error;
mod util;

use clap::Parser;
use cli::Cli;
use zashterminal_core::tracing::{TracingConfig, TracingLevel, init_tracing};

/// Maps `-v` occurrences to a log level; logs always go to stderr
const fn verbosity_level(verbose: u8) -> TracingLevel {
    match verbose {
        0 => TracingLevel::Error,
        1 => TracingLevel::Info,
        2 => TracingLevel::Debug,
        _ => TracingLevel::Trace,
    }
}

fn main() {
    let cli = Cli::parse();

    if !cli.quiet {
        let config = TracingConfig::new().with_level(verbosity_level(cli.verbose));
        if let Err(e) = init_tracing(&config) {
            eprintln!("Warning: logging disabled: {e}");
        }
    }

    let context = commands::Context {
        paths: util::config_paths(cli.config_dir.as_deref()),
        quiet: cli.quiet,
    };
    let result = commands::dispatch(&context, cli.command);

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(e.exit_code());
    }
}
