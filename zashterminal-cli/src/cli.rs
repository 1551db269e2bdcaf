//! CLI argument parsing types using `clap`.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

/// Manage Zashterminal sessions, settings and backups from the shell
#[derive(Parser)]
#[command(name = "zashterminal-cli")]
#[command(author, version, about = "Zashterminal command-line interface")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Configuration directory (defaults to ~/.config/zashterminal)
    #[arg(long, global = true, env = "ZASHTERMINAL_CONFIG_DIR", value_name = "DIR")]
    pub config_dir: Option<PathBuf>,

    /// Increase log output on stderr (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Saved sessions
    #[command(subcommand, about = "List, add and remove saved sessions")]
    Sessions(SessionCommands),

    /// Session folders
    #[command(subcommand, about = "Create and remove session folders")]
    Folder(FolderCommands),

    /// Saved layouts
    #[command(subcommand, about = "List and delete saved layouts")]
    Layouts(LayoutCommands),

    /// Application settings
    #[command(subcommand, about = "Read and change settings")]
    Settings(SettingsCommands),

    /// List the available color schemes
    #[command(about = "List built-in and custom color schemes")]
    Schemes {
        /// Output format
        #[arg(short, long, default_value = "table", value_enum)]
        format: OutputFormat,
    },

    /// Translate a file manager URI into launch arguments
    #[command(about = "Print zashterminal arguments for a file manager location")]
    NautilusArgs {
        /// Selected location (sftp://, ssh:// or file://)
        uri: String,

        /// Local path of the location (GVFS mount point for remote folders)
        #[arg(long, value_name = "PATH")]
        local_path: Option<PathBuf>,
    },

    /// Configuration backups
    #[command(subcommand, about = "Create and restore configuration backups")]
    Backup(BackupCommands),

    /// Highlight standard input with the output highlighting rules
    #[command(about = "Filter stdin through the output highlighter")]
    Highlight {
        /// Command whose highlighting context should be used
        #[arg(short, long)]
        command: Option<String>,

        /// Apply the SSH terminal setting instead of the local one
        #[arg(long)]
        ssh: bool,
    },

    /// Generate shell completions
    #[command(about = "Generate shell completion scripts")]
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },

    /// Generate a man page
    #[command(about = "Generate a man page (roff format) to stdout")]
    Man,
}

/// Output format for listings
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Aligned columns
    #[default]
    Table,
    /// JSON array
    Json,
}

/// Session subcommands
#[derive(Subcommand)]
pub enum SessionCommands {
    /// List saved sessions
    #[command(about = "List saved sessions")]
    List {
        /// Output format
        #[arg(short, long, default_value = "table", value_enum)]
        format: OutputFormat,

        /// Only sessions in this folder (e.g. /Work)
        #[arg(long)]
        folder: Option<String>,
    },

    /// Show session details
    #[command(about = "Show the details of a session")]
    Show {
        /// Session name
        name: String,

        /// Folder containing the session
        #[arg(long)]
        folder: Option<String>,
    },

    /// Add an SSH session
    #[command(about = "Add an SSH session")]
    Add {
        /// Session name
        #[arg(short, long)]
        name: String,

        /// Host name or address
        #[arg(short = 'H', long)]
        host: String,

        /// Remote user
        #[arg(short, long)]
        user: Option<String>,

        /// SSH port
        #[arg(short, long, default_value_t = 22)]
        port: u16,

        /// Folder to place the session in
        #[arg(long)]
        folder: Option<String>,

        /// Identity file for key authentication
        #[arg(short, long)]
        key: Option<PathBuf>,
    },

    /// Add a local shell session
    #[command(about = "Add a local shell session")]
    AddLocal {
        /// Session name
        #[arg(short, long)]
        name: String,

        /// Starting directory
        #[arg(short = 'd', long)]
        directory: Option<PathBuf>,

        /// Command to run after the shell starts
        #[arg(short = 'c', long)]
        command: Option<String>,

        /// Folder to place the session in
        #[arg(long)]
        folder: Option<String>,
    },

    /// Remove a session
    #[command(about = "Remove a saved session")]
    Remove {
        /// Session name
        name: String,

        /// Folder containing the session
        #[arg(long)]
        folder: Option<String>,
    },

    /// Import hosts from an OpenSSH config file
    #[command(about = "Import Host entries from ~/.ssh/config or another file")]
    ImportSshConfig {
        /// ssh_config file to read
        path: Option<PathBuf>,
    },
}

/// Folder subcommands
#[derive(Subcommand)]
pub enum FolderCommands {
    /// Create a folder, including missing parents
    #[command(about = "Create a folder such as /Work/Servers")]
    Add {
        /// Folder path
        path: String,
    },

    /// Remove a folder
    #[command(about = "Remove a folder")]
    Remove {
        /// Folder path
        path: String,

        /// Also remove the sessions and folders inside it
        #[arg(short, long)]
        force: bool,
    },
}

/// Layout subcommands
#[derive(Subcommand)]
pub enum LayoutCommands {
    /// List saved layouts
    #[command(about = "List saved layouts")]
    List {
        /// Output format
        #[arg(short, long, default_value = "table", value_enum)]
        format: OutputFormat,
    },

    /// Delete a saved layout
    #[command(about = "Delete a saved layout")]
    Delete {
        /// Layout name
        name: String,
    },
}

/// Settings subcommands
#[derive(Subcommand)]
pub enum SettingsCommands {
    /// Print a setting as JSON
    #[command(about = "Print the value of a setting")]
    Get {
        /// Setting key, dotted for nested values (e.g. shortcuts.copy)
        key: String,
    },

    /// Change a setting
    #[command(about = "Set a setting to a JSON value")]
    Set {
        /// Setting key
        key: String,

        /// New value as JSON; bare words are taken as strings
        value: String,
    },

    /// Reset settings to their defaults
    #[command(about = "Reset the given settings, or all of them")]
    Reset {
        /// Keys to reset; resets everything when empty
        keys: Vec<String>,
    },
}

/// Backup subcommands
#[derive(Subcommand)]
pub enum BackupCommands {
    /// Write a backup archive
    #[command(about = "Archive sessions, settings, schemes, layouts and highlight rules")]
    Create {
        /// Target .zip file
        file: PathBuf,
    },

    /// Restore a backup archive
    #[command(about = "Replace the configuration with a backup archive")]
    Restore {
        /// Source .zip file
        file: PathBuf,
    },
}
