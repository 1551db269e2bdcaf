//! Command handler modules for the CLI.

mod backup;
mod completions;
mod folder;
mod highlight;
mod layouts;
mod manpage;
mod nautilus;
mod schemes;
mod sessions;
mod settings;

use zashterminal_core::config::ConfigPaths;

use crate::cli::Commands;
use crate::error::CliError;

/// Options shared by every command
pub struct Context {
    /// Configuration location
    pub paths: ConfigPaths,
    /// Print only data and errors
    pub quiet: bool,
}

/// Dispatch a CLI command to the appropriate handler.
pub fn dispatch(ctx: &Context, command: Commands) -> Result<(), CliError> {
    match command {
        Commands::Sessions(subcmd) => sessions::cmd_sessions(ctx, subcmd),
        Commands::Folder(subcmd) => folder::cmd_folder(ctx, subcmd),
        Commands::Layouts(subcmd) => layouts::cmd_layouts(ctx, subcmd),
        Commands::Settings(subcmd) => settings::cmd_settings(ctx, subcmd),
        Commands::Schemes { format } => schemes::cmd_schemes(ctx, format),
        Commands::NautilusArgs { uri, local_path } => {
            nautilus::cmd_nautilus_args(&uri, local_path.as_deref())
        }
        Commands::Backup(subcmd) => backup::cmd_backup(ctx, subcmd),
        Commands::Highlight { command, ssh } => {
            highlight::cmd_highlight(ctx, command.as_deref(), ssh)
        }
        Commands::Completions { shell } => completions::cmd_completions(shell),
        Commands::Man => manpage::cmd_manpage(),
    }
}
