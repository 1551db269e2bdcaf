//! Backup commands.

use zashterminal_core::backup::{create_backup, restore_backup};

use super::Context;
use crate::cli::BackupCommands;
use crate::error::CliError;

/// Backup command handler
pub fn cmd_backup(ctx: &Context, subcmd: BackupCommands) -> Result<(), CliError> {
    match subcmd {
        BackupCommands::Create { file } => {
            let report = create_backup(&ctx.paths, &file)?;
            if !ctx.quiet {
                println!("Backup written to {} ({} files)", file.display(), report.files.len());
            }
        }
        BackupCommands::Restore { file } => {
            if !file.is_file() {
                return Err(CliError::Backup(format!("{} does not exist", file.display())));
            }
            let report = restore_backup(&ctx.paths, &file)?;
            if !ctx.quiet {
                for name in &report.files {
                    println!("restored {name}");
                }
                println!("Restored {} files from {}", report.files.len(), file.display());
            }
        }
    }
    Ok(())
}
