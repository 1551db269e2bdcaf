//! Folder management commands.

use zashterminal_core::models::{SessionFolder, normalize_folder_path};

use super::Context;
use crate::cli::FolderCommands;
use crate::error::CliError;
use crate::util::{finish, load_operations};

/// Folder command handler
pub fn cmd_folder(ctx: &Context, subcmd: FolderCommands) -> Result<(), CliError> {
    match subcmd {
        FolderCommands::Add { path } => cmd_folder_add(ctx, &path),
        FolderCommands::Remove { path, force } => cmd_folder_remove(ctx, &path, force),
    }
}

/// `(name, parent_path)` for every level of `path`, outermost first
fn folder_chain(path: &str) -> Vec<(String, String)> {
    let mut chain = Vec::new();
    let mut parent = String::new();
    for name in path.split('/').filter(|part| !part.trim().is_empty()) {
        let folder = SessionFolder::new(name, &parent);
        parent.clone_from(&folder.path);
        chain.push((folder.name, folder.parent_path));
    }
    chain
}

fn cmd_folder_add(ctx: &Context, path: &str) -> Result<(), CliError> {
    let chain = folder_chain(&normalize_folder_path(path));
    if chain.is_empty() {
        return Err(CliError::Config("Folder path cannot be empty".to_string()));
    }

    let mut operations = load_operations(&ctx.paths)?;
    let last = chain.len() - 1;
    for (index, (name, parent)) in chain.into_iter().enumerate() {
        let folder = SessionFolder::new(&name, &parent);
        let exists = operations.find_folder_by_path(&folder.path).is_some();
        if exists && index < last {
            continue;
        }
        let result = operations.add_folder(folder);
        finish(&result, ctx.quiet)?;
    }
    Ok(())
}

fn cmd_folder_remove(ctx: &Context, path: &str, force: bool) -> Result<(), CliError> {
    let path = normalize_folder_path(path);
    let mut operations = load_operations(&ctx.paths)?;
    let folder = operations
        .find_folder_by_path(&path)
        .map(|(folder, _)| folder.clone())
        .ok_or_else(|| CliError::FolderNotFound(path.clone()))?;
    let has_children = operations.sessions().iter().any(|s| folder.contains_path(&s.folder_path))
        || operations.folders().iter().any(|f| f.parent_path == folder.path);
    if has_children && !force {
        return Err(CliError::Session(format!(
            "Folder '{}' is not empty. Use --force to remove its contents.",
            folder.path
        )));
    }
    let result = operations.remove_folder(&folder, force);
    finish(&result, ctx.quiet)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_lists_every_level() {
        let chain = folder_chain("/Work/Servers/EU");
        assert_eq!(
            chain,
            vec![
                ("Work".to_string(), String::new()),
                ("Servers".to_string(), "/Work".to_string()),
                ("EU".to_string(), "/Work/Servers".to_string()),
            ]
        );
    }

    #[test]
    fn root_has_no_chain() {
        assert!(folder_chain("").is_empty());
        assert!(folder_chain("/").is_empty());
    }
}
