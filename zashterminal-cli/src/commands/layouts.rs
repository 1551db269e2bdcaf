//! Saved layout commands.

use zashterminal_core::layout::LayoutStore;
use zashterminal_core::models::LayoutItem;

use super::Context;
use crate::cli::{LayoutCommands, OutputFormat};
use crate::error::CliError;

/// Layout command handler
pub fn cmd_layouts(ctx: &Context, subcmd: LayoutCommands) -> Result<(), CliError> {
    let store = LayoutStore::new(ctx.paths.layout_dir());
    match subcmd {
        LayoutCommands::List { format } => {
            let layouts = store.list()?;
            match format {
                OutputFormat::Table => println!("{}", format_layouts(&layouts)),
                OutputFormat::Json => {
                    let json = serde_json::to_string_pretty(&layouts).map_err(|e| {
                        CliError::Layout(format!("Failed to serialize layouts: {e}"))
                    })?;
                    println!("{json}");
                }
            }
            Ok(())
        }
        LayoutCommands::Delete { name } => {
            store.delete(&name)?;
            if !ctx.quiet {
                println!("Layout '{name}' deleted.");
            }
            Ok(())
        }
    }
}

fn format_layouts(layouts: &[LayoutItem]) -> String {
    if layouts.is_empty() {
        return "No saved layouts.".to_string();
    }
    let width = layouts.iter().map(|l| l.name.len()).max().unwrap_or(4).max(4);
    let mut lines = vec![
        format!("{:<width$}  FOLDER", "NAME"),
        format!("{:-<width$}  {:-<10}", "", ""),
    ];
    for layout in layouts {
        let folder = if layout.folder_path.is_empty() {
            "/"
        } else {
            &layout.folder_path
        };
        lines.push(format!("{:<width$}  {folder}", layout.name));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layouts_table() {
        let layouts = vec![LayoutItem::new("dev", ""), LayoutItem::new("monitoring", "/Ops")];
        let table = format_layouts(&layouts);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[2].starts_with("dev "));
        assert!(lines[2].ends_with('/'));
        assert!(lines[3].ends_with("/Ops"));
    }
}
