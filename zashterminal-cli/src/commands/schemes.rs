//! Color scheme listing.

use serde::Serialize;

use super::Context;
use crate::cli::OutputFormat;
use crate::error::CliError;
use crate::util::load_settings;

#[derive(Debug, Serialize)]
struct SchemeRow {
    index: usize,
    key: String,
    name: String,
    custom: bool,
    active: bool,
}

/// Lists color schemes in `color_scheme` index order
pub fn cmd_schemes(ctx: &Context, format: OutputFormat) -> Result<(), CliError> {
    let settings = load_settings(&ctx.paths);
    let active = settings.color_scheme_index();
    let rows: Vec<SchemeRow> = settings.with_schemes(|registry| {
        registry
            .scheme_order()
            .into_iter()
            .enumerate()
            .map(|(index, key)| SchemeRow {
                index,
                name: registry.get(&key).map(|s| s.name.clone()).unwrap_or_default(),
                custom: registry.custom().contains_key(&key),
                active: index == active,
                key,
            })
            .collect()
    });

    match format {
        OutputFormat::Table => {
            let width = rows.iter().map(|r| r.key.len()).max().unwrap_or(3).max(3);
            println!("  #   {:<width$}  NAME", "KEY");
            for row in &rows {
                let marker = if row.active { '*' } else { ' ' };
                let custom = if row.custom { " (custom)" } else { "" };
                println!("{marker} {:<3} {:<width$}  {}{custom}", row.index, row.key, row.name);
            }
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&rows)
                .map_err(|e| CliError::Config(format!("Failed to serialize schemes: {e}")))?;
            println!("{json}");
        }
    }
    Ok(())
}
