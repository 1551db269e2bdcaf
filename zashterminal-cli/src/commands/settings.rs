//! Settings commands.

use zashterminal_core::config::SettingsManager;

use super::Context;
use crate::cli::SettingsCommands;
use crate::error::CliError;
use crate::util::{load_settings, parse_setting_value};

/// Settings command handler
pub fn cmd_settings(ctx: &Context, subcmd: SettingsCommands) -> Result<(), CliError> {
    let settings = load_settings(&ctx.paths);
    match subcmd {
        SettingsCommands::Get { key } => {
            let value = settings
                .get(&key)
                .ok_or_else(|| CliError::Config(format!("Unknown setting: {key}")))?;
            let text = serde_json::to_string_pretty(&value)
                .map_err(|e| CliError::Config(e.to_string()))?;
            println!("{text}");
            Ok(())
        }
        SettingsCommands::Set { key, value } => set_setting(&settings, &key, &value, ctx.quiet),
        SettingsCommands::Reset { keys } => {
            if keys.is_empty() {
                settings.reset_to_defaults(None)?;
            } else {
                let keys: Vec<&str> = keys.iter().map(String::as_str).collect();
                settings.reset_to_defaults(Some(&keys))?;
            }
            if !ctx.quiet {
                println!("Settings reset to defaults.");
            }
            Ok(())
        }
    }
}

fn set_setting(
    settings: &SettingsManager,
    key: &str,
    raw: &str,
    quiet: bool,
) -> Result<(), CliError> {
    if settings.default_value(key).is_none() && settings.get(key).is_none() {
        return Err(CliError::Config(format!("Unknown setting: {key}")));
    }
    let value = parse_setting_value(raw);
    settings.set_no_save(key, value.clone())?;
    settings.save(true)?;
    if !quiet {
        println!("{key} = {value}");
    }
    Ok(())
}
