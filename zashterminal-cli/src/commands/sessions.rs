//! Session commands: list, show, add, remove and ssh_config import.

use std::fmt::Write as _;
use std::path::Path;

use serde::Serialize;
use zashterminal_core::models::{AuthType, SessionItem, SessionType, normalize_folder_path};

use super::Context;
use crate::cli::{OutputFormat, SessionCommands};
use crate::error::CliError;
use crate::util::{display_path, finish, find_session, load_operations};

/// Session command handler
pub fn cmd_sessions(ctx: &Context, subcmd: SessionCommands) -> Result<(), CliError> {
    match subcmd {
        SessionCommands::List { format, folder } => cmd_list(ctx, format, folder.as_deref()),
        SessionCommands::Show { name, folder } => cmd_show(ctx, &name, folder.as_deref()),
        SessionCommands::Add {
            name,
            host,
            user,
            port,
            folder,
            key,
        } => {
            let mut session = SessionItem::ssh(&name, &host, user.as_deref().unwrap_or(""), port);
            if let Some(key) = key {
                session.auth_type = AuthType::Key;
                session.auth_value = key.to_string_lossy().into_owned();
            }
            cmd_add(ctx, session, folder.as_deref())
        }
        SessionCommands::AddLocal {
            name,
            directory,
            command,
            folder,
        } => {
            let mut session = SessionItem::local(&name);
            if let Some(dir) = directory {
                session.local_working_directory = dir.to_string_lossy().into_owned();
            }
            session.local_startup_command = command.unwrap_or_default();
            cmd_add(ctx, session, folder.as_deref())
        }
        SessionCommands::Remove { name, folder } => cmd_remove(ctx, &name, folder.as_deref()),
        SessionCommands::ImportSshConfig { path } => cmd_import(ctx, path.as_deref()),
    }
}

/// Row of `sessions list --format json`
#[derive(Debug, Serialize)]
struct SessionRow<'a> {
    name: &'a str,
    folder: &'a str,
    #[serde(rename = "type")]
    session_type: SessionType,
    host: &'a str,
    user: &'a str,
    port: u16,
}

impl<'a> From<&'a SessionItem> for SessionRow<'a> {
    fn from(session: &'a SessionItem) -> Self {
        Self {
            name: &session.name,
            folder: &session.folder_path,
            session_type: session.session_type,
            host: &session.host,
            user: &session.user,
            port: session.port,
        }
    }
}

fn cmd_list(ctx: &Context, format: OutputFormat, folder: Option<&str>) -> Result<(), CliError> {
    let operations = load_operations(&ctx.paths)?;
    let folder = folder.map(normalize_folder_path);
    let mut sessions: Vec<&SessionItem> = operations
        .sessions()
        .iter()
        .filter(|s| folder.as_deref().is_none_or(|f| s.folder_path == f))
        .collect();
    sessions.sort_by(|a, b| {
        a.folder_path
            .cmp(&b.folder_path)
            .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
    });

    match format {
        OutputFormat::Table => println!("{}", format_table(&sessions)),
        OutputFormat::Json => {
            let rows: Vec<SessionRow<'_>> = sessions.iter().map(|s| SessionRow::from(*s)).collect();
            let json = serde_json::to_string_pretty(&rows)
                .map_err(|e| CliError::Config(format!("Failed to serialize sessions: {e}")))?;
            println!("{json}");
        }
    }
    Ok(())
}

fn target(session: &SessionItem) -> String {
    match session.session_type {
        SessionType::Local if session.local_working_directory.is_empty() => "-".to_string(),
        SessionType::Local => session.local_working_directory.clone(),
        SessionType::Ssh if session.port == 22 => session.connection_string(),
        SessionType::Ssh => format!("{}:{}", session.connection_string(), session.port),
    }
}

/// Formats sessions as an aligned table
#[must_use]
pub fn format_table(sessions: &[&SessionItem]) -> String {
    if sessions.is_empty() {
        return "No sessions found.".to_string();
    }

    let name_width = sessions.iter().map(|s| s.name.len()).max().unwrap_or(4).max(4);
    let folder_width = sessions
        .iter()
        .map(|s| s.folder_path.len().max(1))
        .max()
        .unwrap_or(6)
        .max(6);
    let type_width = 5;

    let mut output = String::new();
    let _ = writeln!(
        output,
        "{:<name_width$}  {:<folder_width$}  {:<type_width$}  TARGET",
        "NAME", "FOLDER", "TYPE"
    );
    let _ = writeln!(
        output,
        "{:-<name_width$}  {:-<folder_width$}  {:-<type_width$}  {:-<20}",
        "", "", "", ""
    );
    for session in sessions {
        let folder = if session.folder_path.is_empty() {
            "/"
        } else {
            &session.folder_path
        };
        let _ = writeln!(
            output,
            "{:<name_width$}  {:<folder_width$}  {:<type_width$}  {}",
            session.name,
            folder,
            session.session_type.as_str(),
            target(session)
        );
    }
    output.trim_end().to_string()
}

fn cmd_show(ctx: &Context, name: &str, folder: Option<&str>) -> Result<(), CliError> {
    let operations = load_operations(&ctx.paths)?;
    let session = find_session(operations.sessions(), name, folder)?;
    println!("{}", format_details(session));
    Ok(())
}

fn yes_no(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}

/// Multi-line description used by `sessions show`
#[must_use]
pub fn format_details(session: &SessionItem) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Session Details:");
    let _ = writeln!(out, "  Name:     {}", session.name);
    let _ = writeln!(out, "  Path:     {}", display_path(session));
    let _ = writeln!(out, "  Type:     {}", session.session_type.as_str());

    if session.is_local() {
        if !session.local_working_directory.is_empty() {
            let _ = writeln!(out, "  Directory: {}", session.local_working_directory);
        }
        if !session.local_startup_command.is_empty() {
            let _ = writeln!(out, "  Startup:  {}", session.local_startup_command);
        }
    } else {
        let _ = writeln!(out, "  Host:     {}", session.host);
        let _ = writeln!(out, "  Port:     {}", session.port);
        if !session.user.is_empty() {
            let _ = writeln!(out, "  User:     {}", session.user);
        }
        let auth = match session.auth_type {
            AuthType::Key => "key",
            AuthType::Password => "password",
            AuthType::None => "ssh default",
        };
        let _ = writeln!(out, "  Auth:     {auth}");
        if session.uses_key_auth() && !session.auth_value.is_empty() {
            let _ = writeln!(out, "  Key:      {}", session.auth_value);
        }
        if session.x11_forwarding {
            let _ = writeln!(out, "  X11:      yes");
        }
        if session.post_login_command_enabled {
            let _ = writeln!(out, "  Post-login: {}", session.post_login_command);
        }
        for tunnel in &session.port_forwardings {
            let _ = writeln!(out, "  Tunnel:   {} (-L {})", tunnel.name, tunnel.ssh_spec());
        }
        if session.sftp_session_enabled {
            let _ = writeln!(out, "  SFTP:     yes");
        }
    }

    if let Some(color) = &session.tab_color {
        let _ = writeln!(out, "  Tab color: {color}");
    }
    if let Some(enabled) = session.output_highlighting {
        let _ = writeln!(out, "  Highlighting: {}", yes_no(enabled));
    }
    out.trim_end().to_string()
}

fn cmd_add(ctx: &Context, mut session: SessionItem, folder: Option<&str>) -> Result<(), CliError> {
    if let Some(folder) = folder {
        session.set_folder_path(folder);
    }
    let mut operations = load_operations(&ctx.paths)?;
    let result = operations.add_session(session);
    finish(&result, ctx.quiet)
}

fn cmd_remove(ctx: &Context, name: &str, folder: Option<&str>) -> Result<(), CliError> {
    let mut operations = load_operations(&ctx.paths)?;
    let session = find_session(operations.sessions(), name, folder)?.clone();
    let result = operations.remove_session(&session);
    finish(&result, ctx.quiet)
}

fn cmd_import(ctx: &Context, path: Option<&Path>) -> Result<(), CliError> {
    let mut operations = load_operations(&ctx.paths)?;
    let result = operations.import_sessions_from_ssh_config(path);
    for warning in &result.warnings {
        eprintln!("Warning: {warning}");
    }
    finish(&result, ctx.quiet)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_table() {
        assert_eq!(format_table(&[]), "No sessions found.");
    }

    #[test]
    fn table_shows_targets() {
        let web = SessionItem::ssh("web", "web.example.com", "deploy", 2222);
        let mut shell = SessionItem::local("shell");
        shell.folder_path = "/Dev".to_string();
        shell.local_working_directory = "~/src".to_string();

        let table = format_table(&[&web, &shell]);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("NAME"));
        assert!(lines[2].contains("deploy@web.example.com:2222"));
        assert!(lines[2].contains("ssh"));
        assert!(lines[3].contains("/Dev"));
        assert!(lines[3].contains("~/src"));
    }

    #[test]
    fn details_hide_password_auth_value() {
        let mut session = SessionItem::ssh("db", "db.internal", "admin", 22);
        session.auth_type = AuthType::Password;
        session.auth_value = "hunter2".to_string();

        let details = format_details(&session);
        assert!(details.contains("Auth:     password"));
        assert!(!details.contains("hunter2"));
    }

    #[test]
    fn json_rows_use_type_field() {
        let session = SessionItem::local("shell");
        let row = serde_json::to_value(SessionRow::from(&session)).unwrap();
        assert_eq!(row["type"], "local");
        assert_eq!(row["folder"], "");
    }
}
