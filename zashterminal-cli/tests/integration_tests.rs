//! Integration tests for zashterminal-cli
//!
//! Every test runs the binary against its own temporary configuration
//! directory through `ZASHTERMINAL_CONFIG_DIR`.

use std::io::Write;
use std::path::Path;
use std::process::{Command, Output, Stdio};

use tempfile::TempDir;

/// Helper to run the CLI with given arguments
fn run_cli(args: &[&str], config_dir: &Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_zashterminal-cli"))
        .env("ZASHTERMINAL_CONFIG_DIR", config_dir)
        .args(args)
        .output()
        .expect("Failed to execute CLI")
}

/// Helper to run the CLI with `input` on stdin
fn run_cli_with_input(args: &[&str], config_dir: &Path, input: &str) -> Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_zashterminal-cli"))
        .env("ZASHTERMINAL_CONFIG_DIR", config_dir)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to spawn CLI");
    child
        .stdin
        .take()
        .expect("stdin is piped")
        .write_all(input.as_bytes())
        .expect("Failed to write stdin");
    child.wait_with_output().expect("Failed to wait for CLI")
}

fn stdout_str(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn stderr_str(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

fn strip_ansi(text: &str) -> String {
    let mut out = String::new();
    let mut in_escape = false;
    for c in text.chars() {
        match (in_escape, c) {
            (false, '\x1b') => in_escape = true,
            (false, c) => out.push(c),
            (true, 'm') => in_escape = false,
            (true, _) => {}
        }
    }
    out
}

// ============================================================================
// Help and version
// ============================================================================

#[test]
fn test_help_lists_commands() {
    let dir = TempDir::new().unwrap();
    let output = run_cli(&["--help"], dir.path());
    assert!(output.status.success());

    let stdout = stdout_str(&output);
    for command in ["sessions", "folder", "layouts", "settings", "schemes", "backup", "highlight"] {
        assert!(stdout.contains(command), "help should mention {command}");
    }
}

#[test]
fn test_version() {
    let dir = TempDir::new().unwrap();
    let output = run_cli(&["--version"], dir.path());
    assert!(output.status.success());
    assert!(stdout_str(&output).contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_unknown_command_fails() {
    let dir = TempDir::new().unwrap();
    let output = run_cli(&["frobnicate"], dir.path());
    assert!(!output.status.success());
}

// ============================================================================
// Sessions and folders
// ============================================================================

#[test]
fn test_list_empty() {
    let dir = TempDir::new().unwrap();
    let output = run_cli(&["sessions", "list"], dir.path());
    assert!(output.status.success(), "stderr: {}", stderr_str(&output));
    assert!(stdout_str(&output).contains("No sessions found."));
}

#[test]
fn test_add_show_and_list_json() {
    let dir = TempDir::new().unwrap();
    let output = run_cli(
        &["sessions", "add", "--name", "web", "--host", "web.example.com", "--user", "deploy", "--port", "2222"],
        dir.path(),
    );
    assert!(output.status.success(), "stderr: {}", stderr_str(&output));
    assert!(dir.path().join("sessions.json").exists());

    let output = run_cli(&["sessions", "show", "web"], dir.path());
    assert!(output.status.success());
    let stdout = stdout_str(&output);
    assert!(stdout.contains("web.example.com"));
    assert!(stdout.contains("2222"));

    let output = run_cli(&["sessions", "list", "--format", "json"], dir.path());
    assert!(output.status.success());
    let rows: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(rows.as_array().map(Vec::len), Some(1));
    assert_eq!(rows[0]["name"], "web");
    assert_eq!(rows[0]["type"], "ssh");
    assert_eq!(rows[0]["user"], "deploy");
}

#[test]
fn test_add_local_session() {
    let dir = TempDir::new().unwrap();
    let output = run_cli(&["sessions", "add-local", "--name", "scratch", "--directory", "/tmp"], dir.path());
    assert!(output.status.success(), "stderr: {}", stderr_str(&output));

    let output = run_cli(&["sessions", "list"], dir.path());
    let stdout = stdout_str(&output);
    assert!(stdout.contains("scratch"));
    assert!(stdout.contains("local"));
}

#[test]
fn test_duplicate_name_is_rejected() {
    let dir = TempDir::new().unwrap();
    let args = ["sessions", "add-local", "--name", "shell"];
    assert!(run_cli(&args, dir.path()).status.success());

    let output = run_cli(&args, dir.path());
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr_str(&output).contains("already exists"));
}

#[test]
fn test_add_into_missing_folder_fails() {
    let dir = TempDir::new().unwrap();
    let output = run_cli(
        &["sessions", "add", "--name", "db", "--host", "db.local", "--folder", "/Nowhere"],
        dir.path(),
    );
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr_str(&output).contains("does not exist"));
}

#[test]
fn test_remove_missing_session() {
    let dir = TempDir::new().unwrap();
    let output = run_cli(&["sessions", "remove", "ghost"], dir.path());
    assert_eq!(output.status.code(), Some(2));
    assert!(stderr_str(&output).contains("Session not found"));
}

#[test]
fn test_folder_lifecycle() {
    let dir = TempDir::new().unwrap();
    let output = run_cli(&["folder", "add", "/Work/Servers"], dir.path());
    assert!(output.status.success(), "stderr: {}", stderr_str(&output));

    let output = run_cli(
        &["sessions", "add", "--name", "db", "--host", "db.local", "--folder", "/Work/Servers"],
        dir.path(),
    );
    assert!(output.status.success(), "stderr: {}", stderr_str(&output));

    let output = run_cli(&["folder", "remove", "/Work"], dir.path());
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr_str(&output).contains("--force"));

    let output = run_cli(&["folder", "remove", "/Work", "--force"], dir.path());
    assert!(output.status.success(), "stderr: {}", stderr_str(&output));

    let output = run_cli(&["sessions", "list"], dir.path());
    assert!(stdout_str(&output).contains("No sessions found."));
}

#[test]
fn test_remove_missing_folder() {
    let dir = TempDir::new().unwrap();
    let output = run_cli(&["folder", "remove", "/Nope"], dir.path());
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_import_missing_ssh_config() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("no_such_config");
    let output = run_cli(
        &["sessions", "import-ssh-config", missing.to_str().unwrap()],
        dir.path(),
    );
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr_str(&output).contains("not found"));
}

#[test]
fn test_import_ssh_config() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("ssh_config");
    std::fs::write(
        &config,
        "Host bastion\n    HostName bastion.example.com\n    User ops\n    Port 2200\n",
    )
    .unwrap();

    let output = run_cli(
        &["sessions", "import-ssh-config", config.to_str().unwrap()],
        dir.path(),
    );
    assert!(output.status.success(), "stderr: {}", stderr_str(&output));

    let output = run_cli(&["sessions", "show", "bastion"], dir.path());
    let stdout = stdout_str(&output);
    assert!(stdout.contains("bastion.example.com"));
    assert!(stdout.contains("2200"));
}

// ============================================================================
// Layouts, settings and schemes
// ============================================================================

#[test]
fn test_layouts_empty_and_missing_delete() {
    let dir = TempDir::new().unwrap();
    let output = run_cli(&["layouts", "list"], dir.path());
    assert!(output.status.success());
    assert!(stdout_str(&output).contains("No saved layouts."));

    let output = run_cli(&["layouts", "delete", "nope"], dir.path());
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr_str(&output).contains("Layout not found"));
}

#[test]
fn test_settings_set_and_get() {
    let dir = TempDir::new().unwrap();
    let output = run_cli(&["settings", "set", "auto_hide_sidebar", "false"], dir.path());
    assert!(output.status.success(), "stderr: {}", stderr_str(&output));

    let output = run_cli(&["settings", "get", "auto_hide_sidebar"], dir.path());
    assert!(output.status.success());
    assert_eq!(stdout_str(&output).trim(), "false");

    let output = run_cli(&["settings", "reset", "auto_hide_sidebar"], dir.path());
    assert!(output.status.success());
    let output = run_cli(&["settings", "get", "auto_hide_sidebar"], dir.path());
    assert_eq!(stdout_str(&output).trim(), "true");
}

#[test]
fn test_settings_reject_invalid_values() {
    let dir = TempDir::new().unwrap();
    let output = run_cli(&["settings", "set", "auto_hide_sidebar", "maybe"], dir.path());
    assert_eq!(output.status.code(), Some(1));

    let output = run_cli(&["settings", "get", "no_such_setting"], dir.path());
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr_str(&output).contains("Unknown setting"));
}

#[test]
fn test_schemes_json_marks_active() {
    let dir = TempDir::new().unwrap();
    let output = run_cli(&["schemes", "--format", "json"], dir.path());
    assert!(output.status.success());
    let rows: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let rows = rows.as_array().unwrap();
    assert!(rows.len() >= 13);
    assert_eq!(rows.iter().filter(|r| r["active"] == true).count(), 1);
}

// ============================================================================
// Nautilus, backups, highlighting, completions
// ============================================================================

#[test]
fn test_nautilus_args_for_sftp() {
    let dir = TempDir::new().unwrap();
    let output = run_cli(&["nautilus-args", "sftp://admin@files.example.com/srv"], dir.path());
    assert!(output.status.success(), "stderr: {}", stderr_str(&output));
    let lines: Vec<String> = stdout_str(&output).lines().map(str::to_string).collect();
    assert_eq!(lines, vec!["--ssh".to_string(), "admin@files.example.com/srv".to_string()]);
}

#[test]
fn test_nautilus_args_rejects_http() {
    let dir = TempDir::new().unwrap();
    let output = run_cli(&["nautilus-args", "http://example.com/"], dir.path());
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn test_backup_round_trip() {
    let source = TempDir::new().unwrap();
    let target = TempDir::new().unwrap();
    let archive = source.path().join("backup.zip");

    assert!(run_cli(&["sessions", "add-local", "--name", "kept"], source.path()).status.success());
    let output = run_cli(&["backup", "create", archive.to_str().unwrap()], source.path());
    assert!(output.status.success(), "stderr: {}", stderr_str(&output));
    assert!(archive.exists());

    let output = run_cli(&["backup", "restore", archive.to_str().unwrap()], target.path());
    assert!(output.status.success(), "stderr: {}", stderr_str(&output));

    let output = run_cli(&["sessions", "list"], target.path());
    assert!(stdout_str(&output).contains("kept"));
}

#[test]
fn test_restore_missing_archive() {
    let dir = TempDir::new().unwrap();
    let output = run_cli(&["backup", "restore", "/nonexistent/backup.zip"], dir.path());
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn test_highlight_keeps_text() {
    let dir = TempDir::new().unwrap();
    let input = "plain line\nERROR: disk full\n";
    let output = run_cli_with_input(&["highlight"], dir.path(), input);
    assert!(output.status.success(), "stderr: {}", stderr_str(&output));
    assert_eq!(strip_ansi(&stdout_str(&output)), input);
}

#[test]
fn test_completions_and_man() {
    let dir = TempDir::new().unwrap();
    let output = run_cli(&["completions", "bash"], dir.path());
    assert!(output.status.success());
    assert!(stdout_str(&output).contains("zashterminal-cli"));

    let output = run_cli(&["man"], dir.path());
    assert!(output.status.success());
    assert!(stdout_str(&output).contains(".TH"));
}
