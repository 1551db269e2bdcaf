//! VTE terminal creation, appearance and process spawning

use std::path::Path;

use gtk4::prelude::*;
use gtk4::{gdk, gio, glib, pango};
use vte4::prelude::*;
use vte4::{PtyFlags, Terminal};
use zashterminal_core::config::{SettingsManager, expand_home};
use zashterminal_core::launch::{SshLaunchOptions, ssh_command_args};
use zashterminal_core::models::SessionItem;
use zashterminal_core::theme::{
    CursorBlink, CursorShape, EraseBinding, Rgb, TerminalAppearance, TextBlink,
};

/// `PCRE2_MULTILINE`, required by VTE for match and search regexes
pub const PCRE2_MULTILINE: u32 = 0x0000_0400;

/// Links made clickable with Ctrl+click
const URL_PATTERN: &str =
    r"\b(?:https?|ftp|file)://[-[:alnum:]_.~:/?#@!$&'()*+,;=%]+[-[:alnum:]_~/#=&+%]";

/// Zoom limits for the `font_scale` setting
pub const MIN_FONT_SCALE: f64 = 0.25;
pub const MAX_FONT_SCALE: f64 = 4.0;

/// Shell used when `$SHELL` is unset
const FALLBACK_SHELL: &str = "/bin/bash";

/// Creates a terminal with URL matching enabled
#[must_use]
pub fn create_terminal() -> Terminal {
    let terminal = Terminal::new();
    terminal.set_hexpand(true);
    terminal.set_vexpand(true);
    terminal.set_allow_hyperlink(true);

    match vte4::Regex::for_match(URL_PATTERN, PCRE2_MULTILINE) {
        Ok(regex) => {
            let tag = terminal.match_add_regex(&regex, 0);
            terminal.match_set_cursor_name(tag, "pointer");
        }
        Err(e) => tracing::warn!(error = %e, "URL pattern rejected by VTE"),
    }
    terminal
}

/// Wraps a terminal in the scroller that serves as its pane widget
#[must_use]
pub fn wrap_in_scroller(terminal: &Terminal) -> gtk4::ScrolledWindow {
    let scrolled = gtk4::ScrolledWindow::builder()
        .hscrollbar_policy(gtk4::PolicyType::Never)
        .vscrollbar_policy(gtk4::PolicyType::Automatic)
        .hexpand(true)
        .vexpand(true)
        .child(terminal)
        .build();
    scrolled.add_css_class("terminal-pane");
    scrolled
}

#[allow(clippy::cast_possible_truncation)]
fn rgba(color: Rgb, alpha: f64) -> gdk::RGBA {
    let (r, g, b) = color.to_unit();
    gdk::RGBA::new(r as f32, g as f32, b as f32, alpha as f32)
}

const fn cursor_shape(shape: CursorShape) -> vte4::CursorShape {
    match shape {
        CursorShape::Block => vte4::CursorShape::Block,
        CursorShape::IBeam => vte4::CursorShape::Ibeam,
        CursorShape::Underline => vte4::CursorShape::Underline,
    }
}

const fn cursor_blink(mode: CursorBlink) -> vte4::CursorBlinkMode {
    match mode {
        CursorBlink::System => vte4::CursorBlinkMode::System,
        CursorBlink::On => vte4::CursorBlinkMode::On,
        CursorBlink::Off => vte4::CursorBlinkMode::Off,
    }
}

const fn text_blink(mode: TextBlink) -> vte4::TextBlinkMode {
    match mode {
        TextBlink::Focused => vte4::TextBlinkMode::Focused,
        TextBlink::Unfocused => vte4::TextBlinkMode::Unfocused,
    }
}

const fn erase_binding(binding: EraseBinding) -> vte4::EraseBinding {
    match binding {
        EraseBinding::Auto => vte4::EraseBinding::Auto,
        EraseBinding::AsciiBackspace => vte4::EraseBinding::AsciiBackspace,
        EraseBinding::AsciiDelete => vte4::EraseBinding::AsciiDelete,
        EraseBinding::DeleteSequence => vte4::EraseBinding::DeleteSequence,
    }
}

/// Applies colors, font and behavior to a terminal
#[allow(clippy::cast_possible_truncation)]
pub fn apply_appearance(terminal: &Terminal, appearance: &TerminalAppearance, scroll_on_output: bool) {
    let palette: Vec<gdk::RGBA> = appearance.palette.iter().map(|c| rgba(*c, 1.0)).collect();
    let palette_refs: Vec<&gdk::RGBA> = palette.iter().collect();
    terminal.set_colors(
        Some(&rgba(appearance.foreground, 1.0)),
        Some(&rgba(appearance.background, appearance.background_alpha)),
        &palette_refs,
    );
    terminal.set_color_cursor(Some(&rgba(appearance.cursor, 1.0)));

    let font = pango::FontDescription::from_string(&appearance.font);
    terminal.set_font_desc(Some(&font));
    terminal.set_font_scale(appearance.font_scale.clamp(MIN_FONT_SCALE, MAX_FONT_SCALE));
    terminal.set_cell_height_scale(appearance.line_spacing.clamp(1.0, 2.0));
    terminal.set_bold_is_bright(appearance.bold_is_bright);

    terminal.set_cursor_shape(cursor_shape(appearance.cursor_shape));
    terminal.set_cursor_blink_mode(cursor_blink(appearance.cursor_blink));
    terminal.set_text_blink_mode(text_blink(appearance.text_blink));
    terminal.set_backspace_binding(erase_binding(appearance.backspace));
    terminal.set_delete_binding(erase_binding(appearance.delete));

    terminal.set_scrollback_lines(appearance.scrollback_lines);
    terminal.set_scroll_on_keystroke(appearance.scroll_on_keystroke);
    terminal.set_scroll_on_output(scroll_on_output);
    terminal.set_mouse_autohide(appearance.mouse_autohide);
    terminal.set_audible_bell(appearance.audible_bell);

    terminal.set_enable_bidi(appearance.bidi);
    terminal.set_enable_shaping(appearance.shaping);
    terminal.set_enable_sixel(appearance.sixel);
    terminal.set_word_char_exceptions(&appearance.word_char_exceptions);
    terminal.set_cjk_ambiguous_width(appearance.cjk_ambiguous_width as i32);
}

/// The user's login shell
#[must_use]
pub fn user_shell() -> String {
    std::env::var("SHELL")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| FALLBACK_SHELL.to_string())
}

/// A process to start in a terminal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpawnCommand {
    pub argv: Vec<String>,
    /// `KEY=value` pairs added to the inherited environment
    pub env: Vec<String>,
    pub working_dir: Option<String>,
}

impl SpawnCommand {
    /// A local shell, optionally running `command` first.
    ///
    /// Unless `close_after` is set the shell stays open after the command
    /// finishes. Directories that do not exist are ignored.
    #[must_use]
    pub fn local_shell(
        shell: &str,
        login: bool,
        working_dir: Option<&str>,
        command: Option<&str>,
        close_after: bool,
    ) -> Self {
        let argv = match command.map(str::trim).filter(|c| !c.is_empty()) {
            Some(cmd) if close_after => vec![shell.to_string(), "-c".to_string(), cmd.to_string()],
            Some(cmd) => {
                let login_flag = if login { " -l" } else { "" };
                vec![
                    shell.to_string(),
                    "-c".to_string(),
                    format!("{cmd}; exec \"$SHELL\"{login_flag}"),
                ]
            }
            None if login => vec![shell.to_string(), "-l".to_string()],
            None => vec![shell.to_string()],
        };
        let working_dir = working_dir
            .map(|dir| expand_home(dir))
            .filter(|dir| dir.is_dir())
            .map(|dir| dir.to_string_lossy().into_owned());
        Self {
            argv,
            env: terminal_env(shell),
            working_dir,
        }
    }

    /// A local shell configured by a saved local session
    #[must_use]
    pub fn local_session(session: &SessionItem, shell: &str, login: bool) -> Self {
        let dir = Some(session.local_working_directory.as_str()).filter(|d| !d.is_empty());
        let command = Some(session.local_startup_command.as_str()).filter(|c| !c.is_empty());
        Self::local_shell(shell, login, dir, command, false)
    }

    /// `ssh` to a saved session
    #[must_use]
    pub fn ssh(session: &SessionItem, options: &SshLaunchOptions, initial_command: Option<&str>) -> Self {
        Self {
            argv: ssh_command_args(session, options, initial_command),
            env: terminal_env(&user_shell()),
            working_dir: None,
        }
    }
}

fn terminal_env(shell: &str) -> Vec<String> {
    vec![
        "TERM=xterm-256color".to_string(),
        "COLORTERM=truecolor".to_string(),
        format!("SHELL={shell}"),
    ]
}

/// SSH options for the current settings, with control sockets in the cache
/// directory
#[must_use]
pub fn ssh_options(settings: &SettingsManager, cache_dir: &Path) -> SshLaunchOptions {
    let control_dir = cache_dir.join("ssh_control");
    if let Err(e) = std::fs::create_dir_all(&control_dir) {
        tracing::warn!(path = %control_dir.display(), error = %e, "Failed to create SSH control directory");
    }
    SshLaunchOptions::from_settings(settings, &control_dir)
}

/// Starts `command` in `terminal`; `on_done` receives the spawn result
pub fn spawn(
    terminal: &Terminal,
    command: &SpawnCommand,
    on_done: impl FnOnce(Result<glib::Pid, glib::Error>) + 'static,
) {
    let argv: Vec<&str> = command.argv.iter().map(String::as_str).collect();
    let envv: Vec<&str> = command.env.iter().map(String::as_str).collect();
    tracing::debug!(program = ?argv.first(), cwd = ?command.working_dir, "Spawning terminal process");
    terminal.spawn_async(
        PtyFlags::DEFAULT,
        command.working_dir.as_deref(),
        &argv,
        &envv,
        glib::SpawnFlags::SEARCH_PATH,
        || {},
        -1,
        gio::Cancellable::NONE,
        on_done,
    );
}

/// Builds the VTE search pattern: escaped unless `is_regex`, caseless unless
/// `case_sensitive`
#[must_use]
pub fn search_pattern(text: &str, case_sensitive: bool, is_regex: bool) -> String {
    let body = if is_regex {
        text.to_string()
    } else {
        regex::escape(text)
    };
    if case_sensitive { body } else { format!("(?i){body}") }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_shell_honors_login_flag() {
        let cmd = SpawnCommand::local_shell("/bin/zsh", true, None, None, false);
        assert_eq!(cmd.argv, vec!["/bin/zsh", "-l"]);
        assert!(cmd.env.contains(&"TERM=xterm-256color".to_string()));
        assert!(cmd.env.contains(&"SHELL=/bin/zsh".to_string()));
    }

    #[test]
    fn executed_command_keeps_shell_open() {
        let cmd = SpawnCommand::local_shell("/bin/bash", false, None, Some("htop"), false);
        assert_eq!(cmd.argv, vec!["/bin/bash", "-c", "htop; exec \"$SHELL\""]);
        let once = SpawnCommand::local_shell("/bin/bash", false, None, Some("htop"), true);
        assert_eq!(once.argv, vec!["/bin/bash", "-c", "htop"]);
    }

    #[test]
    fn missing_directories_are_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().to_string_lossy().into_owned();
        let cmd = SpawnCommand::local_shell("/bin/sh", false, Some(&path), None, false);
        assert_eq!(cmd.working_dir.as_deref(), Some(path.as_str()));
        let missing = SpawnCommand::local_shell("/bin/sh", false, Some("/no/such/dir"), None, false);
        assert!(missing.working_dir.is_none());
    }

    #[test]
    fn local_sessions_use_their_startup_command() {
        let mut session = SessionItem::local("build");
        session.local_startup_command = "make".into();
        let cmd = SpawnCommand::local_session(&session, "/bin/sh", false);
        assert_eq!(cmd.argv[2], "make; exec \"$SHELL\"");
    }

    #[test]
    fn search_patterns() {
        assert_eq!(search_pattern("a.b", true, false), r"a\.b");
        assert_eq!(search_pattern("a.b", false, true), "(?i)a.b");
    }
}
