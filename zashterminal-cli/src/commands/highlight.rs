//! Output highlighting filter.

use std::io::{BufRead, BufWriter, IsTerminal, Write};

use zashterminal_core::highlights::{HighlightManager, OutputHighlighter, ignored_commands};
use zashterminal_core::models::SessionType;

use super::Context;
use crate::error::CliError;
use crate::util::load_settings;

/// Copies stdin to stdout, coloring each line with the rules that apply to
/// `command` in a local (or SSH) terminal
pub fn cmd_highlight(ctx: &Context, command: Option<&str>, ssh: bool) -> Result<(), CliError> {
    let stdin = std::io::stdin();
    if stdin.is_terminal() {
        return Err(CliError::Highlight(
            "expects text on standard input, e.g. `ls -l | zashterminal-cli highlight --command ls`"
                .to_string(),
        ));
    }

    let highlighter = build_highlighter(ctx, command, ssh);
    tracing::debug!(rules = highlighter.rule_count(), ?command, "Highlighting stdin");

    let mut out = BufWriter::new(std::io::stdout().lock());
    match filter(&highlighter, stdin.lock(), &mut out) {
        Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => Ok(()),
        other => other.map_err(CliError::Io),
    }
}

fn build_highlighter(ctx: &Context, command: Option<&str>, ssh: bool) -> OutputHighlighter {
    let manager = HighlightManager::from_paths(&ctx.paths);
    let session_type = if ssh { SessionType::Ssh } else { SessionType::Local };
    if !manager.is_enabled_for(session_type) {
        tracing::info!(session_type = session_type.as_str(), "Output highlighting is disabled");
        return OutputHighlighter::default();
    }
    let ignored = ignored_commands(&load_settings(&ctx.paths));
    OutputHighlighter::for_command(&manager, command, &ignored)
}

/// Writes every line of `input` through `highlighter`, keeping line
/// terminators
fn filter(
    highlighter: &OutputHighlighter,
    mut input: impl BufRead,
    out: &mut impl Write,
) -> std::io::Result<()> {
    let mut line = String::new();
    loop {
        line.clear();
        if input.read_line(&mut line)? == 0 {
            break;
        }
        out.write_all(highlighter.highlight_text(&line).as_bytes())?;
    }
    out.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use zashterminal_core::highlights::HighlightRule;

    #[test]
    fn passes_text_through_without_rules() {
        let mut out = Vec::new();
        filter(&OutputHighlighter::default(), "one\ntwo\r\nthree".as_bytes(), &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "one\ntwo\r\nthree");
    }

    #[test]
    fn colors_matching_lines() {
        let rule = HighlightRule::new("errors", r"\berror\b", "red");
        let highlighter = OutputHighlighter::new(&[rule]);
        let mut out = Vec::new();
        filter(&highlighter, "ok\nan error here\n".as_bytes(), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "ok");
        assert!(lines[1].contains("\x1b["));
        assert!(lines[1].contains("error"));
        assert!(text.ends_with('\n'));
    }
}
