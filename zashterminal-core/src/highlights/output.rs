//! Applies highlight rules to terminal output

use std::borrow::Cow;
use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::config::SettingsManager;

use super::colors::{ANSI_RESET, resolve_color_to_ansi};
use super::manager::HighlightManager;
use super::rules::{HighlightRule, RuleAction};

/// SGR sequences that set a color. Lines that already carry one are left as
/// the program wrote them.
static ANSI_COLOR_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\x1b\[(?:[0-9;]*;)?(?:3[0-7]|4[0-7]|9[0-7]|10[0-7]|38;5;\d+|48;5;\d+|38;2;\d+;\d+;\d+|48;2;\d+;\d+;\d+)[;0-9]*m",
    )
    .expect("ANSI_COLOR_REGEX is a valid regex pattern")
});

/// Commands whose output is never highlighted, lowercased
#[must_use]
pub fn ignored_commands(settings: &SettingsManager) -> BTreeSet<String> {
    settings
        .get_or::<Vec<String>>("ignored_highlight_commands", Vec::new())
        .into_iter()
        .map(|c| c.to_lowercase())
        .collect()
}

#[derive(Debug)]
struct CompiledRule {
    regex: Regex,
    // SGR sequence per capture group; empty leaves the group uncolored
    colors: Vec<String>,
    stop: bool,
}

impl CompiledRule {
    fn compile(rule: &HighlightRule) -> Option<Self> {
        if !rule.enabled {
            return None;
        }
        let regex = match Regex::new(&rule.pattern) {
            Ok(regex) => regex,
            Err(e) => {
                tracing::debug!(rule = %rule.name, error = %e, "Skipping invalid rule");
                return None;
            }
        };
        let colors = rule
            .colors
            .iter()
            .map(|c| c.as_deref().map(resolve_color_to_ansi).unwrap_or_default())
            .collect();
        Some(Self {
            regex,
            colors,
            stop: rule.action == RuleAction::Stop,
        })
    }

    fn color_for_group(&self, group: usize) -> &str {
        self.colors
            .get(group - 1)
            .or_else(|| self.colors.first())
            .map_or("", String::as_str)
    }

    // Pushes (start, end, color) spans; returns whether anything matched
    fn collect(&self, line: &str, spans: &mut Vec<(usize, usize, String)>) -> bool {
        let groups = self.regex.captures_len() - 1;
        let mut matched = false;
        if groups == 0 {
            let Some(color) = self.colors.first().filter(|c| !c.is_empty()) else {
                return self.regex.is_match(line);
            };
            for m in self.regex.find_iter(line) {
                matched = true;
                if !m.is_empty() {
                    spans.push((m.start(), m.end(), color.clone()));
                }
            }
            return matched;
        }
        for caps in self.regex.captures_iter(line) {
            matched = true;
            for group in 1..=groups {
                let Some(m) = caps.get(group) else { continue };
                let color = self.color_for_group(group);
                if !m.is_empty() && !color.is_empty() {
                    spans.push((m.start(), m.end(), color.to_string()));
                }
            }
        }
        matched
    }
}

/// Highlights lines of output with a fixed rule set
#[derive(Debug, Default)]
pub struct OutputHighlighter {
    rules: Vec<CompiledRule>,
}

impl OutputHighlighter {
    /// Compiles `rules`, skipping disabled and invalid ones
    #[must_use]
    pub fn new(rules: &[HighlightRule]) -> Self {
        Self {
            rules: rules.iter().filter_map(CompiledRule::compile).collect(),
        }
    }

    /// Highlighter for the output of `command`. Ignored commands get one that
    /// leaves every line untouched.
    #[must_use]
    pub fn for_command(
        manager: &HighlightManager,
        command: Option<&str>,
        ignored: &BTreeSet<String>,
    ) -> Self {
        if command.is_some_and(|c| ignored.contains(&c.to_lowercase())) {
            tracing::debug!(command = ?command, "Highlighting disabled for command");
            return Self::default();
        }
        Self::new(&manager.rules_for_command(command))
    }

    /// Number of usable rules
    #[must_use]
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Highlights a single line (without its terminator).
    ///
    /// Rules run in order; a matching `stop` rule ends the pass. Where
    /// matches overlap, the one starting first wins, then the longer one.
    #[must_use]
    pub fn highlight_line<'a>(&self, line: &'a str) -> Cow<'a, str> {
        if self.rules.is_empty() || line.is_empty() || ANSI_COLOR_REGEX.is_match(line) {
            return Cow::Borrowed(line);
        }

        let mut spans: Vec<(usize, usize, String)> = Vec::new();
        for rule in &self.rules {
            if rule.collect(line, &mut spans) && rule.stop {
                break;
            }
        }
        if spans.is_empty() {
            return Cow::Borrowed(line);
        }
        spans.sort_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)));

        let mut out = String::with_capacity(line.len() + spans.len() * 12);
        let mut pos = 0;
        for (start, end, color) in spans {
            if start < pos {
                continue;
            }
            out.push_str(&line[pos..start]);
            out.push_str(&color);
            out.push_str(&line[start..end]);
            out.push_str(ANSI_RESET);
            pos = end;
        }
        out.push_str(&line[pos..]);
        Cow::Owned(out)
    }

    /// Highlights multi-line text, keeping `\n` and `\r\n` terminators
    #[must_use]
    pub fn highlight_text(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        for chunk in text.split_inclusive('\n') {
            let body = chunk
                .strip_suffix("\r\n")
                .or_else(|| chunk.strip_suffix('\n'))
                .unwrap_or(chunk);
            out.push_str(&self.highlight_line(body));
            out.push_str(&chunk[body.len()..]);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn highlighter(rules: Vec<HighlightRule>) -> OutputHighlighter {
        OutputHighlighter::new(&rules)
    }

    #[test]
    fn wraps_whole_matches() {
        let h = highlighter(vec![HighlightRule::new("err", "error", "red")]);
        assert_eq!(
            h.highlight_line("an error here"),
            "an \x1b[31merror\x1b[0m here"
        );
        assert!(matches!(h.highlight_line("clean"), Cow::Borrowed(_)));
    }

    #[test]
    fn colors_capture_groups() {
        let mut rule = HighlightRule::new("kv", r"(\w+)=(\d+)", "red");
        rule.colors = vec![Some("red".into()), Some("green".into())];
        let h = highlighter(vec![rule.clone()]);
        assert_eq!(h.highlight_line("time=42"), "\x1b[31mtime\x1b[0m=\x1b[32m42\x1b[0m");

        rule.colors = vec![None, Some("green".into())];
        let h = highlighter(vec![rule.clone()]);
        assert_eq!(h.highlight_line("time=42"), "time=\x1b[32m42\x1b[0m");

        rule.colors = vec![Some("cyan".into())];
        let h = highlighter(vec![rule]);
        assert_eq!(h.highlight_line("a=1"), "\x1b[36ma\x1b[0m=\x1b[36m1\x1b[0m");
    }

    #[test]
    fn stop_ends_the_pass() {
        let h = highlighter(vec![
            HighlightRule::new("a", "down", "red").with_action(RuleAction::Stop),
            HighlightRule::new("b", "host", "blue"),
        ]);
        assert_eq!(h.highlight_line("host down"), "host \x1b[31mdown\x1b[0m");
        assert_eq!(h.highlight_line("host up"), "\x1b[34mhost\x1b[0m up");
    }

    #[test]
    fn earlier_and_longer_matches_win() {
        let h = highlighter(vec![
            HighlightRule::new("short", "err", "yellow"),
            HighlightRule::new("long", "error", "red"),
        ]);
        assert_eq!(h.highlight_line("error"), "\x1b[31merror\x1b[0m");
    }

    #[test]
    fn leaves_colored_and_empty_lines() {
        let h = highlighter(vec![HighlightRule::new("e", "error", "red")]);
        let colored = "\x1b[1;31merror\x1b[0m";
        assert_eq!(h.highlight_line(colored), colored);
        assert_eq!(h.highlight_line(""), "");
    }

    #[test]
    fn multi_line_text() {
        let h = highlighter(vec![HighlightRule::new("ok", "ok", "green")]);
        assert_eq!(
            h.highlight_text("ok\r\nno\nok"),
            "\x1b[32mok\x1b[0m\r\nno\n\x1b[32mok\x1b[0m"
        );
    }

    #[test]
    fn ignored_commands_are_untouched() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut manager = HighlightManager::new(
            dir.path().join("highlights"),
            dir.path().join("highlights_settings.json"),
        );
        manager.load();
        let ignored: BTreeSet<String> = ["grep".to_string()].into_iter().collect();
        assert_eq!(
            OutputHighlighter::for_command(&manager, Some("GREP"), &ignored).rule_count(),
            0
        );
        assert!(OutputHighlighter::for_command(&manager, Some("ping"), &ignored).rule_count() > 0);
    }
}
