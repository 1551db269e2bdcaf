//! Property-based tests for output highlighting
//!
//! Highlighting only ever inserts SGR sequences: removing them gives back
//! the original text, whatever the rules and input.

use std::sync::LazyLock;

use proptest::prelude::*;
use regex::Regex;
use zashterminal_core::highlights::{HighlightRule, OutputHighlighter, resolve_color_to_ansi};

static SGR: LazyLock<Regex> = LazyLock::new(|| Regex::new("\x1b\\[[0-9;]*m").unwrap());

fn rule_strategy() -> impl Strategy<Value = HighlightRule> {
    let patterns = prop_oneof![
        Just(r"\d+"),
        Just(r"(?i)error"),
        Just(r"(\w+)=(\d+)"),
        Just(r"\b(ok|fail)\b"),
        Just(r"[a-f]{2,}"),
        Just(r"\s+"),
    ];
    let colors = prop_oneof![
        Just("red"),
        Just("bold green"),
        Just("on_blue"),
        Just("bright_yellow"),
        Just("foreground"),
        Just("nonsense"),
    ];
    (patterns, colors).prop_map(|(p, c)| HighlightRule::new("rule", p, c))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_stripping_sgr_restores_the_line(
        rules in prop::collection::vec(rule_strategy(), 0..5),
        line in "[a-z0-9 =.:/-]{0,60}",
    ) {
        let highlighter = OutputHighlighter::new(&rules);
        let highlighted = highlighter.highlight_line(&line);
        let stripped = SGR.replace_all(&highlighted, "");
        prop_assert_eq!(stripped.as_ref(), line.as_str());
    }

    #[test]
    fn prop_colored_input_is_left_alone(
        rules in prop::collection::vec(rule_strategy(), 1..4),
        text in "[a-z0-9 ]{1,30}",
    ) {
        let line = format!("\x1b[31m{text}\x1b[0m");
        let highlighter = OutputHighlighter::new(&rules);
        let highlighted = highlighter.highlight_line(&line);
        prop_assert_eq!(highlighted.as_ref(), line.as_str());
    }

    #[test]
    fn prop_color_specs_give_one_sgr_sequence(
        spec in "(bold |underline )?(on_)?(bright_)?[a-z]{0,8}",
    ) {
        let code = resolve_color_to_ansi(&spec);
        prop_assert!(code.is_empty() || SGR.find(&code).is_some_and(|m| m.as_str() == code));
    }
}
