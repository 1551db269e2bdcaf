//! Parsing assistant replies
//!
//! Models are asked for `{"reply": "...", "commands": [...]}` but often wrap
//! it in a code fence, surround it with prose or ignore the format
//! altogether. Everything here degrades to showing the raw text.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

static SHELL_BLOCK_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```(?:bash|sh|zsh)?\n(.*?)```")
        .expect("SHELL_BLOCK_REGEX is a valid regex pattern")
});

/// Description given to commands lifted from code blocks
pub const FALLBACK_COMMAND_DESCRIPTION: &str = "Suggested command";

/// A command the user can run with one click
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestedCommand {
    /// Shell command line
    pub command: String,
    /// Short explanation, may be empty
    #[serde(default)]
    pub description: String,
}

impl SuggestedCommand {
    fn new(command: &str, description: &str) -> Self {
        Self {
            command: command.trim().to_string(),
            description: description.trim().to_string(),
        }
    }
}

/// Parsed assistant reply
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssistantReply {
    /// Markdown text to display
    pub reply: String,
    /// Runnable commands
    pub commands: Vec<SuggestedCommand>,
}

impl AssistantReply {
    /// Just the command lines
    #[must_use]
    pub fn command_lines(&self) -> Vec<String> {
        self.commands.iter().map(|c| c.command.clone()).collect()
    }
}

/// Strips a code fence wrapped around the whole reply
#[must_use]
pub fn strip_code_fence(raw: &str) -> &str {
    let mut clean = raw.trim();
    if clean.starts_with("```") {
        if let Some(newline) = clean.find('\n') {
            clean = &clean[newline + 1..];
        }
        if let Some(stripped) = clean.strip_suffix("```") {
            clean = stripped;
        }
    }
    clean.trim()
}

/// Finds the first balanced `{...}` in `text` that parses as a JSON object
#[must_use]
pub fn extract_json_object(text: &str) -> Option<Map<String, Value>> {
    let bytes = text.as_bytes();
    let mut start = text.find('{');
    while let Some(s) = start {
        let mut depth = 0usize;
        for (offset, b) in bytes[s..].iter().enumerate() {
            match b {
                b'{' => depth += 1,
                b'}' => {
                    depth -= 1;
                    if depth == 0 {
                        if let Ok(Value::Object(map)) = serde_json::from_str(&text[s..=s + offset]) {
                            return Some(map);
                        }
                        break;
                    }
                }
                _ => {}
            }
        }
        start = text[s + 1..].find('{').map(|i| s + 1 + i);
    }
    None
}

/// Normalizes a `commands` value: a string, a list of strings, or a list of
/// `{"command"|"cmd", "description"}` objects. Blank entries are dropped.
#[must_use]
pub fn normalize_commands(value: &Value) -> Vec<SuggestedCommand> {
    let from_item = |item: &Value| -> Option<SuggestedCommand> {
        match item {
            Value::String(s) if !s.trim().is_empty() => Some(SuggestedCommand::new(s, "")),
            Value::Object(obj) => {
                let command = obj
                    .get("command")
                    .and_then(Value::as_str)
                    .filter(|c| !c.is_empty())
                    .or_else(|| obj.get("cmd").and_then(Value::as_str))
                    .filter(|c| !c.trim().is_empty())?;
                let description = obj.get("description").and_then(Value::as_str).unwrap_or("");
                Some(SuggestedCommand::new(command, description))
            }
            _ => None,
        }
    };
    match value {
        Value::Array(items) => items.iter().filter_map(from_item).collect(),
        Value::String(_) => from_item(value).into_iter().collect(),
        _ => Vec::new(),
    }
}

/// Parses a complete reply.
///
/// JSON replies (bare, fenced or embedded in prose) give their `reply` and
/// `commands`. Anything else is shown as is, with single-line shell code
/// blocks offered as commands.
#[must_use]
pub fn parse_assistant_payload(content: &str) -> AssistantReply {
    let clean = strip_code_fence(content);
    let object = match serde_json::from_str::<Value>(clean) {
        Ok(Value::Object(map)) => Some(map),
        _ => extract_json_object(clean),
    };

    if let Some(map) = object {
        return AssistantReply {
            reply: map.get("reply").and_then(Value::as_str).unwrap_or_default().to_string(),
            commands: map.get("commands").map(normalize_commands).unwrap_or_default(),
        };
    }

    let commands = SHELL_BLOCK_REGEX
        .captures_iter(content)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
        .filter(|cmd| !cmd.is_empty() && cmd.lines().count() == 1)
        .map(|cmd| SuggestedCommand::new(cmd, FALLBACK_COMMAND_DESCRIPTION))
        .collect();
    AssistantReply {
        reply: content.to_string(),
        commands,
    }
}

// Reads a JSON string body starting after the opening quote, stopping at the
// closing quote or the end of input
fn read_partial_string(rest: &str, quote: char) -> (String, bool) {
    let mut out = String::new();
    let mut chars = rest.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some(other) => out.push(other),
                None => break,
            }
        } else if c == quote {
            return (out, true);
        } else {
            out.push(c);
        }
    }
    (out, false)
}

// Drops a trailing `["cmd", ...]` list some models append after the text
fn strip_trailing_command_list(text: &str) -> Option<&str> {
    let stripped = text.trim();
    if !stripped.ends_with(']') {
        return None;
    }
    let mut depth = 0i32;
    let mut start = None;
    for (i, c) in stripped.char_indices().rev() {
        match c {
            ']' => depth += 1,
            '[' => {
                depth -= 1;
                if depth == 0 {
                    start = Some(i);
                    break;
                }
            }
            _ => {}
        }
    }
    let start = start?;
    let Ok(Value::Array(items)) = serde_json::from_str::<Value>(&stripped[start..]) else {
        return None;
    };
    if !items.iter().all(Value::is_string) {
        return None;
    }
    let before = stripped[..start].trim().trim_end_matches(['\n', ' ', ']']);
    (!before.is_empty()).then_some(before)
}

/// Text to show while a reply is still streaming in.
///
/// Returns the `reply` field of complete or partial JSON, nothing while
/// only the start of a JSON object has arrived, and plain text unchanged.
#[must_use]
pub fn extract_partial_reply(text: &str) -> String {
    if !text.contains('{') && !text.contains('[') {
        return text.to_string();
    }
    if let Some(before) = strip_trailing_command_list(text) {
        return before.to_string();
    }
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(text) {
        return map.get("reply").and_then(Value::as_str).unwrap_or_default().to_string();
    }
    if let Some(start) = text.find('{')
        && let Some(map) = extract_json_object(&text[start..])
    {
        if let Some(reply) = map.get("reply").and_then(Value::as_str) {
            return reply.to_string();
        }
        return text[..start].trim().to_string();
    }
    for (pattern, quote) in [
        ("\"reply\": \"", '"'),
        ("\"reply\":\"", '"'),
        ("'reply': '", '\''),
        ("'reply':'", '\''),
    ] {
        if let Some(pos) = text.find(pattern) {
            let (partial, closed) = read_partial_string(&text[pos + pattern.len()..], quote);
            if closed || !partial.is_empty() {
                return partial;
            }
        }
    }
    let trimmed = text.trim_start();
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        return String::new();
    }
    text.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_replies() {
        let parsed =
            parse_assistant_payload(r#"{"reply":"Use **df**","commands":["df -h", "  "]}"#);
        assert_eq!(parsed.reply, "Use **df**");
        assert_eq!(parsed.command_lines(), vec!["df -h"]);

        let fenced = "```json\n{\"reply\":\"ok\",\"commands\":[{\"cmd\":\"ls\",\"description\":\" list \"}]}\n```";
        let parsed = parse_assistant_payload(fenced);
        assert_eq!(parsed.reply, "ok");
        assert_eq!(
            parsed.commands,
            vec![SuggestedCommand {
                command: "ls".into(),
                description: "list".into()
            }]
        );

        let prose = "Sure! {\"reply\":\"free -m\",\"commands\":\"free -m\"} Enjoy.";
        assert_eq!(parse_assistant_payload(prose).command_lines(), vec!["free -m"]);
    }

    #[test]
    fn plain_text_fallback() {
        let text = "Try this:\n```bash\nuptime\n```\nor a script:\n```sh\na\nb\n```";
        let parsed = parse_assistant_payload(text);
        assert_eq!(parsed.reply, text);
        assert_eq!(parsed.commands.len(), 1);
        assert_eq!(parsed.commands[0].command, "uptime");
        assert_eq!(parsed.commands[0].description, FALLBACK_COMMAND_DESCRIPTION);
    }

    #[test]
    fn balanced_object_skips_broken_candidates() {
        let map = extract_json_object("{oops} then {\"a\": {\"b\": 1}}").unwrap();
        assert_eq!(map["a"]["b"], 1);
        assert!(extract_json_object("no braces").is_none());
    }

    #[test]
    fn partial_replies_while_streaming() {
        assert_eq!(extract_partial_reply("plain text"), "plain text");
        assert_eq!(extract_partial_reply("{\"re"), "");
        assert_eq!(
            extract_partial_reply("{\"reply\": \"Line one\\nLine \\\"two"),
            "Line one\nLine \"two"
        );
        assert_eq!(
            extract_partial_reply("{\"reply\":\"done\",\"commands\":[\"ls\"]}"),
            "done"
        );
        assert_eq!(
            extract_partial_reply("Here you go\n[\"ls -la\", \"pwd\"]"),
            "Here you go"
        );
        assert_eq!(extract_partial_reply("{\"commands\":[]}"), "");
    }
}
