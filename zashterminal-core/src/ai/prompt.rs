//! System prompt with the host's OS and language

use std::fs;

use super::provider::{ChatMessage, ChatRole};

fn os_release_value<'a>(line: &'a str, key: &str) -> Option<&'a str> {
    line.strip_prefix(key)
        .and_then(|rest| rest.strip_prefix('='))
        .map(|v| v.trim().trim_matches('"'))
}

/// Describes the OS from `/etc/os-release` contents, e.g.
/// `"BigLinux (based on arch)"`
#[must_use]
pub fn os_context_from_release(os_release: &str) -> String {
    let mut name = "Linux";
    let mut base = "";
    for line in os_release.lines() {
        if let Some(v) = os_release_value(line, "PRETTY_NAME") {
            name = v;
        } else if let Some(v) = os_release_value(line, "ID_LIKE") {
            base = v;
        }
    }
    if base.is_empty() {
        name.to_string()
    } else {
        format!("{name} (based on {base})")
    }
}

/// OS description of this machine, falling back to `/etc/lsb-release` and
/// then to plain "Linux"
#[must_use]
pub fn detect_os_context() -> String {
    if let Ok(release) = fs::read_to_string("/etc/os-release") {
        return os_context_from_release(&release);
    }
    fs::read_to_string("/etc/lsb-release")
        .ok()
        .and_then(|lsb| {
            lsb.lines()
                .find_map(|l| os_release_value(l, "DISTRIB_DESCRIPTION").map(str::to_string))
        })
        .unwrap_or_else(|| "Linux".to_string())
}

const LANGUAGES: &[(&str, &str)] = &[
    ("pt", "Portuguese"),
    ("en", "English"),
    ("es", "Spanish"),
    ("fr", "French"),
    ("de", "German"),
    ("it", "Italian"),
    ("zh", "Chinese"),
    ("ja", "Japanese"),
    ("ko", "Korean"),
    ("ru", "Russian"),
    ("ar", "Arabic"),
    ("nl", "Dutch"),
    ("pl", "Polish"),
    ("tr", "Turkish"),
    ("uk", "Ukrainian"),
    ("cs", "Czech"),
    ("sv", "Swedish"),
    ("da", "Danish"),
    ("fi", "Finnish"),
    ("no", "Norwegian"),
    ("hu", "Hungarian"),
    ("ro", "Romanian"),
    ("bg", "Bulgarian"),
    ("el", "Greek"),
    ("he", "Hebrew"),
    ("hr", "Croatian"),
    ("sk", "Slovak"),
    ("et", "Estonian"),
    ("is", "Icelandic"),
];

/// Language name for a locale such as `pt_BR.UTF-8`; English if unknown
#[must_use]
pub fn language_for_locale(locale: &str) -> &'static str {
    let prefix = locale
        .split(['_', '.', '@', '-'])
        .next()
        .unwrap_or_default()
        .to_lowercase();
    LANGUAGES
        .iter()
        .find(|(code, _)| *code == prefix)
        .map_or("English", |(_, name)| name)
}

/// Locale from `LC_ALL`, `LC_MESSAGES` or `LANG`
#[must_use]
pub fn current_locale() -> String {
    ["LC_ALL", "LC_MESSAGES", "LANG"]
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .find(|v| !v.is_empty() && v != "C" && v != "POSIX")
        .unwrap_or_else(|| "en_US".to_string())
}

/// System prompt asking for a JSON reply in `language`
#[must_use]
pub fn system_prompt(os_context: &str, language: &str) -> String {
    format!(
        "You are an expert Linux terminal assistant running on {os_context}. \
         Your goal is to provide accurate, safe, and executable command-line solutions.\n\n\
         **CRITICAL RULES:**\n\
         1. **OUTPUT FORMAT:** You must respond with RAW JSON only. Do NOT wrap the output in \
         markdown code blocks (like ```json ... ```).\n\
         2. **JSON STRUCTURE:** {{ \"reply\": \"<explanation using markdown>\", \
         \"commands\": [\"<cmd1>\", \"<cmd2>\"] }}\n\
         3. **LANGUAGE:** Respond strictly in {language}.\n\
         4. **SCOPE:** Answer only Linux, networking, coding, and sysadmin questions. \
         Politely refuse off-topic requests.\n\n\
         **FIELD DETAILS:**\n\
         - 'reply': The explanation text. You MAY use Markdown (bold, lists, inline code) \
         inside this string for readability.\n\
         - 'commands': A list of standalone, executable shell commands appropriate for \
         {os_context}. Do not include placeholders like '<file>' unless necessary.\n"
    )
}

/// System prompt for this machine
#[must_use]
pub fn default_system_prompt() -> String {
    system_prompt(&detect_os_context(), language_for_locale(&current_locale()))
}

/// Messages for a request: the system prompt, then the conversation so far,
/// then the new prompt
#[must_use]
pub fn build_messages(system: &str, history: &[ChatMessage], prompt: &str) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(ChatMessage::new(ChatRole::System, system));
    messages.extend(history.iter().filter(|m| m.role != ChatRole::System).cloned());
    messages.push(ChatMessage::new(ChatRole::User, prompt));
    messages
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn os_release_parsing() {
        let release = "NAME=\"BigLinux\"\nPRETTY_NAME=\"BigLinux 2025\"\nID_LIKE=arch\n";
        assert_eq!(os_context_from_release(release), "BigLinux 2025 (based on arch)");
        assert_eq!(os_context_from_release("PRETTY_NAME=\"Fedora\"\n"), "Fedora");
        assert_eq!(os_context_from_release(""), "Linux");
    }

    #[test]
    fn languages() {
        assert_eq!(language_for_locale("pt_BR.UTF-8"), "Portuguese");
        assert_eq!(language_for_locale("de"), "German");
        assert_eq!(language_for_locale("tlh_QO"), "English");
    }

    #[test]
    fn prompt_and_messages() {
        let prompt = system_prompt("Debian", "Spanish");
        assert!(prompt.contains("running on Debian."));
        assert!(prompt.contains("Respond strictly in Spanish"));
        assert!(prompt.contains("{ \"reply\""));

        let history = vec![
            ChatMessage::new(ChatRole::User, "hi"),
            ChatMessage::new(ChatRole::Assistant, "hello"),
        ];
        let messages = build_messages(&prompt, &history, "disk usage?");
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0].role, ChatRole::System);
        assert_eq!(messages[3].content, "disk usage?");
    }
}
