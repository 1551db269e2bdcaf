//! Markdown subset to Pango markup for chat bubbles

use std::sync::LazyLock;

use regex::{Captures, Regex};

static CODE_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```(\w*)\n?(.*?)```").expect("CODE_BLOCK is a valid regex pattern")
});
static INLINE_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"`([^`]+)`").expect("INLINE_CODE is a valid regex pattern"));
static BOLD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*([^*]+)\*\*").expect("BOLD is a valid regex pattern"));
static ITALIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*([^*]+)\*").expect("ITALIC is a valid regex pattern"));
static HEADER3: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^### (.+)$").expect("HEADER3 is a valid regex pattern"));
static HEADER2: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^## (.+)$").expect("HEADER2 is a valid regex pattern"));
static HEADER1: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^# (.+)$").expect("HEADER1 is a valid regex pattern"));
static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new("\u{e000}(B|I)(\\d+)\u{e001}").expect("PLACEHOLDER is a valid regex pattern")
});

/// Colors for code spans
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodeColors {
    /// Fenced block background
    pub block_bg: &'static str,
    /// Fenced block text
    pub block_fg: &'static str,
    /// Inline code background
    pub inline_bg: &'static str,
    /// Inline code text
    pub inline_fg: &'static str,
}

impl CodeColors {
    /// For dark themes
    pub const DARK: Self = Self {
        block_bg: "#2d2d2d",
        block_fg: "#e6e6e6",
        inline_bg: "#3d3d3d",
        inline_fg: "#ff79c6",
    };

    /// For light themes
    pub const LIGHT: Self = Self {
        block_bg: "#f0f0f0",
        block_fg: "#24292e",
        inline_bg: "#eff1f3",
        inline_fg: "#d63384",
    };

    /// Palette for the current theme
    #[must_use]
    pub const fn for_dark_theme(dark: bool) -> Self {
        if dark { Self::DARK } else { Self::LIGHT }
    }
}

/// Escapes text for Pango markup
#[must_use]
pub fn escape_markup(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\'' => out.push_str("&#39;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

/// Converts chat markdown to Pango markup.
///
/// Code blocks and inline code are set aside first so that emphasis markers
/// inside code stay literal; everything else is escaped before bold,
/// italic and header markers are translated.
#[must_use]
pub fn markdown_to_pango(text: &str, colors: CodeColors) -> String {
    let mut blocks: Vec<String> = Vec::new();
    let mut inlines: Vec<String> = Vec::new();

    let text = CODE_BLOCK.replace_all(text, |caps: &Captures<'_>| {
        let code = caps.get(2).map_or("", |m| m.as_str());
        blocks.push(format!(
            "<span background=\"{}\" foreground=\"{}\"><tt>{}</tt></span>",
            colors.block_bg,
            colors.block_fg,
            escape_markup(code.trim_end_matches('\n'))
        ));
        format!("\u{e000}B{}\u{e001}", blocks.len() - 1)
    });
    let text = INLINE_CODE.replace_all(&text, |caps: &Captures<'_>| {
        inlines.push(format!(
            "<span background=\"{}\" foreground=\"{}\"><tt>{}</tt></span>",
            colors.inline_bg,
            colors.inline_fg,
            escape_markup(&caps[1])
        ));
        format!("\u{e000}I{}\u{e001}", inlines.len() - 1)
    });

    let text = escape_markup(&text);
    let text = BOLD.replace_all(&text, "<b>$1</b>");
    let text = ITALIC.replace_all(&text, "<i>$1</i>");
    let text = HEADER3.replace_all(&text, "<b>$1</b>");
    let text = HEADER2.replace_all(&text, "<b><big>$1</big></b>");
    let text = HEADER1.replace_all(&text, "<b><big><big>$1</big></big></b>");

    PLACEHOLDER
        .replace_all(&text, |caps: &Captures<'_>| {
            let store = if &caps[1] == "B" { &blocks } else { &inlines };
            caps[2]
                .parse::<usize>()
                .ok()
                .and_then(|i| store.get(i))
                .cloned()
                .unwrap_or_default()
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emphasis_and_headers() {
        let out = markdown_to_pango("# Title\n**bold** and *it* <tag>", CodeColors::DARK);
        assert_eq!(
            out,
            "<b><big><big>Title</big></big></b>\n<b>bold</b> and <i>it</i> &lt;tag&gt;"
        );
    }

    #[test]
    fn code_is_protected() {
        let out = markdown_to_pango("run `ls *.rs*` now", CodeColors::LIGHT);
        assert!(out.contains("<tt>ls *.rs*</tt>"));
        assert!(!out.contains("<i>"));

        let out = markdown_to_pango("```bash\necho \"a<b\" && **x**\n```", CodeColors::DARK);
        assert!(out.starts_with("<span background=\"#2d2d2d\""));
        assert!(out.contains("echo &quot;a&lt;b&quot; &amp;&amp; **x**"));
        assert!(!out.contains("<b>"));
    }
}
