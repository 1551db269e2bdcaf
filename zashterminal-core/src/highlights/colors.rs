//! Rule color specs
//!
//! A spec is a space separated list of words: modifiers (`bold`, `dim`,
//! `italic`, `underline`, `blink`, `reverse`, `strikethrough`), an optional
//! background (`on_red`, `on_bright_blue`) and a foreground color name.

use crate::theme::{ColorScheme, FALLBACK_PALETTE};

/// Names of the 16 ANSI colors, in palette order
pub const ANSI_COLOR_NAMES: [&str; 16] = [
    "black",
    "red",
    "green",
    "yellow",
    "blue",
    "magenta",
    "cyan",
    "white",
    "bright_black",
    "bright_red",
    "bright_green",
    "bright_yellow",
    "bright_blue",
    "bright_magenta",
    "bright_cyan",
    "bright_white",
];

/// Resets all attributes
pub const ANSI_RESET: &str = "\x1b[0m";

// Names that mean "leave the terminal default in place"
const THEME_COLOR_NAMES: [&str; 5] = ["foreground", "background", "cursor", "none", "default"];

fn ansi_index(name: &str) -> Option<usize> {
    ANSI_COLOR_NAMES.iter().position(|n| *n == name)
}

fn modifier_code(name: &str) -> Option<&'static str> {
    Some(match name {
        "bold" => "1",
        "dim" => "2",
        "italic" => "3",
        "underline" => "4",
        "blink" => "5",
        "reverse" => "7",
        "strikethrough" => "9",
        _ => return None,
    })
}

fn color_code(index: usize, base: usize, bright_base: usize) -> String {
    if index < 8 {
        (base + index).to_string()
    } else {
        (bright_base + index - 8).to_string()
    }
}

/// SGR sequence for a color spec, or an empty string for an empty spec.
///
/// Unknown foreground names map to plain white (`37`).
#[must_use]
pub fn resolve_color_to_ansi(spec: &str) -> String {
    let lowered = spec.to_lowercase();
    let mut codes: Vec<String> = Vec::new();
    let mut foreground: Option<&str> = None;

    for part in lowered.split_whitespace() {
        if let Some(code) = modifier_code(part) {
            codes.push(code.to_string());
        } else if let Some(bg) = part.strip_prefix("on_") {
            if let Some(index) = ansi_index(bg) {
                codes.push(color_code(index, 40, 100));
            }
        } else {
            foreground = Some(part);
        }
    }

    if let Some(fg) = foreground {
        match ansi_index(fg) {
            Some(index) => codes.push(color_code(index, 30, 90)),
            None if THEME_COLOR_NAMES.contains(&fg) => {}
            None => codes.push("37".to_string()),
        }
    }

    if codes.is_empty() {
        String::new()
    } else {
        format!("\x1b[{}m", codes.join(";"))
    }
}

/// Hex color a spec renders as under `scheme`, for editor swatches.
///
/// Only the last word counts; modifiers and backgrounds are ignored.
/// Unknown names give `#ffffff`.
#[must_use]
pub fn resolve_color_to_hex(spec: &str, scheme: &ColorScheme) -> String {
    let lowered = spec.to_lowercase();
    let Some(base) = lowered.split_whitespace().last() else {
        return scheme.foreground.clone();
    };
    match base {
        "foreground" | "default" | "none" => scheme.foreground.clone(),
        "background" => scheme.background.clone(),
        "cursor" => scheme.cursor().to_string(),
        hex if hex.starts_with('#') => hex.to_string(),
        name => ansi_index(name).map_or_else(
            || "#ffffff".to_string(),
            |i| {
                scheme
                    .palette
                    .get(i)
                    .cloned()
                    .unwrap_or_else(|| FALLBACK_PALETTE[i].to_string())
            },
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ansi_sequences() {
        assert_eq!(resolve_color_to_ansi("red"), "\x1b[31m");
        assert_eq!(resolve_color_to_ansi("Bold Bright_Green"), "\x1b[1;92m");
        assert_eq!(resolve_color_to_ansi("underline on_blue white"), "\x1b[4;44;37m");
        assert_eq!(resolve_color_to_ansi("on_bright_black"), "\x1b[100m");
        assert_eq!(resolve_color_to_ansi("italic chartreuse"), "\x1b[3;37m");
        assert_eq!(resolve_color_to_ansi("bold foreground"), "\x1b[1m");
        assert_eq!(resolve_color_to_ansi("default"), "");
        assert_eq!(resolve_color_to_ansi("   "), "");
    }

    #[test]
    fn hex_for_swatches() {
        let scheme = crate::theme::builtin_schemes()
            .get("dark")
            .cloned()
            .unwrap();
        assert_eq!(resolve_color_to_hex("bold red", &scheme), scheme.palette[1]);
        assert_eq!(resolve_color_to_hex("foreground", &scheme), scheme.foreground);
        assert_eq!(resolve_color_to_hex("#12ab34", &scheme), "#12ab34");
        assert_eq!(resolve_color_to_hex("mauve", &scheme), "#ffffff");
    }
}
