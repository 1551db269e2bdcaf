//! Terminal appearance resolved from settings
//!
//! The GUI maps these toolkit-neutral values onto VTE enums. Index-valued
//! settings out of range fall back to the first entry.

use crate::config::SettingsManager;
use crate::config::defaults::FALLBACK_FONT;

use super::color::{Rgb, adaptive_alpha, resolve_palette};
use super::scheme::ColorScheme;

/// Cursor shape, `cursor_shape` setting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CursorShape {
    /// Filled block
    #[default]
    Block,
    /// Vertical bar
    IBeam,
    /// Underline
    Underline,
}

/// Cursor blinking, `cursor_blink` setting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CursorBlink {
    /// Follow the desktop setting
    #[default]
    System,
    /// Always blink
    On,
    /// Never blink
    Off,
}

/// When blinking text blinks, `text_blink_mode` setting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextBlink {
    /// Only while focused
    #[default]
    Focused,
    /// Only while unfocused
    Unfocused,
}

/// What Backspace / Delete send
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EraseBinding {
    /// Terminal default
    #[default]
    Auto,
    /// `^H`
    AsciiBackspace,
    /// `^?`
    AsciiDelete,
    /// `ESC [ 3 ~`
    DeleteSequence,
}

fn pick<T: Copy + Default>(table: &[T], index: i64) -> T {
    usize::try_from(index)
        .ok()
        .and_then(|i| table.get(i).copied())
        .unwrap_or_default()
}

impl CursorShape {
    /// Maps the setting index
    #[must_use]
    pub fn from_index(index: i64) -> Self {
        pick(&[Self::Block, Self::IBeam, Self::Underline], index)
    }
}

impl CursorBlink {
    /// Maps the setting index
    #[must_use]
    pub fn from_index(index: i64) -> Self {
        pick(&[Self::System, Self::On, Self::Off], index)
    }
}

impl TextBlink {
    /// Maps the setting index
    #[must_use]
    pub fn from_index(index: i64) -> Self {
        pick(&[Self::Focused, Self::Unfocused], index)
    }
}

impl EraseBinding {
    /// Maps the `backspace_binding` index
    #[must_use]
    pub fn backspace_from_index(index: i64) -> Self {
        pick(
            &[
                Self::Auto,
                Self::AsciiBackspace,
                Self::AsciiDelete,
                Self::DeleteSequence,
            ],
            index,
        )
    }

    /// Maps the `delete_binding` index
    #[must_use]
    pub fn delete_from_index(index: i64) -> Self {
        pick(&[Self::Auto, Self::AsciiDelete, Self::DeleteSequence], index)
    }
}

/// Everything a terminal widget needs from the settings
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq)]
pub struct TerminalAppearance {
    pub foreground: Rgb,
    pub background: Rgb,
    /// Background alpha after the transparency curve
    pub background_alpha: f64,
    pub cursor: Rgb,
    pub palette: [Rgb; 16],
    pub font: String,
    pub font_scale: f64,
    pub line_spacing: f64,
    pub bold_is_bright: bool,
    pub cursor_shape: CursorShape,
    pub cursor_blink: CursorBlink,
    pub text_blink: TextBlink,
    pub backspace: EraseBinding,
    pub delete: EraseBinding,
    pub scrollback_lines: i64,
    pub scroll_on_keystroke: bool,
    pub scroll_on_insert: bool,
    pub mouse_autohide: bool,
    pub audible_bell: bool,
    pub bidi: bool,
    pub shaping: bool,
    pub sixel: bool,
    pub word_char_exceptions: String,
    pub cjk_ambiguous_width: i64,
}

impl TerminalAppearance {
    /// Resolves the appearance for `scheme` from the current settings
    #[must_use]
    pub fn from_settings(settings: &SettingsManager, scheme: &ColorScheme) -> Self {
        let foreground = Rgb::parse(&scheme.foreground).unwrap_or(Rgb::new(255, 255, 255));
        let font = settings.font();
        Self {
            foreground,
            background: Rgb::parse(&scheme.background).unwrap_or_default(),
            background_alpha: adaptive_alpha(&scheme.background, settings.transparency()),
            cursor: Rgb::parse(scheme.cursor()).unwrap_or(foreground),
            palette: resolve_palette(&scheme.palette),
            font: if font.trim().is_empty() {
                FALLBACK_FONT.to_string()
            } else {
                font
            },
            font_scale: settings.get_f64("font_scale", 1.0),
            line_spacing: settings.get_f64("line_spacing", 1.0),
            bold_is_bright: settings.get_bool("bold_is_bright", false),
            cursor_shape: CursorShape::from_index(settings.get_i64("cursor_shape", 0)),
            cursor_blink: CursorBlink::from_index(settings.get_i64("cursor_blink", 0)),
            text_blink: TextBlink::from_index(settings.get_i64("text_blink_mode", 0)),
            backspace: EraseBinding::backspace_from_index(settings.get_i64("backspace_binding", 0)),
            delete: EraseBinding::delete_from_index(settings.get_i64("delete_binding", 0)),
            scrollback_lines: settings.get_i64("scrollback_lines", 10_000),
            scroll_on_keystroke: settings.get_bool("scroll_on_keystroke", true),
            scroll_on_insert: settings.get_bool("scroll_on_insert", true),
            mouse_autohide: settings.get_bool("mouse_autohide", true),
            audible_bell: settings.get_bool("bell_sound", false),
            bidi: settings.get_bool("bidi_enabled", false),
            shaping: settings.get_bool("enable_shaping", false),
            sixel: settings.get_bool("sixel_enabled", true),
            word_char_exceptions: settings.get_string("word_char_exceptions", "-_.:/~"),
            cjk_ambiguous_width: settings.get_i64("cjk_ambiguous_width", 1).clamp(1, 2),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigPaths;

    #[test]
    fn out_of_range_indexes_fall_back() {
        assert_eq!(CursorShape::from_index(2), CursorShape::Underline);
        assert_eq!(CursorShape::from_index(7), CursorShape::Block);
        assert_eq!(CursorBlink::from_index(-1), CursorBlink::System);
        assert_eq!(TextBlink::from_index(1), TextBlink::Unfocused);
        assert_eq!(EraseBinding::backspace_from_index(3), EraseBinding::DeleteSequence);
        assert_eq!(EraseBinding::delete_from_index(3), EraseBinding::Auto);
    }

    #[test]
    fn appearance_follows_settings() {
        let dir = tempfile::tempdir().expect("tempdir");
        let settings = SettingsManager::load(&ConfigPaths::with_root(dir.path()));
        settings
            .set_no_save("cursor_shape", serde_json::json!(1))
            .expect("set");
        settings
            .set_no_save("transparency", serde_json::json!(0))
            .expect("set");
        let scheme = settings.color_scheme();
        let appearance = TerminalAppearance::from_settings(&settings, &scheme);
        assert_eq!(appearance.cursor_shape, CursorShape::IBeam);
        assert!((appearance.background_alpha - 1.0).abs() < f64::EPSILON);
        assert_eq!(appearance.scrollback_lines, 10_000);
    }
}
