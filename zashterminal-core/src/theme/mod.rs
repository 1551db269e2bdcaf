//! Color schemes and generated CSS
//!
//! Everything here is toolkit-independent: the GUI crate feeds the CSS
//! strings into style providers and maps [`TerminalAppearance`] onto the
//! terminal widget.

mod color;
mod css;
mod scheme;
mod terminal;

pub use color::{
    FALLBACK_PALETTE, Rgb, adaptive_alpha, contrasting_text_color, resolve_palette,
    transparency_curve,
};
pub use css::{
    MIN_STYLED_LUMINANCE, ThemeCssCache, ThemeCssParams, build_terminal_theme_css,
    dynamic_dialog_css, headerbar_base_color, headerbar_transparency_css,
    terminal_transparency_css,
};
pub use scheme::{ColorScheme, SCHEME_ORDER, SchemeRegistry, builtin_schemes};
pub use terminal::{CursorBlink, CursorShape, EraseBinding, TerminalAppearance, TextBlink};
