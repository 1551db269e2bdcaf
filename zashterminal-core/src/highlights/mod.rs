//! Output highlighting rules
//!
//! Rules are regular expressions paired with color specs. Global rules apply
//! to every terminal; contexts hold extra rules selected by the command that
//! is currently running (`ping`, `systemctl`, ...). [`HighlightManager`]
//! owns the layered configuration and [`OutputHighlighter`] applies a rule
//! set to output lines.

mod colors;
mod manager;
mod output;
mod rules;

pub use colors::{ANSI_COLOR_NAMES, ANSI_RESET, resolve_color_to_ansi, resolve_color_to_hex};
pub use manager::{GLOBAL_CONTEXT, HighlightManager, SYSTEM_HIGHLIGHTS_DIR};
pub use output::{OutputHighlighter, ignored_commands};
pub use rules::{HighlightConfig, HighlightContext, HighlightRule, RuleAction, validate_pattern};
