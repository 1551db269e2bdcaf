//! Saved window layouts and the session state restored at startup
//!
//! Both use the same node format, see [`LayoutNode`].

mod node;
mod state;
mod store;

pub use node::{LayoutNode, RestoredTerminal};
pub use state::{RESTORE_ALWAYS, RESTORE_ASK, RESTORE_NEVER, SessionStateFile};
pub use store::{LayoutStore, SavedLayout, layout_file_stem};
