//! Tabs and split panes
//!
//! Each tab owns a binary tree of panes. The GTK layer mirrors the tree with
//! nested `gtk::Paned` widgets, but every structural decision (where a split
//! goes, which sibling is promoted when a pane closes, what happens when a
//! process exits) is made on the model here.
//!
//! # Module Structure
//!
//! - `types` - identifiers, orientation and the terminal reference held by a pane
//! - `tree` - the per-tab pane tree (`PaneTree`, `PaneNode`)
//! - `tabs` - the tab strip (`TabManagerModel`) and title derivation
//! - `error` - `PaneError`
//!
//! # Example
//!
//! ```
//! use zashterminal_core::split::{PaneOrientation, TabManagerModel, TerminalRef};
//!
//! let mut tabs = TabManagerModel::new();
//! let tab = tabs.add_tab(TerminalRef::local("Local"), None);
//! let pane = tabs.tab(tab).unwrap().panes().first_pane().id;
//!
//! tabs.split_pane(pane, PaneOrientation::Vertical, TerminalRef::ssh("web")).unwrap();
//! assert_eq!(tabs.tab(tab).unwrap().panes().pane_count(), 2);
//! ```

mod error;
mod tabs;
mod tree;
mod types;

pub use error::{PaneError, PaneResult};
pub use tabs::{ExitAction, TabManagerModel, TabModel, derive_tab_title, tab_move_index};
pub use tree::{
    CloseOutcome, DEFAULT_SPLIT_RATIO, MAX_SPLIT_RATIO, MIN_SPLIT_RATIO, PaneLeaf, PaneNode,
    PaneTree, clamp_ratio,
};
pub use types::{PaneId, PaneOrientation, TabId, TerminalRef, TerminalStatus};
