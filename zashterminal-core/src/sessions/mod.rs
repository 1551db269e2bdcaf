//! Saved sessions and folders: persistence, mutations and the sidebar tree

mod operations;
mod storage;
mod tree;

pub use operations::{OperationResult, SessionEntry, SessionOperations};
pub use storage::{MAX_SESSIONS_FILE_SIZE, SessionStorage};
pub use tree::{
    EXPANDED_FOLDERS_KEY, KeyIntent, KeyModifiers, SessionTree, TreeClipboard, TreeKey, TreeNode,
    key_intent, paste_target, trim_search_text,
};
pub(crate) use storage::to_json_pretty4;
