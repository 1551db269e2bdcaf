//! Property-based tests for the session tree filter

use proptest::prelude::*;
use zashterminal_core::models::{SessionFolder, SessionItem};
use zashterminal_core::sessions::{SessionTree, TreeNode};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_match_keeps_ancestors_visible_and_expanded(
        chain in prop::collection::vec("[a-m]{1,6}", 1..5),
        decoys in prop::collection::vec("[a-m]{1,6}", 0..4),
        prefix in "[a-m]{0,4}",
        suffix in "[a-m]{0,4}",
    ) {
        let mut folders = Vec::new();
        let mut parent = String::new();
        for name in &chain {
            let folder = SessionFolder::new(name, &parent);
            parent = folder.path.clone();
            folders.push(folder);
        }
        for name in &decoys {
            folders.push(SessionFolder::new(&format!("{name}-other"), ""));
        }
        let mut target = SessionItem::local(&format!("{prefix}xyz{suffix}"));
        target.set_folder_path(&parent);
        let decoy = SessionItem::ssh("plain", "example.com", "", 22);

        let mut tree = SessionTree::build(vec![target.clone(), decoy], folders.clone(), Vec::new());
        tree.set_filter_text("XYZ");

        let rows = tree.visible_rows();
        prop_assert!(rows.iter().any(|(_, n)| *n == TreeNode::Session(target.clone())));
        prop_assert!(!rows.iter().any(|(_, n)| n.name() == "plain"));
        for folder in &folders[..chain.len()] {
            prop_assert!(tree.is_visible(&TreeNode::Folder(folder.clone())), "{}", folder.path);
            prop_assert!(tree.is_expanded(&folder.path), "{}", folder.path);
        }
        for folder in &folders[chain.len()..] {
            prop_assert!(!tree.is_visible(&TreeNode::Folder(folder.clone())), "{}", folder.path);
        }
    }
}
