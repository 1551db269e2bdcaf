//! Property-based tests for the pane tree
//!
//! Splitting and closing panes in any order must keep the tree consistent:
//! unique pane ids, a leaf count that tracks the operations, and split
//! ratios inside the allowed range.

use std::collections::HashSet;

use proptest::prelude::*;
use zashterminal_core::split::{
    CloseOutcome, MAX_SPLIT_RATIO, MIN_SPLIT_RATIO, PaneNode, PaneOrientation, PaneTree,
    TerminalRef, clamp_ratio,
};

fn orientation_strategy() -> impl Strategy<Value = PaneOrientation> {
    prop_oneof![
        Just(PaneOrientation::Horizontal),
        Just(PaneOrientation::Vertical),
    ]
}

fn ratios_in_range(node: &PaneNode) -> bool {
    match node {
        PaneNode::Leaf(_) => true,
        PaneNode::Split {
            first,
            second,
            ratio,
            ..
        } => {
            (MIN_SPLIT_RATIO..=MAX_SPLIT_RATIO).contains(ratio)
                && ratios_in_range(first)
                && ratios_in_range(second)
        }
    }
}

/// Builds a tree by repeatedly splitting the pane picked by each index
fn build_tree(ops: &[(usize, PaneOrientation)]) -> PaneTree {
    let mut tree = PaneTree::new(TerminalRef::local("root"));
    for (i, (pick, orientation)) in ops.iter().enumerate() {
        let panes = tree.panes();
        let target = panes[pick % panes.len()].id;
        tree.split(target, *orientation, TerminalRef::local(format!("t{i}")))
            .unwrap();
    }
    tree
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_splits_add_one_pane_each(
        ops in prop::collection::vec((any::<usize>(), orientation_strategy()), 0..12),
    ) {
        let tree = build_tree(&ops);
        prop_assert_eq!(tree.pane_count(), ops.len() + 1);
        prop_assert_eq!(tree.is_split(), !ops.is_empty());

        let ids: HashSet<_> = tree.panes().iter().map(|p| p.id).collect();
        prop_assert_eq!(ids.len(), tree.pane_count());
        prop_assert!(ratios_in_range(tree.root()));
    }

    #[test]
    fn prop_closing_every_pane_empties_the_tab_last(
        ops in prop::collection::vec((any::<usize>(), orientation_strategy()), 0..10),
        close_order in any::<u64>(),
    ) {
        let mut tree = build_tree(&ops);
        let mut seed = close_order;
        while tree.pane_count() > 1 {
            let panes = tree.panes();
            let target = panes[(seed as usize) % panes.len()].id;
            seed = seed.rotate_left(7) ^ 0x9e37_79b9;
            let before = tree.pane_count();
            match tree.close(target).unwrap() {
                CloseOutcome::Promoted { removed, focus } => {
                    prop_assert_eq!(removed.id, target);
                    prop_assert!(tree.find(focus).is_some());
                    prop_assert!(tree.find(target).is_none());
                }
                CloseOutcome::TabEmptied(_) => prop_assert!(false, "tab emptied early"),
            }
            prop_assert_eq!(tree.pane_count(), before - 1);
            prop_assert!(ratios_in_range(tree.root()));
        }
        let last = tree.first_pane().id;
        prop_assert!(matches!(tree.close(last), Ok(CloseOutcome::TabEmptied(_))));
    }

    #[test]
    fn prop_ratio_is_always_clamped(ratio in any::<f64>()) {
        let clamped = clamp_ratio(ratio);
        prop_assert!((MIN_SPLIT_RATIO..=MAX_SPLIT_RATIO).contains(&clamped));
    }
}
