//! Property-based tests for saved layouts
//!
//! A tab captured into a layout and restored again must come back with the
//! same shape: the same splits, ratios, terminals and working directories.

use proptest::prelude::*;
use zashterminal_core::helpers::sanitize_name;
use zashterminal_core::layout::{LayoutNode, layout_file_stem};
use zashterminal_core::split::{PaneOrientation, PaneTree, TerminalRef};

fn orientation_strategy() -> impl Strategy<Value = PaneOrientation> {
    prop_oneof![
        Just(PaneOrientation::Horizontal),
        Just(PaneOrientation::Vertical),
    ]
}

fn local_terminal(i: usize, dir: Option<&String>) -> TerminalRef {
    let terminal = TerminalRef::local(format!("shell {i}"));
    match dir {
        Some(d) => terminal.with_working_dir(d.clone()),
        None => terminal,
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_restored_tabs_keep_their_shape(
        ops in prop::collection::vec(
            (any::<usize>(), orientation_strategy(), prop::option::of("/[a-z]{1,6}")),
            0..8,
        ),
        ratio in 0.0..1.0f64,
    ) {
        let mut tree = PaneTree::new(local_terminal(0, None));
        for (i, (pick, orientation, dir)) in ops.iter().enumerate() {
            let panes = tree.panes();
            let target = panes[pick % panes.len()].id;
            tree.split(target, *orientation, local_terminal(i + 1, dir.as_ref())).unwrap();
        }
        let first = tree.first_pane().id;
        tree.update_ratio(first, ratio);

        let layout = LayoutNode::from_tree(&tree);
        prop_assert_eq!(layout.terminal_count(), tree.pane_count());

        let (restored, launches) = layout.restore_tree(&[]);
        prop_assert_eq!(launches.len(), tree.pane_count());
        prop_assert_eq!(restored.pane_count(), tree.pane_count());
        prop_assert_eq!(LayoutNode::from_tree(&restored), layout);
    }

    #[test]
    fn prop_layout_stems_have_no_spaces(name in ".{0,40}") {
        let stem = layout_file_stem(&name);
        prop_assert!(!stem.contains(' '));
        prop_assert_eq!(stem.len(), sanitize_name(&name).len());
    }
}
