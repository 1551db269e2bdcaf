//! Property-based tests for tab reordering and exit handling

use proptest::prelude::*;
use zashterminal_core::split::{ExitAction, TabManagerModel, TerminalRef, tab_move_index};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Dropping a tab lands it next to the target on the chosen side
    #[test]
    fn prop_tab_move_lands_beside_target(
        len in 2usize..10,
        moving_seed in any::<usize>(),
        target_seed in any::<usize>(),
        drop_right in any::<bool>(),
    ) {
        let moving = moving_seed % len;
        let target = target_seed % len;
        let mut order: Vec<usize> = (0..len).collect();

        match tab_move_index(moving, target, drop_right) {
            None => {
                prop_assert!(
                    moving == target
                        || (drop_right && moving == target + 1)
                        || (!drop_right && moving + 1 == target)
                );
            }
            Some(index) => {
                prop_assert!(index < len);
                prop_assert_ne!(index, moving);
                let tab = order.remove(moving);
                order.insert(index, tab);
                let pos_moving = order.iter().position(|t| *t == moving).unwrap();
                let pos_target = order.iter().position(|t| *t == target).unwrap();
                if drop_right {
                    prop_assert_eq!(pos_moving, pos_target + 1);
                } else {
                    prop_assert_eq!(pos_moving + 1, pos_target);
                }
            }
        }
    }

    /// The application quits only when the last live terminal exits
    #[test]
    fn prop_quit_only_after_last_terminal(count in 1usize..6) {
        let mut tabs = TabManagerModel::new();
        let ids: Vec<String> = (0..count)
            .map(|i| {
                let terminal = TerminalRef::local(format!("t{i}"));
                let id = terminal.terminal_id.clone();
                tabs.add_tab(terminal, None);
                id
            })
            .collect();

        for (i, id) in ids.iter().enumerate() {
            let action = tabs.on_child_exited(id);
            if i + 1 == count {
                prop_assert!(matches!(action, ExitAction::QuitApplication { .. }), "{:?}", action);
            } else {
                prop_assert!(matches!(action, ExitAction::CloseTab { .. }), "{:?}", action);
                if let ExitAction::CloseTab { tab } = action {
                    tabs.close_tab(tab).unwrap();
                }
            }
        }
    }
}
