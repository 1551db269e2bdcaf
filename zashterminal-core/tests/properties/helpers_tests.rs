//! Property-based tests for name sanitizing and unique names

use std::collections::HashSet;

use proptest::prelude::*;
use zashterminal_core::helpers::{MAX_NAME_LENGTH, generate_unique_name, sanitize_name};

const FORBIDDEN: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_sanitized_names_are_file_safe(name in any::<String>()) {
        let clean = sanitize_name(&name);
        prop_assert!(!clean.is_empty());
        prop_assert!(clean.chars().count() <= MAX_NAME_LENGTH);
        prop_assert!(!clean.chars().any(|c| FORBIDDEN.contains(&c) || u32::from(c) < 32));
        prop_assert!(!clean.starts_with(' ') && !clean.starts_with('.'));
    }

    #[test]
    fn prop_unique_name_avoids_existing(
        base in "[a-z]{1,8}",
        taken in prop::collection::vec(0usize..6, 0..6),
        base_taken in any::<bool>(),
    ) {
        let mut existing: HashSet<String> =
            taken.iter().map(|n| format!("{base} ({n})")).collect();
        if base_taken {
            existing.insert(base.clone());
        }
        let name = generate_unique_name(&base, &existing);
        prop_assert!(!existing.contains(&name));
        prop_assert!(name.starts_with(&base));
        if !base_taken {
            prop_assert_eq!(name, base);
        }
    }
}
