//! Property-based tests for the settings store
//!
//! Whatever is on disk, one load must leave the file in a state that the
//! next load accepts as is, and anything saved must come back unchanged.

use proptest::prelude::*;
use serde_json::{Value, json};
use zashterminal_core::config::{ConfigPaths, SettingsManager};

fn valid_font() -> impl Strategy<Value = String> {
    ("[A-Z][a-z]{2,8}", prop_oneof![Just("Mono"), Just("Sans Mono"), Just("Code")], 6u8..30)
        .prop_map(|(family, style, size)| format!("{family} {style} {size}"))
}

fn any_json_scalar() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<bool>().prop_map(Value::Bool),
        (-500i64..500).prop_map(Value::from),
        (-2000i32..2000).prop_map(|q| Value::from(f64::from(q) / 4.0)),
        ".{0,16}".prop_map(Value::String),
        Just(Value::Null),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_saved_settings_reload_equal(
        scheme in 0usize..13,
        transparency in 0i64..=100,
        font in valid_font(),
        bell in any::<bool>(),
        sidebar in any::<bool>(),
    ) {
        let dir = tempfile::tempdir().unwrap();
        let paths = ConfigPaths::with_root(dir.path());
        let manager = SettingsManager::load(&paths);
        manager.set_no_save("color_scheme", json!(scheme)).unwrap();
        manager.set_no_save("transparency", json!(transparency)).unwrap();
        manager.set_no_save("font", json!(font)).unwrap();
        manager.set_no_save("bell_sound", json!(bell)).unwrap();
        manager.set_no_save("sidebar_visible", json!(sidebar)).unwrap();
        manager.save(false).unwrap();

        let reloaded = SettingsManager::load(&paths);
        prop_assert!(!reloaded.is_dirty());
        prop_assert_eq!(reloaded.snapshot(), manager.snapshot());
    }

    #[test]
    fn prop_repair_is_idempotent(
        scheme in any_json_scalar(),
        transparency in any_json_scalar(),
        font in any_json_scalar(),
        sidebar in any_json_scalar(),
        drop_shortcuts in any::<bool>(),
    ) {
        let dir = tempfile::tempdir().unwrap();
        let paths = ConfigPaths::with_root(dir.path());
        let mut doc = json!({
            "color_scheme": scheme,
            "transparency": transparency,
            "font": font,
            "sidebar_visible": sidebar,
            "shortcuts": {"copy": "<Control>c", "paste": "<Control>c"},
        });
        if drop_shortcuts {
            doc.as_object_mut().unwrap().remove("shortcuts");
        }
        std::fs::write(paths.settings_file(), doc.to_string()).unwrap();

        let repaired = SettingsManager::load(&paths);
        prop_assert!(!repaired.is_dirty());

        let second = SettingsManager::load(&paths);
        prop_assert!(!second.is_dirty());
        prop_assert_eq!(second.snapshot(), repaired.snapshot());
    }
}
