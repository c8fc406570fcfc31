use outliner_settings::{Preferences, PreferencesStore};
use std::fs;
use std::time::Duration;
use tempfile::tempdir;

#[test]
fn load_missing_file_returns_defaults() {
    let temp = tempdir().expect("tempdir");
    let path = temp.path().join("preferences.json");

    let store = PreferencesStore::load(&path).expect("load defaults");
    let prefs = store.preferences();
    assert_eq!(prefs.storage.data_file, "data.json");
    assert!(prefs.storage.backups_enabled);
    assert_eq!(prefs.storage.save_throttle(), Duration::from_secs(1));
    assert_eq!(prefs.storage.backup_interval(), Duration::from_secs(60));
    assert_eq!(prefs.storage.backup_retention, 0);
    assert_eq!(prefs.outline.indent_width, 2);
    assert_eq!(prefs.outline.initial_text, "Hello, world!");
    assert!(!path.exists(), "loading defaults must not create the file");
}

#[test]
fn save_and_reload_roundtrip() {
    let temp = tempdir().expect("tempdir");
    let path = temp.path().join("nested").join("preferences.json");

    let mut store = PreferencesStore::new(path.clone(), Preferences::default());
    store
        .update(|prefs| {
            prefs.storage.backups_enabled = false;
            prefs.storage.backup_retention = 5;
            prefs.outline.indent_width = 4;
            prefs.outline.initial_text = "Inbox".to_string();
        })
        .expect("save");

    let reloaded = PreferencesStore::load(&path).expect("reload");
    assert!(!reloaded.preferences().storage.backups_enabled);
    assert_eq!(reloaded.preferences().storage.backup_retention, 5);
    assert_eq!(reloaded.preferences().outline.indent_width, 4);
    assert_eq!(reloaded.preferences().outline.initial_text, "Inbox");
    assert!(!path.with_extension("tmp").exists());
}

#[test]
fn overwrite_clamps_out_of_range_values() {
    let temp = tempdir().expect("tempdir");
    let path = temp.path().join("preferences.json");

    let mut store = PreferencesStore::load(&path).expect("default");
    let mut prefs = store.preferences().clone();
    prefs.storage.save_throttle_ms = 5;
    prefs.storage.backup_interval_secs = 1_000_000;
    prefs.storage.data_file = "  ".to_string();
    prefs.outline.indent_width = 0;

    store.overwrite(prefs).expect("overwrite");

    let current = store.preferences();
    assert_eq!(current.storage.save_throttle_ms, 100);
    assert_eq!(current.storage.backup_interval_secs, 86_400);
    assert_eq!(current.storage.data_file, "data.json");
    assert_eq!(current.outline.indent_width, 1);
}

#[test]
fn legacy_version_is_upgraded_on_load() {
    let temp = tempdir().expect("tempdir");
    let path = temp.path().join("preferences.json");
    fs::write(
        &path,
        r#"{
            "version": 0,
            "storage": {
                "backups_enabled": false,
                "save_throttle_ms": 0
            }
        }"#,
    )
    .expect("write legacy prefs");

    let store = PreferencesStore::load(&path).expect("load legacy file");
    let prefs = store.preferences();
    assert_eq!(
        prefs.version, 1,
        "legacy preferences should be upgraded to schema version 1"
    );
    assert!(
        !prefs.storage.backups_enabled,
        "explicit values should be preserved during migration"
    );
    assert_eq!(
        prefs.storage.save_throttle_ms, 100,
        "throttle below the floor should be clamped"
    );
    assert_eq!(
        prefs.outline.initial_text, "Hello, world!",
        "missing sections should fall back to defaults"
    );
}

#[test]
fn import_keeps_previous_file_as_backup() {
    let temp = tempdir().expect("tempdir");
    let path = temp.path().join("preferences.json");
    let incoming = temp.path().join("incoming.json");

    let mut store = PreferencesStore::load(&path).expect("default");
    store.save().expect("initial save");
    let original = fs::read_to_string(&path).expect("read original");

    fs::write(&incoming, r#"{ "outline": { "indent_width": 3 } }"#).expect("write incoming");
    store.import_from(&incoming).expect("import");

    assert_eq!(store.preferences().outline.indent_width, 3);
    assert_eq!(
        fs::read_to_string(path.with_extension("bak")).expect("read backup"),
        original
    );
    let exported = temp.path().join("out").join("exported.json");
    store.export_to(&exported).expect("export");
    let reread = PreferencesStore::load(&exported).expect("load export");
    assert_eq!(reread.preferences(), store.preferences());
}
