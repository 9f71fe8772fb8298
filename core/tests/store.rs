//! Save-file store tests.

use std::fs;
use worldsave_core::{error::SaveError, store::SaveStore};

#[test]
fn write_replaces_longer_file_with_exact_contents() {
    let dir = tempfile::tempdir().unwrap();
    let store = SaveStore::new(dir.path().join("save.dat"));

    store.write_atomic(&"A".repeat(4_096)).unwrap();
    let written = store.write_atomic("short-save").unwrap();

    assert_eq!(written, 10);
    assert_eq!(fs::read_to_string(store.path()).unwrap(), "short-save");
    assert!(!store.temp_path().exists(), "temp file must be renamed away");
}

#[test]
fn stale_temp_file_from_a_crash_is_overwritten() {
    let dir = tempfile::tempdir().unwrap();
    let store = SaveStore::new(dir.path().join("save.dat"));
    store.write_atomic("previous").unwrap();

    // A crash between create and rename leaves a partial temp file behind.
    fs::write(store.temp_path(), "half-writ").unwrap();
    store.write_atomic("next").unwrap();

    assert_eq!(store.read().unwrap(), "next");
    assert!(!store.temp_path().exists());
}

#[test]
fn write_creates_missing_directories() {
    let dir = tempfile::tempdir().unwrap();
    let store = SaveStore::new(dir.path().join("profiles").join("slot1").join("save.dat"));

    store.write_atomic("blob").unwrap();

    assert!(store.exists());
    assert_eq!(store.temp_path(), dir.path().join("profiles/slot1/save.dat.tmp"));
}

#[test]
fn read_of_missing_file_is_no_save_file() {
    let dir = tempfile::tempdir().unwrap();
    let store = SaveStore::new(dir.path().join("save.dat"));

    assert!(matches!(store.read(), Err(SaveError::NoSaveFile { .. })));
    assert!(!store.delete().unwrap());
}
