use super::*;

// =============================================================
// MemoryTokenStore
// =============================================================

#[test]
fn memory_store_round_trip() {
    let store = MemoryTokenStore::new();
    assert_eq!(store.load().unwrap(), None);
    store.save("abc").unwrap();
    assert_eq!(store.load().unwrap().as_deref(), Some("abc"));
    store.clear().unwrap();
    assert_eq!(store.load().unwrap(), None);
}

// =============================================================
// FileTokenStore
// =============================================================

#[test]
fn file_store_missing_file_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileTokenStore::new(dir.path().join("session"));
    assert_eq!(store.load().unwrap(), None);
    store.clear().unwrap();
}

#[test]
fn file_store_creates_parent_dirs() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileTokenStore::new(dir.path().join("nested/deeper/session"));
    store.save("tok-123").unwrap();
    assert_eq!(store.load().unwrap().as_deref(), Some("tok-123"));
    assert!(store.path().exists());
}

#[test]
fn file_store_trims_and_ignores_blank() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session");
    std::fs::write(&path, "  tok-9\n").unwrap();
    let store = FileTokenStore::new(&path);
    assert_eq!(store.load().unwrap().as_deref(), Some("tok-9"));

    std::fs::write(&path, "\n").unwrap();
    assert_eq!(store.load().unwrap(), None);
}

#[test]
fn file_store_clear_removes_file() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileTokenStore::new(dir.path().join("session"));
    store.save("tok").unwrap();
    store.clear().unwrap();
    assert!(!store.path().exists());
    assert_eq!(store.load().unwrap(), None);
}

#[cfg(unix)]
#[test]
fn file_store_is_owner_only() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().unwrap();
    let store = FileTokenStore::new(dir.path().join("session"));
    store.save("tok").unwrap();
    let mode = std::fs::metadata(store.path()).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o600);
}

#[cfg(unix)]
#[test]
fn file_store_tightens_existing_file_before_writing() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session");
    std::fs::write(&path, "old-token-with-longer-text").unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();

    let store = FileTokenStore::new(&path);
    store.save("new").unwrap();
    let mode = std::fs::metadata(&path).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o600);
    assert_eq!(store.load().unwrap().as_deref(), Some("new"));
}
