use std::fs;

use taskcoach::session::{Session, DEFAULT_EMAIL};
use taskcoach::storage::Store;
use tempfile::TempDir;

#[test]
fn test_session_starts_logged_out() {
    let dir = TempDir::new().unwrap();
    let session = Session::hydrate(Store::open(dir.path()).unwrap()).unwrap();
    assert!(!session.is_authenticated());
    assert!(session.user().is_none());
}

#[test]
fn test_login_persists_and_rehydrates() {
    let dir = TempDir::new().unwrap();
    let store = Store::open(dir.path()).unwrap();
    let mut session = Session::hydrate(store.clone()).unwrap();

    let user = session.login("grace@example.org").unwrap().clone();
    assert_eq!(user.email, "grace@example.org");
    assert_eq!(user.display_name, "grace");
    assert!(!user.is_pro);

    let restored = Session::hydrate(store).unwrap();
    assert_eq!(restored.user(), Some(&user));
}

#[test]
fn test_blank_login_uses_demo_account() {
    let dir = TempDir::new().unwrap();
    let mut session = Session::hydrate(Store::open(dir.path()).unwrap()).unwrap();
    let user = session.login("  ").unwrap();
    assert_eq!(user.email, DEFAULT_EMAIL);
    assert_eq!(user.display_name, "demo");
}

#[test]
fn test_logout_clears_saved_user() {
    let dir = TempDir::new().unwrap();
    let store = Store::open(dir.path()).unwrap();
    let mut session = Session::hydrate(store.clone()).unwrap();
    session.login("someone@example.com").unwrap();
    session.logout().unwrap();

    assert!(!session.is_authenticated());
    assert!(!dir.path().join("user.json").exists());
    assert!(!Session::hydrate(store).unwrap().is_authenticated());

    // Logging out twice is harmless.
    session.logout().unwrap();
}

#[test]
fn test_corrupt_user_file_is_reported() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("user.json"), "not json").unwrap();
    assert!(Session::hydrate(Store::open(dir.path()).unwrap()).is_err());
}
