//! End-to-end tests of the assembled authentication core.

use std::sync::Arc;

use auth_service_lib::config::AuthServiceConfig;
use auth_service_lib::infra::{FileStore, KeyValueStore, MemoryStore};
use auth_service_lib::service::{AuthService, UserService};
use auth_service_lib::AuthSystem;
use common::AppError;
use domain::{CreateUser, PasswordScheme, UpdateUser, User, UserRole};

fn fresh_system() -> (AuthSystem, Arc<MemoryStore>) {
    let kv = Arc::new(MemoryStore::new());
    let system = AuthSystem::new(AuthServiceConfig::default(), kv.clone()).unwrap();
    (system, kv)
}

fn nurse(username: &str, password: &str, center: &str) -> CreateUser {
    CreateUser::new(username, password, UserRole::User, center)
}

fn count_center_users(users: &[User], center: &str) -> usize {
    users
        .iter()
        .filter(|u| u.role == UserRole::User && u.center == center)
        .count()
}

// =============================================================================
// Scenarios
// =============================================================================

#[test]
fn test_center_slot_is_freed_by_moving_its_user() {
    let (system, _) = fresh_system();
    let auth = system.auth();
    let users = system.users();

    let session = auth.login("admin", "admin123").unwrap();
    assert_eq!(session.role, UserRole::Admin);

    let nurse1 = users
        .create_user(nurse("nurse1", "secret1", "Center A"))
        .unwrap();

    let err = users
        .create_user(nurse("nurse2", "secret2", "Center A"))
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let moved = UpdateUser {
        center: Some("Center B".into()),
        ..Default::default()
    };
    users.update_user(&nurse1.id, moved).unwrap();

    let nurse2 = users
        .create_user(nurse("nurse2", "secret2", "Center A"))
        .unwrap();
    assert_eq!(nurse2.center, "Center A");

    let all = users.list_all().unwrap();
    assert_eq!(count_center_users(&all, "Center A"), 1);
    assert_eq!(count_center_users(&all, "Center B"), 1);
}

#[test]
fn test_delete_unknown_id_is_not_found() {
    let (system, _) = fresh_system();
    system.auth().login("admin", "admin123").unwrap();

    let err = system.users().delete_user("usr_does_not_exist").unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[test]
fn test_center_user_cannot_create_and_store_is_unchanged() {
    let (system, kv) = fresh_system();
    let auth = system.auth();
    let users = system.users();

    auth.login("admin", "admin123").unwrap();
    users
        .create_user(nurse("nurse1", "secret1", "Center A"))
        .unwrap();
    auth.logout().unwrap();

    auth.login("nurse1", "secret1").unwrap();
    let before = kv.get("users").unwrap();

    let err = users
        .create_user(nurse("nurse2", "secret2", "Center B"))
        .unwrap_err();

    assert!(matches!(err, AppError::Forbidden(_)));
    assert_eq!(kv.get("users").unwrap(), before);
}

#[test]
fn test_duplicate_usernames_never_coexist() {
    let (system, _) = fresh_system();
    system.auth().login("admin", "admin123").unwrap();
    let users = system.users();

    for (i, name) in ["a", "b", "a", "admin", "b", "c"].iter().enumerate() {
        let _ = users.create_user(nurse(name, "pw", &format!("Center {}", i)));
    }

    let mut names: Vec<String> = users.list_all().unwrap().into_iter().map(|u| u.username).collect();
    let total = names.len();
    names.sort();
    names.dedup();
    assert_eq!(names.len(), total);
    assert_eq!(total, 4);
}

#[test]
fn test_deactivated_user_cannot_log_in() {
    let (system, _) = fresh_system();
    let auth = system.auth();
    let users = system.users();

    auth.login("admin", "admin123").unwrap();
    let nurse1 = users
        .create_user(nurse("nurse1", "secret1", "Center A"))
        .unwrap();
    let deactivate = UpdateUser {
        active: Some(false),
        ..Default::default()
    };
    users.update_user(&nurse1.id, deactivate).unwrap();
    auth.logout().unwrap();

    assert!(matches!(
        auth.login("nurse1", "secret1"),
        Err(AppError::InvalidCredentials)
    ));
}

// =============================================================================
// Start-up, persistence and reset
// =============================================================================

#[test]
fn test_startup_seeds_admin_once() {
    let kv = Arc::new(MemoryStore::new());

    let first = AuthSystem::new(AuthServiceConfig::default(), kv.clone()).unwrap();
    assert_eq!(first.users().list_all().unwrap().len(), 1);

    let second = AuthSystem::new(AuthServiceConfig::default(), kv.clone()).unwrap();
    assert_eq!(second.users().list_all().unwrap().len(), 1);
}

#[test]
fn test_session_survives_restart_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let config = AuthServiceConfig::default().with_data_dir(dir.path());

    {
        let system = AuthSystem::open(config.clone()).unwrap();
        system.auth().login("admin", "admin123").unwrap();
    }

    let reopened = AuthSystem::open(config.clone()).unwrap();
    let auth = reopened.auth();
    assert!(auth.is_admin());
    assert_eq!(auth.current().map(|s| s.username).as_deref(), Some("admin"));

    auth.logout().unwrap();
    let after_logout = AuthSystem::open(config).unwrap();
    assert!(!after_logout.auth().is_authenticated());
}

#[test]
fn test_corrupt_session_file_is_discarded_at_startup() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::open(dir.path()).unwrap();
    store.set("currentSession", "{ definitely not a session").unwrap();

    let config = AuthServiceConfig::default().with_data_dir(dir.path());
    let system = AuthSystem::open(config).unwrap();

    assert!(!system.auth().is_authenticated());
    assert!(!dir.path().join("currentSession.json").exists());
}

#[test]
fn test_reads_collections_written_by_the_browser_app() {
    let kv = Arc::new(MemoryStore::new());
    kv.set(
        "users",
        r#"[{"id":"usr_admin_default_1700000000000","usuario":"admin","contraseña":"-139c43b7d","rol":"admin","centro":"ADMINISTRACIÓN","activo":true,"creado_en":"2024-01-10T09:00:00.000Z"},
            {"id":"usr_1700000000001_abc123def","usuario":"nurse1","contraseña":"756e8781","rol":"usuario","centro":"Center A","activo":true,"creado_en":"2024-01-11T09:00:00.000Z"}]"#,
    )
    .unwrap();

    let system = AuthSystem::new(AuthServiceConfig::default(), kv).unwrap();
    let session = system.auth().login("nurse1", "secret1").unwrap();

    assert_eq!(session.role, UserRole::User);
    assert_eq!(session.center, "Center A");
    assert_eq!(system.users().list_all().unwrap().len(), 2);
}

#[test]
fn test_reset_brings_back_the_default_admin() {
    let (system, _) = fresh_system();
    let auth = system.auth();
    auth.login("admin", "admin123").unwrap();
    system
        .users()
        .create_user(nurse("nurse1", "secret1", "Center A"))
        .unwrap();

    system.bootstrap().reset().unwrap();

    assert!(!auth.is_authenticated());
    let all = system.users().list_all().unwrap();
    assert_eq!(all.len(), 1);
    assert!(auth.login("admin", "admin123").is_ok());
}

#[test]
fn test_argon2_deployment_hashes_new_users() {
    let kv = Arc::new(MemoryStore::new());
    let config = AuthServiceConfig {
        password_scheme: PasswordScheme::Argon2,
        ..Default::default()
    };
    let system = AuthSystem::new(config, kv).unwrap();
    let auth = system.auth();

    auth.login("admin", "admin123").unwrap();
    let created = system
        .users()
        .create_user(nurse("nurse1", "secret1", "Center A"))
        .unwrap();
    assert!(created.password_digest.starts_with("$argon2"));

    auth.logout().unwrap();
    assert!(auth.login("nurse1", "secret1").is_ok());
    assert!(auth.login("nurse1", "secret2").is_err());
}
