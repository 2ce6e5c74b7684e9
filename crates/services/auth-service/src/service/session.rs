//! Session Manager - who is currently authenticated.
//!
//! The current identity lives in memory and is mirrored under the session
//! key of the key/value store so it survives a restart.

use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;
use tracing::{debug, info, warn};

use common::{AppError, AppResult};
use domain::{Password, PasswordScheme, Session, User, UserRole};

use crate::infra::{write_json, KeyValueStore};
use crate::repository::{UserChanges, UserRepository};

/// Plain text behind the digest verified for unknown usernames.
const DECOY_PASSWORD: &str = "decoy-password-never-stored";

/// Access type picked on the login screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessType {
    Admin,
    /// Center user logging in for the named center
    Center(String),
}

/// Authentication service trait for dependency injection.
pub trait AuthService: Send + Sync {
    /// Adopt the persisted session, if any. Corrupt session bytes force a logout.
    fn restore(&self) -> AppResult<Option<Session>>;

    /// Authenticate and persist a new session
    fn login(&self, username: &str, password: &str) -> AppResult<Session>;

    /// Log in only if the account matches the requested access type.
    /// A rejected call leaves any existing session untouched.
    fn login_as(&self, username: &str, password: &str, access: AccessType) -> AppResult<Session>;

    /// End the session; returns the username that was logged in
    fn logout(&self) -> AppResult<Option<String>>;

    fn current(&self) -> Option<Session>;

    fn is_authenticated(&self) -> bool {
        self.current().is_some()
    }

    fn current_role(&self) -> Option<UserRole> {
        self.current().map(|s| s.role)
    }

    fn current_center(&self) -> Option<String> {
        self.current().map(|s| s.center)
    }

    fn is_admin(&self) -> bool {
        self.current_role().is_some_and(|r| r.is_admin())
    }
}

/// Concrete implementation of AuthService over the Credential Store.
pub struct SessionManager {
    users: Arc<dyn UserRepository>,
    kv: Arc<dyn KeyValueStore>,
    key: String,
    scheme: PasswordScheme,
    current: RwLock<Option<Session>>,
    decoy: OnceLock<Password>,
}

impl SessionManager {
    /// Create a manager with no current identity; call `restore` to adopt a persisted one.
    pub fn new(
        users: Arc<dyn UserRepository>,
        kv: Arc<dyn KeyValueStore>,
        key: impl Into<String>,
        scheme: PasswordScheme,
    ) -> Self {
        let decoy = OnceLock::new();
        if scheme == PasswordScheme::Argon2 {
            let _ = decoy.set(argon2_decoy());
        }

        Self {
            users,
            kv,
            key: key.into(),
            scheme,
            current: RwLock::new(None),
            decoy,
        }
    }

    fn authenticate(&self, username: &str, password: &str) -> AppResult<User> {
        let users = self.users.list()?;
        let candidate = users
            .iter()
            .find(|u| u.username == username && u.active)
            .cloned();

        // Unknown usernames still pay for a verify against the costliest scheme in use
        let stored = match &candidate {
            Some(user) => Password::from_hash(user.password_digest.as_str()),
            None => self.decoy(&users),
        };
        let password_valid = stored.verify(password);

        match candidate {
            Some(user) if password_valid => {
                self.upgrade_digest(&user, &stored, password);
                Ok(user)
            }
            _ => {
                warn!(username, "login rejected");
                Err(AppError::InvalidCredentials)
            }
        }
    }

    fn start_session(&self, user: &User) -> AppResult<Session> {
        let session = Session::for_user(user);
        write_json(self.kv.as_ref(), &self.key, &session)?;
        *self.current.write() = Some(session.clone());

        info!(username = %session.username, role = %session.role, center = %session.center, "logged in");
        Ok(session)
    }

    fn decoy(&self, users: &[User]) -> Password {
        let argon2_in_use = self.scheme == PasswordScheme::Argon2
            || users
                .iter()
                .any(|u| Password::from_hash(u.password_digest.as_str()).scheme() == PasswordScheme::Argon2);

        if argon2_in_use {
            self.decoy.get_or_init(argon2_decoy).clone()
        } else {
            Password::from_hash(Password::legacy_digest(DECOY_PASSWORD))
        }
    }

    /// Re-hash a digest written with an older scheme. Failure leaves the old digest.
    fn upgrade_digest(&self, user: &User, stored: &Password, plain: &str) {
        if !stored.needs_rehash(self.scheme) {
            return;
        }

        let upgraded = Password::new(plain, self.scheme)
            .map_err(AppError::from)
            .and_then(|digest| {
                let changes = UserChanges {
                    password_digest: Some(digest.into_string()),
                    ..Default::default()
                };
                self.users.update(&user.id, changes)
            });

        match upgraded {
            Ok(_) => info!(username = %user.username, scheme = ?self.scheme, "password digest upgraded"),
            Err(e) => warn!(username = %user.username, error = %e, "password digest upgrade failed"),
        }
    }
}

fn argon2_decoy() -> Password {
    Password::new(DECOY_PASSWORD, PasswordScheme::Argon2).unwrap_or_else(|e| {
        warn!(error = %e, "argon2 decoy digest unavailable");
        Password::from_hash(Password::legacy_digest(DECOY_PASSWORD))
    })
}

fn access_mismatch(user: &User, access: &AccessType) -> Option<String> {
    match access {
        AccessType::Admin if !user.is_admin() => {
            Some("this account is not an administrator; use center access".to_string())
        }
        AccessType::Center(_) if user.is_admin() => {
            Some("administrators must use administrator access".to_string())
        }
        AccessType::Center(center) if user.center != center.trim() => Some(format!(
            "user \"{}\" belongs to center \"{}\", not \"{}\"",
            user.username,
            user.center,
            center.trim()
        )),
        _ => None,
    }
}

impl AuthService for SessionManager {
    fn restore(&self) -> AppResult<Option<Session>> {
        let Some(raw) = self.kv.get(&self.key)? else {
            *self.current.write() = None;
            return Ok(None);
        };

        match serde_json::from_str::<Session>(&raw) {
            Ok(session) => {
                debug!(username = %session.username, "session restored");
                *self.current.write() = Some(session.clone());
                Ok(Some(session))
            }
            Err(e) => {
                let err = AppError::CorruptState(format!("session: {}", e));
                warn!(error = %err, "discarding persisted session");
                self.logout()?;
                Ok(None)
            }
        }
    }

    fn login(&self, username: &str, password: &str) -> AppResult<Session> {
        let user = self.authenticate(username, password)?;
        self.start_session(&user)
    }

    fn login_as(&self, username: &str, password: &str, access: AccessType) -> AppResult<Session> {
        if matches!(&access, AccessType::Center(c) if c.trim().is_empty()) {
            return Err(AppError::validation("a center must be selected"));
        }

        let user = self.authenticate(username, password)?;

        if let Some(reason) = access_mismatch(&user, &access) {
            warn!(username, "login refused: access type mismatch");
            return Err(AppError::Validation(reason));
        }
        self.start_session(&user)
    }

    fn logout(&self) -> AppResult<Option<String>> {
        let previous = self.current.write().take();
        self.kv.remove(&self.key)?;

        let username = previous.map(|s| s.username);
        if let Some(name) = &username {
            info!(username = %name, "logged out");
        }
        Ok(username)
    }

    fn current(&self) -> Option<Session> {
        self.current.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::{MemoryStore, MockKeyValueStore};
    use crate::repository::{MockUserRepository, NewUser, UserStore};

    const SESSION_KEY: &str = "currentSession";

    struct Fixture {
        kv: Arc<MemoryStore>,
        users: Arc<UserStore>,
        manager: SessionManager,
    }

    fn fixture(scheme: PasswordScheme) -> Fixture {
        let kv = Arc::new(MemoryStore::new());
        let users = Arc::new(UserStore::new(kv.clone(), "users"));
        let manager = SessionManager::new(users.clone(), kv.clone(), SESSION_KEY, scheme);
        Fixture { kv, users, manager }
    }

    fn add_user(users: &UserStore, username: &str, password: &str, role: UserRole, center: &str) -> User {
        users
            .create(NewUser {
                username: username.into(),
                password_digest: Password::legacy_digest(password),
                role,
                center: center.into(),
            })
            .unwrap()
    }

    #[test]
    fn test_login_snapshots_user() {
        let f = fixture(PasswordScheme::Legacy);
        let nurse = add_user(&f.users, "nurse1", "secret1", UserRole::User, "Center A");

        let session = f.manager.login("nurse1", "secret1").unwrap();

        assert_eq!(session.id, nurse.id);
        assert_eq!(session.center, "Center A");
        assert!(f.manager.is_authenticated());
        assert!(!f.manager.is_admin());
        assert_eq!(f.manager.current_role(), Some(UserRole::User));
        assert_eq!(f.manager.current_center().as_deref(), Some("Center A"));
        assert!(f.kv.get(SESSION_KEY).unwrap().is_some());
    }

    #[test]
    fn test_login_failures_are_indistinguishable() {
        let f = fixture(PasswordScheme::Legacy);
        add_user(&f.users, "nurse1", "secret1", UserRole::User, "Center A");
        let idle = add_user(&f.users, "idle", "secret3", UserRole::User, "Center B");
        f.users
            .update(
                &idle.id,
                UserChanges {
                    active: Some(false),
                    ..Default::default()
                },
            )
            .unwrap();

        let wrong_password = f.manager.login("nurse1", "secret2").unwrap_err();
        let unknown_user = f.manager.login("ghost", "secret1").unwrap_err();
        let inactive = f.manager.login("idle", "secret3").unwrap_err();

        for err in [&wrong_password, &unknown_user, &inactive] {
            assert!(matches!(err, AppError::InvalidCredentials));
            assert_eq!(err.user_message(), wrong_password.user_message());
        }
        assert!(!f.manager.is_authenticated());
    }

    #[test]
    fn test_restore_round_trip_and_logout() {
        let f = fixture(PasswordScheme::Legacy);
        add_user(&f.users, "nurse1", "secret1", UserRole::User, "Center A");
        let session = f.manager.login("nurse1", "secret1").unwrap();

        let reloaded = SessionManager::new(f.users.clone(), f.kv.clone(), SESSION_KEY, PasswordScheme::Legacy);
        assert_eq!(reloaded.restore().unwrap(), Some(session));

        assert_eq!(reloaded.logout().unwrap().as_deref(), Some("nurse1"));
        assert_eq!(reloaded.logout().unwrap(), None);

        let again = SessionManager::new(f.users.clone(), f.kv.clone(), SESSION_KEY, PasswordScheme::Legacy);
        assert_eq!(again.restore().unwrap(), None);
        assert!(!again.is_authenticated());
    }

    #[test]
    fn test_session_is_a_snapshot() {
        let f = fixture(PasswordScheme::Legacy);
        let nurse = add_user(&f.users, "nurse1", "secret1", UserRole::User, "Center A");
        f.manager.login("nurse1", "secret1").unwrap();

        f.users
            .update(
                &nurse.id,
                UserChanges {
                    center: Some("Center B".into()),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(f.manager.current_center().as_deref(), Some("Center A"));
    }

    #[test]
    fn test_corrupt_session_forces_logout() {
        let mut kv = MockKeyValueStore::new();
        kv.expect_get()
            .withf(|key| key == SESSION_KEY)
            .returning(|_| Ok(Some("{\"usuario\": ".to_string())));
        kv.expect_remove()
            .withf(|key| key == SESSION_KEY)
            .times(1)
            .returning(|_| Ok(()));

        let manager = SessionManager::new(
            Arc::new(MockUserRepository::new()),
            Arc::new(kv),
            SESSION_KEY,
            PasswordScheme::Legacy,
        );

        assert_eq!(manager.restore().unwrap(), None);
        assert!(!manager.is_authenticated());
    }

    #[test]
    fn test_login_as_checks_access_type() {
        let f = fixture(PasswordScheme::Legacy);
        add_user(&f.users, "admin", "admin123", UserRole::Admin, "ADMINISTRACIÓN");
        add_user(&f.users, "nurse1", "secret1", UserRole::User, "Center A");

        let err = f
            .manager
            .login_as("nurse1", "secret1", AccessType::Admin)
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let err = f
            .manager
            .login_as("admin", "admin123", AccessType::Center("Center A".into()))
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(ref m) if m.contains("administrator access")));

        let err = f
            .manager
            .login_as("nurse1", "secret1", AccessType::Center("Center B".into()))
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(ref m) if m.contains("Center A")));
        assert!(!f.manager.is_authenticated());
        assert!(f.kv.get(SESSION_KEY).unwrap().is_none());

        let session = f
            .manager
            .login_as("nurse1", "secret1", AccessType::Center("Center A".into()))
            .unwrap();
        assert_eq!(session.username, "nurse1");
    }

    #[test]
    fn test_login_as_wrong_password_stays_generic() {
        let f = fixture(PasswordScheme::Legacy);
        add_user(&f.users, "nurse1", "secret1", UserRole::User, "Center A");

        let err = f
            .manager
            .login_as("nurse1", "nope", AccessType::Admin)
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidCredentials));

        let err = f
            .manager
            .login_as("nurse1", "secret1", AccessType::Center("  ".into()))
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_argon2_scheme_upgrades_legacy_digest() {
        let f = fixture(PasswordScheme::Argon2);
        let nurse = add_user(&f.users, "nurse1", "secret1", UserRole::User, "Center A");
        assert_eq!(nurse.password_digest, "756e8781");

        f.manager.login("nurse1", "secret1").unwrap();

        let stored = f.users.find_by_id(&nurse.id).unwrap().unwrap();
        assert!(stored.password_digest.starts_with("$argon2"));

        f.manager.logout().unwrap();
        assert!(f.manager.login("nurse1", "secret1").is_ok());
    }

    #[test]
    fn test_legacy_scheme_leaves_digest_alone() {
        let f = fixture(PasswordScheme::Legacy);
        let nurse = add_user(&f.users, "nurse1", "secret1", UserRole::User, "Center A");

        f.manager.login("nurse1", "secret1").unwrap();

        let stored = f.users.find_by_id(&nurse.id).unwrap().unwrap();
        assert_eq!(stored.password_digest, "756e8781");
        assert!(stored.updated_at.is_none());
    }

    #[test]
    fn test_legacy_scheme_keeps_argon2_digest() {
        let f = fixture(PasswordScheme::Legacy);
        let digest = Password::new("secret1", PasswordScheme::Argon2)
            .unwrap()
            .into_string();
        let nurse = f
            .users
            .create(NewUser {
                username: "nurse1".into(),
                password_digest: digest.clone(),
                role: UserRole::User,
                center: "Center A".into(),
            })
            .unwrap();

        f.manager.login("nurse1", "secret1").unwrap();

        let stored = f.users.find_by_id(&nurse.id).unwrap().unwrap();
        assert_eq!(stored.password_digest, digest);
        assert!(stored.updated_at.is_none());
    }

    #[test]
    fn test_unknown_user_verifies_against_argon2_when_in_use() {
        let argon2 = fixture(PasswordScheme::Argon2);
        assert_eq!(argon2.manager.decoy(&[]).scheme(), PasswordScheme::Argon2);
        assert!(matches!(
            argon2.manager.login("ghost", DECOY_PASSWORD),
            Err(AppError::InvalidCredentials)
        ));

        let legacy = fixture(PasswordScheme::Legacy);
        let nurse = add_user(&legacy.users, "nurse1", "secret1", UserRole::User, "Center A");
        assert_eq!(legacy.manager.decoy(&[nurse.clone()]).scheme(), PasswordScheme::Legacy);

        let mut migrated = nurse;
        migrated.password_digest = Password::new("secret1", PasswordScheme::Argon2)
            .unwrap()
            .into_string();
        assert_eq!(legacy.manager.decoy(&[migrated]).scheme(), PasswordScheme::Argon2);
    }

    #[test]
    fn test_refused_login_as_keeps_existing_session() {
        let f = fixture(PasswordScheme::Legacy);
        add_user(&f.users, "admin", "admin123", UserRole::Admin, "ADMINISTRACIÓN");
        add_user(&f.users, "nurse1", "secret1", UserRole::User, "Center A");
        let admin = f.manager.login("admin", "admin123").unwrap();

        let err = f
            .manager
            .login_as("nurse1", "secret1", AccessType::Admin)
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        assert_eq!(f.manager.current(), Some(admin.clone()));
        let persisted: Session = serde_json::from_str(&f.kv.get(SESSION_KEY).unwrap().unwrap()).unwrap();
        assert_eq!(persisted, admin);
    }
}
