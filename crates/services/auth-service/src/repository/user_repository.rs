//! Credential Store: the persisted users collection.
//!
//! Every mutation reloads the whole collection, validates the username and
//! center invariants against it, and writes it back in one piece while
//! holding the store's write lock. A failed validation leaves the persisted
//! collection untouched.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use common::{AppError, AppResult, OptionExt};
use domain::{User, UserRole};

use crate::infra::{read_json, write_json, KeyValueStore};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// A user about to be stored; the password is already a digest.
#[derive(Debug, Clone, PartialEq)]
pub struct NewUser {
    pub username: String,
    pub password_digest: String,
    pub role: UserRole,
    pub center: String,
}

/// Partial update at the storage level; the password is already a digest.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserChanges {
    pub username: Option<String>,
    pub password_digest: Option<String>,
    pub role: Option<UserRole>,
    pub center: Option<String>,
    pub active: Option<bool>,
}

/// User repository trait for dependency injection.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
pub trait UserRepository: Send + Sync {
    /// Every stored user; empty when the collection was never written
    fn list(&self) -> AppResult<Vec<User>>;

    /// Find user by id
    fn find_by_id(&self, id: &str) -> AppResult<Option<User>>;

    /// Find user by exact, case-sensitive username
    fn find_by_username(&self, username: &str) -> AppResult<Option<User>>;

    /// Validate and append a new active user
    fn create(&self, new_user: NewUser) -> AppResult<User>;

    /// Apply a partial update, revalidating the invariants
    fn update(&self, id: &str, changes: UserChanges) -> AppResult<User>;

    /// Remove a user, returning the removed record
    fn delete(&self, id: &str) -> AppResult<User>;

    /// Store `user` only if the collection is empty. Returns whether it was stored.
    fn seed(&self, user: User) -> AppResult<bool>;

    /// Drop the whole collection
    fn clear(&self) -> AppResult<()>;
}

/// Concrete implementation of UserRepository over a key/value store.
pub struct UserStore {
    kv: Arc<dyn KeyValueStore>,
    key: String,
    write_lock: Mutex<()>,
}

impl UserStore {
    /// Create new repository instance
    pub fn new(kv: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        Self {
            kv,
            key: key.into(),
            write_lock: Mutex::new(()),
        }
    }

    fn load(&self) -> AppResult<Vec<User>> {
        Ok(read_json(self.kv.as_ref(), &self.key)?.unwrap_or_default())
    }

    fn save(&self, users: &[User]) -> AppResult<()> {
        write_json(self.kv.as_ref(), &self.key, users)?;
        debug!(count = users.len(), "users collection saved");
        Ok(())
    }
}

fn duplicate_username(username: &str) -> AppError {
    AppError::validation(format!("username \"{}\" already exists", username))
}

fn center_taken(center: &str) -> AppError {
    AppError::validation(format!(
        "center \"{}\" already has a user; only one user per center is allowed",
        center
    ))
}

impl UserRepository for UserStore {
    fn list(&self) -> AppResult<Vec<User>> {
        self.load()
    }

    fn find_by_id(&self, id: &str) -> AppResult<Option<User>> {
        Ok(self.load()?.into_iter().find(|u| u.id == id))
    }

    fn find_by_username(&self, username: &str) -> AppResult<Option<User>> {
        Ok(self.load()?.into_iter().find(|u| u.username == username))
    }

    fn create(&self, new_user: NewUser) -> AppResult<User> {
        let username = new_user.username.trim().to_string();
        let center = new_user.center.trim().to_string();
        if username.is_empty() || new_user.password_digest.is_empty() || center.is_empty() {
            return Err(AppError::validation("all fields are required"));
        }

        let _guard = self.write_lock.lock();
        let mut users = self.load()?;

        if users.iter().any(|u| u.username == username) {
            return Err(duplicate_username(&username));
        }
        if new_user.role.is_center_bound() && users.iter().any(|u| u.claims_center(&center)) {
            return Err(center_taken(&center));
        }

        let user = User::new(
            domain::user::generate_user_id(),
            username,
            new_user.password_digest,
            new_user.role,
            center,
        );
        users.push(user.clone());
        self.save(&users)?;

        Ok(user)
    }

    fn update(&self, id: &str, changes: UserChanges) -> AppResult<User> {
        let _guard = self.write_lock.lock();
        let mut users = self.load()?;

        let index = users
            .iter()
            .position(|u| u.id == id)
            .ok_or_not_found("User")?;
        let others = || users.iter().filter(|u| u.id != id);

        let username = changes.username.as_deref().map(str::trim);
        if let Some(name) = username {
            if name.is_empty() {
                return Err(AppError::validation("username must not be empty"));
            }
            if others().any(|u| u.username == name) {
                return Err(duplicate_username(name));
            }
        }

        let current = &users[index];
        let role = changes.role.unwrap_or(current.role);
        let center = match changes.center.as_deref().map(str::trim) {
            Some("") => return Err(AppError::validation("center must not be empty")),
            Some(center) => center.to_string(),
            None => current.center.clone(),
        };
        let slot_changes = role != current.role || center != current.center;
        if role.is_center_bound() && slot_changes && others().any(|u| u.claims_center(&center)) {
            return Err(center_taken(&center));
        }

        let username = username.map(str::to_string);
        let user = &mut users[index];
        if let Some(name) = username {
            user.username = name;
        }
        if let Some(digest) = changes.password_digest {
            user.password_digest = digest;
        }
        if let Some(active) = changes.active {
            user.active = active;
        }
        user.role = role;
        user.center = center;
        user.touch();

        let updated = user.clone();
        self.save(&users)?;

        Ok(updated)
    }

    fn delete(&self, id: &str) -> AppResult<User> {
        let _guard = self.write_lock.lock();
        let mut users = self.load()?;

        let index = users
            .iter()
            .position(|u| u.id == id)
            .ok_or_not_found("User")?;
        let removed = users.remove(index);
        self.save(&users)?;

        Ok(removed)
    }

    fn seed(&self, user: User) -> AppResult<bool> {
        let _guard = self.write_lock.lock();
        if !self.load()?.is_empty() {
            return Ok(false);
        }
        self.save(&[user])?;
        Ok(true)
    }

    fn clear(&self) -> AppResult<()> {
        let _guard = self.write_lock.lock();
        self.kv.remove(&self.key)
    }
}
