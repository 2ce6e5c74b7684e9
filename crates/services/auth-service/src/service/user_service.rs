//! User service - gated user administration.
//!
//! Every mutating call passes the gate before the Credential Store is
//! touched, so a denied caller never causes a read-modify-write.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::info;

use common::{AppError, AppResult};
use domain::{CreateUser, Password, PasswordScheme, Session, UpdateUser, User, UserResponse};

use crate::repository::{NewUser, UserChanges, UserRepository};
use crate::service::gate::{authorize, Action};
use crate::service::AuthService;

/// User service trait for dependency injection.
pub trait UserService: Send + Sync {
    /// Create a user (admin only)
    fn create_user(&self, input: CreateUser) -> AppResult<User>;

    /// Partially update a user (admin only)
    fn update_user(&self, id: &str, input: UpdateUser) -> AppResult<User>;

    /// Delete a user, returning the removed record (admin only)
    fn delete_user(&self, id: &str) -> AppResult<User>;

    /// Privileged listing (admin only)
    fn list_users(&self) -> AppResult<Vec<UserResponse>>;

    /// Every stored user, ungated. Meant for read-only catalog use.
    fn list_all(&self) -> AppResult<Vec<User>>;

    fn find_by_username(&self, username: &str) -> AppResult<Option<User>>;

    /// Sorted, de-duplicated centers present in the store
    fn centers(&self) -> AppResult<Vec<String>>;
}

/// Concrete implementation of UserService using repository.
pub struct UserManager {
    repo: Arc<dyn UserRepository>,
    auth: Arc<dyn AuthService>,
    scheme: PasswordScheme,
}

impl UserManager {
    /// Create new user service instance with repository
    pub fn new(repo: Arc<dyn UserRepository>, auth: Arc<dyn AuthService>, scheme: PasswordScheme) -> Self {
        Self { repo, auth, scheme }
    }

    /// Gate check against the current session, returning it for audit logs
    fn authorize(&self, action: Action) -> AppResult<Session> {
        let session = self.auth.current();
        authorize(session.as_ref(), &action)?;
        session.ok_or_else(|| AppError::forbidden(action.to_string()))
    }

    fn hash(&self, plain: &str) -> AppResult<String> {
        Ok(Password::new(plain, self.scheme)?.into_string())
    }
}

impl UserService for UserManager {
    fn create_user(&self, input: CreateUser) -> AppResult<User> {
        let actor = self.authorize(Action::CreateUser)?;
        input.validate()?;

        let user = self.repo.create(NewUser {
            username: input.username,
            password_digest: self.hash(&input.password)?,
            role: input.role,
            center: input.center,
        })?;

        info!(
            actor = %actor.username,
            target = %user.username,
            role = %user.role,
            center = %user.center,
            "user created"
        );
        Ok(user)
    }

    fn update_user(&self, id: &str, input: UpdateUser) -> AppResult<User> {
        let actor = self.authorize(Action::UpdateUser)?;
        input.validate()?;

        let password_digest = match input.password.as_deref() {
            Some(plain) => Some(self.hash(plain)?),
            None => None,
        };
        let changes = UserChanges {
            username: input.username,
            password_digest,
            role: input.role,
            center: input.center,
            active: input.active,
        };
        let user = self.repo.update(id, changes)?;

        info!(actor = %actor.username, target = %user.username, "user updated");
        Ok(user)
    }

    fn delete_user(&self, id: &str) -> AppResult<User> {
        let actor = self.authorize(Action::DeleteUser)?;

        let removed = self.repo.delete(id)?;

        info!(actor = %actor.username, target = %removed.username, "user deleted");
        Ok(removed)
    }

    fn list_users(&self) -> AppResult<Vec<UserResponse>> {
        self.authorize(Action::ListUsers)?;
        Ok(self.repo.list()?.into_iter().map(UserResponse::from).collect())
    }

    fn list_all(&self) -> AppResult<Vec<User>> {
        self.repo.list()
    }

    fn find_by_username(&self, username: &str) -> AppResult<Option<User>> {
        self.repo.find_by_username(username)
    }

    fn centers(&self) -> AppResult<Vec<String>> {
        let centers: BTreeSet<String> = self.repo.list()?.into_iter().map(|u| u.center).collect();
        Ok(centers.into_iter().collect())
    }
}
