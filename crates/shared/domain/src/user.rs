//! User domain entity and related types.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_ADMIN_ID_PREFIX, LEGACY_ROLE_USER, ROLE_ADMIN, ROLE_USER, USER_ID_PREFIX,
    USER_ID_SUFFIX_LENGTH,
};
use crate::error::{DomainError, DomainResult};

const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// User roles enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    #[serde(alias = "usuario")]
    User,
    Admin,
}

impl UserRole {
    /// Check if this role has admin privileges
    pub fn is_admin(&self) -> bool {
        matches!(self, UserRole::Admin)
    }

    /// Whether records with this role are limited to one per center
    pub fn is_center_bound(&self) -> bool {
        matches!(self, UserRole::User)
    }
}

impl std::str::FromStr for UserRole {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            ROLE_ADMIN => Ok(UserRole::Admin),
            ROLE_USER | LEGACY_ROLE_USER => Ok(UserRole::User),
            other => Err(DomainError::validation(format!("unknown role \"{}\"", other))),
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UserRole::Admin => write!(f, "{}", ROLE_ADMIN),
            UserRole::User => write!(f, "{}", ROLE_USER),
        }
    }
}

/// Generate an id of the form `usr_<unix-millis>_<9 base-36 chars>`.
///
/// Uniqueness is probabilistic: two ids collide only when they are generated
/// in the same millisecond and draw the same 9-character suffix.
pub fn generate_user_id() -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..USER_ID_SUFFIX_LENGTH)
        .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
        .collect();
    format!("{}{}_{}", USER_ID_PREFIX, Utc::now().timestamp_millis(), suffix)
}

/// Id given to the administrator seeded into an empty store.
pub fn default_admin_id() -> String {
    format!("{}{}", DEFAULT_ADMIN_ID_PREFIX, Utc::now().timestamp_millis())
}

/// User domain entity, as persisted in the users collection.
///
/// Field aliases accept collections written by the original browser
/// application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    #[serde(alias = "usuario")]
    pub username: String,
    #[serde(alias = "contraseña")]
    pub password_digest: String,
    #[serde(alias = "rol")]
    pub role: UserRole,
    #[serde(alias = "centro")]
    pub center: String,
    /// Only active users may authenticate; a missing flag reads as inactive
    #[serde(alias = "activo", default)]
    pub active: bool,
    #[serde(alias = "creado_en")]
    pub created_at: DateTime<Utc>,
    #[serde(alias = "actualizado_en", default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl User {
    /// Create a new active user
    pub fn new(
        id: String,
        username: String,
        password_digest: String,
        role: UserRole,
        center: String,
    ) -> Self {
        Self {
            id,
            username,
            password_digest,
            role,
            center,
            active: true,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    /// Check if user has admin role
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    /// Whether this record occupies the single user slot of `center`
    pub fn claims_center(&self, center: &str) -> bool {
        self.role.is_center_bound() && self.center == center
    }

    /// Stamp the update timestamp
    pub fn touch(&mut self) {
        self.updated_at = Some(Utc::now());
    }
}

/// User creation data transfer object (plain text password)
#[derive(Debug, Clone, Deserialize)]
pub struct CreateUser {
    pub username: String,
    pub password: String,
    pub role: UserRole,
    pub center: String,
}

impl CreateUser {
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        role: UserRole,
        center: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            role,
            center: center.into(),
        }
    }

    /// Reject blank fields. The role is typed and always present.
    pub fn validate(&self) -> DomainResult<()> {
        if self.username.trim().is_empty()
            || self.password.is_empty()
            || self.center.trim().is_empty()
        {
            return Err(DomainError::validation("all fields are required"));
        }
        Ok(())
    }
}

/// Partial user update (plain text password). `None` leaves a field untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateUser {
    pub username: Option<String>,
    pub password: Option<String>,
    pub role: Option<UserRole>,
    pub center: Option<String>,
    pub active: Option<bool>,
}

impl UpdateUser {
    /// Reject supplied-but-blank fields
    pub fn validate(&self) -> DomainResult<()> {
        let blank = |value: &Option<String>| value.as_deref().is_some_and(|v| v.trim().is_empty());

        if blank(&self.username) {
            return Err(DomainError::validation("username must not be empty"));
        }
        if self.password.as_deref().is_some_and(str::is_empty) {
            return Err(DomainError::validation("password must not be empty"));
        }
        if blank(&self.center) {
            return Err(DomainError::validation("center must not be empty"));
        }
        Ok(())
    }
}

/// User response (safe to show: no digest)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: String,
    pub username: String,
    pub role: UserRole,
    pub center: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            role: user.role,
            center: user.center,
            active: user.active,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}
