//! Session snapshot of an authenticated identity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::user::{User, UserRole};

/// Identity captured at login time.
///
/// A snapshot, not a live reference: later edits to the source user record
/// do not change an active session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    #[serde(alias = "usuario")]
    pub username: String,
    #[serde(alias = "rol")]
    pub role: UserRole,
    #[serde(alias = "centro")]
    pub center: String,
    #[serde(alias = "login_en")]
    pub login_at: DateTime<Utc>,
}

impl Session {
    /// Snapshot `user`, stamping the login time now.
    pub fn for_user(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            username: user.username.clone(),
            role: user.role,
            center: user.center.clone(),
            login_at: Utc::now(),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    /// Whether this identity may touch data belonging to `facility`.
    pub fn can_access_facility(&self, facility: &str) -> bool {
        self.is_admin() || self.center == facility
    }
}
