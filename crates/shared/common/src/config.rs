//! Shared configuration structures.

use std::path::PathBuf;

use domain::{ADMIN_CENTER, DEFAULT_ADMIN_PASSWORD, DEFAULT_ADMIN_USERNAME};
use serde::{Deserialize, Serialize};

/// Where persisted key/value entries live.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Directory holding one JSON file per key; `None` keeps everything in memory
    pub data_dir: Option<PathBuf>,
}

/// Keys of the persisted entries.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageKeys {
    /// JSON array of user records
    pub users: String,
    /// JSON object of the current session, absent when logged out
    pub session: String,
    /// JSON array of demand records
    pub demand: String,
}

impl Default for StorageKeys {
    fn default() -> Self {
        Self {
            users: "users".to_string(),
            session: "currentSession".to_string(),
            demand: "demandRecords".to_string(),
        }
    }
}

/// Administrator seeded into an empty store.
#[derive(Clone, Deserialize, Serialize)]
pub struct BootstrapConfig {
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub center: String,
}

impl std::fmt::Debug for BootstrapConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BootstrapConfig")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("center", &self.center)
            .finish()
    }
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            username: DEFAULT_ADMIN_USERNAME.to_string(),
            password: DEFAULT_ADMIN_PASSWORD.to_string(),
            center: ADMIN_CENTER.to_string(),
        }
    }
}
