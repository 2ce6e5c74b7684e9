//! Auth service configuration.

use std::env;
use std::path::PathBuf;

use common::{BootstrapConfig, StorageConfig, StorageKeys};
use domain::PasswordScheme;
use tracing::warn;

/// Auth service configuration.
#[derive(Debug, Clone, Default)]
pub struct AuthServiceConfig {
    /// Where the key/value entries live
    pub storage: StorageConfig,
    /// Keys of the users collection and the session
    pub keys: StorageKeys,
    /// Administrator seeded into an empty store
    pub bootstrap: BootstrapConfig,
    /// Scheme for newly stored digests
    pub password_scheme: PasswordScheme,
}

impl AuthServiceConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self::from_vars(|name| env::var(name).ok())
    }

    /// Load configuration through `var`, falling back to defaults for unset names.
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = BootstrapConfig::default();

        let password_scheme = match var("RECETAS_PASSWORD_SCHEME") {
            Some(raw) => raw.parse().unwrap_or_else(|e| {
                warn!(error = %e, "falling back to the legacy password scheme");
                PasswordScheme::default()
            }),
            None => PasswordScheme::default(),
        };

        Self {
            storage: StorageConfig {
                data_dir: var("RECETAS_DATA_DIR")
                    .filter(|d| !d.trim().is_empty())
                    .map(PathBuf::from),
            },
            keys: StorageKeys::default(),
            bootstrap: BootstrapConfig {
                username: var("RECETAS_ADMIN_USERNAME").unwrap_or(defaults.username),
                password: var("RECETAS_ADMIN_PASSWORD").unwrap_or(defaults.password),
                center: var("RECETAS_ADMIN_CENTER").unwrap_or(defaults.center),
            },
            password_scheme,
        }
    }

    /// Same configuration with a different data directory.
    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.storage.data_dir = Some(dir.into());
        self
    }
}
