//! Auth Service Library
//!
//! Credential storage, session lifecycle, the authorization gate and
//! bootstrap/reset for the unmet-demand registry. Everything is synchronous;
//! state is persisted through a [`KeyValueStore`].
//!
//! [`AuthSystem`] wires the pieces together once at start-up. There is no
//! global state: callers hold the system (or the `Arc`s it hands out) and
//! pass it where it is needed.

pub mod config;
pub mod infra;
pub mod repository;
pub mod service;

use std::sync::Arc;

use tracing::{debug, info};

use common::AppResult;

use crate::config::AuthServiceConfig;
use crate::infra::{FileStore, KeyValueStore, MemoryStore};
use crate::repository::{UserRepository, UserStore};
use crate::service::{AuthService, Bootstrap, SessionManager, UserManager, UserService};

/// The assembled authentication core.
pub struct AuthSystem {
    config: AuthServiceConfig,
    kv: Arc<dyn KeyValueStore>,
    auth: Arc<dyn AuthService>,
    users: Arc<dyn UserService>,
    bootstrap: Arc<Bootstrap>,
}

impl AuthSystem {
    /// Open the store named by `config` (file-backed when a data directory is
    /// set, in memory otherwise) and start the system on it.
    pub fn open(config: AuthServiceConfig) -> AppResult<Self> {
        let kv: Arc<dyn KeyValueStore> = match &config.storage.data_dir {
            Some(dir) => Arc::new(FileStore::open(dir)?),
            None => {
                debug!("no data directory configured, using an in-memory store");
                Arc::new(MemoryStore::new())
            }
        };
        Self::new(config, kv)
    }

    /// Start the system on an existing store: restore the persisted session,
    /// then seed the default administrator if the store has no users.
    pub fn new(config: AuthServiceConfig, kv: Arc<dyn KeyValueStore>) -> AppResult<Self> {
        let scheme = config.password_scheme;
        let repo: Arc<dyn UserRepository> = Arc::new(UserStore::new(kv.clone(), config.keys.users.clone()));
        let auth: Arc<dyn AuthService> = Arc::new(SessionManager::new(
            repo.clone(),
            kv.clone(),
            config.keys.session.clone(),
            scheme,
        ));
        let users: Arc<dyn UserService> = Arc::new(UserManager::new(repo.clone(), auth.clone(), scheme));
        let bootstrap = Arc::new(Bootstrap::new(repo, auth.clone(), config.bootstrap.clone(), scheme));

        let restored = auth.restore()?;
        bootstrap.seed_default_admin()?;
        info!(
            session = restored.as_ref().map(|s| s.username.as_str()),
            scheme = ?scheme,
            "auth system ready"
        );

        Ok(Self {
            config,
            kv,
            auth,
            users,
            bootstrap,
        })
    }

    pub fn config(&self) -> &AuthServiceConfig {
        &self.config
    }

    /// Backing key/value store, shared with other services
    pub fn store(&self) -> Arc<dyn KeyValueStore> {
        self.kv.clone()
    }

    /// Get the session manager
    pub fn auth(&self) -> Arc<dyn AuthService> {
        self.auth.clone()
    }

    /// Get the user administration service
    pub fn users(&self) -> Arc<dyn UserService> {
        self.users.clone()
    }

    pub fn bootstrap(&self) -> Arc<Bootstrap> {
        self.bootstrap.clone()
    }
}
