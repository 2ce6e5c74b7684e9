//! Bootstrap and reset of the credential store.

use std::sync::Arc;

use tracing::{info, warn};

use common::{AppResult, BootstrapConfig};
use domain::{user::default_admin_id, Password, PasswordScheme, User, UserRole};

use crate::repository::UserRepository;
use crate::service::AuthService;

/// Seeds the default administrator and performs full resets.
pub struct Bootstrap {
    repo: Arc<dyn UserRepository>,
    auth: Arc<dyn AuthService>,
    config: BootstrapConfig,
    scheme: PasswordScheme,
}

impl Bootstrap {
    pub fn new(
        repo: Arc<dyn UserRepository>,
        auth: Arc<dyn AuthService>,
        config: BootstrapConfig,
        scheme: PasswordScheme,
    ) -> Self {
        Self {
            repo,
            auth,
            config,
            scheme,
        }
    }

    /// Store the bootstrap administrator when no user exists.
    ///
    /// Returns `true` when it seeded; an existing collection is left untouched.
    pub fn seed_default_admin(&self) -> AppResult<bool> {
        let digest = Password::new(&self.config.password, self.scheme)?.into_string();
        let admin = User::new(
            default_admin_id(),
            self.config.username.clone(),
            digest,
            UserRole::Admin,
            self.config.center.clone(),
        );

        let seeded = self.repo.seed(admin)?;
        if seeded {
            warn!(
                username = %self.config.username,
                "seeded default administrator; change its password after the first login"
            );
        }
        Ok(seeded)
    }

    /// Drop every user and the session, then seed the default administrator again.
    ///
    /// Not gated: this is the way back in when nobody can log in.
    pub fn reset(&self) -> AppResult<()> {
        let previous = self.auth.logout()?;
        self.repo.clear()?;

        info!(previous_session = ?previous, "system reset");
        self.seed_default_admin()?;
        Ok(())
    }
}
