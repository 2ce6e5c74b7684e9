//! Password value object - Domain layer password handling.
//!
//! Two digest formats live side by side in a store:
//!
//! - the legacy integer-folding digest written by the original browser
//!   application (fast, unsalted, kept only for bit-compatibility), and
//! - Argon2id PHC strings for stores configured with [`PasswordScheme::Argon2`].
//!
//! [`Password::verify`] dispatches on the stored format, so a store can be
//! migrated one login at a time.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// Prefix shared by every Argon2 PHC string.
const ARGON2_PREFIX: &str = "$argon2";

/// Hashing scheme used for newly stored passwords.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PasswordScheme {
    /// Legacy digest, compatible with stores written by the original application
    #[default]
    Legacy,
    /// Salted Argon2id
    Argon2,
}

impl std::str::FromStr for PasswordScheme {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "legacy" => Ok(PasswordScheme::Legacy),
            "argon2" => Ok(PasswordScheme::Argon2),
            other => Err(DomainError::validation(format!(
                "unknown password scheme \"{}\"",
                other
            ))),
        }
    }
}

/// Password value object holding a stored digest.
#[derive(Clone)]
pub struct Password {
    hash: String,
}

// Don't expose hash in debug output (security)
impl std::fmt::Debug for Password {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Password")
            .field("hash", &"[REDACTED]")
            .finish()
    }
}

impl Password {
    /// Hash a plain text password with the given scheme.
    ///
    /// # Errors
    /// Returns a password error if Argon2 hashing fails.
    pub fn new(plain_text: &str, scheme: PasswordScheme) -> DomainResult<Self> {
        let hash = match scheme {
            PasswordScheme::Legacy => Self::legacy_digest(plain_text),
            PasswordScheme::Argon2 => Self::argon2_hash(plain_text)?,
        };
        Ok(Self { hash })
    }

    /// Wrap an existing stored digest.
    pub fn from_hash(hash: impl Into<String>) -> Self {
        Self { hash: hash.into() }
    }

    /// Get the digest string for storage.
    pub fn as_str(&self) -> &str {
        &self.hash
    }

    /// Consume and return the digest string.
    pub fn into_string(self) -> String {
        self.hash
    }

    /// Scheme the stored digest was produced with.
    pub fn scheme(&self) -> PasswordScheme {
        if self.hash.starts_with(ARGON2_PREFIX) {
            PasswordScheme::Argon2
        } else {
            PasswordScheme::Legacy
        }
    }

    /// Whether this digest should be replaced when `target` is the configured scheme.
    ///
    /// Only legacy digests are ever replaced, and only by Argon2. An Argon2
    /// digest is kept under any configuration.
    pub fn needs_rehash(&self, target: PasswordScheme) -> bool {
        self.scheme() == PasswordScheme::Legacy && target == PasswordScheme::Argon2
    }

    /// Verify a plain text password against this digest.
    pub fn verify(&self, plain_text: &str) -> bool {
        match self.scheme() {
            PasswordScheme::Legacy => Self::legacy_digest(plain_text) == self.hash,
            PasswordScheme::Argon2 => Self::argon2_verify(plain_text, &self.hash).unwrap_or(false),
        }
    }

    /// Legacy digest: fold every UTF-16 code unit into `h = (h << 5) - h + unit`
    /// where the shift operates on the value truncated to a signed 32-bit
    /// integer while the subtraction and addition do not. The result is
    /// rendered as signed lowercase hexadecimal.
    pub fn legacy_digest(plain_text: &str) -> String {
        if plain_text.is_empty() {
            return "0".to_string();
        }

        let hash = plain_text.encode_utf16().fold(0i64, |hash, unit| {
            let shifted = (hash as i32).wrapping_shl(5) as i64;
            shifted - hash + unit as i64
        });

        if hash < 0 {
            format!("-{:x}", hash.unsigned_abs())
        } else {
            format!("{:x}", hash)
        }
    }

    fn argon2_hash(plain_text: &str) -> DomainResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Self::argon2()
            .hash_password(plain_text.as_bytes(), &salt)
            .map_err(|e| DomainError::password(format!("hash failed: {}", e)))?;
        Ok(hash.to_string())
    }

    fn argon2_verify(plain_text: &str, hash: &str) -> DomainResult<bool> {
        let parsed = PasswordHash::new(hash)
            .map_err(|e| DomainError::password(format!("invalid hash format: {}", e)))?;
        Ok(Self::argon2()
            .verify_password(plain_text.as_bytes(), &parsed)
            .is_ok())
    }

    #[inline]
    fn argon2() -> Argon2<'static> {
        Argon2::default()
    }
}

impl From<Password> for String {
    fn from(password: Password) -> Self {
        password.hash
    }
}

impl PartialEq for Password {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash
    }
}

impl Eq for Password {}
