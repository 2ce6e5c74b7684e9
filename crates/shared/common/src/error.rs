//! Unified error handling.
//!
//! Every failure a caller can observe is an [`AppError`]. All of them are
//! fatal to the requested operation only; callers display
//! [`AppError::user_message`] and stay operable.

use domain::DomainError;
use thiserror::Error;

/// Application error types.
#[derive(Error, Debug)]
pub enum AppError {
    // Authentication & Authorization
    /// Login failed. Deliberately says nothing about which factor was wrong.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Authorization gate denial, carrying the attempted action
    #[error("Access denied: {0}")]
    Forbidden(String),

    // Resource errors
    #[error("{0} not found")]
    NotFound(String),

    // Validation
    #[error("{0}")]
    Validation(String),

    /// Persisted state could not be parsed
    #[error("Corrupt state: {0}")]
    CorruptState(String),

    // Persistence
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error")]
    Serialization(#[from] serde_json::Error),

    // Internal
    #[error("Internal error")]
    Internal(String),
}

impl AppError {
    /// Get error code for client
    pub fn code(&self) -> &'static str {
        match self {
            AppError::InvalidCredentials => "INVALID_CREDENTIALS",
            AppError::Forbidden(_) => "FORBIDDEN",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::CorruptState(_) => "CORRUPT_STATE",
            AppError::Storage(_) => "STORAGE_ERROR",
            AppError::Serialization(_) => "SERIALIZATION_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Get user-facing message (hides internal details)
    pub fn user_message(&self) -> String {
        match self {
            // Show full message for client errors
            AppError::Validation(msg) => msg.clone(),

            // Hide details for internal errors
            AppError::CorruptState(msg) => {
                tracing::error!("Corrupt state: {}", msg);
                "Stored data could not be read".to_string()
            }
            AppError::Storage(msg) => {
                tracing::error!("Storage error: {}", msg);
                "A storage error occurred".to_string()
            }
            AppError::Serialization(e) => {
                tracing::error!("Serialization error: {:?}", e);
                "Stored data could not be read".to_string()
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                "An internal error occurred".to_string()
            }

            // Use default message for others
            _ => self.to_string(),
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Storage(err.to_string())
    }
}

// =============================================================================
// Domain Error Conversion
// =============================================================================

impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(msg) => AppError::Validation(msg),
            DomainError::Password(msg) => AppError::Internal(msg),
        }
    }
}

/// Result type alias
pub type AppResult<T> = Result<T, AppError>;

/// Extension trait for Option -> AppError conversion
pub trait OptionExt<T> {
    fn ok_or_not_found(self, entity: &str) -> AppResult<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_not_found(self, entity: &str) -> AppResult<T> {
        self.ok_or_else(|| AppError::NotFound(entity.to_string()))
    }
}

/// Convenience constructors
impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }

    pub fn forbidden(action: impl Into<String>) -> Self {
        AppError::Forbidden(action.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        AppError::Storage(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        AppError::Internal(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_validation_maps_to_validation() {
        let err: AppError = DomainError::validation("all fields are required").into();
        assert!(matches!(err, AppError::Validation(ref m) if m == "all fields are required"));
        assert_eq!(err.code(), "VALIDATION_ERROR");
    }

    #[test]
    fn test_invalid_credentials_message_is_generic() {
        assert_eq!(AppError::InvalidCredentials.user_message(), "Invalid credentials");
    }

    #[test]
    fn test_forbidden_names_action() {
        let err = AppError::forbidden("create user");
        assert_eq!(err.user_message(), "Access denied: create user");
        assert_eq!(err.code(), "FORBIDDEN");
    }

    #[test]
    fn test_internal_details_are_hidden() {
        let err = AppError::storage("/var/lib/recetas/users.json: permission denied");
        assert!(!err.user_message().contains("/var/lib"));
    }

    #[test]
    fn test_ok_or_not_found() {
        let missing: Option<u8> = None;
        let err = missing.ok_or_not_found("User").unwrap_err();
        assert_eq!(err.to_string(), "User not found");
    }
}
