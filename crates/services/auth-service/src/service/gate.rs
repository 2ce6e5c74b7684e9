//! Authorization gate.
//!
//! One predicate, [`authorize`], consulted by every sensitive entry point
//! with the attempted [`Action`] and the current session. A denial is always
//! an [`AppError::Forbidden`] naming the action; nothing is silently skipped.

use tracing::warn;

use common::{AppError, AppResult};
use domain::Session;

/// Sensitive operations guarded by the gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    CreateUser,
    UpdateUser,
    DeleteUser,
    /// Privileged user listing (includes inactive accounts and ids)
    ListUsers,
    CreateDemand { facility: String },
    DeleteDemand { facility: String },
    ViewDemand { facility: String },
    /// Bulk removal of every demand record
    WipeDemand,
}

impl Action {
    /// Admin-only actions
    pub fn requires_admin(&self) -> bool {
        matches!(
            self,
            Action::CreateUser
                | Action::UpdateUser
                | Action::DeleteUser
                | Action::ListUsers
                | Action::WipeDemand
        )
    }

    /// Facility the action is scoped to, for center users
    pub fn facility(&self) -> Option<&str> {
        match self {
            Action::CreateDemand { facility }
            | Action::DeleteDemand { facility }
            | Action::ViewDemand { facility } => Some(facility),
            _ => None,
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::CreateUser => write!(f, "create user"),
            Action::UpdateUser => write!(f, "update user"),
            Action::DeleteUser => write!(f, "delete user"),
            Action::ListUsers => write!(f, "list users"),
            Action::CreateDemand { facility } => write!(f, "record demand for \"{}\"", facility),
            Action::DeleteDemand { facility } => write!(f, "delete demand of \"{}\"", facility),
            Action::ViewDemand { facility } => write!(f, "view demand of \"{}\"", facility),
            Action::WipeDemand => write!(f, "wipe all demand records"),
        }
    }
}

/// Allow or deny `action` for the identity in `session`.
pub fn authorize(session: Option<&Session>, action: &Action) -> AppResult<()> {
    let Some(session) = session else {
        warn!(action = %action, "denied: not logged in");
        return Err(AppError::forbidden(format!("{} (not logged in)", action)));
    };

    if session.is_admin() {
        return Ok(());
    }

    if action.requires_admin() {
        warn!(action = %action, username = %session.username, "denied: administrator required");
        return Err(AppError::forbidden(action.to_string()));
    }

    match action.facility() {
        Some(facility) if !session.can_access_facility(facility) => {
            warn!(
                action = %action,
                username = %session.username,
                center = %session.center,
                "denied: outside own center"
            );
            Err(AppError::forbidden(action.to_string()))
        }
        _ => Ok(()),
    }
}
