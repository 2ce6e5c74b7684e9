//! Authentication service business logic.

mod bootstrap;
pub mod gate;
mod session;
mod user_service;

pub use bootstrap::Bootstrap;
pub use gate::{authorize, Action};
pub use session::{AccessType, AuthService, SessionManager};
pub use user_service::{UserManager, UserService};
