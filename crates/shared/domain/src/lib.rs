//! Domain layer - Core business entities and value objects.
//!
//! This crate contains pure domain logic with no infrastructure dependencies.
//! All types here are shared by the auth and demand services.

pub mod constants;
pub mod demand;
pub mod error;
pub mod password;
pub mod session;
pub mod user;

pub use constants::*;
pub use demand::{CriticalProduct, DemandRecord, FacilitySummary, NewDemand};
pub use error::{DomainError, DomainResult};
pub use password::{Password, PasswordScheme};
pub use session::Session;
pub use user::{CreateUser, UpdateUser, User, UserResponse, UserRole};
