//! Repository layer for data access.

mod demand_repository;

pub use demand_repository::{DemandRepository, DemandStore};

#[cfg(any(test, feature = "test-utils"))]
pub use demand_repository::MockDemandRepository;
