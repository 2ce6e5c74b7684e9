//! Demand service business logic.

mod demand_service;

pub use demand_service::{DemandManager, DemandService};
