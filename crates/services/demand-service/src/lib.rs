//! Demand Service Library
//!
//! Unmet-demand records: gated recording and deletion, center-scoped
//! listing, and the per-facility aggregations used by reports. Runs on the
//! same key/value store and session as the auth service.

pub mod repository;
pub mod service;

pub use service::{DemandManager, DemandService};
