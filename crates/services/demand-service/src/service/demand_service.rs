//! Demand service - recording and reporting unmet demand.
//!
//! Administrators see and manage every facility. A center user only reaches
//! records whose facility is their own center, for reads and writes alike.

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use auth_service_lib::service::{authorize, Action, AuthService};
use auth_service_lib::AuthSystem;
use common::{AppError, AppResult};
use domain::demand::{critical_products, summarize_by_facility};
use domain::{CriticalProduct, DemandRecord, FacilitySummary, NewDemand, Session};

use crate::repository::{DemandRepository, DemandStore};

/// Demand service trait for dependency injection.
pub trait DemandService: Send + Sync {
    /// Validate and store a record for the session's scope
    fn record(&self, input: NewDemand) -> AppResult<DemandRecord>;

    /// Remove a record the session may reach
    fn delete(&self, id: Uuid) -> AppResult<DemandRecord>;

    /// Records visible to the session
    fn list(&self) -> AppResult<Vec<DemandRecord>>;

    /// Remove every record (admin only); returns how many were removed
    fn wipe(&self) -> AppResult<usize>;

    /// Per-facility aggregation over the visible records
    fn summary(&self) -> AppResult<Vec<FacilitySummary>>;

    /// Products with unmet demand over the visible records
    fn critical_products(&self) -> AppResult<Vec<CriticalProduct>>;
}

/// Concrete implementation of DemandService using repository.
pub struct DemandManager {
    repo: Arc<dyn DemandRepository>,
    auth: Arc<dyn AuthService>,
}

impl DemandManager {
    pub fn new(repo: Arc<dyn DemandRepository>, auth: Arc<dyn AuthService>) -> Self {
        Self { repo, auth }
    }

    /// Demand manager sharing the store and session of `system`.
    pub fn for_system(system: &AuthSystem) -> Self {
        let key = system.config().keys.demand.clone();
        Self::new(Arc::new(DemandStore::new(system.store(), key)), system.auth())
    }

    fn check(&self, action: Action) -> AppResult<Session> {
        let session = self.auth.current();
        authorize(session.as_ref(), &action)?;
        session.ok_or_else(|| AppError::forbidden(action.to_string()))
    }

    fn visible(&self) -> AppResult<Vec<DemandRecord>> {
        let session = self.auth.current();
        let facility = session.as_ref().map(|s| s.center.clone()).unwrap_or_default();
        authorize(session.as_ref(), &Action::ViewDemand { facility })?;

        let records = self.repo.list()?;
        Ok(match session {
            Some(s) if !s.is_admin() => records
                .into_iter()
                .filter(|r| s.can_access_facility(&r.facility))
                .collect(),
            _ => records,
        })
    }
}

impl DemandService for DemandManager {
    fn record(&self, input: NewDemand) -> AppResult<DemandRecord> {
        let session = self.check(Action::CreateDemand {
            facility: input.facility.trim().to_string(),
        })?;

        let record = self.repo.insert(DemandRecord::new(input, session.username.as_str())?)?;

        info!(
            actor = %session.username,
            facility = %record.facility,
            product = %record.product,
            unmet = record.unmet,
            "demand recorded"
        );
        Ok(record)
    }

    fn delete(&self, id: Uuid) -> AppResult<DemandRecord> {
        let session = self.auth.current();
        let existing = match &session {
            Some(_) => self.repo.find_by_id(id)?,
            None => None,
        };

        // A missing record is checked against the caller's own center
        let facility = match (&existing, &session) {
            (Some(record), _) => record.facility.clone(),
            (None, Some(s)) => s.center.clone(),
            (None, None) => String::new(),
        };
        let actor = self.check(Action::DeleteDemand { facility })?;

        let Some(record) = existing else {
            return Err(AppError::NotFound("Demand record".to_string()));
        };
        let removed = self.repo.delete(record.id)?;

        info!(actor = %actor.username, facility = %removed.facility, id = %removed.id, "demand deleted");
        Ok(removed)
    }

    fn list(&self) -> AppResult<Vec<DemandRecord>> {
        self.visible()
    }

    fn wipe(&self) -> AppResult<usize> {
        let actor = self.check(Action::WipeDemand)?;

        let removed = self.repo.clear()?;

        info!(actor = %actor.username, removed, "demand records wiped");
        Ok(removed)
    }

    fn summary(&self) -> AppResult<Vec<FacilitySummary>> {
        Ok(summarize_by_facility(&self.visible()?))
    }

    fn critical_products(&self) -> AppResult<Vec<CriticalProduct>> {
        Ok(critical_products(&self.visible()?))
    }
}
