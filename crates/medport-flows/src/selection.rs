//! Clinic selection flow — enumerate reachable clinics, pick one, classify
//! it, and establish the relationship record.

use std::sync::Arc;

use medport_client::{ApiClient, CallOptions, Method};
use medport_protocol::error::PortalError;
use medport_protocol::tenant::{
    RelationshipStatus, TenantRecord, TenantSummary, derive_relationship, needs_profile_setup,
};
use parking_lot::Mutex;
use tracing::{debug, info};

/// Outcome of selecting a clinic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// Clinic is active; the session may enter the portal.
    Entered,
    /// Relationship established but blocked; the access guard takes over.
    Blocked(RelationshipStatus),
    /// Placeholder profile on a paid plan; the clinic profile must be edited
    /// before entry even though the backend would accept it.
    ProfileSetupRequired,
}

#[derive(Default)]
struct Listing {
    in_flight: bool,
    clinics: Option<Vec<TenantSummary>>,
}

pub struct SelectionFlow {
    api: Arc<ApiClient>,
    listing: Mutex<Listing>,
}

impl SelectionFlow {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self {
            api,
            listing: Mutex::new(Listing::default()),
        }
    }

    /// Fetch the clinics reachable by the current credential.
    ///
    /// One fetch per flow instance: a call made while another is outstanding
    /// is dropped (returns `None`), not queued; a completed fetch is cached
    /// and returned thereafter.
    pub async fn list_clinics(&self) -> Result<Option<Vec<TenantSummary>>, PortalError> {
        {
            let mut listing = self.listing.lock();
            if let Some(cached) = &listing.clinics {
                return Ok(Some(cached.clone()));
            }
            if listing.in_flight {
                debug!("clinic listing already in flight, dropping call");
                return Ok(None);
            }
            listing.in_flight = true;
        }

        let result = self
            .api
            .call::<Vec<TenantSummary>>(Method::Get, "/clinics", None, CallOptions::public())
            .await;

        let mut listing = self.listing.lock();
        listing.in_flight = false;
        match result {
            Ok(clinics) => {
                listing.clinics = Some(clinics.clone());
                Ok(Some(clinics))
            }
            Err(e) => Err(e),
        }
    }

    /// Fetch the full record for `clinic_id` (pre-entry, addressed by
    /// explicit override), classify it, and write the relationship record.
    ///
    /// The relationship is written for blocked outcomes too, since the
    /// access guard and the profile editor both need an established tenant
    /// context. Nothing is written when the fetch or parse fails.
    pub async fn select_clinic(&self, clinic_id: &str) -> Result<Selection, PortalError> {
        let record: TenantRecord = self
            .api
            .call(
                Method::Get,
                &format!("/clinics/{clinic_id}"),
                None,
                CallOptions::public().with_clinic(clinic_id),
            )
            .await?;

        let caller = self.api.store().profile();
        let relationship = derive_relationship(&record, caller.as_ref().map(|p| p.id.as_str()))?;
        let status = relationship.status();
        let profile_setup = needs_profile_setup(&record);

        self.api.store().replace_relationship(relationship);
        info!(clinic = %record.id, ?status, "clinic selected");

        if profile_setup {
            return Ok(Selection::ProfileSetupRequired);
        }
        match status {
            RelationshipStatus::Active => Ok(Selection::Entered),
            blocked => Ok(Selection::Blocked(blocked)),
        }
    }
}
