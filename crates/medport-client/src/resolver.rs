//! Request-context resolution — decides which tenant headers one outgoing
//! request carries.
//!
//! Pure function over snapshot inputs; it never errors and never touches
//! shared state, so missing context degrades to "no header" and the backend
//! itself rejects requests that needed one.

use medport_protocol::headers::HeaderSet;
use medport_protocol::tenant::Relationship;

/// Whether a request targets the authenticated portal area or a public
/// (pre-entry) endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestScope {
    Public,
    Portal,
}

/// Resolve the tenant headers for one request.
///
/// Inside the portal, precedence highest to lowest:
/// 1. owner relationship: clinic header from the relationship, no staff
///    header;
/// 2. staff relationship: staff header from the affiliation id; the clinic
///    header is absent unless the caller supplied an explicit override, which
///    is never silently dropped (narrow exception for the pre-entry
///    complete-record fetch);
/// 3. no relationship: explicit override first, then the last-known clinic id
///    as a degraded fallback, otherwise nothing.
///
/// Outside the portal only an explicit override is honored, verbatim, and a
/// staff header is never emitted.
pub fn resolve(
    override_clinic: Option<&str>,
    relationship: Option<&Relationship>,
    last_known: Option<&str>,
    scope: RequestScope,
) -> HeaderSet {
    if scope == RequestScope::Public {
        return HeaderSet {
            clinic: override_clinic.map(str::to_owned),
            staff: None,
        };
    }

    match relationship {
        Some(Relationship::ClinicOwner { clinic_id, .. }) => HeaderSet::for_clinic(clinic_id),
        Some(Relationship::AffiliatedStaff { affiliation_id, .. }) => HeaderSet {
            clinic: override_clinic.map(str::to_owned),
            staff: Some(affiliation_id.clone()),
        },
        None => HeaderSet {
            clinic: override_clinic
                .map(str::to_owned)
                .or_else(|| last_known.map(str::to_owned)),
            staff: None,
        },
    }
}
