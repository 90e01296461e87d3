//! Tenant, subscription, and relationship models plus the classification
//! rules applied when a clinic is selected or re-polled.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::PortalError;

// ─────────────────────────────────────────────────────────────────────────────
// Relationship record
// ─────────────────────────────────────────────────────────────────────────────

/// How the current session is attached to a clinic.
///
/// "No relationship yet" (the transient state during clinic selection) is the
/// absence of this value in the session store. That keeps the invariants
/// structural: an owner carries a clinic id and no affiliation id, affiliated
/// staff always carry both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Relationship {
    #[serde(rename_all = "camelCase")]
    ClinicOwner {
        clinic_id: String,
        status: RelationshipStatus,
    },
    #[serde(rename_all = "camelCase")]
    AffiliatedStaff {
        clinic_id: String,
        affiliation_id: String,
        status: RelationshipStatus,
    },
}

impl Relationship {
    pub fn clinic_id(&self) -> &str {
        match self {
            Self::ClinicOwner { clinic_id, .. } => clinic_id,
            Self::AffiliatedStaff { clinic_id, .. } => clinic_id,
        }
    }

    pub fn status(&self) -> RelationshipStatus {
        match self {
            Self::ClinicOwner { status, .. } => *status,
            Self::AffiliatedStaff { status, .. } => *status,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status() == RelationshipStatus::Active
    }
}

/// Derived from the clinic's own record and its subscription, not from the
/// relationship call itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelationshipStatus {
    Active,
    Inactive,
    PendingSubscription,
}

// ─────────────────────────────────────────────────────────────────────────────
// Backend payloads
// ─────────────────────────────────────────────────────────────────────────────

/// One entry in the clinic picker, as seen from the caller's perspective.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantSummary {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub logo_url: Option<String>,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub subscription_status: Option<String>,
    #[serde(default)]
    pub staff_relation: Option<StaffRelation>,
}

/// Full clinic record fetched on selection and on every access poll.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantRecord {
    pub id: String,
    pub name: String,
    pub active: bool,
    #[serde(default)]
    pub lifecycle_state: Option<String>,
    #[serde(default)]
    pub owner_user_id: Option<String>,
    #[serde(default)]
    pub subscription: Option<Subscription>,
    #[serde(default)]
    pub staff_relation: Option<StaffRelation>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub plan: Option<String>,
    #[serde(default)]
    pub renews_at: Option<DateTime<Utc>>,
}

/// The caller's staff-to-clinic link, when one exists.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaffRelation {
    pub id: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

/// Cached user record written by the login flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Classification rules
// ─────────────────────────────────────────────────────────────────────────────

/// Lifecycle states that mark a clinic inactive regardless of subscription.
const INACTIVE_LIFECYCLES: &[&str] = &["INACTIVE", "DEACTIVATED", "SUSPENDED"];

const ACTIVE_SUBSCRIPTION: &str = "ACTIVE";

/// Display name the backend seeds before the owner edits the clinic profile.
pub const PLACEHOLDER_NAME: &str = "My Clinic";

const TRIAL_PLAN: &str = "TRIAL";

/// Classify a clinic record into a relationship status.
///
/// The clinic's own active flag dominates; a missing or malformed
/// subscription classifies as pending, never as active.
pub fn classify(record: &TenantRecord) -> RelationshipStatus {
    let lifecycle_inactive = record
        .lifecycle_state
        .as_deref()
        .is_some_and(|s| INACTIVE_LIFECYCLES.contains(&s.to_ascii_uppercase().as_str()));
    if !record.active || lifecycle_inactive {
        return RelationshipStatus::Inactive;
    }
    match record.subscription.as_ref().and_then(|s| s.status.as_deref()) {
        Some(s) if s.eq_ignore_ascii_case(ACTIVE_SUBSCRIPTION) => RelationshipStatus::Active,
        _ => RelationshipStatus::PendingSubscription,
    }
}

/// A placeholder display name on a paid (non-trial) plan means the clinic
/// profile must be edited before entry, even if the backend would otherwise
/// classify the clinic as active.
pub fn needs_profile_setup(record: &TenantRecord) -> bool {
    record.name.trim() == PLACEHOLDER_NAME
        && record
            .subscription
            .as_ref()
            .and_then(|s| s.plan.as_deref())
            .is_some_and(|p| !p.eq_ignore_ascii_case(TRIAL_PLAN))
}

/// Build the relationship record for a freshly fetched clinic.
///
/// Ownership is decided by comparing the caller's user id against the
/// record's owner. A caller who is neither the owner nor carries a usable
/// staff relation is indeterminate and fails closed.
pub fn derive_relationship(
    record: &TenantRecord,
    caller_user_id: Option<&str>,
) -> Result<Relationship, PortalError> {
    if record.id.is_empty() {
        return Err(PortalError::malformed("clinic record without an id"));
    }
    let status = classify(record);

    let is_owner = match (caller_user_id, record.owner_user_id.as_deref()) {
        (Some(me), Some(owner)) => me == owner,
        _ => false,
    };
    if is_owner {
        return Ok(Relationship::ClinicOwner {
            clinic_id: record.id.clone(),
            status,
        });
    }

    match record.staff_relation.as_ref() {
        Some(relation) if !relation.id.is_empty() => Ok(Relationship::AffiliatedStaff {
            clinic_id: record.id.clone(),
            affiliation_id: relation.id.clone(),
            status,
        }),
        _ => Err(PortalError::malformed(
            "caller is neither owner nor affiliated staff of the selected clinic",
        )),
    }
}
