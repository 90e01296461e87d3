//! Medport - Protocol Types
//!
//! Wire types for the clinic-management backend: the JSON response envelope,
//! the error taxonomy, the tenant/relationship data model, and the pure
//! classification rules. This crate is the single source of truth for header
//! names, status enums, and the shape of every payload the client consumes.

pub mod envelope;
pub mod error;
pub mod headers;
pub mod tenant;

pub use envelope::{ApiEnvelope, SUCCESS_CODE};
pub use error::PortalError;
pub use headers::{HeaderSet, CLINIC_HEADER, STAFF_HEADER};
pub use tenant::{
    Relationship, RelationshipStatus, StaffRelation, Subscription,
    TenantRecord, TenantSummary, UserProfile,
    classify, derive_relationship, needs_profile_setup,
};
