//! Tenant-identifying request headers.

/// Header carrying the master clinic id.
pub const CLINIC_HEADER: &str = "x-clinic-id";

/// Header carrying the staff-affiliation id (distinct from the clinic id).
pub const STAFF_HEADER: &str = "x-clinic-staff-id";

/// Resolved tenant headers for one outgoing request.
///
/// `None` means the header must be absent on the wire, not left over from a
/// previous request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderSet {
    pub clinic: Option<String>,
    pub staff: Option<String>,
}

impl HeaderSet {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn for_clinic(id: impl Into<String>) -> Self {
        Self {
            clinic: Some(id.into()),
            staff: None,
        }
    }

    pub fn for_staff(id: impl Into<String>) -> Self {
        Self {
            clinic: None,
            staff: Some(id.into()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.clinic.is_none() && self.staff.is_none()
    }
}
