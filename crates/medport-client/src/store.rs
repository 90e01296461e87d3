//! Session store — the one piece of shared mutable state.
//!
//! Holds the bearer credential, the live relationship record, the
//! last-known clinic id (degraded fallback), and the cached user profile.
//! Injectable as `Arc<SessionStore>` so the resolver, interceptor, and
//! flows are testable without any environment.
//!
//! Relationship writes are last-write-wins under a single lock; every write
//! bumps an epoch that lets a flow detect it has been superseded before
//! firing a late write (the access guard's "still current" check).

use std::path::Path;

use medport_protocol::tenant::{Relationship, UserProfile};
use parking_lot::RwLock;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

#[derive(Default)]
struct SessionState {
    credential: Option<SecretString>,
    relationship: Option<Relationship>,
    last_known_clinic: Option<String>,
    profile: Option<UserProfile>,
    epoch: u64,
}

/// On-disk snapshot. The credential rides along as a plain string; the
/// snapshot file carries the same sensitivity as the token itself and the
/// CLI restricts its location.
#[derive(Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snapshot {
    credential: Option<String>,
    relationship: Option<Relationship>,
    last_known_clinic: Option<String>,
    profile: Option<UserProfile>,
}

#[derive(Default)]
pub struct SessionStore {
    inner: RwLock<SessionState>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Credential ──────────────────────────────────────────────────────

    pub fn credential(&self) -> Option<SecretString> {
        self.inner.read().credential.clone()
    }

    pub fn set_credential(&self, token: impl Into<String>) {
        self.inner.write().credential = Some(SecretString::from(token.into()));
    }

    // ── Profile ─────────────────────────────────────────────────────────

    pub fn profile(&self) -> Option<UserProfile> {
        self.inner.read().profile.clone()
    }

    pub fn set_profile(&self, profile: UserProfile) {
        self.inner.write().profile = Some(profile);
    }

    // ── Relationship ────────────────────────────────────────────────────

    pub fn relationship(&self) -> Option<Relationship> {
        self.inner.read().relationship.clone()
    }

    /// Epoch of the current relationship state. Bumped on every write,
    /// including clears.
    pub fn relationship_epoch(&self) -> u64 {
        self.inner.read().epoch
    }

    /// Atomically replace the relationship, recording the clinic id as the
    /// degraded fallback. Returns the new epoch.
    pub fn replace_relationship(&self, relationship: Relationship) -> u64 {
        let mut state = self.inner.write();
        state.last_known_clinic = Some(relationship.clinic_id().to_string());
        state.relationship = Some(relationship);
        state.epoch += 1;
        debug!(epoch = state.epoch, "relationship replaced");
        state.epoch
    }

    /// Write only if no other flow has touched the relationship since
    /// `expected_epoch` was observed. A superseded write is dropped.
    pub fn replace_relationship_if_current(
        &self,
        expected_epoch: u64,
        relationship: Relationship,
    ) -> bool {
        let mut state = self.inner.write();
        if state.epoch != expected_epoch {
            debug!(
                expected = expected_epoch,
                current = state.epoch,
                "stale relationship write dropped"
            );
            return false;
        }
        state.last_known_clinic = Some(relationship.clinic_id().to_string());
        state.relationship = Some(relationship);
        state.epoch += 1;
        true
    }

    /// "Back to clinic selection": drop the relationship but keep the
    /// fallback id and the rest of the session.
    pub fn clear_relationship(&self) {
        let mut state = self.inner.write();
        state.relationship = None;
        state.epoch += 1;
    }

    pub fn last_known_clinic(&self) -> Option<String> {
        self.inner.read().last_known_clinic.clone()
    }

    // ── Teardown ────────────────────────────────────────────────────────

    /// Full logout teardown: credential, relationship, fallback, profile.
    pub fn clear(&self) {
        let mut state = self.inner.write();
        state.credential = None;
        state.relationship = None;
        state.last_known_clinic = None;
        state.profile = None;
        state.epoch += 1;
        info!("session cleared");
    }

    // ── Snapshot persistence ────────────────────────────────────────────

    /// Load a store from a snapshot file. A missing or corrupt file yields
    /// an empty store.
    pub async fn load_from(path: &Path) -> Self {
        let snapshot = match tokio::fs::read_to_string(path).await {
            Ok(content) => serde_json::from_str::<Snapshot>(&content).unwrap_or_default(),
            Err(_) => Snapshot::default(),
        };
        let store = Self::new();
        {
            let mut state = store.inner.write();
            state.credential = snapshot.credential.map(SecretString::from);
            state.relationship = snapshot.relationship;
            state.last_known_clinic = snapshot.last_known_clinic;
            state.profile = snapshot.profile;
        }
        store
    }

    pub async fn persist_to(&self, path: &Path) -> std::io::Result<()> {
        let snapshot = {
            let state = self.inner.read();
            Snapshot {
                credential: state
                    .credential
                    .as_ref()
                    .map(|c| c.expose_secret().to_string()),
                relationship: state.relationship.clone(),
                last_known_clinic: state.last_known_clinic.clone(),
                profile: state.profile.clone(),
            }
        };
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(&snapshot)
            .map_err(|e| std::io::Error::other(e.to_string()))?;
        tokio::fs::write(path, json).await
    }
}

#[cfg(test)]
mod tests {
    use medport_protocol::tenant::RelationshipStatus;

    use super::*;

    fn owner(clinic: &str) -> Relationship {
        Relationship::ClinicOwner {
            clinic_id: clinic.into(),
            status: RelationshipStatus::Active,
        }
    }

    #[test]
    fn replace_bumps_epoch_and_records_fallback() {
        let store = SessionStore::new();
        assert_eq!(store.relationship_epoch(), 0);

        let epoch = store.replace_relationship(owner("c-1"));
        assert_eq!(epoch, 1);
        assert_eq!(store.last_known_clinic().as_deref(), Some("c-1"));
        assert_eq!(store.relationship().unwrap().clinic_id(), "c-1");
    }

    #[test]
    fn conditional_write_rejects_stale_epoch() {
        let store = SessionStore::new();
        let epoch = store.replace_relationship(owner("c-1"));

        // Another flow selects a different clinic in between.
        store.replace_relationship(owner("c-2"));

        assert!(!store.replace_relationship_if_current(epoch, owner("c-1")));
        assert_eq!(store.relationship().unwrap().clinic_id(), "c-2");
    }

    #[test]
    fn conditional_write_accepts_current_epoch() {
        let store = SessionStore::new();
        let epoch = store.replace_relationship(owner("c-1"));
        assert!(store.replace_relationship_if_current(epoch, owner("c-1")));
        assert_eq!(store.relationship_epoch(), epoch + 1);
    }

    #[test]
    fn clear_relationship_keeps_fallback() {
        let store = SessionStore::new();
        store.replace_relationship(owner("c-1"));
        store.clear_relationship();
        assert!(store.relationship().is_none());
        assert_eq!(store.last_known_clinic().as_deref(), Some("c-1"));
    }

    #[test]
    fn clear_wipes_everything_and_bumps_epoch() {
        let store = SessionStore::new();
        store.set_credential("tok");
        let epoch = store.replace_relationship(owner("c-1"));
        store.clear();
        assert!(store.credential().is_none());
        assert!(store.relationship().is_none());
        assert!(store.last_known_clinic().is_none());
        assert!(store.relationship_epoch() > epoch);
    }

    #[tokio::test]
    async fn snapshot_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");

        let store = SessionStore::new();
        store.set_credential("tok-1");
        store.replace_relationship(owner("c-1"));
        store.persist_to(&path).await.unwrap();

        let loaded = SessionStore::load_from(&path).await;
        assert_eq!(
            loaded.credential().unwrap().expose_secret(),
            "tok-1"
        );
        assert_eq!(loaded.relationship().unwrap().clinic_id(), "c-1");
        assert_eq!(loaded.last_known_clinic().as_deref(), Some("c-1"));
    }

    #[tokio::test]
    async fn missing_snapshot_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = SessionStore::load_from(&dir.path().join("nope.json")).await;
        assert!(loaded.credential().is_none());
        assert!(loaded.relationship().is_none());
    }
}
