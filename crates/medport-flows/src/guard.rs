//! Inactive-access guard — polls a blocked clinic until access clears, then
//! promotes the session into the portal.
//!
//! The backend offers no push mechanism, so this is a fixed-interval poll:
//! a short delay before the first re-check, then a longer interval,
//! indefinitely, until the guard resolves or is torn down. Teardown aborts
//! the polling task, and the promotion write is epoch-checked against the
//! session store, so a stray tick can never overwrite a relationship that
//! another flow replaced in the meantime.

use std::sync::Arc;
use std::time::Duration;

use medport_client::{ApiClient, CallOptions, Method};
use medport_protocol::tenant::{RelationshipStatus, TenantRecord, derive_relationship};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info};

/// Observable guard states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardState {
    Checking,
    Blocked,
    Promoting,
    Done(GuardOutcome),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardOutcome {
    /// Access restored; proceed into the portal.
    Enter,
    /// No usable session remains; return to login.
    Login,
}

/// Poll timing; injectable so tests can drive the loop under a paused clock.
#[derive(Debug, Clone, Copy)]
pub struct GuardTiming {
    pub initial_delay: Duration,
    pub poll_interval: Duration,
}

impl Default for GuardTiming {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(5),
            poll_interval: Duration::from_secs(30),
        }
    }
}

/// Handle to a running guard. Dropping it (or calling [`stop`]) aborts the
/// polling task.
///
/// [`stop`]: AccessGuard::stop
pub struct AccessGuard {
    state_rx: watch::Receiver<GuardState>,
    handle: JoinHandle<()>,
}

impl AccessGuard {
    /// Spawn the guard for the relationship currently in the session store.
    pub fn spawn(api: Arc<ApiClient>, timing: GuardTiming) -> Self {
        let (tx, state_rx) = watch::channel(GuardState::Checking);
        let handle = tokio::spawn(async move {
            let outcome = run(api, timing, &tx).await;
            let _ = tx.send(GuardState::Done(outcome));
        });
        Self { state_rx, handle }
    }

    pub fn state(&self) -> GuardState {
        *self.state_rx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<GuardState> {
        self.state_rx.clone()
    }

    /// Wait for the guard to resolve.
    pub async fn outcome(&mut self) -> GuardOutcome {
        loop {
            if let GuardState::Done(outcome) = *self.state_rx.borrow_and_update() {
                return outcome;
            }
            if self.state_rx.changed().await.is_err() {
                return GuardOutcome::Login;
            }
        }
    }

    /// Tear the guard down; an in-flight tick becomes a no-op.
    pub fn stop(&self) {
        self.handle.abort();
    }
}

impl Drop for AccessGuard {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// The poll loop, separated from the task wrapper.
async fn run(
    api: Arc<ApiClient>,
    timing: GuardTiming,
    state: &watch::Sender<GuardState>,
) -> GuardOutcome {
    let store = Arc::clone(api.store());

    let Some(relationship) = store.relationship() else {
        // Session fell out from under the guard before it even started.
        return GuardOutcome::Login;
    };
    if relationship.is_active() {
        return GuardOutcome::Enter;
    }

    // Snapshot for the "still current" check at promotion time.
    let entry_epoch = store.relationship_epoch();
    let clinic_id = relationship.clinic_id().to_string();
    let _ = state.send(GuardState::Blocked);
    debug!(clinic = %clinic_id, status = ?relationship.status(), "access blocked, polling");

    let mut delay = timing.initial_delay;
    loop {
        sleep(delay).await;
        delay = timing.poll_interval;

        if store.relationship().is_none() {
            return GuardOutcome::Login;
        }

        let record = match api
            .call::<TenantRecord>(
                Method::Get,
                &format!("/clinics/{clinic_id}"),
                None,
                CallOptions::public().with_clinic(clinic_id.clone()),
            )
            .await
        {
            Ok(record) => record,
            Err(e) => {
                // The guard's job is to wait, not to report transient errors.
                debug!(error = %e, "access poll failed, retrying next tick");
                continue;
            }
        };

        let caller = store.profile();
        let fresh = match derive_relationship(&record, caller.as_ref().map(|p| p.id.as_str())) {
            Ok(relationship) => relationship,
            Err(e) => {
                debug!(error = %e, "access poll returned indeterminate record");
                continue;
            }
        };
        if fresh.status() != RelationshipStatus::Active {
            debug!(status = ?fresh.status(), "clinic still blocked");
            continue;
        }

        // Promote from the record this poll already fetched; no second fetch.
        let _ = state.send(GuardState::Promoting);
        if !store.replace_relationship_if_current(entry_epoch, fresh) {
            info!("relationship superseded during promotion, handing back");
            return GuardOutcome::Login;
        }
        info!(clinic = %clinic_id, "access restored, promoting session");
        return GuardOutcome::Enter;
    }
}
