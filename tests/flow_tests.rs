//! End-to-end flow tests: select a blocked clinic, wait out the access
//! guard, and verify the promoted session stamps the right tenant headers
//! on subsequent portal calls.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use medport_client::{
    ApiClient, CallOptions, Method, SessionStore, Transport, TransportRequest, TransportResponse,
};
use medport_flows::{AccessGuard, GuardOutcome, GuardTiming, Selection, SelectionFlow};
use medport_protocol::error::PortalError;
use medport_protocol::tenant::{RelationshipStatus, UserProfile};
use parking_lot::Mutex;
use serde_json::{Value, json};

/// Fake backend: one clinic whose subscription activates after a configurable
/// number of record fetches. Records every request for header assertions.
struct FakeBackend {
    activate_after: usize,
    record_fetches: AtomicUsize,
    requests: Mutex<Vec<TransportRequest>>,
}

impl FakeBackend {
    fn new(activate_after: usize) -> Arc<Self> {
        Arc::new(Self {
            activate_after,
            record_fetches: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn clinic_record(&self, active_subscription: bool) -> Value {
        json!({
            "id": "c-1", "name": "North Clinic", "active": true,
            "ownerUserId": "u-1",
            "subscription": { "status": if active_subscription { "ACTIVE" } else { "PENDING" } }
        })
    }
}

#[async_trait]
impl Transport for FakeBackend {
    async fn execute(&self, request: TransportRequest) -> Result<TransportResponse, PortalError> {
        let path = request.path.clone();
        self.requests.lock().push(request);

        let data = match path.as_str() {
            "/clinics" => json!([{ "id": "c-1", "name": "North Clinic", "active": true }]),
            "/clinics/c-1" => {
                let fetches = self.record_fetches.fetch_add(1, Ordering::SeqCst) + 1;
                self.clinic_record(fetches > self.activate_after)
            }
            "/patients" => json!([]),
            other => {
                return Ok(TransportResponse {
                    http_status: 200,
                    body: json!({ "statusCode": 404, "message": format!("no route {other}") }),
                });
            }
        };
        Ok(TransportResponse {
            http_status: 200,
            body: json!({ "statusCode": 200, "data": data }),
        })
    }
}

fn session() -> Arc<SessionStore> {
    let store = Arc::new(SessionStore::new());
    store.set_credential("tok-1");
    store.set_profile(UserProfile {
        id: "u-1".into(),
        name: Some("Dr. Owner".into()),
        email: None,
        role: Some("owner".into()),
    });
    store
}

#[tokio::test(start_paused = true)]
async fn blocked_selection_promotes_through_the_guard() {
    // Selection fetch sees a pending subscription; the next two guard polls
    // still see it pending; the third sees it active.
    let backend = FakeBackend::new(3);
    let store = session();
    let api = Arc::new(ApiClient::new(backend.clone(), store.clone()));

    let flow = SelectionFlow::new(api.clone());
    let clinics = flow.list_clinics().await.unwrap().unwrap();
    assert_eq!(clinics.len(), 1);

    let outcome = flow.select_clinic("c-1").await.unwrap();
    assert_eq!(
        outcome,
        Selection::Blocked(RelationshipStatus::PendingSubscription)
    );

    // The pre-entry record fetch addressed the clinic explicitly while
    // outside the portal, with no staff header.
    let pre_entry = backend
        .requests
        .lock()
        .iter()
        .find(|r| r.path == "/clinics/c-1")
        .cloned()
        .unwrap();
    assert_eq!(pre_entry.headers.clinic.as_deref(), Some("c-1"));
    assert!(pre_entry.headers.staff.is_none());

    let timing = GuardTiming {
        initial_delay: Duration::from_secs(5),
        poll_interval: Duration::from_secs(30),
    };
    let mut guard = AccessGuard::spawn(api.clone(), timing);
    assert_eq!(guard.outcome().await, GuardOutcome::Enter);

    let relationship = store.relationship().unwrap();
    assert!(relationship.is_active());
    assert_eq!(relationship.clinic_id(), "c-1");

    // Portal calls now carry the owner's clinic header, resolved fresh.
    let _: Value = api
        .call(Method::Get, "/patients", None, CallOptions::portal())
        .await
        .unwrap();
    let portal_request = backend.requests.lock().last().cloned().unwrap();
    assert_eq!(portal_request.bearer.as_deref(), Some("tok-1"));
    assert_eq!(portal_request.headers.clinic.as_deref(), Some("c-1"));
    assert!(portal_request.headers.staff.is_none());
}

#[tokio::test]
async fn application_level_rejection_reaches_the_flow() {
    let backend = FakeBackend::new(0);
    let api = Arc::new(ApiClient::new(backend, session()));

    let err = api
        .call::<Value>(Method::Get, "/nowhere", None, CallOptions::portal())
        .await
        .unwrap_err();
    assert!(matches!(err, PortalError::Api { status_code: 404, .. }));
}

#[tokio::test]
async fn active_selection_enters_directly() {
    let backend = FakeBackend::new(0);
    let store = session();
    let api = Arc::new(ApiClient::new(backend, store.clone()));

    let flow = SelectionFlow::new(api);
    assert_eq!(flow.select_clinic("c-1").await.unwrap(), Selection::Entered);
    assert!(store.relationship().unwrap().is_active());
    assert_eq!(store.last_known_clinic().as_deref(), Some("c-1"));
}
