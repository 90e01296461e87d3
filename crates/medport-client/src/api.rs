//! Request augmentation interceptor and HTTP transport.
//!
//! Every outgoing call goes through [`ApiClient::call`]: the bearer
//! credential is attached when present, the resolver decides the tenant
//! headers from a snapshot of the session store, and the response is decoded
//! through the `{ statusCode, message?, data }` envelope. A 401 anywhere
//! outside a login-type call tears the whole session down and broadcasts
//! [`SessionEvent::ForceLogin`], independent of tenant context.

use std::sync::Arc;

use async_trait::async_trait;
use medport_protocol::envelope::ApiEnvelope;
use medport_protocol::error::PortalError;
use medport_protocol::headers::{CLINIC_HEADER, HeaderSet, STAFF_HEADER};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::{debug, warn};
use url::Url;
use uuid::Uuid;

use crate::resolver::{RequestScope, resolve};
use crate::store::SessionStore;

/// HTTP verb subset the portal backend uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
}

/// Fully resolved outgoing request handed to the transport. Headers are
/// exactly what the resolver produced for this call; nothing carries over
/// from a previous request.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub method: Method,
    pub path: String,
    pub bearer: Option<String>,
    pub headers: HeaderSet,
    pub body: Option<Value>,
}

/// Raw transport result: HTTP status plus parsed JSON body.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub http_status: u16,
    pub body: Value,
}

/// Seam between the interceptor and the wire, so flows are testable without
/// a network.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: TransportRequest) -> Result<TransportResponse, PortalError>;
}

/// reqwest-backed transport.
pub struct HttpTransport {
    base_url: Url,
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: TransportRequest) -> Result<TransportResponse, PortalError> {
        let url = self
            .base_url
            .join(request.path.trim_start_matches('/'))
            .map_err(|e| PortalError::Transport(format!("invalid url: {e}")))?;

        let mut builder = match request.method {
            Method::Get => self.client.get(url),
            Method::Post => self.client.post(url),
            Method::Put => self.client.put(url),
        };
        if let Some(token) = &request.bearer {
            builder = builder.bearer_auth(token);
        }
        if let Some(id) = &request.headers.clinic {
            builder = builder.header(CLINIC_HEADER, id);
        }
        if let Some(id) = &request.headers.staff {
            builder = builder.header(STAFF_HEADER, id);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| PortalError::Transport(e.to_string()))?;
        let http_status = response.status().as_u16();
        // Non-JSON bodies (proxy error pages) decode as Null and surface as
        // malformed payloads downstream.
        let body = response.json().await.unwrap_or(Value::Null);
        Ok(TransportResponse { http_status, body })
    }
}

/// Cross-cutting session notifications emitted by the interceptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// The session was torn down after a 401; the UI must return to login.
    ForceLogin,
}

/// Per-call routing context the interceptor needs.
#[derive(Debug, Clone)]
pub struct CallOptions {
    pub scope: RequestScope,
    pub clinic_override: Option<String>,
    pub login_route: bool,
}

impl CallOptions {
    /// A call inside the authenticated portal area.
    pub fn portal() -> Self {
        Self {
            scope: RequestScope::Portal,
            clinic_override: None,
            login_route: false,
        }
    }

    /// A pre-entry call (clinic picker, tenant record fetch).
    pub fn public() -> Self {
        Self {
            scope: RequestScope::Public,
            clinic_override: None,
            login_route: false,
        }
    }

    /// Address a specific clinic for this call only.
    pub fn with_clinic(mut self, id: impl Into<String>) -> Self {
        self.clinic_override = Some(id.into());
        self
    }

    /// Mark the call as a login-type route; 401 is then left to the caller.
    pub fn login(mut self) -> Self {
        self.login_route = true;
        self
    }
}

/// The portal API client: transport + session store + 401 policy.
pub struct ApiClient {
    transport: Arc<dyn Transport>,
    store: Arc<SessionStore>,
    events: broadcast::Sender<SessionEvent>,
}

impl ApiClient {
    pub fn new(transport: Arc<dyn Transport>, store: Arc<SessionStore>) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            transport,
            store,
            events,
        }
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    /// Subscribe to cross-cutting session events (forced re-login).
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Dispatch one request with tenant context attached per the resolver.
    pub async fn call<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        options: CallOptions,
    ) -> Result<T, PortalError> {
        let headers = {
            let relationship = self.store.relationship();
            let last_known = self.store.last_known_clinic();
            resolve(
                options.clinic_override.as_deref(),
                relationship.as_ref(),
                last_known.as_deref(),
                options.scope,
            )
        };
        let bearer = self
            .store
            .credential()
            .map(|c| c.expose_secret().to_string());

        let request_id = Uuid::new_v4();
        debug!(
            %request_id,
            path,
            clinic = headers.clinic.as_deref(),
            staff = headers.staff.as_deref(),
            "dispatching request"
        );

        let response = self
            .transport
            .execute(TransportRequest {
                method,
                path: path.to_string(),
                bearer,
                headers,
                body,
            })
            .await?;

        if response.http_status == 401 {
            if !options.login_route {
                warn!(%request_id, path, "authorization failure, clearing session");
                self.store.clear();
                let _ = self.events.send(SessionEvent::ForceLogin);
            }
            return Err(PortalError::Unauthorized);
        }

        let envelope: ApiEnvelope<T> = serde_json::from_value(response.body)
            .map_err(|e| PortalError::malformed(format!("invalid envelope: {e}")))?;
        envelope.into_result()
    }
}
