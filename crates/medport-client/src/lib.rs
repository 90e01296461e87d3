//! Medport client layer: the session store, the pure request-context
//! resolver, and the request-augmentation interceptor over an injectable
//! transport.

pub mod api;
pub mod resolver;
pub mod store;

pub use api::{
    ApiClient, CallOptions, HttpTransport, Method, SessionEvent, Transport,
    TransportRequest, TransportResponse,
};
pub use resolver::{RequestScope, resolve};
pub use store::SessionStore;
