//! Transport abstraction (ambient stack).
//!
//! The core algorithm treats the HTTP client as an external collaborator
//! (spec §1), but a shippable crate still needs one. Grounded on
//! `ruma-client`'s `HttpClient` trait: a small, object-usable trait with
//! exactly one production implementation instead of the teacher's
//! hyper/isahc/reqwest trio, since this engine only ever needs one real
//! backend plus an in-memory test double.

use std::future::Future;

#[cfg(feature = "reqwest")]
mod reqwest;

#[cfg(feature = "reqwest")]
pub use self::reqwest::ReqwestTransport;

/// The path MSC4186 defines for the sliding-sync endpoint, relative to the homeserver root.
pub const SYNC_PATH: &str = "_matrix/client/unstable/org.matrix.msc4186/sync";

/// Query parameters attached to every sync request (spec §6). `set_presence`
/// is query-only; the source this spec is distilled from never also puts it
/// in the body (spec §9, Open Questions).
#[derive(Clone, Debug, Default)]
pub struct TransportQuery {
    pub pos: Option<String>,
    pub timeout_ms: Option<u64>,
    pub set_presence: Option<&'static str>,
}

/// A fully-assembled, transport-agnostic HTTP request.
#[derive(Clone, Debug)]
pub struct TransportRequest {
    pub homeserver_url: String,
    pub access_token: String,
    pub query: TransportQuery,
    pub body: Vec<u8>,
}

/// A transport-agnostic HTTP response: just enough for the engine to decide
/// between a 200, an `M_UNKNOWN_POS`, and any other failure.
#[derive(Clone, Debug)]
pub struct TransportResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

/// Couldn't obtain a response at all — network, TLS, or DNS failure, as
/// opposed to a response the server actually sent (spec §7's `TransportFailure`
/// covers the latter).
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("couldn't obtain a response: {0}")]
    Send(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("invalid homeserver URL: {0}")]
    InvalidUrl(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Sends a sliding-sync request and returns the raw response. Implementors
/// only need to know how to get bytes to a homeserver and back; the engine
/// owns all sliding-sync semantics.
pub trait Transport: Send + Sync {
    /// Sends `request`, returning the raw status and body.
    fn send(
        &self,
        request: TransportRequest,
    ) -> impl Future<Output = Result<TransportResponse, TransportError>> + Send;
}
