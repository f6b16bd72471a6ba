//! Error conditions (§7).

use crate::transport::TransportError;

/// An error surfaced from a single `sync_once` tick.
///
/// The engine's contract is that its state remains self-consistent across
/// any of these: no half-advanced `pos`, no half-updated lists (spec §7).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The server rejected `pos` with `M_UNKNOWN_POS`. The engine has already
    /// cleared its cursor before this error is returned, so an immediate
    /// retry builds a fresh request.
    #[error("sync cursor was rejected by the server (M_UNKNOWN_POS)")]
    CursorExpired,

    /// Any other non-200 response.
    #[error("sync request failed: HTTP {status:?}: {body}")]
    TransportFailure {
        status: Option<u16>,
        body: String,
    },

    /// A 200 response whose JSON shape didn't match the minimum contract
    /// (e.g. a missing `pos`). Fatal for the current tick; engine state is
    /// left untouched.
    #[error("malformed sync response: {reason}")]
    Malformed { reason: String },

    /// Couldn't obtain a response at all.
    #[error(transparent)]
    Transport(#[from] TransportError),
}
