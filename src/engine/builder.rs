//! Builder for [`SlidingSyncEngine`] (ambient stack), grounded on
//! `ruma-client`'s `ClientBuilder`.

use std::time::Duration;

use super::SlidingSyncEngine;

const DEFAULT_CATCH_UP_TIMEOUT: Duration = Duration::from_millis(2_000);
const DEFAULT_LONG_POLL_TIMEOUT: Duration = Duration::from_millis(30_000);

/// A [`SlidingSyncEngine`] builder.
///
/// The homeserver URL and access token are deliberately not accepted here:
/// they vary per `sync_once` call (spec §6), while `conn_id` and the timeout
/// pair are fixed engine state for the connection's lifetime (spec §3).
pub struct SlidingSyncEngineBuilder {
    conn_id: Option<String>,
    catch_up_timeout: Duration,
    long_poll_timeout: Duration,
}

impl SlidingSyncEngineBuilder {
    pub(super) fn new() -> Self {
        Self { conn_id: None, catch_up_timeout: DEFAULT_CATCH_UP_TIMEOUT, long_poll_timeout: DEFAULT_LONG_POLL_TIMEOUT }
    }

    /// Sets the `conn_id` the engine sends on every request.
    ///
    /// Must be set before calling [`build()`][Self::build] or
    /// [`build_with_transport()`][Self::build_with_transport].
    pub fn conn_id(mut self, conn_id: impl Into<String>) -> Self {
        self.conn_id = Some(conn_id.into());
        self
    }

    /// Sets the timeout used while any list is not yet fully loaded.
    pub fn catch_up_timeout(mut self, timeout: Duration) -> Self {
        self.catch_up_timeout = timeout;
        self
    }

    /// Sets the timeout used once every list is fully loaded.
    pub fn long_poll_timeout(mut self, timeout: Duration) -> Self {
        self.long_poll_timeout = timeout;
        self
    }

    /// Finishes building with an explicit [`Transport`][crate::transport::Transport],
    /// e.g. an in-memory test double.
    pub fn build_with_transport<T>(self, transport: T) -> SlidingSyncEngine<T> {
        let conn_id =
            self.conn_id.expect("conn_id has to be set prior to calling .build() or .build_with_transport()");
        SlidingSyncEngine::new(conn_id, transport, self.catch_up_timeout, self.long_poll_timeout)
    }

    /// Finishes building with the default `reqwest`-backed transport.
    #[cfg(feature = "reqwest")]
    pub fn build(self) -> SlidingSyncEngine<crate::transport::ReqwestTransport> {
        self.build_with_transport(crate::transport::ReqwestTransport::new())
    }
}
