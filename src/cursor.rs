//! Cursor & timeout controller (§4.2).

use std::time::Duration;

/// Per-call overrides for the request timeout and presence, as accepted by
/// `build_request`/`sync_once`.
#[derive(Clone, Copy, Debug, Default)]
pub struct TimeoutOverrides {
    pub catch_up_timeout: Option<Duration>,
    pub long_poll_timeout: Option<Duration>,
}

/// Owns `pos` and the to-device since-token, and decides the request timeout.
#[derive(Clone, Debug)]
pub struct CursorController {
    catch_up_timeout: Duration,
    long_poll_timeout: Duration,
    pos: Option<String>,
    to_device_since: Option<String>,
}

impl CursorController {
    pub fn new(catch_up_timeout: Duration, long_poll_timeout: Duration) -> Self {
        Self { catch_up_timeout, long_poll_timeout, pos: None, to_device_since: None }
    }

    pub fn pos(&self) -> Option<&str> {
        self.pos.as_deref()
    }

    pub fn to_device_since(&self) -> Option<&str> {
        self.to_device_since.as_deref()
    }

    /// Sets `pos` from a successful response.
    pub fn advance_pos(&mut self, pos: String) {
        self.pos = Some(pos);
    }

    /// Clears `pos` after an `M_UNKNOWN_POS` error.
    pub fn expire_pos(&mut self) {
        self.pos = None;
    }

    /// Advances the to-device since-token; monotone by construction since the
    /// caller only ever passes a later response's `next_batch`.
    pub fn advance_to_device_since(&mut self, next_batch: String) {
        self.to_device_since = Some(next_batch);
    }

    pub fn restore(&mut self, pos: Option<String>, to_device_since: Option<String>) {
        self.pos = pos;
        self.to_device_since = to_device_since;
    }

    /// The timeout to use for the next request, given whether every list is
    /// fully loaded and any per-call overrides.
    pub fn effective_timeout(&self, is_fully_synced: bool, overrides: TimeoutOverrides) -> Duration {
        if is_fully_synced {
            overrides.long_poll_timeout.unwrap_or(self.long_poll_timeout)
        } else {
            overrides.catch_up_timeout.unwrap_or(self.catch_up_timeout)
        }
    }
}
