//! Request builder (§4.4): assembles the wire request from the engine's
//! current state plus optional per-call overrides.

use indexmap::IndexMap;
use serde::Serialize;

use crate::{
    extensions::ExtensionConfig,
    list::{ListConfig, RoomSubscription},
};

/// Per-call overrides accepted by `build_request`/`sync_once`.
#[derive(Clone, Debug, Default)]
pub struct RequestOverrides {
    pub catch_up_timeout_ms: Option<u64>,
    pub long_poll_timeout_ms: Option<u64>,
    pub set_presence: Option<Presence>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Presence {
    Online,
    Offline,
    Unavailable,
}

impl Presence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Offline => "offline",
            Self::Unavailable => "unavailable",
        }
    }
}

/// The fully-assembled request for one tick: the wire JSON body plus the
/// out-of-band query parameters the transport must also send.
#[derive(Clone, Debug)]
pub struct SyncRequest {
    pub pos: Option<String>,
    pub timeout_ms: u64,
    pub set_presence: Option<Presence>,
    pub body: WireRequestBody,
}

/// The JSON body of a sync request (spec §6).
#[derive(Clone, Debug, Serialize)]
pub struct WireRequestBody {
    pub conn_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pos: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
    pub lists: IndexMap<String, ListConfig>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub room_subscriptions: IndexMap<String, RoomSubscription>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub extensions: IndexMap<String, ExtensionConfig>,
}
