//! The incoming wire shape (§6): what `serde_json` deserializes a raw sync
//! response into, before the classifier (§4.5) turns it into a [`crate::classifier::SyncUpdate`].
//!
//! Deliberately untyped where the spec doesn't ask for more: event payloads
//! keep their `content` as a [`serde_json::Value`] rather than reproducing a
//! full Matrix event type system, which is explicitly plumbing, not part of
//! the core algorithm (spec §1).

use std::collections::BTreeMap;

use serde::Deserialize;

/// A minimally-typed timeline/state/to-device event: the fields the
/// classifier and log formatters need, with the rest left as raw JSON.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub sender: Option<String>,
    #[serde(default)]
    pub state_key: Option<String>,
    #[serde(default)]
    pub content: serde_json::Value,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct UnreadNotifications {
    #[serde(default)]
    pub highlight_count: Option<u64>,
    #[serde(default)]
    pub notification_count: Option<u64>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct RawHero {
    pub user_id: String,
    #[serde(default, rename = "displayname")]
    pub name: Option<String>,
    #[serde(default, rename = "avatar_url")]
    pub avatar_url: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawRoom {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub initial: Option<bool>,
    #[serde(default)]
    pub is_dm: Option<bool>,
    #[serde(default)]
    pub limited: Option<bool>,
    #[serde(default)]
    pub prev_batch: Option<String>,
    #[serde(default)]
    pub invite_state: Option<Vec<RawEvent>>,
    #[serde(default)]
    pub timeline: Vec<RawEvent>,
    #[serde(default)]
    pub required_state: Vec<RawEvent>,
    #[serde(default)]
    pub unread_notifications: UnreadNotifications,
    #[serde(default)]
    pub joined_count: Option<u64>,
    #[serde(default)]
    pub invited_count: Option<u64>,
    #[serde(default)]
    pub bump_stamp: Option<u64>,
    #[serde(default)]
    pub num_live: Option<u64>,
    #[serde(default)]
    pub heroes: Option<Vec<RawHero>>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawOp {
    #[serde(default)]
    pub op: String,
    #[serde(default)]
    pub range: Option<(u64, u64)>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct RawListResponse {
    pub count: u64,
    #[serde(default)]
    pub ops: Vec<RawOp>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawToDevice {
    #[serde(default)]
    pub next_batch: Option<String>,
    #[serde(default)]
    pub events: Vec<RawEvent>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawDeviceLists {
    #[serde(default)]
    pub changed: Vec<String>,
    #[serde(default)]
    pub left: Vec<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawE2ee {
    #[serde(default)]
    pub device_lists: RawDeviceLists,
    #[serde(default)]
    pub device_one_time_keys_count: BTreeMap<String, u64>,
    #[serde(default)]
    pub device_unused_fallback_key_types: Option<Vec<String>>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawAccountData {
    #[serde(default)]
    pub global: Vec<RawEvent>,
    #[serde(default)]
    pub rooms: BTreeMap<String, Vec<RawEvent>>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawTypingRoom {
    #[serde(default)]
    pub user_ids: Vec<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawTyping {
    #[serde(default)]
    pub rooms: BTreeMap<String, RawTypingRoom>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawReceipts {
    #[serde(default)]
    pub rooms: BTreeMap<String, serde_json::Value>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawExtensions {
    #[serde(default)]
    pub to_device: Option<RawToDevice>,
    #[serde(default)]
    pub e2ee: RawE2ee,
    #[serde(default)]
    pub account_data: RawAccountData,
    #[serde(default)]
    pub typing: RawTyping,
    #[serde(default)]
    pub receipts: RawReceipts,
}

/// The full deserialized shape of a 200 response.
#[derive(Clone, Debug, Deserialize)]
pub struct RawResponse {
    pub pos: String,
    #[serde(default)]
    pub lists: BTreeMap<String, RawListResponse>,
    #[serde(default)]
    pub rooms: BTreeMap<String, RawRoom>,
    #[serde(default)]
    pub extensions: RawExtensions,
}

/// The `{errcode, error}` shape of a non-200 Matrix error response.
#[derive(Clone, Debug, Deserialize)]
pub struct RawErrorBody {
    pub errcode: String,
    #[serde(default)]
    pub error: String,
}

pub const UNKNOWN_POS_ERRCODE: &str = "M_UNKNOWN_POS";
