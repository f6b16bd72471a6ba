//! Persistence envelope (§4.7): the resumable subset of engine state.
//!
//! `SyncState` is a value snapshot — callers are free to serialize, store,
//! and restore it without any aliasing concerns (spec §5).

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::list::ListSnapshot;

/// Everything needed to resume a sliding-sync connection: the cursor, the
/// to-device since-token, and each known list's range/total.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pos: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_device_since: Option<String>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub lists: IndexMap<String, ListSnapshot>,
}
