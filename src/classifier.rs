//! Response classifier (§4.5): splits the raw per-room response into
//! joined/invited/left updates and merges per-room extension payloads.
//!
//! Pure with respect to engine state — it never touches `pos`, lists, or
//! extension configs; [`crate::engine::SlidingSyncEngine::sync_once`] calls
//! this after it has already advanced those itself.

use indexmap::{IndexMap, IndexSet};

use crate::response::{RawE2ee, RawEvent, RawHero, RawResponse};

/// A joined-room update: everything the classifier could extract, including
/// any per-room extension data merged in by room id.
#[derive(Clone, Debug, Default)]
pub struct JoinedRoom {
    pub name: Option<String>,
    pub avatar: Option<String>,
    pub initial: bool,
    pub is_dm: bool,
    pub limited: bool,
    pub prev_batch: Option<String>,
    pub timeline: Vec<RawEvent>,
    pub required_state: Vec<RawEvent>,
    pub highlight_count: u64,
    pub notification_count: u64,
    pub joined_count: Option<u64>,
    pub invited_count: Option<u64>,
    pub bump_stamp: Option<u64>,
    pub num_live: Option<u64>,
    pub heroes: Vec<RawHero>,
    pub account_data: Vec<RawEvent>,
    pub typing_user_ids: Vec<String>,
    pub receipts: Option<serde_json::Value>,
}

#[derive(Clone, Debug, Default)]
pub struct InvitedRoom {
    pub invite_state: Vec<RawEvent>,
}

#[derive(Clone, Debug, Default)]
pub struct LeftRoom {
    pub timeline: Vec<RawEvent>,
    pub required_state: Vec<RawEvent>,
}

/// Per-tick room updates, keyed by room id and grouped by membership.
#[derive(Clone, Debug, Default)]
pub struct RoomUpdates {
    pub joined: IndexMap<String, JoinedRoom>,
    pub invited: IndexMap<String, InvitedRoom>,
    pub left: IndexMap<String, LeftRoom>,
}

/// Extension deltas carried by this tick, mostly a straight pass-through of
/// the response's extension section (per-room entries were already merged
/// into the room updates above).
#[derive(Clone, Debug, Default)]
pub struct ExtensionUpdates {
    pub to_device_events: Vec<RawEvent>,
    pub to_device_next_batch: Option<String>,
    pub e2ee: RawE2ee,
    pub account_data_global: Vec<RawEvent>,
    pub typing_rooms: IndexMap<String, Vec<String>>,
    pub receipts_rooms: IndexMap<String, serde_json::Value>,
}

/// The per-tick output handed back to the caller of `sync_once`.
#[derive(Clone, Debug, Default)]
pub struct SyncUpdate {
    pub pos: String,
    pub updated_lists: Vec<String>,
    pub rooms: RoomUpdates,
    pub extensions: ExtensionUpdates,
}

fn membership_is_left(events: &[RawEvent], current_user_id: &str) -> bool {
    events.iter().any(|event| {
        event.event_type == "m.room.member"
            && event.state_key.as_deref() == Some(current_user_id)
            && matches!(event.content.get("membership").and_then(|v| v.as_str()), Some("leave") | Some("ban"))
    })
}

/// Classifies a raw response into a [`SyncUpdate`].
///
/// `updated_lists` is the intersection of `response.lists` with the engine's
/// known list names, already computed by the caller (spec §4.6 step 3).
pub fn classify(response: &RawResponse, updated_lists: Vec<String>, current_user_id: Option<&str>) -> SyncUpdate {
    let mut rooms = RoomUpdates::default();

    // Pre-pass: every room id that carries per-room extension data, so the
    // second pass can tell whether it already emitted an update for it.
    let mut extension_only_rooms: IndexSet<String> = IndexSet::new();
    for room_id in response.extensions.account_data.rooms.keys() {
        extension_only_rooms.insert(room_id.clone());
    }
    for room_id in response.extensions.typing.rooms.keys() {
        extension_only_rooms.insert(room_id.clone());
    }
    for room_id in response.extensions.receipts.rooms.keys() {
        extension_only_rooms.insert(room_id.clone());
    }

    let merge_extensions = |room_id: &str| -> (Vec<RawEvent>, Vec<String>, Option<serde_json::Value>) {
        let account_data = response.extensions.account_data.rooms.get(room_id).cloned().unwrap_or_default();
        let typing_user_ids = response
            .extensions
            .typing
            .rooms
            .get(room_id)
            .map(|t| t.user_ids.clone())
            .unwrap_or_default();
        let receipts = response.extensions.receipts.rooms.get(room_id).cloned();
        (account_data, typing_user_ids, receipts)
    };

    for (room_id, raw) in &response.rooms {
        extension_only_rooms.shift_remove(room_id);

        if raw.invite_state.is_some() {
            rooms.invited.insert(
                room_id.clone(),
                InvitedRoom { invite_state: raw.invite_state.clone().unwrap_or_default() },
            );
            continue;
        }

        if let Some(user_id) = current_user_id {
            if membership_is_left(&raw.required_state, user_id) {
                rooms.left.insert(
                    room_id.clone(),
                    LeftRoom { timeline: raw.timeline.clone(), required_state: raw.required_state.clone() },
                );
                continue;
            }
        }

        let (account_data, typing_user_ids, receipts) = merge_extensions(room_id);
        rooms.joined.insert(
            room_id.clone(),
            JoinedRoom {
                name: raw.name.clone(),
                avatar: raw.avatar.clone(),
                initial: raw.initial.unwrap_or(false),
                is_dm: raw.is_dm.unwrap_or(false),
                limited: raw.limited.unwrap_or(false),
                prev_batch: raw.prev_batch.clone(),
                timeline: raw.timeline.clone(),
                required_state: raw.required_state.clone(),
                highlight_count: raw.unread_notifications.highlight_count.unwrap_or(0),
                notification_count: raw.unread_notifications.notification_count.unwrap_or(0),
                joined_count: raw.joined_count,
                invited_count: raw.invited_count,
                bump_stamp: raw.bump_stamp,
                num_live: raw.num_live,
                heroes: raw.heroes.clone().unwrap_or_default(),
                account_data,
                typing_user_ids,
                receipts,
            },
        );
    }

    // Any room that only carried extension data surfaces as joined, carrying
    // nothing but that data (spec §4.5, the mechanism for typing/receipts
    // updates to appear between timeline-bearing ticks).
    for room_id in extension_only_rooms {
        let (account_data, typing_user_ids, receipts) = merge_extensions(&room_id);
        rooms.joined.insert(
            room_id,
            JoinedRoom { account_data, typing_user_ids, receipts, ..JoinedRoom::default() },
        );
    }

    let extensions = ExtensionUpdates {
        to_device_events: response.extensions.to_device.as_ref().map(|td| td.events.clone()).unwrap_or_default(),
        to_device_next_batch: response.extensions.to_device.as_ref().and_then(|td| td.next_batch.clone()),
        e2ee: response.extensions.e2ee.clone(),
        account_data_global: response.extensions.account_data.global.clone(),
        typing_rooms: response
            .extensions
            .typing
            .rooms
            .iter()
            .map(|(room_id, typing)| (room_id.clone(), typing.user_ids.clone()))
            .collect(),
        receipts_rooms: response.extensions.receipts.rooms.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
    };

    SyncUpdate { pos: response.pos.clone(), updated_lists, rooms, extensions }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::{RawAccountData, RawExtensions, RawListResponse, RawOp, RawTyping, RawTypingRoom};
    use std::collections::BTreeMap;

    fn member_event(user_id: &str, membership: &str) -> RawEvent {
        RawEvent {
            event_type: "m.room.member".into(),
            sender: Some(user_id.into()),
            state_key: Some(user_id.into()),
            content: serde_json::json!({ "membership": membership }),
        }
    }

    #[test]
    fn invited_room_classified_from_invite_state() {
        let mut response = RawResponse {
            pos: "p1".into(),
            lists: BTreeMap::new(),
            rooms: BTreeMap::new(),
            extensions: RawExtensions::default(),
        };
        response.rooms.insert(
            "!a:x".into(),
            crate::response::RawRoom { invite_state: Some(vec![member_event("@me:x", "invite")]), ..Default::default() },
        );

        let update = classify(&response, vec![], Some("@me:x"));
        assert!(update.rooms.invited.contains_key("!a:x"));
        assert!(update.rooms.joined.is_empty());
    }

    #[test]
    fn left_room_classified_from_membership_leave() {
        let mut response = RawResponse {
            pos: "p1".into(),
            lists: BTreeMap::new(),
            rooms: BTreeMap::new(),
            extensions: RawExtensions::default(),
        };
        response.rooms.insert(
            "!a:x".into(),
            crate::response::RawRoom {
                required_state: vec![member_event("@me:x", "leave")],
                ..Default::default()
            },
        );

        let update = classify(&response, vec![], Some("@me:x"));
        assert!(update.rooms.left.contains_key("!a:x"));
    }

    #[test]
    fn banned_room_also_classified_as_left() {
        let mut response = RawResponse {
            pos: "p1".into(),
            lists: BTreeMap::new(),
            rooms: BTreeMap::new(),
            extensions: RawExtensions::default(),
        };
        response.rooms.insert(
            "!a:x".into(),
            crate::response::RawRoom { required_state: vec![member_event("@me:x", "ban")], ..Default::default() },
        );
        let update = classify(&response, vec![], Some("@me:x"));
        assert!(update.rooms.left.contains_key("!a:x"));
    }

    #[test]
    fn plain_room_classified_as_joined_with_defaulted_counts() {
        let mut response = RawResponse {
            pos: "p1".into(),
            lists: BTreeMap::new(),
            rooms: BTreeMap::new(),
            extensions: RawExtensions::default(),
        };
        response.rooms.insert("!a:x".into(), crate::response::RawRoom::default());

        let update = classify(&response, vec![], Some("@me:x"));
        let joined = &update.rooms.joined["!a:x"];
        assert_eq!(joined.highlight_count, 0);
        assert_eq!(joined.notification_count, 0);
    }

    #[test]
    fn extension_only_room_surfaces_as_joined() {
        // S5: rooms = {}, extensions.typing.rooms = {"!a:x": {user_ids: ["@u:x"]}}.
        let mut typing_rooms = BTreeMap::new();
        typing_rooms.insert("!a:x".to_string(), RawTypingRoom { user_ids: vec!["@u:x".into()] });
        let response = RawResponse {
            pos: "p1".into(),
            lists: BTreeMap::new(),
            rooms: BTreeMap::new(),
            extensions: RawExtensions { typing: RawTyping { rooms: typing_rooms }, ..Default::default() },
        };

        let update = classify(&response, vec![], None);
        let joined = update.rooms.joined.get("!a:x").expect("room should surface as joined");
        assert_eq!(joined.typing_user_ids, vec!["@u:x".to_string()]);
        assert!(joined.timeline.is_empty());
        assert!(joined.required_state.is_empty());
    }

    #[test]
    fn account_data_global_passes_through_untouched() {
        let response = RawResponse {
            pos: "p1".into(),
            lists: BTreeMap::new(),
            rooms: BTreeMap::new(),
            extensions: RawExtensions {
                account_data: RawAccountData {
                    global: vec![RawEvent { event_type: "m.push_rules".into(), ..Default::default() }],
                    rooms: BTreeMap::new(),
                },
                ..Default::default()
            },
        };
        let update = classify(&response, vec![], None);
        assert_eq!(update.extensions.account_data_global.len(), 1);
    }

    #[test]
    fn updated_lists_passed_through_verbatim() {
        let mut lists = BTreeMap::new();
        lists.insert("all_rooms".to_string(), RawListResponse { count: 10, ops: vec![RawOp { op: "SYNC".into(), range: Some((0, 9)) }] });
        let response = RawResponse { pos: "p1".into(), lists, rooms: BTreeMap::new(), extensions: RawExtensions::default() };
        let update = classify(&response, vec!["all_rooms".to_string()], None);
        assert_eq!(update.updated_lists, vec!["all_rooms".to_string()]);
    }
}
