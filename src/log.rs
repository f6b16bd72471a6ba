//! Log formatters (§4.8): deterministic, human-readable request/response
//! renderings. Kept as pure functions (no `tracing` dependency here) so they
//! stay testable and usable by a caller that hasn't wired up a subscriber;
//! [`crate::engine::SlidingSyncEngine::sync_once`] is what actually emits
//! them via `tracing::debug!`.

use std::fmt::Write as _;

use indexmap::IndexMap;

use crate::{
    classifier::SyncUpdate,
    list::List,
    request::SyncRequest,
    response::RawResponse,
};

/// Renders the request about to be sent. Always begins with `>>> REQUEST`.
pub fn format_request_log(request: &SyncRequest) -> String {
    let mut out = String::new();
    writeln!(
        out,
        ">>> REQUEST conn_id={} pos={} timeout={}ms",
        request.body.conn_id,
        request.pos.as_deref().unwrap_or("null"),
        request.timeout_ms,
    )
    .unwrap();

    for (name, config) in &request.body.lists {
        let (start, end) = config.ranges.first().copied().unwrap_or((0, 0));
        writeln!(out, "  list:{name}=[{start}, {end}]").unwrap();
    }

    if !request.body.room_subscriptions.is_empty() {
        let ids = request.body.room_subscriptions.keys().cloned().collect::<Vec<_>>().join(", ");
        writeln!(out, "  subscriptions=[{ids}]").unwrap();
    }

    if !request.body.extensions.is_empty() {
        let names = request.body.extensions.keys().cloned().collect::<Vec<_>>().join(", ");
        writeln!(out, "  extensions=[{names}]").unwrap();
    }

    out
}

/// Renders the response and classified update from a tick. Always begins
/// with `<<< RESPONSE`. `known_lists` supplies the post-tick loading state
/// for every list the engine knows about, not only the ones present in
/// `response.lists`.
pub fn format_response_log(
    response: &RawResponse,
    update: &SyncUpdate,
    known_lists: &IndexMap<String, List>,
    is_fully_synced: bool,
) -> String {
    let mut out = String::new();
    writeln!(out, "<<< RESPONSE pos={}", response.pos).unwrap();

    for (name, list_response) in &response.lists {
        write!(out, "  list:{name} count={}", list_response.count).unwrap();
        if let Some((start, end)) = list_response.ops.iter().find_map(|op| op.range) {
            write!(out, " range=[{start}, {end}]").unwrap();
        }
        writeln!(out).unwrap();
    }

    for (name, list) in known_lists {
        writeln!(out, "  {name}:{}", list.loading_state().as_str()).unwrap();
    }

    let total_rooms = update.rooms.joined.len() + update.rooms.invited.len() + update.rooms.left.len();
    writeln!(out, "  rooms={total_rooms} updated").unwrap();

    for (room_id, room) in &update.rooms.joined {
        writeln!(out, "  room:{room_id}").unwrap();
        if let Some(name) = &room.name {
            writeln!(out, "    name={name}").unwrap();
        }
        if room.initial {
            writeln!(out, "    initial=true").unwrap();
        }
        if !room.required_state.is_empty() {
            let types = room.required_state.iter().map(|e| e.event_type.as_str()).collect::<Vec<_>>().join(", ");
            writeln!(out, "    required_state=[{types}]").unwrap();
        }
        writeln!(out, "    timeline={} events", room.timeline.len()).unwrap();
        for event in &room.timeline {
            writeln!(out, "      {} from {}", event.event_type, event.sender.as_deref().unwrap_or("?")).unwrap();
        }
        writeln!(
            out,
            "    highlight_count={} notification_count={}",
            room.highlight_count, room.notification_count
        )
        .unwrap();
    }

    for (room_id, invited) in &update.rooms.invited {
        let types = invited.invite_state.iter().map(|e| e.event_type.as_str()).collect::<Vec<_>>().join(", ");
        writeln!(out, "  invited:{room_id} invite_state=[{types}]").unwrap();
    }

    for room_id in update.rooms.left.keys() {
        writeln!(out, "  left:{room_id}").unwrap();
    }

    if !update.extensions.to_device_events.is_empty() || update.extensions.to_device_next_batch.is_some() {
        write!(out, "  to_device: {} events", update.extensions.to_device_events.len()).unwrap();
        if let Some(next_batch) = &update.extensions.to_device_next_batch {
            write!(out, ", next_batch={next_batch}").unwrap();
        }
        writeln!(out).unwrap();
    }

    if !update.extensions.e2ee.device_lists.changed.is_empty() || !update.extensions.e2ee.device_lists.left.is_empty()
    {
        writeln!(
            out,
            "  e2ee: changed=[{}] left=[{}]",
            update.extensions.e2ee.device_lists.changed.join(", "),
            update.extensions.e2ee.device_lists.left.join(", "),
        )
        .unwrap();
    }

    if !update.extensions.account_data_global.is_empty() {
        writeln!(out, "  account_data: {} global events", update.extensions.account_data_global.len()).unwrap();
    }

    if !update.extensions.typing_rooms.is_empty() {
        writeln!(out, "  typing: {} rooms", update.extensions.typing_rooms.len()).unwrap();
    }

    if !update.extensions.receipts_rooms.is_empty() {
        writeln!(out, "  receipts: {} rooms", update.extensions.receipts_rooms.len()).unwrap();
    }

    if is_fully_synced {
        writeln!(out, "  [FULLY SYNCED]").unwrap();
    }

    out
}
