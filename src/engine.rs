//! Sync engine (§4.6): orchestrates one tick — build request, send, handle
//! response, log, return — and the `M_UNKNOWN_POS` reset.

use std::time::Duration;

use indexmap::IndexMap;
use tracing::{debug, info_span, Instrument};

use crate::{
    classifier::{classify, SyncUpdate},
    cursor::{CursorController, TimeoutOverrides},
    error::Error,
    extensions::ExtensionsRegistry,
    list::{List, ListOp, ListResponse, Range, RoomSubscription},
    log::{format_request_log, format_response_log},
    persistence::SyncState,
    request::{RequestOverrides, SyncRequest, WireRequestBody},
    response::{RawErrorBody, RawResponse, UNKNOWN_POS_ERRCODE},
    transport::{Transport, TransportQuery, TransportRequest},
};

mod builder;

pub use self::builder::SlidingSyncEngineBuilder;

/// Drives one Matrix Simplified Sliding Sync (MSC4186) connection.
///
/// Owned directly by its caller rather than `Arc<Mutex<_>>`-wrapped: the
/// engine is single-threaded cooperative by design (spec §5). Configuration
/// methods (`add_list`, `subscribe_to_rooms`, `enable_extension`,
/// `restore_state`) must not be called while a `sync_once` future for this
/// engine is in flight — doing so is caller error, not a race this type
/// guards against.
pub struct SlidingSyncEngine<T> {
    conn_id: String,
    transport: T,
    cursor: CursorController,
    lists: IndexMap<String, List>,
    subscriptions: IndexMap<String, RoomSubscription>,
    extensions: ExtensionsRegistry,
}

impl<T> SlidingSyncEngine<T> {
    pub(crate) fn new(
        conn_id: String,
        transport: T,
        catch_up_timeout: Duration,
        long_poll_timeout: Duration,
    ) -> Self {
        Self {
            conn_id,
            transport,
            cursor: CursorController::new(catch_up_timeout, long_poll_timeout),
            lists: IndexMap::new(),
            subscriptions: IndexMap::new(),
            extensions: ExtensionsRegistry::new(),
        }
    }

    /// Starts building an engine; `conn_id` must be set on the returned builder.
    pub fn builder() -> SlidingSyncEngineBuilder {
        SlidingSyncEngineBuilder::new()
    }

    /// Adds (or replaces) a named list. The engine exclusively owns it from here on.
    pub fn add_list(&mut self, list: List) {
        self.lists.insert(list.name().to_owned(), list);
    }

    /// Returns a read-only handle to a known list.
    pub fn get_list(&self, name: &str) -> Option<&List> {
        self.lists.get(name)
    }

    /// Adds or replaces an explicit room subscription for each id.
    pub fn subscribe_to_rooms(&mut self, room_ids: impl IntoIterator<Item = String>, subscription: RoomSubscription) {
        for room_id in room_ids {
            self.subscriptions.insert(room_id, subscription.clone());
        }
    }

    /// Removes an explicit room subscription for each id, if present.
    pub fn unsubscribe_from_rooms(&mut self, room_ids: impl IntoIterator<Item = String>) {
        for room_id in room_ids {
            self.subscriptions.shift_remove(&room_id);
        }
    }

    /// Enables one extension by name (`to_device` gets the since-tracking variant).
    pub fn enable_extension(&mut self, name: impl Into<String>) {
        self.extensions.enable(name);
    }

    /// Enables exactly `{e2ee, to_device, account_data, typing, receipts}`.
    pub fn enable_all_extensions(&mut self) {
        self.extensions.enable_all();
    }

    /// True iff there is at least one list and every list is `fully_loaded`.
    pub fn is_fully_synced(&self) -> bool {
        !self.lists.is_empty() && self.lists.values().all(List::is_fully_loaded)
    }

    /// Assembles the next request from current engine state (§4.4). This is
    /// the one authoritative call to each list's `to_config` (and therefore
    /// `compute_next_range`) per tick, so the wire request and each list's
    /// own idea of "what I last asked for" can never diverge.
    pub fn build_request(&self, overrides: Option<RequestOverrides>) -> SyncRequest {
        let overrides = overrides.unwrap_or_default();
        let timeout = self.cursor.effective_timeout(
            self.is_fully_synced(),
            TimeoutOverrides {
                catch_up_timeout: overrides.catch_up_timeout_ms.map(Duration::from_millis),
                long_poll_timeout: overrides.long_poll_timeout_ms.map(Duration::from_millis),
            },
        );
        let timeout_ms = timeout.as_millis() as u64;

        let lists = self.lists.iter().map(|(name, list)| (name.clone(), list.to_config())).collect();
        let extensions = self.extensions.snapshot_for_request(self.cursor.to_device_since());
        let pos = self.cursor.pos().map(str::to_owned);

        SyncRequest {
            pos: pos.clone(),
            timeout_ms,
            set_presence: overrides.set_presence,
            body: WireRequestBody {
                conn_id: self.conn_id.clone(),
                pos,
                timeout: Some(timeout_ms),
                lists,
                room_subscriptions: self.subscriptions.clone(),
                extensions,
            },
        }
    }

    /// Consumes a parsed 200 response: advances every known list named in
    /// `response.lists`, advances the cursor and to-device since-token, and
    /// returns the classified update (§4.5, §4.6 step 3). Pure with respect
    /// to everything the classifier itself doesn't touch — this is the one
    /// place list/cursor state actually moves forward.
    pub fn handle_response(&mut self, response: &RawResponse, user_id: Option<&str>) -> SyncUpdate {
        self.cursor.advance_pos(response.pos.clone());

        let mut updated_lists = Vec::new();
        for (name, list_response) in &response.lists {
            if let Some(list) = self.lists.get_mut(name) {
                list.handle_response(&ListResponse {
                    count: list_response.count,
                    ops: list_response
                        .ops
                        .iter()
                        .map(|op| ListOp {
                            op: op.op.clone(),
                            range: op.range.map(|(start, end)| Range::new(start, end)),
                        })
                        .collect(),
                });
                updated_lists.push(name.clone());
            }
        }

        if let Some(to_device) = &response.extensions.to_device {
            if let Some(next_batch) = &to_device.next_batch {
                self.cursor.advance_to_device_since(next_batch.clone());
            }
            self.extensions.observe_to_device_next_batch(to_device.next_batch.as_deref());
        }

        classify(response, updated_lists, user_id)
    }

    /// Exports the resumable subset of engine state (§4.7).
    pub fn export_state(&self) -> SyncState {
        SyncState {
            pos: self.cursor.pos().map(str::to_owned),
            to_device_since: self.cursor.to_device_since().map(str::to_owned),
            lists: self.lists.iter().map(|(name, list)| (name.clone(), list.export_state())).collect(),
        }
    }

    /// Restores the cursor, to-device token, and every list named in `state`
    /// that this engine also knows about. Unknown list names are dropped silently.
    pub fn restore_state(&mut self, state: &SyncState) {
        self.cursor.restore(state.pos.clone(), state.to_device_since.clone());
        for (name, snapshot) in &state.lists {
            if let Some(list) = self.lists.get_mut(name) {
                list.restore_state(snapshot);
            }
        }
    }
}

impl<T: Transport> SlidingSyncEngine<T> {
    /// Runs one full tick against `homeserver_url` (§4.6).
    pub async fn sync_once(
        &mut self,
        homeserver_url: &str,
        access_token: &str,
        user_id: Option<&str>,
        overrides: Option<RequestOverrides>,
    ) -> Result<SyncUpdate, Error> {
        let span = info_span!("sliding_sync_tick", conn_id = %self.conn_id);
        async {
            let request = self.build_request(overrides);
            debug!("{}", format_request_log(&request));

            let body = serde_json::to_vec(&request.body)
                .map_err(|error| Error::Malformed { reason: error.to_string() })?;

            let transport_request = TransportRequest {
                homeserver_url: homeserver_url.to_owned(),
                access_token: access_token.to_owned(),
                query: TransportQuery {
                    pos: request.pos.clone(),
                    timeout_ms: Some(request.timeout_ms),
                    set_presence: request.set_presence.map(|presence| presence.as_str()),
                },
                body,
            };

            let response = self.transport.send(transport_request).await?;

            if response.status != 200 {
                if let Ok(error_body) = serde_json::from_slice::<RawErrorBody>(&response.body) {
                    if error_body.errcode == UNKNOWN_POS_ERRCODE {
                        self.cursor.expire_pos();
                        return Err(Error::CursorExpired);
                    }
                }
                return Err(Error::TransportFailure {
                    status: Some(response.status),
                    body: String::from_utf8_lossy(&response.body).into_owned(),
                });
            }

            let raw: RawResponse = serde_json::from_slice(&response.body)
                .map_err(|error| Error::Malformed { reason: error.to_string() })?;

            let update = self.handle_response(&raw, user_id);
            let fully_synced = self.is_fully_synced();
            debug!("{}", format_response_log(&raw, &update, &self.lists, fully_synced));

            Ok(update)
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        list::{ListBuilder, ListMode},
        transport::TransportResponse,
    };
    use std::sync::{Arc, Mutex};

    struct ScriptedTransport {
        responses: Mutex<Vec<Result<(u16, serde_json::Value), ()>>>,
        seen: Arc<Mutex<Vec<TransportRequest>>>,
    }

    impl Transport for ScriptedTransport {
        async fn send(
            &self,
            request: TransportRequest,
        ) -> Result<TransportResponse, crate::transport::TransportError> {
            self.seen.lock().unwrap().push(request);
            let (status, body) = self.responses.lock().unwrap().remove(0).expect("scripted response");
            Ok(TransportResponse { status, body: serde_json::to_vec(&body).unwrap() })
        }
    }

    fn engine_with(responses: Vec<(u16, serde_json::Value)>) -> SlidingSyncEngine<ScriptedTransport> {
        let transport = ScriptedTransport {
            responses: Mutex::new(responses.into_iter().map(Ok).collect()),
            seen: Arc::new(Mutex::new(Vec::new())),
        };
        SlidingSyncEngine::builder().conn_id("conn1").build_with_transport(transport)
    }

    #[tokio::test]
    async fn sync_once_advances_pos_and_list_state() {
        let mut engine = engine_with(vec![(
            200,
            serde_json::json!({
                "pos": "tok_1",
                "lists": {"all_rooms": {"count": 50, "ops": [{"op": "SYNC", "range": [0, 9]}]}},
            }),
        )]);
        engine.add_list(ListBuilder::new("all_rooms", ListMode::Growing { batch_size: 10 }).build());

        let update = engine.sync_once("https://example.org", "tok", None, None).await.unwrap();
        assert_eq!(update.pos, "tok_1");
        assert_eq!(update.updated_lists, vec!["all_rooms".to_string()]);
        assert_eq!(engine.get_list("all_rooms").unwrap().ranges(), &[Range::new(0, 9)]);
    }

    #[tokio::test]
    async fn unknown_pos_clears_cursor_and_fails() {
        let mut engine = engine_with(vec![(
            200,
            serde_json::json!({"pos": "old"}),
        ), (
            400,
            serde_json::json!({"errcode": "M_UNKNOWN_POS", "error": "unknown position"}),
        )]);
        engine.add_list(ListBuilder::new("all_rooms", ListMode::Selective).build());

        engine.sync_once("https://example.org", "tok", None, None).await.unwrap();
        let result = engine.sync_once("https://example.org", "tok", None, None).await;
        assert!(matches!(result, Err(Error::CursorExpired)));

        let next_request = engine.build_request(None);
        assert!(next_request.pos.is_none());
    }

    #[tokio::test]
    async fn non_200_without_unknown_pos_is_transport_failure() {
        let mut engine = engine_with(vec![(500, serde_json::json!({"errcode": "M_UNKNOWN", "error": "oops"}))]);
        let result = engine.sync_once("https://example.org", "tok", None, None).await;
        assert!(matches!(result, Err(Error::TransportFailure { status: Some(500), .. })));
    }
}
