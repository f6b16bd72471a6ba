//! The sliding-window state machine for a single named list.
//!
//! Modelled after the request-generator pattern used by Matrix client SDKs:
//! the sync mode is a tagged variant and each variant only carries the
//! fields its own arithmetic needs (there is no `page_offset` for a growing
//! list, for instance) so invalid combinations aren't representable.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// An inclusive range of indices into the server's filtered room list.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Range {
    pub start: u64,
    pub end: u64,
}

impl Range {
    pub fn new(start: u64, end: u64) -> Self {
        assert!(start <= end, "range start must not exceed end");
        Self { start, end }
    }
}

/// Loading state of a [`List`], recomputed after every response.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadingState {
    NotLoaded,
    /// Reserved for a future loading phase; the core algorithm never writes this variant.
    Preloaded,
    PartiallyLoaded,
    FullyLoaded,
}

/// A `(event_type, state_key)` pair requested as required state for rooms in a list.
pub type StateKeySelector = (String, String);

/// Sticky filter applied to a list before windowing, per MSC4186.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ListFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_dm: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_encrypted: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_invite: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub spaces: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub room_types: Vec<String>,
}

/// The windowing strategy of a [`List`] and the mutable state it owns.
#[derive(Clone, Debug)]
pub enum ListMode {
    /// A fixed set of ranges the caller chose; the engine never advances them.
    Selective,
    /// Tiles the index space into non-overlapping `batch_size` windows, advancing
    /// `page_offset` by a full batch on every response.
    Paging { batch_size: u64, page_offset: u64 },
    /// Grows a single window `[0, end]` by `batch_size` on every response until
    /// it covers the whole (possibly capped) room count.
    Growing { batch_size: u64 },
}

/// Configuration and synced state of one named sliding-sync list.
#[derive(Clone, Debug)]
pub struct List {
    name: String,
    mode: ListMode,
    max_rooms_to_fetch: Option<u64>,
    timeline_limit: Option<u64>,
    required_state: BTreeSet<StateKeySelector>,
    filter: Option<ListFilter>,
    include_heroes: Option<bool>,

    ranges: Vec<Range>,
    server_room_count: Option<u64>,
    loading_state: LoadingState,
}

/// Builder-style constructor parameters for a new [`List`].
#[derive(Clone, Debug)]
pub struct ListBuilder {
    name: String,
    mode: ListMode,
    max_rooms_to_fetch: Option<u64>,
    timeline_limit: Option<u64>,
    required_state: BTreeSet<StateKeySelector>,
    filter: Option<ListFilter>,
    include_heroes: Option<bool>,
    initial_ranges: Option<Vec<Range>>,
}

impl ListBuilder {
    pub fn new(name: impl Into<String>, mode: ListMode) -> Self {
        Self {
            name: name.into(),
            mode,
            max_rooms_to_fetch: None,
            timeline_limit: None,
            required_state: BTreeSet::new(),
            filter: None,
            include_heroes: None,
            initial_ranges: None,
        }
    }

    pub fn max_rooms_to_fetch(mut self, cap: u64) -> Self {
        self.max_rooms_to_fetch = Some(cap);
        self
    }

    pub fn timeline_limit(mut self, limit: u64) -> Self {
        self.timeline_limit = Some(limit);
        self
    }

    pub fn required_state(mut self, keys: impl IntoIterator<Item = StateKeySelector>) -> Self {
        self.required_state.extend(keys);
        self
    }

    pub fn filter(mut self, filter: ListFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn include_heroes(mut self, include: bool) -> Self {
        self.include_heroes = Some(include);
        self
    }

    /// Only meaningful for [`ListMode::Selective`]; seeds the fixed ranges.
    pub fn initial_ranges(mut self, ranges: Vec<Range>) -> Self {
        self.initial_ranges = Some(ranges);
        self
    }

    pub fn build(self) -> List {
        let ranges = self.initial_ranges.unwrap_or_else(|| match &self.mode {
            ListMode::Selective => Vec::new(),
            ListMode::Paging { batch_size, .. } | ListMode::Growing { batch_size } => {
                let cap = self.max_rooms_to_fetch.unwrap_or(u64::MAX);
                let end = batch_size.saturating_sub(1).min(cap.saturating_sub(1));
                vec![Range::new(0, end)]
            }
        });

        List {
            name: self.name,
            mode: self.mode,
            max_rooms_to_fetch: self.max_rooms_to_fetch,
            timeline_limit: self.timeline_limit,
            required_state: self.required_state,
            filter: self.filter,
            include_heroes: self.include_heroes,
            ranges,
            server_room_count: None,
            loading_state: LoadingState::NotLoaded,
        }
    }
}

/// A single operation as echoed by the server for one list.
///
/// `SYNC` is the only op this engine acts on; any other op (`INSERT`,
/// `DELETE`, `INVALIDATE`, …) is treated as carrying no range even if the
/// wire payload happens to include a `range` field (spec SPEC_FULL.md §G).
#[derive(Clone, Debug)]
pub struct ListOp {
    pub op: String,
    pub range: Option<Range>,
}

impl ListOp {
    /// The range this op carries, or `None` if it's not a `SYNC` op.
    fn effective_range(&self) -> Option<Range> {
        if self.op == "SYNC" { self.range } else { None }
    }
}

/// The server's per-list portion of a sync response.
#[derive(Clone, Debug)]
pub struct ListResponse {
    pub count: u64,
    pub ops: Vec<ListOp>,
}

/// The persisted subset of a list's state (see §4.7 in the spec).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ListSnapshot {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<Range>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_room_count: Option<u64>,
}

fn clamp_end(end: u64, total: Option<u64>, cap: Option<u64>) -> u64 {
    let mut e = end;
    if let Some(total) = total {
        e = e.min(total.saturating_sub(1));
    }
    if let Some(cap) = cap {
        e = e.min(cap.saturating_sub(1));
    }
    e
}

impl LoadingState {
    /// Matches the `snake_case` rendering used by `Serialize` and by the log formatters.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotLoaded => "not_loaded",
            Self::Preloaded => "preloaded",
            Self::PartiallyLoaded => "partially_loaded",
            Self::FullyLoaded => "fully_loaded",
        }
    }
}

impl List {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mode(&self) -> &ListMode {
        &self.mode
    }

    pub fn ranges(&self) -> &[Range] {
        &self.ranges
    }

    pub fn server_room_count(&self) -> Option<u64> {
        self.server_room_count
    }

    pub fn loading_state(&self) -> LoadingState {
        self.loading_state
    }

    pub fn timeline_limit(&self) -> Option<u64> {
        self.timeline_limit
    }

    pub fn required_state(&self) -> impl Iterator<Item = &StateKeySelector> {
        self.required_state.iter()
    }

    pub fn filter(&self) -> Option<&ListFilter> {
        self.filter.as_ref()
    }

    pub fn include_heroes(&self) -> Option<bool> {
        self.include_heroes
    }

    pub fn is_fully_loaded(&self) -> bool {
        self.loading_state == LoadingState::FullyLoaded
    }

    fn effective_cap(&self) -> Option<u64> {
        match (self.max_rooms_to_fetch, self.server_room_count) {
            (Some(cap), _) => Some(cap),
            (None, Some(total)) => Some(total),
            (None, None) => None,
        }
    }

    /// Pure function of current state: the range(s) to send on the next request.
    ///
    /// Returns `None` only for a paging list that has finished tiling the space.
    pub fn compute_next_range(&self) -> Option<Vec<Range>> {
        match &self.mode {
            ListMode::Selective => {
                if self.ranges.is_empty() {
                    None
                } else {
                    Some(self.ranges.clone())
                }
            }
            ListMode::Paging { batch_size, page_offset } => {
                let cap = self.max_rooms_to_fetch;
                if self.server_room_count.is_some_and(|t| *page_offset >= t)
                    || cap.is_some_and(|c| *page_offset >= c)
                {
                    return None;
                }
                let end = clamp_end(
                    page_offset + batch_size.saturating_sub(1),
                    self.server_room_count,
                    cap,
                );
                Some(vec![Range::new(*page_offset, end)])
            }
            ListMode::Growing { batch_size } => {
                let current_end = self.ranges.first().map(|r| r.end as i64).unwrap_or(-1);
                let cap = self.effective_cap();
                let new_end =
                    clamp_end((current_end + *batch_size as i64).max(0) as u64, self.server_room_count, cap);
                if (new_end as i64) <= current_end {
                    // Can't grow further: re-request the current window so the server keeps
                    // streaming live updates for it.
                    let end = current_end.max(0) as u64;
                    Some(vec![Range::new(0, end)])
                } else {
                    Some(vec![Range::new(0, new_end)])
                }
            }
        }
    }

    /// Consumes the server's per-list response, advancing ranges and loading state.
    pub fn handle_response(&mut self, response: &ListResponse) {
        self.server_room_count = Some(response.count);

        let mut carried_range = false;
        for op in &response.ops {
            if let Some(range) = op.effective_range() {
                carried_range = true;
                self.ranges = vec![range];
                if let ListMode::Paging { page_offset, .. } = &mut self.mode {
                    *page_offset = range.end + 1;
                }
            }
        }

        self.recompute_loading_state(carried_range);
    }

    /// Restores ranges/count from a persisted snapshot (see §4.7).
    pub fn restore_state(&mut self, snapshot: &ListSnapshot) {
        if let Some(range) = snapshot.range {
            self.ranges = vec![range];
            if let ListMode::Paging { page_offset, .. } = &mut self.mode {
                *page_offset = range.end + 1;
            }
        }
        self.server_room_count = snapshot.server_room_count;
        self.recompute_loading_state(snapshot.range.is_some());
    }

    /// Recomputes `loading_state` from current ranges/count/cap.
    ///
    /// `carried_range` is whether the triggering response/snapshot actually
    /// carried a range for this list. When it didn't (e.g. a response with
    /// `server_room_count` set but empty, or only non-`SYNC` ops), the
    /// blind `>=` saturation check is bypassed and a non-selective list is
    /// forced to `partially_loaded` regardless of `server_room_count`/cap —
    /// spec §4.1's edge-case policy ("if `server_room_count` is set but no
    /// op carried a range, leave `ranges` unchanged and transition to
    /// `partially_loaded`").
    fn recompute_loading_state(&mut self, carried_range: bool) {
        self.loading_state = match &self.mode {
            ListMode::Selective => LoadingState::FullyLoaded,
            ListMode::Paging { page_offset, .. } => {
                if !carried_range {
                    LoadingState::PartiallyLoaded
                } else {
                    let cap = self.max_rooms_to_fetch;
                    let done = self.server_room_count.is_some_and(|t| *page_offset >= t)
                        || cap.is_some_and(|c| *page_offset >= c);
                    if done { LoadingState::FullyLoaded } else { LoadingState::PartiallyLoaded }
                }
            }
            ListMode::Growing { .. } => {
                if !carried_range {
                    LoadingState::PartiallyLoaded
                } else {
                    let cap = self.effective_cap();
                    let current_end = self.ranges.first().map(|r| r.end);
                    let done = match (current_end, self.server_room_count, cap) {
                        (Some(end), Some(total), _) if end + 1 >= total => true,
                        (Some(end), _, Some(cap)) if end + 1 >= cap => true,
                        _ => false,
                    };
                    if done {
                        LoadingState::FullyLoaded
                    } else {
                        LoadingState::PartiallyLoaded
                    }
                }
            }
        };
    }

    /// Exports the persistable subset of this list's state.
    pub fn export_state(&self) -> ListSnapshot {
        ListSnapshot { range: self.ranges.first().copied(), server_room_count: self.server_room_count }
    }

    /// Renders the outgoing list config for the next request. This is the one
    /// authoritative call to [`Self::compute_next_range`] per tick (spec §4.4):
    /// the request builder calls `to_config` exactly once per list, so the
    /// wire request and this list's idea of "what I last asked for" can never
    /// diverge.
    ///
    /// Only the first range is ever serialized under `ranges`, even for a
    /// selective list configured with several fixed ranges (spec §9, open
    /// question: whether the server contract requires all ranges is out of
    /// scope here).
    pub fn to_config(&self) -> ListConfig {
        let ranges = self.compute_next_range().unwrap_or_else(|| self.ranges.clone());
        let first = ranges.first().copied().or_else(|| self.ranges.first().copied()).unwrap_or(Range::new(0, 0));
        ListConfig {
            ranges: vec![(first.start, first.end)],
            timeline_limit: self.timeline_limit,
            required_state: self.required_state.iter().cloned().collect(),
            filters: self.filter.clone(),
            include_heroes: self.include_heroes,
        }
    }
}

/// The outgoing, serializable per-list portion of a request (spec §4.4/§6).
#[derive(Clone, Debug, Serialize)]
pub struct ListConfig {
    pub ranges: Vec<(u64, u64)>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeline_limit: Option<u64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required_state: Vec<StateKeySelector>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filters: Option<ListFilter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_heroes: Option<bool>,
}

/// An explicit room subscription, attached to a specific room id.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RoomSubscription {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeline_limit: Option<u64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required_state: Vec<StateKeySelector>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn growing(batch_size: u64) -> List {
        ListBuilder::new("testing", ListMode::Growing { batch_size }).build()
    }

    fn paging(batch_size: u64) -> List {
        ListBuilder::new("testing", ListMode::Paging { batch_size, page_offset: 0 }).build()
    }

    fn respond(list: &mut List, count: u64, range: Range) {
        list.handle_response(&ListResponse { count, ops: vec![ListOp { op: "SYNC".into(), range: Some(range) }] });
    }

    #[test]
    fn growing_list_advances_by_batch_size_over_five_ticks() {
        // S1: 50 total rooms, batch 10.
        let mut list = growing(10);
        let expected = [(0, 9), (0, 19), (0, 29), (0, 39), (0, 49)];
        for &(start, end) in &expected {
            let next = list.compute_next_range().unwrap();
            assert_eq!(next, vec![Range::new(start, end)]);
            respond(&mut list, 50, Range::new(start, end));
        }
        assert!(list.is_fully_loaded());
    }

    #[test]
    fn growing_list_reuses_window_once_saturated() {
        let mut list =
            ListBuilder::new("testing", ListMode::Growing { batch_size: 20 }).max_rooms_to_fetch(40).build();

        let next = list.compute_next_range().unwrap();
        assert_eq!(next, vec![Range::new(0, 19)]);
        list.handle_response(&ListResponse { count: 200, ops: vec![ListOp { op: "SYNC".into(), range: Some(Range::new(0, 19)) }] });
        assert!(!list.is_fully_loaded());

        let next = list.compute_next_range().unwrap();
        assert_eq!(next, vec![Range::new(0, 39)]);
        list.handle_response(&ListResponse { count: 200, ops: vec![ListOp { op: "SYNC".into(), range: Some(Range::new(0, 39)) }] });
        assert!(list.is_fully_loaded());

        // Re-requests the same window at saturation.
        let next = list.compute_next_range().unwrap();
        assert_eq!(next, vec![Range::new(0, 39)]);
    }

    #[test]
    fn paging_list_tiles_without_overlap_then_stops() {
        // S2: 50 rooms, batch 25.
        let mut list = paging(25);
        let next = list.compute_next_range().unwrap();
        assert_eq!(next, vec![Range::new(0, 24)]);
        respond(&mut list, 50, Range::new(0, 24));
        assert!(!list.is_fully_loaded());

        let next = list.compute_next_range().unwrap();
        assert_eq!(next, vec![Range::new(25, 49)]);
        respond(&mut list, 50, Range::new(25, 49));
        assert!(list.is_fully_loaded());

        assert!(list.compute_next_range().is_none());
    }

    #[test]
    fn paging_list_with_exactly_enough_rooms_produces_short_final_window() {
        let mut list = paging(10);
        respond(&mut list, 25, Range::new(0, 9));
        respond(&mut list, 25, Range::new(10, 19));
        let next = list.compute_next_range().unwrap();
        assert_eq!(next, vec![Range::new(20, 24)]);
        respond(&mut list, 25, Range::new(20, 24));
        assert!(list.is_fully_loaded());
        assert!(list.compute_next_range().is_none());
    }

    #[test]
    fn selective_list_never_changes_and_loads_after_first_response() {
        let list = ListBuilder::new("testing", ListMode::Selective)
            .initial_ranges(vec![Range::new(0, 10), Range::new(42, 153)])
            .build();
        let mut list = list;
        assert_eq!(list.loading_state(), LoadingState::NotLoaded);
        let next = list.compute_next_range().unwrap();
        assert_eq!(next, vec![Range::new(0, 10), Range::new(42, 153)]);

        list.handle_response(&ListResponse { count: 25, ops: vec![] });
        assert!(list.is_fully_loaded());
        assert_eq!(list.compute_next_range().unwrap(), vec![Range::new(0, 10), Range::new(42, 153)]);
    }

    #[test]
    fn growing_clamped_by_fetch_cap() {
        // S3: batch 20, cap 40, count 200.
        let mut list =
            ListBuilder::new("testing", ListMode::Growing { batch_size: 20 }).max_rooms_to_fetch(40).build();

        let next = list.compute_next_range().unwrap();
        assert_eq!(next, vec![Range::new(0, 19)]);
        respond(&mut list, 200, Range::new(0, 19));
        assert!(!list.is_fully_loaded());

        let next = list.compute_next_range().unwrap();
        assert_eq!(next, vec![Range::new(0, 39)]);
        respond(&mut list, 200, Range::new(0, 39));
        assert!(list.is_fully_loaded());

        let next = list.compute_next_range().unwrap();
        assert_eq!(next, vec![Range::new(0, 39)]);
    }

    #[test]
    fn total_zero_keeps_paging_list_partially_loaded_and_stops_requesting() {
        let mut list = paging(10);
        list.handle_response(&ListResponse { count: 0, ops: vec![] });
        assert_eq!(list.loading_state(), LoadingState::PartiallyLoaded);
        assert!(list.compute_next_range().is_none());
    }

    #[test]
    fn total_zero_keeps_growing_list_partially_loaded() {
        let mut list = growing(10);
        list.handle_response(&ListResponse { count: 0, ops: vec![] });
        assert_eq!(list.loading_state(), LoadingState::PartiallyLoaded);
        assert_eq!(list.ranges(), &[Range::new(0, 9)]);
    }

    #[test]
    fn non_sync_op_with_range_is_ignored() {
        let mut list = growing(10);
        list.handle_response(&ListResponse {
            count: 50,
            ops: vec![ListOp { op: "INVALIDATE".into(), range: Some(Range::new(0, 19)) }],
        });
        // Range field present but op isn't SYNC: treated as carrying no range.
        assert_eq!(list.ranges(), &[Range::new(0, 9)]);
        assert_eq!(list.loading_state(), LoadingState::PartiallyLoaded);
    }

    #[test]
    fn total_zero_selective_is_fully_loaded() {
        let mut list = ListBuilder::new("testing", ListMode::Selective)
            .initial_ranges(vec![Range::new(0, 9)])
            .build();
        list.handle_response(&ListResponse { count: 0, ops: vec![] });
        assert!(list.is_fully_loaded());
    }

    #[test]
    fn max_rooms_to_fetch_below_batch_size_clamps_first_window() {
        let list = ListBuilder::new("testing", ListMode::Growing { batch_size: 20 }).max_rooms_to_fetch(5).build();
        assert_eq!(list.ranges(), &[Range::new(0, 4)]);
    }

    #[test]
    fn restore_state_round_trips_a_growing_list() {
        let mut original = growing(10);
        respond(&mut original, 50, Range::new(0, 19));
        let snapshot = original.export_state();

        let mut restored = growing(10);
        restored.restore_state(&snapshot);
        assert_eq!(restored.ranges(), original.ranges());
        assert_eq!(restored.server_room_count(), original.server_room_count());
        assert_eq!(restored.loading_state(), original.loading_state());

        let next = restored.compute_next_range().unwrap();
        assert_eq!(next, vec![Range::new(0, 29)]);
    }

    #[test]
    fn restore_state_sets_paging_offset_from_range_end() {
        let mut list = paging(10);
        list.restore_state(&ListSnapshot { range: Some(Range::new(0, 9)), server_room_count: Some(50) });
        let next = list.compute_next_range().unwrap();
        assert_eq!(next, vec![Range::new(10, 19)]);
    }
}
