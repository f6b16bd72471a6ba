//! A client-side engine for [Matrix](https://matrix.org/) Simplified Sliding
//! Sync ([MSC4186](https://github.com/matrix-org/matrix-spec-proposals/pull/4186)).
//!
//! The engine drives an incremental long-poll conversation with a
//! homeserver so a client observes just the slice of the room graph it
//! cares about, rather than replaying the full user state on every tick. It
//! owns the cursor (`pos`), one or more named [`list::List`]s, a set of
//! explicit room subscriptions, and a set of enabled protocol
//! [`extensions`]; each tick through [`engine::SlidingSyncEngine::sync_once`]
//! returns a [`classifier::SyncUpdate`] classified by room membership
//! (joined/invited/left) together with extension deltas.
//!
//! # Usage
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use sliding_sync_engine::{
//!     list::{ListBuilder, ListMode},
//!     engine::SlidingSyncEngine,
//! };
//!
//! # async {
//! let mut engine = SlidingSyncEngine::builder()
//!     .conn_id("my-client")
//!     .catch_up_timeout(Duration::from_millis(2_000))
//!     .long_poll_timeout(Duration::from_millis(30_000))
//!     .build();
//!
//! engine.add_list(ListBuilder::new("all_rooms", ListMode::Growing { batch_size: 100 }).build());
//! engine.enable_all_extensions();
//!
//! let update = engine.sync_once("https://example.org", "access_token", None, None).await?;
//! println!("{} rooms joined", update.rooms.joined.len());
//! # Result::<(), sliding_sync_engine::Error>::Ok(())
//! # };
//! ```
//!
//! # Crate features
//!
//! * `reqwest` (default) — enables [`transport::ReqwestTransport`], the
//!   production [`transport::Transport`] implementation. Disable it and
//!   supply your own `Transport` (e.g. over a different HTTP stack, or an
//!   in-memory test double) via
//!   [`SlidingSyncEngineBuilder::build_with_transport`][engine::SlidingSyncEngineBuilder::build_with_transport].

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub mod classifier;
pub mod cursor;
pub mod engine;
pub mod error;
pub mod extensions;
pub mod list;
pub mod log;
pub mod persistence;
pub mod request;
pub mod response;
pub mod transport;

pub use crate::{engine::SlidingSyncEngine, error::Error};
