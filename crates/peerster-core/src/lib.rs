//! View synchronization for the Peerster chat client.
//!
//! The gossiper's web server only ever answers with full snapshots of its
//! collections. This crate folds those snapshots into a store and turns them
//! into an append-only, duplicate-free stream of render events for the
//! conversation currently on screen.
//!
//! - `model`: conversations, messages, stream keys, reputation scores
//! - `wire`: JSON shapes served by the gossiper and snapshot decoding
//! - `post`: request bodies for the pass-through write endpoints
//! - `store`: latest known state of every collection
//! - `read_index` / `merger`: per-stream render cursors and delta computation
//! - `engine`: active-conversation state machine and snapshot routing
//! - `format`: reputation display helpers

pub mod engine;
pub mod event;
pub mod format;
pub mod merger;
pub mod model;
pub mod post;
pub mod read_index;
pub mod store;
pub mod wire;

pub use engine::{SyncEngine, ViewState};
pub use event::SyncEvent;
pub use merger::merge_and_emit;
pub use model::{
    ConversationId, Message, MessageKind, ReputationScore, ReputationSnapshot, ReputationTable,
    StreamKey,
};
pub use post::{DownloadPost, FilePost, MessagePost, PeerPost, PostRequest, PostValidationError};
pub use read_index::ReadIndexTracker;
pub use store::{EntityStore, OrderedSet, SnapshotReport};
pub use wire::{decode_snapshot, CollectionKind, CollectionSnapshot, WireError};
