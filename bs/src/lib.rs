//! BoardStore - in-memory realtime hierarchical key-value store
//!
//! A single-actor store modeled on realtime sync backends: point writes,
//! partial-field updates, subtree deletes, full-subtree snapshot
//! subscriptions, and per-connection disconnect hooks that the store runs
//! itself when a connection ends (gracefully or not).
//!
//! # Core Concepts
//!
//! - **One actor owns the tree**: all mutations are serialized through one
//!   task, so every subscriber sees a monotonic sequence of snapshots for
//!   its path. There is no cross-path ordering guarantee.
//! - **Snapshots, not diffs**: subscribers always receive the full current
//!   subtree value (`Null` when absent), including one immediately on
//!   subscribe.
//! - **Disconnect hooks**: cleanup actions registered against a connection
//!   run without any further client-side code when that connection is lost.

pub mod messages;
pub mod path;
pub mod store;
pub mod tree;

pub use messages::{CleanupAction, ConnId, StoreCommand, StoreError, StoreResponse, SubscriptionId};
pub use path::StorePath;
pub use store::{Store, StoreConn, StoreHandle, Subscription};

/// Current wall-clock time in milliseconds since the Unix epoch
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
