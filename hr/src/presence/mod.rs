//! Presence: liveness publishing and roster subscription
//!
//! The responder side publishes and heartbeats a single
//! [`crate::domain::LivenessRecord`]; the requester side subscribes to
//! the whole presence collection and derives a name-sorted roster.

mod publisher;
mod subscriber;

pub use publisher::PresencePublisher;
pub use subscriber::{PresenceSubscriber, RosterEntry, roster_from_snapshot};
