//! Event bus for presentation-layer notifications
//!
//! The core never renders anything; instead it emits events a UI (or
//! test) can subscribe to. Delivery is fire-and-forget over a tokio
//! broadcast channel.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::debug;

use crate::role::Role;

/// Default channel capacity (events)
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Notifications emitted by the synchronization core
#[derive(Debug, Clone)]
pub enum HrEvent {
    /// The responder roster changed (requester side)
    RosterChanged { responders: usize },
    /// The triage order changed (responder side)
    TriageChanged { requests: usize },
    /// A presence write failed; liveness may look stale to others
    PresenceDegraded { responder_id: String, reason: String },
    /// A request write failed; local intent is unconfirmed
    RequestWriteFailed { responder_id: String, reason: String },
    /// An authenticated principal failed the domain check and was
    /// signed out by policy
    ForcedSignOut { email: String },
    /// A session started with the given role
    SessionStarted { principal_id: String, role: Role },
    /// A session ended
    SessionEnded { principal_id: String },
}

impl HrEvent {
    /// Short name for logging
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::RosterChanged { .. } => "RosterChanged",
            Self::TriageChanged { .. } => "TriageChanged",
            Self::PresenceDegraded { .. } => "PresenceDegraded",
            Self::RequestWriteFailed { .. } => "RequestWriteFailed",
            Self::ForcedSignOut { .. } => "ForcedSignOut",
            Self::SessionStarted { .. } => "SessionStarted",
            Self::SessionEnded { .. } => "SessionEnded",
        }
    }
}

/// Central bus for core → presentation notifications
pub struct EventBus {
    tx: broadcast::Sender<HrEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Emit an event to all subscribers
    ///
    /// Fire-and-forget: no subscribers means the event is dropped.
    pub fn emit(&self, event: HrEvent) {
        debug!(event_type = event.event_type(), "EventBus::emit");
        let _ = self.tx.send(event);
    }

    /// Subscribe to events emitted after this call
    pub fn subscribe(&self) -> broadcast::Receiver<HrEvent> {
        self.tx.subscribe()
    }

    /// Number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

/// Create an event bus wrapped in an Arc for shared ownership
pub fn create_event_bus(capacity: usize) -> Arc<EventBus> {
    Arc::new(EventBus::new(capacity))
}
