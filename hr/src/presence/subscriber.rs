//! Requester-side roster subscription

use std::sync::Arc;

use boardstore::{StoreHandle, StoreResponse, Subscription};
use serde_json::Value;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::domain::{LivenessRecord, presence_root};
use crate::events::{EventBus, HrEvent};

/// One row of the responder selection list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterEntry {
    pub responder_id: String,
    pub record: LivenessRecord,
}

/// Subscribes to the presence collection and maintains a sorted roster
///
/// Every snapshot replaces the roster wholesale; there is no incremental
/// merge. Consumers watch the derived list via [`PresenceSubscriber::roster`].
pub struct PresenceSubscriber {
    roster_rx: watch::Receiver<Vec<RosterEntry>>,
    pump: JoinHandle<()>,
}

impl PresenceSubscriber {
    /// Subscribe to the presence collection
    pub async fn activate(store: &StoreHandle, events: Arc<EventBus>) -> StoreResponse<Self> {
        debug!("PresenceSubscriber::activate");
        let sub = store.subscribe(presence_root()).await?;
        let (roster_tx, roster_rx) = watch::channel(Vec::new());
        let pump = tokio::spawn(pump_loop(sub, roster_tx, events));
        Ok(Self { roster_rx, pump })
    }

    /// Watch the current roster; updated atomically per snapshot
    pub fn roster(&self) -> watch::Receiver<Vec<RosterEntry>> {
        self.roster_rx.clone()
    }

    /// Stop receiving snapshots; no store state is cleaned up because the
    /// subscriber owns none
    pub fn deactivate(self) {
        debug!("PresenceSubscriber::deactivate");
        self.pump.abort();
    }
}

impl Drop for PresenceSubscriber {
    fn drop(&mut self) {
        self.pump.abort();
    }
}

async fn pump_loop(mut sub: Subscription, roster_tx: watch::Sender<Vec<RosterEntry>>, events: Arc<EventBus>) {
    while let Some(snapshot) = sub.recv().await {
        let roster = roster_from_snapshot(&snapshot);
        let responders = roster.len();
        if roster_tx.send(roster).is_err() {
            // All receivers gone; keep draining so deactivate stays cheap
            continue;
        }
        events.emit(HrEvent::RosterChanged { responders });
    }
}

/// Pure derivation of the selection list from a presence snapshot
///
/// Sorted ascending by display name (ordinal), responder id as the
/// deterministic tie-break. Malformed entries are skipped.
pub fn roster_from_snapshot(snapshot: &Value) -> Vec<RosterEntry> {
    let Some(map) = snapshot.as_object() else {
        return Vec::new();
    };
    let mut roster: Vec<RosterEntry> = map
        .iter()
        .filter_map(|(id, value)| match serde_json::from_value(value.clone()) {
            Ok(record) => Some(RosterEntry {
                responder_id: id.clone(),
                record,
            }),
            Err(e) => {
                warn!(responder_id = %id, error = %e, "skipping malformed liveness record");
                None
            }
        })
        .collect();
    roster.sort_by(|a, b| {
        a.record
            .display_name
            .cmp(&b.record.display_name)
            .then_with(|| a.responder_id.cmp(&b.responder_id))
    });
    roster
}
