//! Responder-side triage view
//!
//! A read-only, recomputed-on-every-snapshot ordering over the
//! responder's current request records. Ordering is a pure function of
//! the snapshot; no incremental patching.

use std::collections::HashMap;
use std::sync::Arc;

use boardstore::{StoreHandle, StoreResponse, Subscription};
use serde_json::Value;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::domain::{RequestRecord, requests_path};
use crate::events::{EventBus, HrEvent};

/// One row of the triage board
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriageEntry {
    pub requester_id: String,
    pub record: RequestRecord,
}

/// Total triage order over a request subtree snapshot
///
/// Lexicographic comparator: severity rank ascending (High < Medium <
/// Low), then `updated_at` ascending — the longest-unaddressed requester
/// in a severity band surfaces first, so self-updates push a record back,
/// not forward — then requester name, then requester id as the final
/// total-order key.
pub fn triage_order(snapshot: &Value) -> Vec<TriageEntry> {
    let Some(map) = snapshot.as_object() else {
        return Vec::new();
    };
    let mut entries: Vec<TriageEntry> = map
        .iter()
        .filter_map(|(id, value)| match serde_json::from_value(value.clone()) {
            Ok(record) => Some(TriageEntry {
                requester_id: id.clone(),
                record,
            }),
            Err(e) => {
                warn!(requester_id = %id, error = %e, "skipping malformed request record");
                None
            }
        })
        .collect();
    entries.sort_by(|a, b| {
        a.record
            .severity
            .rank()
            .cmp(&b.record.severity.rank())
            .then_with(|| a.record.updated_at.cmp(&b.record.updated_at))
            .then_with(|| a.record.requester_name.cmp(&b.record.requester_name))
            .then_with(|| a.requester_id.cmp(&b.requester_id))
    });
    entries
}

/// Subscribes to the responder's own request subtree and publishes the
/// derived order
///
/// The view holds no mutation capability over the records it displays.
pub struct TriageView {
    order_rx: watch::Receiver<Vec<TriageEntry>>,
    pump: JoinHandle<()>,
}

impl TriageView {
    /// Subscribe to `requests/{responder_id}`
    pub async fn activate(store: &StoreHandle, events: Arc<EventBus>, responder_id: &str) -> StoreResponse<Self> {
        debug!(%responder_id, "TriageView::activate");
        let sub = store.subscribe(requests_path(responder_id)).await?;
        let (order_tx, order_rx) = watch::channel(Vec::new());
        let pump = tokio::spawn(pump_loop(sub, order_tx, events));
        Ok(Self { order_rx, pump })
    }

    /// Watch the current triage order
    pub fn order(&self) -> watch::Receiver<Vec<TriageEntry>> {
        self.order_rx.clone()
    }

    /// Stop receiving snapshots
    pub fn deactivate(self) {
        debug!("TriageView::deactivate");
        self.pump.abort();
    }
}

impl Drop for TriageView {
    fn drop(&mut self) {
        self.pump.abort();
    }
}

async fn pump_loop(mut sub: Subscription, order_tx: watch::Sender<Vec<TriageEntry>>, events: Arc<EventBus>) {
    while let Some(snapshot) = sub.recv().await {
        let order = triage_order(&snapshot);
        let requests = order.len();
        if order_tx.send(order).is_err() {
            continue;
        }
        events.emit(HrEvent::TriageChanged { requests });
    }
}

/// Ephemeral per-viewer note-expansion state
///
/// Keyed by requester id; never persisted or synchronized. Toggles for
/// requesters that leave the board simply become inert.
#[derive(Debug, Default)]
pub struct NoteToggles {
    expanded: HashMap<String, bool>,
}

impl NoteToggles {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip and return the new state for `requester_id`
    pub fn toggle(&mut self, requester_id: &str) -> bool {
        let state = self.expanded.entry(requester_id.to_string()).or_insert(false);
        *state = !*state;
        *state
    }

    pub fn is_expanded(&self, requester_id: &str) -> bool {
        self.expanded.get(requester_id).copied().unwrap_or(false)
    }
}
