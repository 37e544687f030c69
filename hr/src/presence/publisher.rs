//! Responder-side presence publishing

use std::sync::Arc;
use std::time::Duration;

use boardstore::{CleanupAction, StoreConn, StoreHandle, StorePath, StoreResponse};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::domain::{LivenessRecord, presence_path, requests_path};
use crate::events::{EventBus, HrEvent};
use crate::identity::Principal;

/// Publishes and heartbeats one responder's liveness record
///
/// The record is written on activation together with a store-side delete
/// hook, so involuntary disconnection needs no client code to clean up.
/// Deliberate deactivation is stronger: it also bulk-deletes the
/// responder's whole request subtree so pending requesters are cleared
/// immediately rather than lingering.
pub struct PresencePublisher {
    store: StoreHandle,
    responder_id: String,
    heartbeat: Option<JoinHandle<()>>,
}

impl PresencePublisher {
    /// Publish the liveness record, register the disconnect hook, and
    /// start the heartbeat
    pub async fn activate(
        store: StoreHandle,
        conn: &StoreConn,
        events: Arc<EventBus>,
        principal: &Principal,
        heartbeat_interval: Duration,
    ) -> StoreResponse<Self> {
        let path = presence_path(&principal.id);
        debug!(responder_id = %principal.id, %path, "PresencePublisher::activate");

        let record = LivenessRecord::new(&principal.display_name, &principal.email);
        store.write(path.clone(), record.to_value()).await?;
        conn.on_disconnect(path.clone(), CleanupAction::Delete).await?;

        let heartbeat = tokio::spawn(heartbeat_loop(
            store.clone(),
            path,
            principal.id.clone(),
            events,
            heartbeat_interval,
        ));
        info!(responder_id = %principal.id, "presence published");

        Ok(Self {
            store,
            responder_id: principal.id.clone(),
            heartbeat: Some(heartbeat),
        })
    }

    /// Deliberate sign-out: cancel the heartbeat, then explicitly delete
    /// the liveness record and every request scoped to this responder
    pub async fn deactivate(mut self) -> StoreResponse<()> {
        debug!(responder_id = %self.responder_id, "PresencePublisher::deactivate");
        if let Some(heartbeat) = self.heartbeat.take() {
            heartbeat.abort();
        }
        self.store.delete(presence_path(&self.responder_id)).await?;
        self.store.delete(requests_path(&self.responder_id)).await?;
        info!(responder_id = %self.responder_id, "presence withdrawn");
        Ok(())
    }

    pub fn responder_id(&self) -> &str {
        &self.responder_id
    }
}

impl Drop for PresencePublisher {
    fn drop(&mut self) {
        // Deactivation is the graceful path; this only stops the timer if
        // the publisher is dropped without it (the disconnect hook still
        // owns record removal).
        if let Some(heartbeat) = self.heartbeat.take() {
            heartbeat.abort();
        }
    }
}

/// Periodic partial update of `last_seen_at` only
///
/// Failures are not retried inline; they surface as a degraded-presence
/// event and the next tick tries again.
async fn heartbeat_loop(
    store: StoreHandle,
    path: StorePath,
    responder_id: String,
    events: Arc<EventBus>,
    interval: Duration,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    // The first tick of a tokio interval fires immediately; activation
    // already wrote a fresh timestamp, so consume it.
    ticker.tick().await;

    loop {
        ticker.tick().await;
        debug!(%responder_id, "heartbeat tick");
        if let Err(e) = store.update(path.clone(), LivenessRecord::heartbeat_fields()).await {
            warn!(%responder_id, error = %e, "heartbeat update failed");
            events.emit(HrEvent::PresenceDegraded {
                responder_id: responder_id.clone(),
                reason: e.to_string(),
            });
        }
    }
}
