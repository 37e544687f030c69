//! Requester-side request lifecycle
//!
//! One state machine per requester session: `Unattached` or
//! `Attached(responder_id)`. The requester is the only writer of its
//! request record; severity and note changes are partial updates that
//! never disturb fields they don't own.

use std::sync::Arc;

use boardstore::{CleanupAction, StoreConn, StoreError, StoreHandle};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::domain::{RequestRecord, Severity, request_path};
use crate::events::{EventBus, HrEvent};
use crate::identity::Principal;

/// Errors from request lifecycle operations
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("Not attached to a responder")]
    NotAttached,

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Current attachment of a requester session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attachment {
    Unattached,
    Attached { responder_id: String },
}

impl Attachment {
    pub fn responder_id(&self) -> Option<&str> {
        match self {
            Self::Unattached => None,
            Self::Attached { responder_id } => Some(responder_id),
        }
    }
}

/// Creates, mutates, and tears down a requester's single live request
///
/// Local severity/note state is the user's intent: it is kept even when
/// a store write fails (surfaced via [`HrEvent::RequestWriteFailed`]),
/// and reset to defaults on every attach.
pub struct RequestLifecycleManager {
    store: StoreHandle,
    events: Arc<EventBus>,
    principal: Principal,
    state: Attachment,
    severity: Severity,
    note: String,
}

impl RequestLifecycleManager {
    pub fn new(store: StoreHandle, events: Arc<EventBus>, principal: Principal) -> Self {
        Self {
            store,
            events,
            principal,
            state: Attachment::Unattached,
            severity: Severity::Low,
            note: String::new(),
        }
    }

    pub fn state(&self) -> &Attachment {
        &self.state
    }

    /// Local (optimistic) severity
    pub fn severity(&self) -> Severity {
        self.severity
    }

    /// Local (optimistic) note
    pub fn note(&self) -> &str {
        &self.note
    }

    /// Attach to responder `responder_id`
    ///
    /// Switching responders deletes the old record first (best-effort;
    /// a failed delete is logged and left for the responder's own
    /// sign-out cleanup) and then creates the new one with defaults.
    /// Selecting the already-attached responder is a no-op.
    pub async fn select(&mut self, conn: &StoreConn, responder_id: &str) -> Result<(), RequestError> {
        debug!(requester_id = %self.principal.id, %responder_id, state = ?self.state, "select");
        if self.state.responder_id() == Some(responder_id) {
            return Ok(());
        }

        if let Attachment::Attached { responder_id: old } = std::mem::replace(&mut self.state, Attachment::Unattached)
        {
            self.release(&old).await;
        }

        let path = request_path(responder_id, &self.principal.id);
        let record = RequestRecord::new(&self.principal.display_name, &self.principal.email);
        self.store.write(path.clone(), record.to_value()).await?;
        conn.on_disconnect(path, CleanupAction::Delete).await?;

        self.state = Attachment::Attached {
            responder_id: responder_id.to_string(),
        };
        self.severity = Severity::Low;
        self.note.clear();
        info!(requester_id = %self.principal.id, %responder_id, "attached");
        Ok(())
    }

    /// Detach from the current responder, deleting the request record
    ///
    /// A no-op when already unattached (including the stale-attachment
    /// case after the responder's own sign-out already removed the
    /// record: the delete is simply a no-op in the store).
    pub async fn deselect(&mut self) -> Result<(), RequestError> {
        debug!(requester_id = %self.principal.id, state = ?self.state, "deselect");
        if let Attachment::Attached { responder_id } = std::mem::replace(&mut self.state, Attachment::Unattached) {
            self.store.delete(request_path(&responder_id, &self.principal.id)).await?;
            info!(requester_id = %self.principal.id, %responder_id, "detached");
        }
        Ok(())
    }

    /// Update severity on the live record (and `updated_at`); keeps the
    /// local value as intent even if the write fails
    pub async fn set_severity(&mut self, severity: Severity) -> Result<(), RequestError> {
        debug!(requester_id = %self.principal.id, %severity, "set_severity");
        let responder_id = self.attached()?.to_string();
        self.severity = severity;
        let fields = RequestRecord::severity_fields(severity);
        self.write_fields(&responder_id, fields).await;
        Ok(())
    }

    /// Update the note on the live record (and `updated_at`); keeps the
    /// local text as intent even if the write fails
    pub async fn set_note(&mut self, note: &str) -> Result<(), RequestError> {
        debug!(requester_id = %self.principal.id, "set_note");
        let responder_id = self.attached()?.to_string();
        self.note = note.to_string();
        let fields = RequestRecord::note_fields(note);
        self.write_fields(&responder_id, fields).await;
        Ok(())
    }

    /// Sign-out teardown: identical to deselect
    pub async fn sign_out(&mut self) -> Result<(), RequestError> {
        self.deselect().await
    }

    fn attached(&self) -> Result<&str, RequestError> {
        self.state.responder_id().ok_or(RequestError::NotAttached)
    }

    /// Best-effort delete of the old record during a responder switch
    async fn release(&self, old_responder_id: &str) {
        let path = request_path(old_responder_id, &self.principal.id);
        if let Err(e) = self.store.delete(path).await {
            // Known gap: the stale record survives until the responder's
            // own sign-out cleanup removes the subtree.
            warn!(requester_id = %self.principal.id, responder_id = %old_responder_id, error = %e,
                  "failed to delete old request record during switch");
        }
    }

    /// Partial update with intent-preserving failure handling
    async fn write_fields(&self, responder_id: &str, fields: serde_json::Map<String, serde_json::Value>) {
        let path = request_path(responder_id, &self.principal.id);
        if let Err(e) = self.store.update(path, fields).await {
            warn!(requester_id = %self.principal.id, %responder_id, error = %e, "request update failed");
            self.events.emit(HrEvent::RequestWriteFailed {
                responder_id: responder_id.to_string(),
                reason: e.to_string(),
            });
        }
    }
}
