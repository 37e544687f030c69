//! Role-gated session wiring
//!
//! A [`Session`] binds one authenticated principal to the subsystem pair
//! its role allows: responders get (PresencePublisher, TriageView),
//! requesters get (PresenceSubscriber, RequestLifecycleManager). The
//! [`SessionManager`] drives sessions from identity-provider auth events
//! and enforces the hard Unauthorized policy: such a principal is signed
//! out immediately and never holds a session.

use std::sync::Arc;
use std::time::Duration;

use boardstore::{StoreConn, StoreError, StoreHandle};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::events::{EventBus, HrEvent};
use crate::identity::{AuthEvent, IdentityProvider, Principal};
use crate::presence::{PresencePublisher, PresenceSubscriber, RosterEntry};
use crate::request::{Attachment, RequestError, RequestLifecycleManager};
use crate::role::{Role, RoleResolver};
use crate::triage::{TriageEntry, TriageView};

/// Errors from session operations
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Unauthorized email domain: {email}")]
    Unauthorized { email: String },

    #[error("Operation requires the {expected} role (session is {actual})")]
    RoleMismatch { expected: Role, actual: Role },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Request error: {0}")]
    Request(#[from] RequestError),

    #[error("Identity provider error: {0}")]
    Identity(String),
}

/// The role-specific half of a session
enum ActiveRole {
    Responder {
        publisher: PresencePublisher,
        triage: TriageView,
    },
    Requester {
        roster: PresenceSubscriber,
        lifecycle: RequestLifecycleManager,
    },
}

/// One authenticated principal's live participation on the board
///
/// All subscriptions and timers are scoped to the session: they are
/// cancelled synchronously in [`Session::sign_out`], and the store-side
/// disconnect hooks cover involuntary loss.
pub struct Session {
    principal: Principal,
    role: Role,
    conn: Option<StoreConn>,
    active: Option<ActiveRole>,
    events: Arc<EventBus>,
}

impl Session {
    /// Resolve the principal's role and activate its subsystem pair
    ///
    /// `Unauthorized` performs no store activity and yields an error; the
    /// caller must terminate the authenticated session (see
    /// [`SessionManager`]).
    pub async fn start(
        store: StoreHandle,
        events: Arc<EventBus>,
        config: &Config,
        principal: Principal,
    ) -> Result<Self, SessionError> {
        let resolver = RoleResolver::new(&config.domains);
        let role = resolver.resolve(&principal.email);
        debug!(principal_id = %principal.id, %role, "Session::start");

        if role == Role::Unauthorized {
            return Err(SessionError::Unauthorized {
                email: principal.email.clone(),
            });
        }

        let conn = store.connect().await?;
        let active = match role {
            Role::Responder => {
                let heartbeat = Duration::from_millis(config.presence.heartbeat_interval_ms);
                let publisher =
                    PresencePublisher::activate(store.clone(), &conn, events.clone(), &principal, heartbeat).await?;
                let triage = TriageView::activate(&store, events.clone(), &principal.id).await?;
                ActiveRole::Responder { publisher, triage }
            }
            Role::Requester => {
                let roster = PresenceSubscriber::activate(&store, events.clone()).await?;
                let lifecycle = RequestLifecycleManager::new(store.clone(), events.clone(), principal.clone());
                ActiveRole::Requester { roster, lifecycle }
            }
            Role::Unauthorized => unreachable!("checked above"),
        };

        events.emit(HrEvent::SessionStarted {
            principal_id: principal.id.clone(),
            role,
        });
        info!(principal_id = %principal.id, %role, "session started");

        Ok(Self {
            principal,
            role,
            conn: Some(conn),
            active: Some(active),
            events,
        })
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    /// Responder side: the live triage order
    pub fn triage(&self) -> Result<watch::Receiver<Vec<TriageEntry>>, SessionError> {
        match &self.active {
            Some(ActiveRole::Responder { triage, .. }) => Ok(triage.order()),
            _ => Err(self.role_mismatch(Role::Responder)),
        }
    }

    /// Requester side: the live responder roster
    pub fn roster(&self) -> Result<watch::Receiver<Vec<RosterEntry>>, SessionError> {
        match &self.active {
            Some(ActiveRole::Requester { roster, .. }) => Ok(roster.roster()),
            _ => Err(self.role_mismatch(Role::Requester)),
        }
    }

    /// Requester side: current attachment state
    pub fn attachment(&self) -> Result<Attachment, SessionError> {
        match &self.active {
            Some(ActiveRole::Requester { lifecycle, .. }) => Ok(lifecycle.state().clone()),
            _ => Err(self.role_mismatch(Role::Requester)),
        }
    }

    /// Requester side: attach to (or switch to) a responder
    pub async fn select_responder(&mut self, responder_id: &str) -> Result<(), SessionError> {
        // Split borrows: the lifecycle mutates while the connection is read
        let Self { conn, active, .. } = self;
        let conn = conn.as_ref().ok_or(StoreError::ChannelClosed)?;
        match active {
            Some(ActiveRole::Requester { lifecycle, .. }) => {
                lifecycle.select(conn, responder_id).await?;
                Ok(())
            }
            _ => Err(SessionError::RoleMismatch {
                expected: Role::Requester,
                actual: self.role,
            }),
        }
    }

    /// Requester side: clear the current attachment
    pub async fn deselect_responder(&mut self) -> Result<(), SessionError> {
        match &mut self.active {
            Some(ActiveRole::Requester { lifecycle, .. }) => {
                lifecycle.deselect().await?;
                Ok(())
            }
            _ => Err(self.role_mismatch(Role::Requester)),
        }
    }

    /// Requester side: update severity on the live request
    pub async fn set_severity(&mut self, severity: crate::domain::Severity) -> Result<(), SessionError> {
        match &mut self.active {
            Some(ActiveRole::Requester { lifecycle, .. }) => {
                lifecycle.set_severity(severity).await?;
                Ok(())
            }
            _ => Err(self.role_mismatch(Role::Requester)),
        }
    }

    /// Requester side: update the note on the live request
    pub async fn set_note(&mut self, note: &str) -> Result<(), SessionError> {
        match &mut self.active {
            Some(ActiveRole::Requester { lifecycle, .. }) => {
                lifecycle.set_note(note).await?;
                Ok(())
            }
            _ => Err(self.role_mismatch(Role::Requester)),
        }
    }

    /// Deliberate sign-out: tear down the role pair, then disconnect the
    /// store connection gracefully
    pub async fn sign_out(mut self) -> Result<(), SessionError> {
        debug!(principal_id = %self.principal.id, "Session::sign_out");
        match self.active.take() {
            Some(ActiveRole::Responder { publisher, triage }) => {
                triage.deactivate();
                publisher.deactivate().await?;
            }
            Some(ActiveRole::Requester { roster, mut lifecycle }) => {
                lifecycle.sign_out().await?;
                roster.deactivate();
            }
            None => {}
        }
        if let Some(conn) = self.conn.take() {
            conn.disconnect().await?;
        }
        self.events.emit(HrEvent::SessionEnded {
            principal_id: self.principal.id.clone(),
        });
        info!(principal_id = %self.principal.id, "session ended");
        Ok(())
    }

    fn role_mismatch(&self, expected: Role) -> SessionError {
        SessionError::RoleMismatch {
            expected,
            actual: self.role,
        }
    }
}

/// Drives sessions from identity-provider auth state changes
pub struct SessionManager {
    store: StoreHandle,
    events: Arc<EventBus>,
    config: Config,
    identity: Arc<dyn IdentityProvider>,
    session: Option<Session>,
}

impl SessionManager {
    pub fn new(store: StoreHandle, events: Arc<EventBus>, config: Config, identity: Arc<dyn IdentityProvider>) -> Self {
        Self {
            store,
            events,
            config,
            identity,
            session: None,
        }
    }

    /// The live session, if any
    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn session_mut(&mut self) -> Option<&mut Session> {
        self.session.as_mut()
    }

    /// Apply one auth state transition
    ///
    /// `SignedIn` with an unauthorized domain enforces the hard policy:
    /// the identity session is terminated immediately and the error is
    /// surfaced so the caller can show a distinct screen state.
    pub async fn handle_auth_event(&mut self, event: AuthEvent) -> Result<(), SessionError> {
        match event {
            AuthEvent::SignedIn(principal) => {
                debug!(principal_id = %principal.id, "handle_auth_event: signed in");
                self.teardown().await?;
                match Session::start(self.store.clone(), self.events.clone(), &self.config, principal).await {
                    Ok(session) => {
                        self.session = Some(session);
                        Ok(())
                    }
                    Err(SessionError::Unauthorized { email }) => {
                        warn!(%email, "unauthorized principal; forcing sign-out");
                        self.identity
                            .sign_out()
                            .await
                            .map_err(|e| SessionError::Identity(e.to_string()))?;
                        self.events.emit(HrEvent::ForcedSignOut { email: email.clone() });
                        Err(SessionError::Unauthorized { email })
                    }
                    Err(e) => Err(e),
                }
            }
            AuthEvent::SignedOut => {
                debug!("handle_auth_event: signed out");
                self.teardown().await
            }
        }
    }

    /// User-initiated sign-out: provider first, then session teardown
    pub async fn sign_out(&mut self) -> Result<(), SessionError> {
        self.identity
            .sign_out()
            .await
            .map_err(|e| SessionError::Identity(e.to_string()))?;
        self.teardown().await
    }

    async fn teardown(&mut self) -> Result<(), SessionError> {
        if let Some(session) = self.session.take() {
            session.sign_out().await?;
        }
        Ok(())
    }
}
