//! Identity provider boundary
//!
//! Authentication itself is an external collaborator; this module owns
//! only the trait surface the session layer consumes plus an in-process
//! implementation used by tests and the demo.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, Mutex};
use tracing::debug;
use uuid::Uuid;

/// An authenticated identity, immutable for the session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// Stable, store-scoped unique id
    pub id: String,
    pub display_name: String,
    pub email: String,
}

impl Principal {
    pub fn new(display_name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            display_name: display_name.into(),
            email: email.into(),
        }
    }

    /// A principal with a caller-chosen id (stable across reconnects)
    pub fn with_id(id: impl Into<String>, display_name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            email: email.into(),
        }
    }
}

/// Authentication state transitions delivered to subscribers
#[derive(Debug, Clone)]
pub enum AuthEvent {
    /// A principal is now signed in
    SignedIn(Principal),
    /// No principal is signed in
    SignedOut,
}

/// External identity provider boundary
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Interactively authenticate, yielding the principal
    async fn sign_in(&self) -> eyre::Result<Principal>;

    /// End the authenticated session
    async fn sign_out(&self) -> eyre::Result<()>;

    /// Current principal, if any
    async fn current(&self) -> Option<Principal>;

    /// Subscribe to authentication state changes
    fn on_auth_state_change(&self) -> broadcast::Receiver<AuthEvent>;
}

/// In-process identity provider seeded with a fixed principal
///
/// `sign_in` always yields the seeded principal; useful for tests and
/// the demo, where interactive auth would be noise.
pub struct StaticIdentityProvider {
    principal: Principal,
    current: Mutex<Option<Principal>>,
    events: broadcast::Sender<AuthEvent>,
}

impl StaticIdentityProvider {
    pub fn new(principal: Principal) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            principal,
            current: Mutex::new(None),
            events,
        }
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentityProvider {
    async fn sign_in(&self) -> eyre::Result<Principal> {
        debug!(id = %self.principal.id, "StaticIdentityProvider::sign_in");
        let mut current = self.current.lock().await;
        *current = Some(self.principal.clone());
        let _ = self.events.send(AuthEvent::SignedIn(self.principal.clone()));
        Ok(self.principal.clone())
    }

    async fn sign_out(&self) -> eyre::Result<()> {
        debug!(id = %self.principal.id, "StaticIdentityProvider::sign_out");
        let mut current = self.current.lock().await;
        if current.take().is_some() {
            let _ = self.events.send(AuthEvent::SignedOut);
        }
        Ok(())
    }

    async fn current(&self) -> Option<Principal> {
        self.current.lock().await.clone()
    }

    fn on_auth_state_change(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }
}
