//! Role resolution from authenticated email domains
//!
//! A pure, total function of the email string: no state, no I/O. The
//! caller enforces the Unauthorized policy (forced sign-out); see
//! [`crate::session`].

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::DomainsConfig;

/// A principal's role on the board
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Publishes presence, triages requests
    Responder,
    /// Discovers responders, raises requests
    Requester,
    /// Fails the domain check; must not hold a session
    Unauthorized,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Responder => write!(f, "responder"),
            Self::Requester => write!(f, "requester"),
            Self::Unauthorized => write!(f, "unauthorized"),
        }
    }
}

/// Suffix-match resolver over the two configured role domains
#[derive(Debug, Clone)]
pub struct RoleResolver {
    responder_suffix: String,
    requester_suffix: String,
}

impl RoleResolver {
    pub fn new(domains: &DomainsConfig) -> Self {
        Self {
            responder_suffix: domains.responder_suffix.clone(),
            requester_suffix: domains.requester_suffix.clone(),
        }
    }

    /// Resolve an email to its role
    ///
    /// Byte-wise suffix match, responder checked first. Anything matching
    /// neither suffix is Unauthorized.
    pub fn resolve(&self, email: &str) -> Role {
        let role = if email.ends_with(&self.responder_suffix) {
            Role::Responder
        } else if email.ends_with(&self.requester_suffix) {
            Role::Requester
        } else {
            Role::Unauthorized
        };
        debug!(%email, %role, "RoleResolver::resolve");
        role
    }
}
