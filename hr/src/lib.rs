//! Handraise - presence & triage synchronization core
//!
//! Handraise coordinates live "help request" state between two disjoint
//! populations over a shared realtime store: responders publish liveness
//! records and triage incoming requests; requesters discover available
//! responders and maintain a single live request record that follows
//! their connectivity.
//!
//! # Core Concepts
//!
//! - **Partitioned ownership**: every store path has exactly one writer
//!   (a responder owns its presence record, a requester owns its request
//!   record), so no locking is needed across sessions.
//! - **Snapshots over diffs**: all derived views (roster, triage order)
//!   are pure functions of the latest full-subtree snapshot.
//! - **Disconnect hooks carry the cleanup**: involuntary loss of a
//!   session is handled entirely by store-side hooks, never by client
//!   code that may no longer be running.
//!
//! # Modules
//!
//! - [`role`] - email-domain role resolution
//! - [`presence`] - liveness publishing and roster subscription
//! - [`request`] - the requester-side attachment state machine
//! - [`triage`] - the responder-side ordered request view
//! - [`session`] - role-gated wiring of the above

pub mod cli;
pub mod config;
pub mod domain;
pub mod events;
pub mod identity;
pub mod presence;
pub mod request;
pub mod role;
pub mod session;
pub mod triage;

// Re-export commonly used types
pub use config::{Config, DomainsConfig, PresenceConfig};
pub use domain::{LivenessRecord, RequestRecord, Severity, presence_path, request_path, requests_path};
pub use events::{EventBus, HrEvent, create_event_bus};
pub use identity::{AuthEvent, IdentityProvider, Principal, StaticIdentityProvider};
pub use presence::{PresencePublisher, PresenceSubscriber, RosterEntry};
pub use request::{Attachment, RequestError, RequestLifecycleManager};
pub use role::{Role, RoleResolver};
pub use session::{Session, SessionError, SessionManager};
pub use triage::{NoteToggles, TriageEntry, TriageView, triage_order};
