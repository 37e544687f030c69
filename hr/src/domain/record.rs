//! Persisted record types
//!
//! Both records live in the store as plain JSON objects; the structs here
//! are the typed view used on either side of a subscription.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use boardstore::now_ms;

use super::Severity;

/// A responder's published availability
///
/// Exactly one exists per currently-online responder, written only by
/// that responder. Absence of the record is the sole "offline" signal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LivenessRecord {
    pub display_name: String,
    pub email: String,
    /// Millisecond timestamp of the last heartbeat
    pub last_seen_at: i64,
}

impl LivenessRecord {
    pub fn new(display_name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            email: email.into(),
            last_seen_at: now_ms(),
        }
    }

    /// Store representation
    pub fn to_value(&self) -> Value {
        serde_json::json!({
            "display_name": self.display_name,
            "email": self.email,
            "last_seen_at": self.last_seen_at,
        })
    }

    /// Partial-update fields for a heartbeat
    pub fn heartbeat_fields() -> Map<String, Value> {
        let mut fields = Map::new();
        fields.insert("last_seen_at".into(), Value::from(now_ms()));
        fields
    }
}

/// A requester's live request, scoped to one responder
///
/// Owned exclusively by the requester in its key; read-only to the
/// responder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestRecord {
    pub requester_name: String,
    pub requester_email: String,
    pub severity: Severity,
    #[serde(default)]
    pub note: String,
    /// Millisecond timestamp of the last requester interaction
    pub updated_at: i64,
}

impl RequestRecord {
    /// A fresh record with attach defaults: Low severity, empty note
    pub fn new(requester_name: impl Into<String>, requester_email: impl Into<String>) -> Self {
        Self {
            requester_name: requester_name.into(),
            requester_email: requester_email.into(),
            severity: Severity::Low,
            note: String::new(),
            updated_at: now_ms(),
        }
    }

    /// Store representation
    pub fn to_value(&self) -> Value {
        serde_json::json!({
            "requester_name": self.requester_name,
            "requester_email": self.requester_email,
            "severity": self.severity,
            "note": self.note,
            "updated_at": self.updated_at,
        })
    }

    /// Partial-update fields for a severity change
    pub fn severity_fields(severity: Severity) -> Map<String, Value> {
        let mut fields = Map::new();
        fields.insert("severity".into(), serde_json::to_value(severity).unwrap_or(Value::Null));
        fields.insert("updated_at".into(), Value::from(now_ms()));
        fields
    }

    /// Partial-update fields for a note change
    pub fn note_fields(note: &str) -> Map<String, Value> {
        let mut fields = Map::new();
        fields.insert("note".into(), Value::from(note));
        fields.insert("updated_at".into(), Value::from(now_ms()));
        fields
    }
}
