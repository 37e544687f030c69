//! Domain records and store layout
//!
//! Persisted layout under the store root:
//!
//! - `presence/{responder_id}` → [`LivenessRecord`]
//! - `requests/{responder_id}/{requester_id}` → [`RequestRecord`]

mod record;
mod severity;

pub use record::{LivenessRecord, RequestRecord};
pub use severity::Severity;

use boardstore::StorePath;

/// Path of a responder's liveness record
pub fn presence_path(responder_id: &str) -> StorePath {
    StorePath::root().child("presence").child(responder_id)
}

/// Root of the presence collection
pub fn presence_root() -> StorePath {
    StorePath::root().child("presence")
}

/// Path of one (responder, requester) request record
pub fn request_path(responder_id: &str, requester_id: &str) -> StorePath {
    StorePath::root().child("requests").child(responder_id).child(requester_id)
}

/// Root of a responder's entire request subtree
pub fn requests_path(responder_id: &str) -> StorePath {
    StorePath::root().child("requests").child(responder_id)
}
