//! Integration tests for the Handraise synchronization core
//!
//! End-to-end scenarios driven through real sessions against the
//! in-process boardstore actor.

use std::sync::Arc;
use std::time::Duration;

use boardstore::{StoreHandle, now_ms};
use serde_json::Value;

use handraise::config::Config;
use handraise::domain::{LivenessRecord, RequestRecord, Severity, presence_path, request_path};
use handraise::events::create_event_bus;
use handraise::identity::{AuthEvent, IdentityProvider, Principal, StaticIdentityProvider};
use handraise::session::{Session, SessionError, SessionManager};

fn config() -> Config {
    Config::default()
}

fn responder(id: &str, name: &str) -> Principal {
    Principal::with_id(id, name, format!("{}@staff.example.edu", name.to_lowercase()))
}

fn requester(id: &str, name: &str) -> Principal {
    Principal::with_id(id, name, format!("{}@example.edu", name.to_lowercase()))
}

async fn snapshot_at(store: &StoreHandle, path: boardstore::StorePath) -> Value {
    let mut sub = store.subscribe(path).await.expect("subscribe");
    sub.recv().await.expect("snapshot")
}

// =============================================================================
// Scenario A: responder sign-in publishes presence
// =============================================================================

#[tokio::test]
async fn scenario_a_responder_presence_appears_on_sign_in() {
    let store = StoreHandle::spawn();
    let events = create_event_bus(16);

    let before = now_ms();
    let session = Session::start(store.clone(), events, &config(), responder("r1", "Ada"))
        .await
        .unwrap();

    let snap = snapshot_at(&store, presence_path("r1")).await;
    let record: LivenessRecord = serde_json::from_value(snap).unwrap();
    assert_eq!(record.display_name, "Ada");
    assert!(record.last_seen_at >= before);
    assert!(record.last_seen_at <= now_ms());

    session.sign_out().await.unwrap();
}

// =============================================================================
// Scenario B: select then escalate touches only owned fields
// =============================================================================

#[tokio::test]
async fn scenario_b_select_then_escalate() {
    let store = StoreHandle::spawn();
    let events = create_event_bus(16);

    let resp = Session::start(store.clone(), events.clone(), &config(), responder("r1", "Ada"))
        .await
        .unwrap();
    let mut req = Session::start(store.clone(), events, &config(), requester("s1", "Sam"))
        .await
        .unwrap();

    req.select_responder("r1").await.unwrap();

    let snap = snapshot_at(&store, request_path("r1", "s1")).await;
    let record: RequestRecord = serde_json::from_value(snap).unwrap();
    assert_eq!(record.severity, Severity::Low);
    assert_eq!(record.note, "");
    assert_eq!(record.requester_name, "Sam");

    req.set_severity(Severity::High).await.unwrap();

    let snap = snapshot_at(&store, request_path("r1", "s1")).await;
    let after: RequestRecord = serde_json::from_value(snap).unwrap();
    assert_eq!(after.severity, Severity::High);
    assert_eq!(after.requester_name, record.requester_name);
    assert_eq!(after.requester_email, record.requester_email);
    assert!(after.updated_at >= record.updated_at);

    req.sign_out().await.unwrap();
    resp.sign_out().await.unwrap();
}

// =============================================================================
// Scenario C: switching responders moves the record
// =============================================================================

#[tokio::test]
async fn scenario_c_switch_responders() {
    let store = StoreHandle::spawn();
    let events = create_event_bus(16);

    let mut req = Session::start(store.clone(), events, &config(), requester("s1", "Sam"))
        .await
        .unwrap();

    req.select_responder("r1").await.unwrap();
    req.select_responder("r2").await.unwrap();

    assert_eq!(snapshot_at(&store, request_path("r1", "s1")).await, Value::Null);
    let snap = snapshot_at(&store, request_path("r2", "s1")).await;
    let record: RequestRecord = serde_json::from_value(snap).unwrap();
    assert_eq!(record.severity, Severity::Low);

    req.sign_out().await.unwrap();
}

// =============================================================================
// Scenario D: responder sign-out clears its whole subtree
// =============================================================================

#[tokio::test]
async fn scenario_d_responder_sign_out_clears_attached_requesters() {
    let store = StoreHandle::spawn();
    let events = create_event_bus(16);

    let resp = Session::start(store.clone(), events.clone(), &config(), responder("r1", "Ada"))
        .await
        .unwrap();
    let mut req = Session::start(store.clone(), events, &config(), requester("s1", "Sam"))
        .await
        .unwrap();
    req.select_responder("r1").await.unwrap();

    resp.sign_out().await.unwrap();

    assert_eq!(snapshot_at(&store, request_path("r1", "s1")).await, Value::Null);
    assert_eq!(snapshot_at(&store, presence_path("r1")).await, Value::Null);

    // The requester's local attachment is stale, not auto-reassigned; the
    // next user action resolves it
    assert_eq!(req.attachment().unwrap().responder_id(), Some("r1"));
    req.deselect_responder().await.unwrap();
    assert_eq!(req.attachment().unwrap().responder_id(), None);

    req.sign_out().await.unwrap();
}

#[tokio::test]
async fn scenario_d_stale_mutation_cannot_resurrect_request() {
    let store = StoreHandle::spawn();
    let events = create_event_bus(16);

    let resp = Session::start(store.clone(), events.clone(), &config(), responder("r1", "Ada"))
        .await
        .unwrap();
    let mut req = Session::start(store.clone(), events, &config(), requester("s1", "Sam"))
        .await
        .unwrap();
    req.select_responder("r1").await.unwrap();

    resp.sign_out().await.unwrap();

    // A severity change against the stale attachment must not leave a
    // partial record under the signed-out responder
    req.set_severity(Severity::High).await.unwrap();
    assert_eq!(snapshot_at(&store, request_path("r1", "s1")).await, Value::Null);
    assert_eq!(
        snapshot_at(&store, handraise::domain::requests_path("r1")).await,
        Value::Null
    );

    req.sign_out().await.unwrap();
}

// =============================================================================
// Scenario E: abrupt disconnection cleans up via hooks alone
// =============================================================================

#[tokio::test]
async fn scenario_e_abrupt_disconnect_runs_hooks() {
    let store = StoreHandle::spawn();
    let events = create_event_bus(16);

    let session = Session::start(store.clone(), events, &config(), responder("r1", "Ada"))
        .await
        .unwrap();

    let mut sub = store.subscribe(presence_path("r1")).await.unwrap();
    assert_ne!(sub.recv().await.unwrap(), Value::Null);

    // Simulated crash: the session is dropped without sign_out; the
    // store-side hook removes the record with no client code running
    drop(session);

    assert_eq!(sub.recv().await.unwrap(), Value::Null);
}

// =============================================================================
// Record-count invariant
// =============================================================================

#[tokio::test]
async fn test_request_count_matches_attachments() {
    let store = StoreHandle::spawn();
    let events = create_event_bus(16);

    let mut sam = Session::start(store.clone(), events.clone(), &config(), requester("s1", "Sam"))
        .await
        .unwrap();
    let mut kim = Session::start(store.clone(), events, &config(), requester("s2", "Kim"))
        .await
        .unwrap();

    sam.select_responder("r1").await.unwrap();
    kim.select_responder("r1").await.unwrap();

    let snap = snapshot_at(&store, handraise::domain::requests_path("r1")).await;
    assert_eq!(snap.as_object().map(|m| m.len()), Some(2));

    kim.deselect_responder().await.unwrap();
    let snap = snapshot_at(&store, handraise::domain::requests_path("r1")).await;
    assert_eq!(snap.as_object().map(|m| m.len()), Some(1));

    sam.deselect_responder().await.unwrap();
    let snap = snapshot_at(&store, handraise::domain::requests_path("r1")).await;
    assert_eq!(snap, Value::Null);

    sam.sign_out().await.unwrap();
    kim.sign_out().await.unwrap();
}

// =============================================================================
// Full board: triage ordering across live sessions
// =============================================================================

#[tokio::test]
async fn test_live_triage_order_across_sessions() {
    let store = StoreHandle::spawn();
    let events = create_event_bus(16);

    let resp = Session::start(store.clone(), events.clone(), &config(), responder("r1", "Ada"))
        .await
        .unwrap();
    let mut sam = Session::start(store.clone(), events.clone(), &config(), requester("s1", "Sam"))
        .await
        .unwrap();
    let mut kim = Session::start(store.clone(), events, &config(), requester("s2", "Kim"))
        .await
        .unwrap();

    sam.select_responder("r1").await.unwrap();
    kim.select_responder("r1").await.unwrap();
    kim.set_severity(Severity::High).await.unwrap();

    let mut order = resp.triage().unwrap();
    // Wait until the view reflects Kim's escalation
    let deadline = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            {
                let current = order.borrow_and_update();
                if current.len() == 2 && current[0].record.severity == Severity::High {
                    assert_eq!(current[0].record.requester_name, "Kim");
                    assert_eq!(current[1].record.requester_name, "Sam");
                    break;
                }
            }
            order.changed().await.unwrap();
        }
    })
    .await;
    assert!(deadline.is_ok(), "triage view never converged");

    sam.sign_out().await.unwrap();
    kim.sign_out().await.unwrap();
    resp.sign_out().await.unwrap();
}

// =============================================================================
// Unauthorized principals never reach a view state
// =============================================================================

#[tokio::test]
async fn test_unauthorized_forced_sign_out_end_to_end() {
    let store = StoreHandle::spawn();
    let events = create_event_bus(16);
    let mallory = Principal::with_id("x1", "Mallory", "mallory@elsewhere.net");
    let identity = Arc::new(StaticIdentityProvider::new(mallory.clone()));
    let mut manager = SessionManager::new(store.clone(), events.clone(), config(), identity.clone());

    identity.sign_in().await.unwrap();
    let result = manager.handle_auth_event(AuthEvent::SignedIn(mallory)).await;

    assert!(matches!(result, Err(SessionError::Unauthorized { .. })));
    assert!(manager.session().is_none());
    assert_eq!(identity.current().await, None);

    // No store state was ever created for the rejected principal
    assert_eq!(snapshot_at(&store, presence_path("x1")).await, Value::Null);
}
