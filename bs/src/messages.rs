//! Store actor messages
//!
//! Commands and responses for the actor pattern.

use serde_json::{Map, Value};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

use crate::path::StorePath;

/// Identifier for an active subscription
pub type SubscriptionId = u64;

/// Identifier for a client connection
pub type ConnId = u64;

/// Errors from store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Value at {0} is not an object")]
    NotAnObject(String),

    #[error("Nothing exists at {0}")]
    NotFound(String),

    #[error("Unknown connection: {0}")]
    UnknownConnection(ConnId),

    #[error("Store channel closed")]
    ChannelClosed,
}

/// Response from store operations
pub type StoreResponse<T> = Result<T, StoreError>;

/// Cleanup action run by the store when a connection is lost
#[derive(Debug, Clone)]
pub enum CleanupAction {
    /// Delete the subtree at the registered path
    Delete,
    /// Write the given value at the registered path
    Write(Value),
}

/// Commands sent to the store actor
#[derive(Debug)]
pub enum StoreCommand {
    Write {
        path: StorePath,
        value: Value,
        reply: oneshot::Sender<StoreResponse<()>>,
    },
    Update {
        path: StorePath,
        fields: Map<String, Value>,
        reply: oneshot::Sender<StoreResponse<()>>,
    },
    Delete {
        path: StorePath,
        reply: oneshot::Sender<StoreResponse<()>>,
    },
    Subscribe {
        path: StorePath,
        tx: mpsc::UnboundedSender<Value>,
        reply: oneshot::Sender<StoreResponse<SubscriptionId>>,
    },
    /// Fire-and-forget: sent from Subscription::drop
    Unsubscribe { id: SubscriptionId },
    Connect {
        reply: oneshot::Sender<StoreResponse<ConnId>>,
    },
    RegisterDisconnectCleanup {
        conn: ConnId,
        path: StorePath,
        action: CleanupAction,
        reply: oneshot::Sender<StoreResponse<()>>,
    },
    /// Runs the connection's cleanup actions; reply is None when sent from
    /// a Drop impl (abrupt loss)
    Disconnect {
        conn: ConnId,
        reply: Option<oneshot::Sender<StoreResponse<()>>>,
    },
    Shutdown,
}
