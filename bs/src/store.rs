//! Store actor and client handles
//!
//! One tokio task owns the JSON tree and processes commands from any
//! number of `StoreHandle` clones. Serializing every mutation through the
//! actor gives each subscription a monotonic snapshot sequence for free.

use std::collections::HashMap;

use serde_json::{Map, Value};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::messages::{CleanupAction, ConnId, StoreCommand, StoreError, StoreResponse, SubscriptionId};
use crate::path::StorePath;
use crate::tree;

/// Handle to send commands to the store actor
///
/// The command channel is unbounded: Drop impls must be able to enqueue
/// their Unsubscribe/Disconnect messages without awaiting, and a
/// cleanup message dropped on a full buffer would be a lost crash
/// cleanup.
#[derive(Debug, Clone)]
pub struct StoreHandle {
    tx: mpsc::UnboundedSender<StoreCommand>,
}

impl StoreHandle {
    /// Spawn a new store actor and return a handle to it
    pub fn spawn() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(actor_loop(rx));
        info!("store actor spawned");
        Self { tx }
    }

    /// Replace the subtree at `path` with `value`
    pub async fn write(&self, path: StorePath, value: Value) -> StoreResponse<()> {
        debug!(%path, "StoreHandle::write");
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(StoreCommand::Write {
                path,
                value,
                reply: reply_tx,
            })
            .map_err(|_| StoreError::ChannelClosed)?;
        reply_rx.await.map_err(|_| StoreError::ChannelClosed)?
    }

    /// Shallow-merge `fields` into the existing object at `path`, leaving
    /// other fields untouched; `NotFound` when nothing exists there
    pub async fn update(&self, path: StorePath, fields: Map<String, Value>) -> StoreResponse<()> {
        debug!(%path, "StoreHandle::update");
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(StoreCommand::Update {
                path,
                fields,
                reply: reply_tx,
            })
            .map_err(|_| StoreError::ChannelClosed)?;
        reply_rx.await.map_err(|_| StoreError::ChannelClosed)?
    }

    /// Delete the subtree at `path` (no-op when absent)
    pub async fn delete(&self, path: StorePath) -> StoreResponse<()> {
        debug!(%path, "StoreHandle::delete");
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(StoreCommand::Delete { path, reply: reply_tx })
            .map_err(|_| StoreError::ChannelClosed)?;
        reply_rx.await.map_err(|_| StoreError::ChannelClosed)?
    }

    /// Subscribe to full-subtree snapshots of `path`
    ///
    /// The current snapshot is delivered immediately, then again after
    /// every mutation that intersects the path.
    pub async fn subscribe(&self, path: StorePath) -> StoreResponse<Subscription> {
        debug!(%path, "StoreHandle::subscribe");
        let (snap_tx, snap_rx) = mpsc::unbounded_channel();
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(StoreCommand::Subscribe {
                path,
                tx: snap_tx,
                reply: reply_tx,
            })
            .map_err(|_| StoreError::ChannelClosed)?;
        let id = reply_rx.await.map_err(|_| StoreError::ChannelClosed)??;
        Ok(Subscription {
            id,
            rx: snap_rx,
            ctl: self.tx.clone(),
        })
    }

    /// Open a connection for disconnect-hook registration
    pub async fn connect(&self) -> StoreResponse<StoreConn> {
        debug!("StoreHandle::connect");
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(StoreCommand::Connect { reply: reply_tx })
            .map_err(|_| StoreError::ChannelClosed)?;
        let id = reply_rx.await.map_err(|_| StoreError::ChannelClosed)??;
        Ok(StoreConn {
            id,
            tx: self.tx.clone(),
            ended: false,
        })
    }

    /// Stop the actor (pending commands already queued are still handled)
    pub async fn shutdown(&self) {
        let _ = self.tx.send(StoreCommand::Shutdown);
    }
}

/// An active full-subtree snapshot subscription
///
/// Dropping the subscription unsubscribes.
#[derive(Debug)]
pub struct Subscription {
    id: SubscriptionId,
    rx: mpsc::UnboundedReceiver<Value>,
    ctl: mpsc::UnboundedSender<StoreCommand>,
}

impl Subscription {
    /// Receive the next snapshot; `None` once the store shuts down
    pub async fn recv(&mut self) -> Option<Value> {
        self.rx.recv().await
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        // Unbounded channel: this cannot fail while the actor is alive.
        // The actor also prunes subscriptions lazily on send failure.
        let _ = self.ctl.send(StoreCommand::Unsubscribe { id: self.id });
    }
}

/// A client connection against which disconnect cleanups are registered
///
/// Dropping the connection without calling [`StoreConn::disconnect`]
/// models abrupt loss: the store still runs the registered cleanups, with
/// no further client code involved.
#[derive(Debug)]
pub struct StoreConn {
    id: ConnId,
    tx: mpsc::UnboundedSender<StoreCommand>,
    ended: bool,
}

impl StoreConn {
    /// The connection id
    pub fn id(&self) -> ConnId {
        self.id
    }

    /// Register a cleanup action the store runs when this connection ends
    pub async fn on_disconnect(&self, path: StorePath, action: CleanupAction) -> StoreResponse<()> {
        debug!(conn = self.id, %path, "StoreConn::on_disconnect");
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(StoreCommand::RegisterDisconnectCleanup {
                conn: self.id,
                path,
                action,
                reply: reply_tx,
            })
            .map_err(|_| StoreError::ChannelClosed)?;
        reply_rx.await.map_err(|_| StoreError::ChannelClosed)?
    }

    /// End the connection gracefully, waiting for cleanups to run
    pub async fn disconnect(mut self) -> StoreResponse<()> {
        debug!(conn = self.id, "StoreConn::disconnect");
        self.ended = true;
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(StoreCommand::Disconnect {
                conn: self.id,
                reply: Some(reply_tx),
            })
            .map_err(|_| StoreError::ChannelClosed)?;
        reply_rx.await.map_err(|_| StoreError::ChannelClosed)?
    }
}

impl Drop for StoreConn {
    fn drop(&mut self) {
        if !self.ended {
            // Unbounded channel: the cleanup message cannot be lost to a
            // full buffer, only to the actor itself being gone.
            let _ = self.tx.send(StoreCommand::Disconnect {
                conn: self.id,
                reply: None,
            });
        }
    }
}

struct SubEntry {
    path: StorePath,
    tx: mpsc::UnboundedSender<Value>,
}

/// Actor state: the tree plus subscription and connection registries
#[derive(Default)]
pub struct Store {
    root: Value,
    subs: HashMap<SubscriptionId, SubEntry>,
    hooks: HashMap<ConnId, Vec<(StorePath, CleanupAction)>>,
    next_sub: SubscriptionId,
    next_conn: ConnId,
}

impl Store {
    fn new() -> Self {
        Self {
            root: Value::Object(Map::new()),
            ..Self::default()
        }
    }

    fn apply_write(&mut self, path: &StorePath, value: Value) {
        tree::set(&mut self.root, path, value);
        self.notify(path);
    }

    fn apply_update(&mut self, path: &StorePath, fields: Map<String, Value>) -> StoreResponse<()> {
        tree::merge_fields(&mut self.root, path, fields)?;
        self.notify(path);
        Ok(())
    }

    fn apply_delete(&mut self, path: &StorePath) {
        if tree::delete(&mut self.root, path) {
            self.notify(path);
        }
    }

    /// Push fresh snapshots to every subscription whose path intersects
    /// the changed path; prune subscriptions with closed receivers
    fn notify(&mut self, changed: &StorePath) {
        let mut dead = Vec::new();
        for (id, sub) in &self.subs {
            if !changed.intersects(&sub.path) {
                continue;
            }
            let snap = tree::snapshot(&self.root, &sub.path);
            if sub.tx.send(snap).is_err() {
                dead.push(*id);
            }
        }
        for id in dead {
            debug!(sub = id, "pruning closed subscription");
            self.subs.remove(&id);
        }
    }

    /// Register a cleanup action, replacing any earlier action for the
    /// same path so repeated re-registration (e.g. a requester switching
    /// responders back and forth) cannot grow the list
    fn register_hook(&mut self, conn: ConnId, path: StorePath, action: CleanupAction) -> StoreResponse<()> {
        let actions = self.hooks.get_mut(&conn).ok_or(StoreError::UnknownConnection(conn))?;
        match actions.iter_mut().find(|(p, _)| *p == path) {
            Some(existing) => existing.1 = action,
            None => actions.push((path, action)),
        }
        Ok(())
    }

    fn run_disconnect(&mut self, conn: ConnId) {
        let Some(actions) = self.hooks.remove(&conn) else {
            return;
        };
        info!(conn, actions = actions.len(), "running disconnect cleanups");
        for (path, action) in actions {
            match action {
                CleanupAction::Delete => self.apply_delete(&path),
                CleanupAction::Write(value) => self.apply_write(&path, value),
            }
        }
    }
}

async fn actor_loop(mut rx: mpsc::UnboundedReceiver<StoreCommand>) {
    let mut store = Store::new();

    while let Some(command) = rx.recv().await {
        match command {
            StoreCommand::Write { path, value, reply } => {
                store.apply_write(&path, value);
                let _ = reply.send(Ok(()));
            }
            StoreCommand::Update { path, fields, reply } => {
                let result = store.apply_update(&path, fields);
                let _ = reply.send(result);
            }
            StoreCommand::Delete { path, reply } => {
                store.apply_delete(&path);
                let _ = reply.send(Ok(()));
            }
            StoreCommand::Subscribe { path, tx, reply } => {
                let id = store.next_sub;
                store.next_sub += 1;
                // Initial snapshot before registration so it can't race a
                // concurrent notify for the same state
                let _ = tx.send(tree::snapshot(&store.root, &path));
                store.subs.insert(id, SubEntry { path, tx });
                let _ = reply.send(Ok(id));
            }
            StoreCommand::Unsubscribe { id } => {
                store.subs.remove(&id);
            }
            StoreCommand::Connect { reply } => {
                let id = store.next_conn;
                store.next_conn += 1;
                store.hooks.insert(id, Vec::new());
                let _ = reply.send(Ok(id));
            }
            StoreCommand::RegisterDisconnectCleanup {
                conn,
                path,
                action,
                reply,
            } => {
                let _ = reply.send(store.register_hook(conn, path, action));
            }
            StoreCommand::Disconnect { conn, reply } => {
                store.run_disconnect(conn);
                if let Some(reply) = reply {
                    let _ = reply.send(Ok(()));
                }
            }
            StoreCommand::Shutdown => {
                info!("store actor shutting down");
                break;
            }
        }
    }

    if !store.subs.is_empty() {
        warn!(subs = store.subs.len(), "store actor exiting with live subscriptions");
    }
}
