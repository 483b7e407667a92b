//! Live connection registry.
//!
//! Maps identities to their active realtime connections (0..N each, e.g.
//! mobile + web) and additionally tracks anonymous connections, which only
//! participate in broadcasts. Delivery is best-effort and fire-and-forget:
//! with no connections registered, `send_to` is a silent no-op and nothing
//! is queued for later.
//!
//! Uses DashMap for concurrent access; all mutating operations are safe
//! under concurrent callers. Process-local only — multi-instance fan-out
//! needs a message bus in front of this.

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;

use super::messages::WsEvent;
use crate::core_types::{ConnectionId, UserId};

/// Sender half of a connection's outbound channel
pub type WsSender = mpsc::UnboundedSender<WsEvent>;

pub struct ConnectionRegistry {
    /// user_id -> list of (connection_id, sender)
    identified: DashMap<UserId, Vec<(ConnectionId, WsSender)>>,
    /// Connections with no authenticated identity
    anonymous: DashMap<ConnectionId, WsSender>,
    next_conn_id: AtomicU64,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            identified: DashMap::new(),
            anonymous: DashMap::new(),
            next_conn_id: AtomicU64::new(1),
        }
    }

    /// Register a live connection, optionally keyed by identity.
    ///
    /// Returns the unique connection id used for `disconnect`.
    pub fn connect(&self, user_id: Option<UserId>, tx: WsSender) -> ConnectionId {
        let conn_id = self.next_conn_id.fetch_add(1, Ordering::Relaxed);

        match user_id {
            Some(uid) => {
                self.identified
                    .entry(uid)
                    .or_insert_with(Vec::new)
                    .push((conn_id, tx));
                tracing::info!(user_id = uid, conn_id, "connection registered");
            }
            None => {
                self.anonymous.insert(conn_id, tx);
                tracing::info!(conn_id, "anonymous connection registered");
            }
        }

        conn_id
    }

    /// Remove a connection from all index structures.
    ///
    /// Safe to call for a connection that was never fully registered.
    pub fn disconnect(&self, user_id: Option<UserId>, conn_id: ConnectionId) {
        match user_id {
            Some(uid) => {
                if let Some(mut senders) = self.identified.get_mut(&uid) {
                    senders.retain(|(id, _)| *id != conn_id);
                    if senders.is_empty() {
                        drop(senders); // Release the lock
                        self.identified.remove(&uid);
                    }
                }
                tracing::info!(user_id = uid, conn_id, "connection removed");
            }
            None => {
                self.anonymous.remove(&conn_id);
                tracing::info!(conn_id, "anonymous connection removed");
            }
        }
    }

    /// Deliver an event to every live connection of one identity.
    ///
    /// Silent no-op when the identity has no connections; a dead channel is
    /// logged and skipped, never an error to the caller.
    pub fn send_to(&self, user_id: UserId, event: WsEvent) {
        if let Some(senders) = self.identified.get(&user_id) {
            for (_, tx) in senders.iter() {
                if tx.send(event.clone()).is_err() {
                    tracing::warn!(user_id, "send failed - client disconnected");
                }
            }
            tracing::debug!(user_id, recipients = senders.len(), "event sent to user");
        }
    }

    /// Deliver an event to every live connection, identified or anonymous.
    pub fn broadcast(&self, event: WsEvent) {
        for entry in self.identified.iter() {
            for (_, tx) in entry.value().iter() {
                let _ = tx.send(event.clone());
            }
        }
        for entry in self.anonymous.iter() {
            let _ = entry.value().send(event.clone());
        }
    }

    /// Returns (identified users, total connections).
    pub fn stats(&self) -> (usize, usize) {
        let users = self.identified.len();
        let total: usize = self
            .identified
            .iter()
            .map(|entry| entry.value().len())
            .sum::<usize>()
            + self.anonymous.len();
        (users, total)
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
