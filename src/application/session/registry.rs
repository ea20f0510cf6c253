//! Connection registry: the set of live retrieval machine sockets

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use utoipa::ToSchema;

use crate::domain::events::DispatchEvent;

use super::connection::{ConnectionId, MachineConnection};

/// Thread-safe registry of connected machines.
///
/// This is the only shared mutable state in the process. Registration,
/// removal and broadcast may run concurrently from any task.
pub struct ConnectionRegistry {
    connections: DashMap<ConnectionId, MachineConnection>,
    next_id: AtomicU64,
}

/// Shared, reference-counted connection registry
pub type SharedConnectionRegistry = Arc<ConnectionRegistry>;

/// Read-only view of one connection
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MachineSummary {
    pub connection_id: u64,
    pub machine_id: String,
    pub connected_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Wrap in `Arc` for shared ownership
    pub fn shared() -> SharedConnectionRegistry {
        Arc::new(Self::new())
    }

    /// Register a freshly upgraded socket. Without a reported label the
    /// machine is named after its connection id.
    pub fn register(
        &self,
        machine_id: Option<&str>,
        sender: mpsc::UnboundedSender<String>,
    ) -> ConnectionId {
        let connection_id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let machine_id = machine_id
            .filter(|label| !label.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("machine-{connection_id}"));

        info!(connection_id, machine_id = %machine_id, "Machine connected");
        self.connections.insert(
            connection_id,
            MachineConnection::new(connection_id, machine_id, sender),
        );
        self.record_gauge();
        connection_id
    }

    /// Remove a connection. Returns `false` if it was already gone.
    pub fn unregister(&self, connection_id: ConnectionId) -> bool {
        match self.connections.remove(&connection_id) {
            Some((_, conn)) => {
                info!(connection_id, machine_id = %conn.machine_id, "Machine disconnected");
                self.record_gauge();
                true
            }
            None => false,
        }
    }

    pub fn touch(&self, connection_id: ConnectionId) {
        if let Some(mut conn) = self.connections.get_mut(&connection_id) {
            conn.touch();
        }
    }

    /// Deliver a dispatch event to every machine registered right now.
    /// Returns how many machines accepted it.
    pub fn broadcast(&self, event: &DispatchEvent) -> usize {
        match serde_json::to_string(event) {
            Ok(payload) => {
                let delivered = self.broadcast_raw(&payload);
                metrics::counter!("dispatch_events_total").increment(1);
                info!(spot_id = %event.spot_id, delivered, "Dispatch event broadcast");
                delivered
            }
            Err(e) => {
                error!(spot_id = %event.spot_id, error = %e, "Failed to serialize dispatch event");
                0
            }
        }
    }

    /// Fan a pre-serialized frame out to all connections. Connections whose
    /// socket is gone are dropped; they never hold up the others.
    pub fn broadcast_raw(&self, payload: &str) -> usize {
        let mut delivered = 0;
        let mut dead = Vec::new();

        for entry in self.connections.iter() {
            match entry.send(payload.to_string()) {
                Ok(()) => delivered += 1,
                Err(e) => {
                    warn!(
                        connection_id = entry.connection_id,
                        machine_id = %entry.machine_id,
                        error = %e,
                        "Failed to deliver to machine, dropping it"
                    );
                    dead.push(entry.connection_id);
                }
            }
        }

        // Removal happens after iteration: DashMap shards stay read-locked
        // while the iterator is alive.
        for connection_id in dead {
            metrics::counter!("dispatch_send_failures_total").increment(1);
            self.unregister(connection_id);
        }

        delivered
    }

    /// Drop machines silent for longer than `timeout_seconds`.
    pub fn evict_stale(&self, timeout_seconds: i64) -> Vec<ConnectionId> {
        let stale: Vec<ConnectionId> = self
            .connections
            .iter()
            .filter(|conn| conn.is_stale(timeout_seconds))
            .map(|conn| conn.connection_id)
            .collect();

        for connection_id in &stale {
            debug!(connection_id, "Evicting idle machine");
            self.unregister(*connection_id);
        }
        stale
    }

    /// Drop every connection (shutdown). Writer tasks end once their
    /// channel closes.
    pub fn clear(&self) -> usize {
        let ids: Vec<ConnectionId> = self.connections.iter().map(|c| c.connection_id).collect();
        ids.into_iter().filter(|id| self.unregister(*id)).count()
    }

    pub fn is_connected(&self, connection_id: ConnectionId) -> bool {
        self.connections.contains_key(&connection_id)
    }

    /// Number of active connections
    pub fn count(&self) -> usize {
        self.connections.len()
    }

    pub fn snapshot(&self) -> Vec<MachineSummary> {
        let mut machines: Vec<MachineSummary> = self
            .connections
            .iter()
            .map(|conn| MachineSummary {
                connection_id: conn.connection_id,
                machine_id: conn.machine_id.clone(),
                connected_at: conn.connected_at,
                last_activity: conn.last_activity,
            })
            .collect();
        machines.sort_by_key(|m| m.connection_id);
        machines
    }

    /// Pretend the machine was last heard from `seconds` ago.
    #[cfg(test)]
    pub(crate) fn backdate(&self, connection_id: ConnectionId, seconds: i64) {
        if let Some(mut conn) = self.connections.get_mut(&connection_id) {
            conn.last_activity = Utc::now() - chrono::Duration::seconds(seconds);
        }
    }

    fn record_gauge(&self) {
        metrics::gauge!("machine_connections").set(self.connections.len() as f64);
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ── Tests ──────────────────────────────────────────────────────
