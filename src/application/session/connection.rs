//! Machine connection handle

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;

/// Process-unique id of one machine socket. A machine that reconnects gets
/// a new id, so a stale cleanup never removes its successor.
pub type ConnectionId = u64;

/// Registry-side half of an open WebSocket to a retrieval machine.
///
/// Outbound frames go through `sender` to the socket's writer task; the
/// registry never touches the socket itself.
#[derive(Debug)]
pub struct MachineConnection {
    pub connection_id: ConnectionId,
    /// Label reported by the machine, or `machine-<id>`
    pub machine_id: String,
    pub sender: mpsc::UnboundedSender<String>,
    pub connected_at: DateTime<Utc>,
    /// Last inbound frame (heartbeat, log line, ping)
    pub last_activity: DateTime<Utc>,
}

impl MachineConnection {
    pub fn new(
        connection_id: ConnectionId,
        machine_id: impl Into<String>,
        sender: mpsc::UnboundedSender<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            connection_id,
            machine_id: machine_id.into(),
            sender,
            connected_at: now,
            last_activity: now,
        }
    }

    /// Hand a whole frame to the writer task. Fails once the socket is gone.
    pub fn send(&self, message: String) -> Result<(), String> {
        self.sender
            .send(message)
            .map_err(|e| format!("Failed to send message: {}", e))
    }

    pub fn touch(&mut self) {
        self.last_activity = Utc::now();
    }

    pub fn is_stale(&self, timeout_seconds: i64) -> bool {
        let elapsed = Utc::now()
            .signed_duration_since(self.last_activity)
            .num_seconds();
        elapsed > timeout_seconds
    }
}

// ── Tests ──────────────────────────────────────────────────────
