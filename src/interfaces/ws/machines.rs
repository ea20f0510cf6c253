//! WebSocket endpoint for retrieval machines
//!
//! Machines connect to `/ws/machine?machine_id=<label>` and then mostly
//! listen. Anything they send (heartbeats, log lines, pongs) only refreshes
//! their activity timestamp. The socket pings the machine on a fixed
//! interval, so a machine that never speaks still answers with pongs.
//! Dispatch events arrive through the connection registry as
//! pre-serialized JSON text frames.

use std::time::Duration;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::select;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::application::session::SharedConnectionRegistry;
use crate::shared::shutdown::ShutdownSignal;

#[derive(Debug, Default, Deserialize)]
pub struct MachineParams {
    /// Label the machine wants to be known by
    pub machine_id: Option<String>,
}

#[derive(Clone)]
pub struct MachineSocketState {
    pub registry: SharedConnectionRegistry,
    pub shutdown: ShutdownSignal,
    pub ping_interval: Duration,
}

/// `GET /ws/machine` upgrade handler
pub async fn machine_socket_handler(
    ws: WebSocketUpgrade,
    State(state): State<MachineSocketState>,
    Query(params): Query<MachineParams>,
) -> impl IntoResponse {
    debug!(machine_id = ?params.machine_id, "Machine WebSocket upgrade requested");
    ws.on_upgrade(move |socket| handle_machine_socket(socket, state, params))
}

async fn handle_machine_socket(socket: WebSocket, state: MachineSocketState, params: MachineParams) {
    let (mut sender, mut receiver) = socket.split();
    let (tx, mut outbound) = mpsc::unbounded_channel::<String>();
    let connection_id = state.registry.register(params.machine_id.as_deref(), tx);

    let mut keepalive = tokio::time::interval(state.ping_interval);
    keepalive.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick fires immediately.
    keepalive.tick().await;

    loop {
        select! {
            frame = outbound.recv() => {
                match frame {
                    Some(payload) => {
                        if let Err(e) = sender.send(Message::Text(payload.into())).await {
                            warn!(connection_id, error = %e, "Failed to write to machine");
                            break;
                        }
                    }
                    // Registry dropped us (idle eviction or shutdown).
                    None => {
                        let _ = sender.send(Message::Close(None)).await;
                        break;
                    }
                }
            }

            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        state.registry.touch(connection_id);
                        debug!(connection_id, message = text.as_str(), "Machine message");
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        info!(connection_id, "Machine closed the connection");
                        break;
                    }
                    // Pings are answered by the socket itself.
                    Some(Ok(_)) => state.registry.touch(connection_id),
                    Some(Err(e)) => {
                        warn!(connection_id, error = %e, "Machine WebSocket error");
                        break;
                    }
                }
            }

            _ = keepalive.tick() => {
                if let Err(e) = sender.send(Message::Ping(Default::default())).await {
                    warn!(connection_id, error = %e, "Failed to ping machine");
                    break;
                }
            }

            _ = state.shutdown.wait() => {
                let _ = sender.send(Message::Close(None)).await;
                break;
            }
        }
    }

    state.registry.unregister(connection_id);
}
