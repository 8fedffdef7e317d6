//! WebSocket session lifecycle: one connected client from upgrade through
//! disconnect.

use std::sync::Arc;

use axum::extract::ws::{CloseFrame, Message, WebSocket, close_code};
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use metrics::{counter, gauge, histogram};
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};
use wheelbridge_core::envelope::{ConnectedNotice, FailureReply};
use wheelbridge_core::{BridgeError, InputError};

use super::connection::ClientConnection;
use super::handler::handle_message;
use super::heartbeat::run_heartbeat;
use crate::metrics::{
    WS_CONNECTION_DURATION_SECONDS, WS_CONNECTIONS_ACTIVE, WS_CONNECTIONS_REFUSED_TOTAL,
    WS_CONNECTIONS_TOTAL,
};
use crate::server::AppState;

/// Outbound queue depth per client.
const SEND_QUEUE: usize = 64;

type WsSink = SplitSink<WebSocket, Message>;

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CloseReason {
    ClientClosed,
    TransportError,
    HeartbeatTimeout,
    SendFailed,
    ServerShutdown,
}

impl CloseReason {
    fn frame(self) -> Option<CloseFrame> {
        let (code, reason) = match self {
            Self::ClientClosed | Self::TransportError => return None,
            Self::HeartbeatTimeout => (close_code::AWAY, "heartbeat timeout"),
            Self::SendFailed => (close_code::POLICY, "client too slow"),
            Self::ServerShutdown => (close_code::AWAY, "server shutting down"),
        };
        Some(CloseFrame {
            code,
            reason: reason.into(),
        })
    }

    /// The error that ended the session, if the channel broke underneath it.
    fn error(self) -> Option<BridgeError> {
        match self {
            Self::TransportError | Self::SendFailed => Some(BridgeError::TransportClosed),
            Self::ClientClosed | Self::HeartbeatTimeout | Self::ServerShutdown => None,
        }
    }
}

/// Run a WebSocket session for a connected client.
///
/// 1. Refuses the client if the server is at capacity
/// 2. Sends a `connected` greeting with the client ID
/// 3. Runs each inbound frame through the motion controller, replying to
///    this client and fanning the status out to everyone else
/// 4. Pings periodically and disconnects silent clients
/// 5. Unregisters on disconnect
#[instrument(skip_all, fields(client_id = %client_id))]
pub async fn run_ws_session(mut ws: WebSocket, client_id: String, state: AppState) {
    let (send_tx, send_rx) = mpsc::channel::<Arc<String>>(SEND_QUEUE);
    let connection = Arc::new(ClientConnection::new(
        client_id.clone(),
        send_tx,
        state.config.send_timeout(),
    ));

    if !state
        .broadcast
        .try_add(Arc::clone(&connection), state.config.max_connections)
        .await
    {
        warn!(
            max_connections = state.config.max_connections,
            "refusing client, server at capacity"
        );
        counter!(WS_CONNECTIONS_REFUSED_TOTAL).increment(1);
        let frame = CloseFrame {
            code: close_code::AGAIN,
            reason: "server at capacity".into(),
        };
        let _ = ws.send(Message::Close(Some(frame))).await;
        return;
    }

    info!("client connected");
    counter!(WS_CONNECTIONS_TOTAL).increment(1);
    gauge!(WS_CONNECTIONS_ACTIVE).increment(1.0);

    let (mut ws_tx, mut ws_rx) = ws.split();

    if let Ok(json) = serde_json::to_string(&ConnectedNotice::new(client_id.as_str())) {
        let _ = ws_tx.send(Message::Text(json.into())).await;
    }

    let mut writer = tokio::spawn(write_loop(
        ws_tx,
        send_rx,
        Arc::clone(&connection),
        state.config.heartbeat_interval(),
    ));

    let heartbeat = run_heartbeat(
        Arc::clone(&connection),
        state.config.heartbeat_interval(),
        state.config.heartbeat_timeout(),
    );
    tokio::pin!(heartbeat);
    let shutdown = state.shutdown.sessions_token();

    let reason = loop {
        let frame = tokio::select! {
            () = shutdown.cancelled() => break CloseReason::ServerShutdown,
            () = connection.closed() => break CloseReason::SendFailed,
            silent = &mut heartbeat => {
                warn!(silent_secs = silent.as_secs(), "client unresponsive, disconnecting");
                break CloseReason::HeartbeatTimeout;
            }
            frame = ws_rx.next() => frame,
        };

        let msg = match frame {
            Some(Ok(msg)) => msg,
            Some(Err(e)) => {
                debug!(error = %e, "receive failed");
                break CloseReason::TransportError;
            }
            None => break CloseReason::TransportError,
        };
        connection.mark_alive();

        let text = match msg {
            Message::Text(t) => t.as_str().to_owned(),
            Message::Binary(data) => match String::from_utf8(data.to_vec()) {
                Ok(s) => s,
                Err(_) => {
                    info!(len = data.len(), "received non-UTF8 binary frame");
                    let error = BridgeError::from(InputError::InvalidJson(
                        "binary frame is not valid UTF-8".into(),
                    ));
                    if !connection.send_json(&FailureReply::new(&error)).await {
                        warn!("failure reply not delivered, dropping client");
                        break CloseReason::SendFailed;
                    }
                    continue;
                }
            },
            Message::Close(_) => {
                info!("client sent close frame");
                break CloseReason::ClientClosed;
            }
            Message::Ping(_) | Message::Pong(_) => continue,
        };

        let result = handle_message(&text, &state.controller, state.classifier.as_ref()).await;
        let replied = connection.send(Arc::new(result.reply_json)).await;
        if let Some(status) = result.status {
            let _ = state
                .broadcast
                .broadcast_except(Some(&client_id), &status)
                .await;
        }
        if !replied {
            warn!("reply not delivered, dropping client");
            break CloseReason::SendFailed;
        }
    };

    // Clean up
    state.broadcast.remove(&client_id).await;
    connection.close();
    // A peer that stopped reading can wedge the writer mid-send
    let grace = state.config.send_timeout();
    match tokio::time::timeout(grace, &mut writer).await {
        Ok(Ok(mut ws_tx)) => {
            let _ = tokio::time::timeout(grace, async {
                if let Some(frame) = reason.frame() {
                    let _ = ws_tx.send(Message::Close(Some(frame))).await;
                }
                let _ = ws_tx.close().await;
            })
            .await;
        }
        Ok(Err(e)) => debug!(error = %e, "write task failed"),
        Err(_) => {
            debug!("write task stuck, aborting");
            writer.abort();
        }
    }

    let age = connection.age();
    match reason.error() {
        Some(error) => info!(?reason, %error, age_secs = age.as_secs_f64(), "client disconnected"),
        None => info!(?reason, age_secs = age.as_secs_f64(), "client disconnected"),
    }
    gauge!(WS_CONNECTIONS_ACTIVE).decrement(1.0);
    histogram!(WS_CONNECTION_DURATION_SECONDS).record(age.as_secs_f64());
}

/// Forward queued messages and send periodic pings until the connection is
/// closed or the socket fails. Hands the sink back for the close frame.
async fn write_loop(
    mut ws_tx: WsSink,
    mut send_rx: mpsc::Receiver<Arc<String>>,
    connection: Arc<ClientConnection>,
    ping_every: std::time::Duration,
) -> WsSink {
    let mut ping_interval = tokio::time::interval(ping_every);
    // Skip the immediate first tick
    let _ = ping_interval.tick().await;

    loop {
        tokio::select! {
            () = connection.closed() => break,
            msg = send_rx.recv() => {
                let Some(text) = msg else { break };
                if ws_tx.send(Message::Text(text.as_str().into())).await.is_err() {
                    connection.close();
                    break;
                }
            }
            _ = ping_interval.tick() => {
                if ws_tx.send(Message::Ping(Default::default())).await.is_err() {
                    connection.close();
                    break;
                }
            }
        }
    }
    ws_tx
}
