//! WebSocket client connection state.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};

/// Represents a connected WebSocket client.
pub struct ClientConnection {
    /// Unique connection ID.
    pub id: String,
    /// Send channel to the client's WebSocket write task.
    tx: mpsc::Sender<Arc<String>>,
    /// Bound on one enqueue when the write task is backed up.
    send_timeout: Duration,
    /// When this connection was established.
    pub connected_at: Instant,
    /// When the last frame of any kind arrived.
    last_seen: Mutex<Instant>,
    /// Cancelled when the connection must close.
    closed: CancellationToken,
}

impl ClientConnection {
    /// Create a new connection.
    pub fn new(id: String, tx: mpsc::Sender<Arc<String>>, send_timeout: Duration) -> Self {
        let now = Instant::now();
        Self {
            id,
            tx,
            send_timeout,
            connected_at: now,
            last_seen: Mutex::new(now),
            closed: CancellationToken::new(),
        }
    }

    /// Queue a text message for the client.
    ///
    /// Returns `false` if the connection is closed, the write task is gone,
    /// or the queue stayed full for longer than the send timeout.
    pub async fn send(&self, message: Arc<String>) -> bool {
        if self.closed.is_cancelled() {
            return false;
        }
        matches!(
            tokio::time::timeout(self.send_timeout, self.tx.send(message)).await,
            Ok(Ok(()))
        )
    }

    /// Serialize a value and queue it for the client.
    pub async fn send_json<T: serde::Serialize>(&self, value: &T) -> bool {
        match serde_json::to_string(value) {
            Ok(json) => self.send(Arc::new(json)).await,
            Err(_) => false,
        }
    }

    /// Record inbound activity.
    pub fn mark_alive(&self) {
        *self.last_seen.lock() = Instant::now();
    }

    /// Time since the last inbound frame (or connection establishment).
    pub fn last_seen_elapsed(&self) -> Duration {
        self.last_seen.lock().elapsed()
    }

    /// Ask the session to close.
    pub fn close(&self) {
        self.closed.cancel();
    }

    /// Whether [`close`](Self::close) was called.
    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    /// Resolves once the connection is asked to close.
    pub fn closed(&self) -> WaitForCancellationFuture<'_> {
        self.closed.cancelled()
    }

    /// Connection age.
    pub fn age(&self) -> Duration {
        self.connected_at.elapsed()
    }
}
