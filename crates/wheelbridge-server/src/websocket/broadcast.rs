//! Status fan-out to connected WebSocket clients.

use std::collections::HashMap;
use std::sync::Arc;

use metrics::counter;
use tokio::sync::RwLock;
use tracing::{debug, warn};
use wheelbridge_core::envelope::StatusBroadcast;

use super::connection::ClientConnection;
use crate::metrics::BRIDGE_BROADCAST_FAILURES_TOTAL;

/// Registry of connected clients and the status broadcaster.
pub struct BroadcastManager {
    /// Connected clients indexed by connection ID.
    connections: RwLock<HashMap<String, Arc<ClientConnection>>>,
}

impl BroadcastManager {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
        }
    }

    /// Add a connection. Re-adding the same ID keeps the existing entry.
    pub async fn add(&self, connection: Arc<ClientConnection>) {
        let mut conns = self.connections.write().await;
        let _ = conns.entry(connection.id.clone()).or_insert(connection);
    }

    /// Add a connection unless `limit` clients are already registered.
    pub async fn try_add(&self, connection: Arc<ClientConnection>, limit: usize) -> bool {
        let mut conns = self.connections.write().await;
        if conns.contains_key(&connection.id) {
            return true;
        }
        if conns.len() >= limit {
            return false;
        }
        let _ = conns.insert(connection.id.clone(), connection);
        true
    }

    /// Remove a connection by ID. Idempotent.
    pub async fn remove(&self, connection_id: &str) {
        let mut conns = self.connections.write().await;
        let _ = conns.remove(connection_id);
    }

    /// Send a status envelope to every client except `exclude`.
    ///
    /// Sends run concurrently, each bounded by the connection's send
    /// timeout. Recipients whose send fails are closed and removed before
    /// this returns. Returns the number of clients that received it.
    pub async fn broadcast_except(&self, exclude: Option<&str>, status: &StatusBroadcast) -> usize {
        let json = match serde_json::to_string(status) {
            Ok(j) => Arc::new(j),
            Err(e) => {
                warn!(error = %e, "failed to serialize status");
                return 0;
            }
        };

        let recipients: Vec<Arc<ClientConnection>> = {
            let conns = self.connections.read().await;
            conns
                .values()
                .filter(|c| Some(c.id.as_str()) != exclude)
                .cloned()
                .collect()
        };
        debug!(
            command = %status.command,
            success = status.success,
            recipients = recipients.len(),
            "broadcast status"
        );

        let results = futures::future::join_all(recipients.iter().map(|conn| {
            let json = Arc::clone(&json);
            async move { conn.send(json).await }
        }))
        .await;

        let failed: Vec<&Arc<ClientConnection>> = recipients
            .iter()
            .zip(&results)
            .filter_map(|(conn, ok)| (!ok).then_some(conn))
            .collect();

        if !failed.is_empty() {
            let mut conns = self.connections.write().await;
            for conn in &failed {
                warn!(conn_id = %conn.id, "status send failed, dropping client");
                conn.close();
                let _ = conns.remove(&conn.id);
            }
            counter!(BRIDGE_BROADCAST_FAILURES_TOTAL).increment(failed.len() as u64);
        }

        recipients.len() - failed.len()
    }

    /// Number of registered connections.
    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }
}

impl Default for BroadcastManager {
    fn default() -> Self {
        Self::new()
    }
}
