//! Liveness monitoring.

use std::sync::Arc;
use std::time::Duration;

use tokio::time;

use super::connection::ClientConnection;

/// Resolve once the client has been silent for longer than `timeout`.
///
/// Silence is checked every `interval`; any inbound frame (pong included)
/// resets it. Returns how long the client had been silent.
pub async fn run_heartbeat(
    connection: Arc<ClientConnection>,
    interval: Duration,
    timeout: Duration,
) -> Duration {
    let mut check = time::interval(interval);
    check.set_missed_tick_behavior(time::MissedTickBehavior::Delay);
    loop {
        let _ = check.tick().await;
        let silent = connection.last_seen_elapsed();
        if silent > timeout {
            return silent;
        }
    }
}
