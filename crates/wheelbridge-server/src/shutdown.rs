//! Graceful shutdown coordination via `CancellationToken`.
//!
//! Shutdown happens in two steps so the actuator can be parked between them:
//! first the listener stops accepting, then open sessions are told to close.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{info, warn};

/// Default timeout for graceful shutdown before giving up on stragglers.
const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// Coordinates graceful shutdown across the listener and all sessions.
pub struct ShutdownCoordinator {
    accept: CancellationToken,
    sessions: CancellationToken,
    tracker: TaskTracker,
}

impl ShutdownCoordinator {
    /// Create a new shutdown coordinator.
    pub fn new() -> Self {
        Self {
            accept: CancellationToken::new(),
            sessions: CancellationToken::new(),
            tracker: TaskTracker::new(),
        }
    }

    /// Token cancelled when the listener must stop accepting.
    pub fn accept_token(&self) -> CancellationToken {
        self.accept.clone()
    }

    /// Token cancelled when open sessions must close.
    pub fn sessions_token(&self) -> CancellationToken {
        self.sessions.clone()
    }

    /// Tracker that session tasks register with.
    pub fn tracker(&self) -> &TaskTracker {
        &self.tracker
    }

    /// Stop accepting new connections.
    pub fn stop_accepting(&self) {
        self.accept.cancel();
    }

    /// Tell every open session to close. Implies [`stop_accepting`](Self::stop_accepting).
    pub fn close_sessions(&self) {
        self.accept.cancel();
        self.sessions.cancel();
    }

    /// Whether a shutdown has been initiated.
    pub fn is_shutting_down(&self) -> bool {
        self.accept.is_cancelled()
    }

    /// Close sessions, then wait for them and `handles` to finish.
    ///
    /// Anything still running after `timeout` is left behind with a warning.
    pub async fn graceful_shutdown(&self, handles: Vec<JoinHandle<()>>, timeout: Option<Duration>) {
        let timeout = timeout.unwrap_or(DEFAULT_SHUTDOWN_TIMEOUT);

        self.close_sessions();
        let _ = self.tracker.close();
        info!(
            task_count = handles.len(),
            sessions = self.tracker.len(),
            timeout_secs = timeout.as_secs(),
            "waiting for tasks to complete"
        );

        let drain = async {
            let _ = futures::future::join_all(handles).await;
            self.tracker.wait().await;
        };

        if tokio::time::timeout(timeout, drain).await.is_err() {
            warn!("shutdown timed out after {timeout:?}, some tasks may still be running");
        }
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_state_not_shutting_down() {
        let coord = ShutdownCoordinator::new();
        assert!(!coord.is_shutting_down());
        assert!(!coord.sessions_token().is_cancelled());
    }

    #[test]
    fn stop_accepting_leaves_sessions_open() {
        let coord = ShutdownCoordinator::new();
        coord.stop_accepting();
        assert!(coord.is_shutting_down());
        assert!(coord.accept_token().is_cancelled());
        assert!(!coord.sessions_token().is_cancelled());
    }

    #[test]
    fn close_sessions_cancels_both() {
        let coord = ShutdownCoordinator::new();
        let accept = coord.accept_token();
        let sessions = coord.sessions_token();
        coord.close_sessions();
        assert!(accept.is_cancelled());
        assert!(sessions.is_cancelled());
    }

    #[test]
    fn repeated_calls_idempotent() {
        let coord = ShutdownCoordinator::default();
        coord.stop_accepting();
        coord.close_sessions();
        coord.close_sessions();
        assert!(coord.is_shutting_down());
    }

    #[tokio::test]
    async fn graceful_shutdown_awaits_tracked_sessions() {
        let coord = ShutdownCoordinator::new();
        let token = coord.sessions_token();
        let session = coord.tracker().spawn(async move {
            token.cancelled().await;
        });

        coord.graceful_shutdown(Vec::new(), None).await;
        assert!(coord.tracker().is_empty());
        session.await.unwrap();
    }

    #[tokio::test]
    async fn graceful_shutdown_awaits_handles() {
        let coord = ShutdownCoordinator::new();
        let token = coord.accept_token();
        let handle = tokio::spawn(async move {
            token.cancelled().await;
        });

        coord.graceful_shutdown(vec![handle], None).await;
        assert!(coord.is_shutting_down());
    }

    #[tokio::test(start_paused = true)]
    async fn graceful_shutdown_times_out() {
        let coord = ShutdownCoordinator::new();
        let stuck = tokio::spawn(async {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        });

        let start = tokio::time::Instant::now();
        coord
            .graceful_shutdown(vec![stuck], Some(Duration::from_secs(2)))
            .await;
        assert!(start.elapsed() >= Duration::from_secs(2));
        assert!(start.elapsed() < Duration::from_secs(3600));
    }
}
