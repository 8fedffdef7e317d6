//! Torque enable at startup; stop and torque disable at shutdown.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{info, warn};
use wheelbridge_core::{BridgeError, WheelCommand};

use crate::dispatch::Dispatcher;

/// Result of the startup torque pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StartupReport {
    /// Torque commands sent.
    pub attempted: usize,
    /// Torque commands that failed.
    pub failed: usize,
}

impl StartupReport {
    /// Whether any joint failed to enable.
    pub fn is_degraded(&self) -> bool {
        self.failed > 0
    }

    /// The degraded-startup error, if any.
    pub fn error(&self) -> Option<BridgeError> {
        self.is_degraded().then_some(BridgeError::StartupDegraded {
            failed: self.failed,
            total: self.attempted,
        })
    }
}

/// Result of the shutdown pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ShutdownReport {
    /// Whether the final stop was confirmed.
    pub stopped: bool,
    /// Torque-disable commands that failed.
    pub torque_failures: usize,
}

/// Brackets the service's life with actuator setup and teardown.
pub struct LifecycleManager {
    dispatcher: Arc<Dispatcher>,
    joints: Vec<u8>,
    shut_down: AtomicBool,
}

impl LifecycleManager {
    /// Manage torque on `joints` through `dispatcher`.
    pub fn new(dispatcher: Arc<Dispatcher>, joints: Vec<u8>) -> Self {
        Self {
            dispatcher,
            joints,
            shut_down: AtomicBool::new(false),
        }
    }

    /// Enable torque on every configured joint.
    ///
    /// Failures are counted, not fatal; the service keeps running degraded.
    pub async fn startup(&self) -> StartupReport {
        let mut slot = self.dispatcher.claim().await;
        let mut failed = 0;
        for joint in &self.joints {
            if let Err(e) = slot.send_raw(&format!("torque {joint} on")).await {
                warn!(joint, error = %e, "torque enable failed");
                failed += 1;
            }
        }
        let report = StartupReport {
            attempted: self.joints.len(),
            failed,
        };
        match report.error() {
            Some(error) => warn!(%error, "actuator startup degraded"),
            None => info!(joints = ?self.joints, "torque enabled"),
        }
        report
    }

    /// Stop the wheels, disable torque and halt the dispatcher.
    ///
    /// Waits for any in-flight command first. Returns `None` if shutdown
    /// already ran.
    pub async fn shutdown(&self) -> Option<ShutdownReport> {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            return None;
        }

        let mut slot = self.dispatcher.claim().await;
        let stopped = match slot.send_wheels(WheelCommand::STOP).await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "final stop failed");
                false
            }
        };

        let mut torque_failures = 0;
        for joint in &self.joints {
            if let Err(e) = slot.send_raw(&format!("torque {joint} off")).await {
                warn!(joint, error = %e, "torque disable failed");
                torque_failures += 1;
            }
        }
        slot.halt();

        info!(stopped, torque_failures, "actuator shut down");
        Some(ShutdownReport {
            stopped,
            torque_failures,
        })
    }

    /// Whether shutdown has started.
    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }
}
