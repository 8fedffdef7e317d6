//! Serialized actuator access.
//!
//! The dispatcher owns a single slot. Holding a [`DispatchSlot`] is the only
//! way to reach the driver, so at most one command is in flight. Every call
//! through the slot is bounded by the dispatch timeout. Once halted, the slot
//! refuses further commands.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{Mutex, MutexGuard};
use tracing::{info, warn};
use wheelbridge_core::{ActuationError, WheelCommand};

use crate::BRIDGE_DISPATCH_DURATION_SECONDS;
use crate::driver::ActuatorDriver;

#[derive(Debug, Default)]
struct SlotState {
    halted: bool,
}

/// Gatekeeper in front of an [`ActuatorDriver`].
pub struct Dispatcher {
    driver: Arc<dyn ActuatorDriver>,
    timeout: Duration,
    slot: Mutex<SlotState>,
}

impl Dispatcher {
    /// Wrap `driver`, bounding every call by `timeout`.
    pub fn new(driver: Arc<dyn ActuatorDriver>, timeout: Duration) -> Self {
        Self {
            driver,
            timeout,
            slot: Mutex::new(SlotState::default()),
        }
    }

    /// Per-call bound.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Take the slot if nothing is in flight.
    pub fn try_claim(&self) -> Option<DispatchSlot<'_>> {
        self.slot.try_lock().ok().map(|state| DispatchSlot {
            dispatcher: self,
            state,
        })
    }

    /// Wait for the slot.
    pub async fn claim(&self) -> DispatchSlot<'_> {
        DispatchSlot {
            dispatcher: self,
            state: self.slot.lock().await,
        }
    }
}

/// Exclusive access to the driver; released on drop.
pub struct DispatchSlot<'a> {
    dispatcher: &'a Dispatcher,
    state: MutexGuard<'a, SlotState>,
}

impl DispatchSlot<'_> {
    /// Send a wheel-speed pair.
    pub async fn send_wheels(&mut self, wheels: WheelCommand) -> Result<(), ActuationError> {
        if self.state.halted {
            return Err(ActuationError::Halted);
        }
        info!(left = wheels.left, right = wheels.right, "dispatching wheel command");
        let driver = Arc::clone(&self.dispatcher.driver);
        self.bounded(driver.send_wheel_speeds(wheels.left, wheels.right))
            .await
    }

    /// Send a raw command line.
    pub async fn send_raw(&mut self, command: &str) -> Result<(), ActuationError> {
        if self.state.halted {
            return Err(ActuationError::Halted);
        }
        info!(command, "dispatching raw command");
        let driver = Arc::clone(&self.dispatcher.driver);
        self.bounded(driver.send_raw_command(command)).await
    }

    /// Refuse every later command, through this slot or any future one.
    pub fn halt(&mut self) {
        self.state.halted = true;
    }

    /// Whether [`halt`](Self::halt) has been called.
    pub fn is_halted(&self) -> bool {
        self.state.halted
    }

    async fn bounded<F>(&self, call: F) -> Result<(), ActuationError>
    where
        F: Future<Output = Result<(), ActuationError>>,
    {
        let timeout = self.dispatcher.timeout;
        let started = Instant::now();
        let result = match tokio::time::timeout(timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(ActuationError::Timeout(timeout)),
        };
        metrics::histogram!(BRIDGE_DISPATCH_DURATION_SECONDS)
            .record(started.elapsed().as_secs_f64());
        if let Err(ref error) = result {
            warn!(%error, "actuation failed");
        }
        result
    }
}
