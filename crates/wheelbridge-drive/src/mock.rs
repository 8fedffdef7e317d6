//! In-memory driver for tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use wheelbridge_core::{ActuationError, WheelCommand};

use crate::driver::ActuatorDriver;

/// One call observed by [`MockDriver`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DriverCall {
    /// `send_wheel_speeds`.
    Wheels(WheelCommand),
    /// `send_raw_command`.
    Raw(String),
}

/// Records every call; optionally fails or stalls on demand.
///
/// Calls are recorded when they start, before any delay, so a test can
/// observe an in-flight dispatch.
#[derive(Default)]
pub struct MockDriver {
    calls: Mutex<Vec<DriverCall>>,
    failing: AtomicBool,
    delay: Mutex<Option<Duration>>,
}

impl MockDriver {
    /// A driver that accepts everything immediately.
    pub fn new() -> Self {
        Self::default()
    }

    /// A driver that rejects everything.
    pub fn failing() -> Self {
        let driver = Self::new();
        driver.set_failing(true);
        driver
    }

    /// Builder: stall every call for `delay`.
    #[must_use]
    pub fn with_delay(self, delay: Duration) -> Self {
        self.set_delay(Some(delay));
        self
    }

    /// Toggle failure mode.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Change the stall applied to subsequent calls.
    pub fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.lock() = delay;
    }

    /// Every call so far, in order.
    pub fn calls(&self) -> Vec<DriverCall> {
        self.calls.lock().clone()
    }

    /// Only the wheel commands.
    pub fn wheel_calls(&self) -> Vec<WheelCommand> {
        self.calls
            .lock()
            .iter()
            .filter_map(|c| match c {
                DriverCall::Wheels(w) => Some(*w),
                DriverCall::Raw(_) => None,
            })
            .collect()
    }

    /// Only the raw command lines.
    pub fn raw_calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .filter_map(|c| match c {
                DriverCall::Raw(r) => Some(r.clone()),
                DriverCall::Wheels(_) => None,
            })
            .collect()
    }

    /// Total calls of either kind.
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    async fn respond(&self, call: DriverCall) -> Result<(), ActuationError> {
        self.calls.lock().push(call);
        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            Err(ActuationError::Failure("mock failure".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ActuatorDriver for MockDriver {
    async fn send_wheel_speeds(&self, left: i32, right: i32) -> Result<(), ActuationError> {
        self.respond(DriverCall::Wheels(WheelCommand::new(left, right)))
            .await
    }

    async fn send_raw_command(&self, command: &str) -> Result<(), ActuationError> {
        self.respond(DriverCall::Raw(command.to_owned())).await
    }
}
