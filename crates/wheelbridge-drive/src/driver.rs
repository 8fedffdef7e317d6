//! Actuator transport seam.

use async_trait::async_trait;
use wheelbridge_core::ActuationError;

/// Sends commands to the physical base.
///
/// Implementations report failures as values; callers bound every call with
/// their own timeout, so a driver may block but must never panic.
#[async_trait]
pub trait ActuatorDriver: Send + Sync {
    /// Set both wheel speeds together.
    async fn send_wheel_speeds(&self, left: i32, right: i32) -> Result<(), ActuationError>;

    /// Send a raw command line (e.g. `torque 0 on`).
    async fn send_raw_command(&self, command: &str) -> Result<(), ActuationError>;
}
