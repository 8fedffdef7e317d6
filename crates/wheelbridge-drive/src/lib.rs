//! # wheelbridge-drive
//!
//! Everything between an admitted intent and the physical wheels.
//!
//! - [`driver::ActuatorDriver`]: the seam to the actuator transport
//! - [`shell::ShellDriver`]: pipes commands into a configured shell client
//! - [`dispatch::Dispatcher`]: one in-flight command at a time, bounded by a timeout
//! - [`controller::MotionController`]: rate limiter → translator → dispatcher
//! - [`lifecycle::LifecycleManager`]: torque enable on startup, stop + disable on shutdown
//! - [`mock::MockDriver`]: call-recording driver for tests

#![deny(unsafe_code)]

pub mod controller;
pub mod dispatch;
pub mod driver;
pub mod lifecycle;
pub mod mock;
pub mod shell;

pub use controller::{CommandOutcome, MotionController};
pub use dispatch::{DispatchSlot, Dispatcher};
pub use driver::ActuatorDriver;
pub use lifecycle::{LifecycleManager, ShutdownReport, StartupReport};
pub use shell::{ShellDriver, ShellDriverConfig};

/// Commands seen by the controller (counter, labels: admission).
pub const BRIDGE_COMMANDS_TOTAL: &str = "bridge_commands_total";
/// Admitted commands the actuator did not confirm (counter).
pub const BRIDGE_ACTUATION_FAILURES_TOTAL: &str = "bridge_actuation_failures_total";
/// Time spent in one actuator call (histogram).
pub const BRIDGE_DISPATCH_DURATION_SECONDS: &str = "bridge_dispatch_duration_seconds";
