//! # wheelbridge-core
//!
//! Domain types shared by every wheelbridge crate.
//!
//! - [`Intent`]: the five symbolic movement requests
//! - [`motion`]: intent → signed wheel speeds for a differential drive
//! - [`limiter`]: minimum-interval gate plus last-intent deduplication
//! - [`envelope`]: inbound command parsing and outbound reply/status JSON
//! - [`classifier`]: pluggable free-text → intent classification
//! - [`errors`]: the bridge error taxonomy

#![deny(unsafe_code)]

pub mod classifier;
pub mod envelope;
pub mod errors;
pub mod intent;
pub mod limiter;
pub mod motion;

pub use classifier::{IntentClassifier, KeywordClassifier};
pub use errors::{ActuationError, BridgeError, InputError};
pub use intent::Intent;
pub use limiter::{Admission, RateLimiter};
pub use motion::{MotionProfile, WheelCommand, translate};
