//! Intent → wheel-speed translation for a two-wheel differential drive.
//!
//! The wheels are mounted mirror-image, so straight-line motion needs
//! opposite signs on the two wheels and in-place rotation needs equal signs.

use serde::{Deserialize, Serialize};

use crate::intent::Intent;

/// Signed speed pair for the left and right drive wheels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WheelCommand {
    /// Left wheel speed.
    pub left: i32,
    /// Right wheel speed.
    pub right: i32,
}

impl WheelCommand {
    /// Both wheels halted.
    pub const STOP: WheelCommand = WheelCommand { left: 0, right: 0 };

    /// Build a command from explicit speeds.
    pub const fn new(left: i32, right: i32) -> Self {
        Self { left, right }
    }

    /// Whether both wheels are at rest.
    pub fn is_stop(&self) -> bool {
        *self == Self::STOP
    }
}

/// The two magnitudes that parameterise translation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MotionProfile {
    /// Magnitude used for forward/backward.
    pub drive_power: i32,
    /// Magnitude used for in-place rotation.
    pub turn_power: i32,
}

impl MotionProfile {
    /// Translate an intent with this profile's magnitudes.
    pub fn translate(&self, intent: Intent) -> WheelCommand {
        translate(intent, self.drive_power, self.turn_power)
    }
}

impl Default for MotionProfile {
    fn default() -> Self {
        Self {
            drive_power: 2000,
            turn_power: 1500,
        }
    }
}

/// Map an intent to wheel speeds.
///
/// | intent   | left        | right       |
/// |----------|-------------|-------------|
/// | forward  | -drive      | +drive      |
/// | backward | +drive      | -drive      |
/// | left     | -turn       | -turn       |
/// | right    | +turn       | +turn       |
/// | stop     | 0           | 0           |
pub fn translate(intent: Intent, drive_power: i32, turn_power: i32) -> WheelCommand {
    match intent {
        Intent::Forward => WheelCommand::new(-drive_power, drive_power),
        Intent::Backward => WheelCommand::new(drive_power, -drive_power),
        Intent::Left => WheelCommand::new(-turn_power, -turn_power),
        Intent::Right => WheelCommand::new(turn_power, turn_power),
        Intent::Stop => WheelCommand::STOP,
    }
}
