//! Symbolic movement intents.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::{InputError, excerpt};

/// A movement request for the differential-drive base.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    /// Drive straight ahead.
    Forward,
    /// Drive straight back.
    Backward,
    /// Rotate in place to the left.
    Left,
    /// Rotate in place to the right.
    Right,
    /// Halt both wheels.
    Stop,
}

impl Intent {
    /// Every intent, in wire order.
    pub const ALL: [Intent; 5] = [
        Intent::Forward,
        Intent::Backward,
        Intent::Left,
        Intent::Right,
        Intent::Stop,
    ];

    /// Wire name of the intent.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Forward => "forward",
            Self::Backward => "backward",
            Self::Left => "left",
            Self::Right => "right",
            Self::Stop => "stop",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Intent {
    type Err = InputError;

    /// Case-insensitive, surrounding whitespace ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        Intent::ALL
            .into_iter()
            .find(|i| i.as_str() == normalized)
            .ok_or_else(|| InputError::InvalidValue {
                field: "command",
                reason: format!("unknown command '{}'", excerpt(s)),
            })
    }
}
