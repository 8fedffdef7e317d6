//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase", default)]` so a partial
//! JSON file fills the rest from [`Default`].

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, SettingsError};

/// Root settings for the bridge.
///
/// ```json
/// { "server": { "port": 9000 }, "drive": { "cooldownMs": 300 } }
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BridgeSettings {
    /// Listener and session settings.
    pub server: ServerSettings,
    /// Translation magnitudes and pacing.
    pub drive: DriveSettings,
    /// How the actuator is reached.
    pub actuator: ActuatorSettings,
    /// Log output.
    pub logging: LoggingSettings,
}

impl BridgeSettings {
    /// Reject values the service cannot run with.
    pub fn validate(&self) -> Result<()> {
        fn invalid(msg: &str) -> Result<()> {
            Err(SettingsError::InvalidValue(msg.to_string()))
        }

        if self.server.port == 0 {
            return invalid("server.port must be > 0");
        }
        if self.server.max_connections == 0 {
            return invalid("server.maxConnections must be > 0");
        }
        if self.server.max_message_size == 0 {
            return invalid("server.maxMessageSize must be > 0");
        }
        if self.server.heartbeat_interval_secs == 0 {
            return invalid("server.heartbeatIntervalSecs must be > 0");
        }
        if self.server.heartbeat_timeout_secs < self.server.heartbeat_interval_secs {
            return invalid("server.heartbeatTimeoutSecs must be >= heartbeatIntervalSecs");
        }
        if self.server.send_timeout_ms == 0 {
            return invalid("server.sendTimeoutMs must be > 0");
        }
        if self.drive.drive_power < 0 {
            return invalid("drive.drivePower must not be negative");
        }
        if self.drive.turn_power < 0 {
            return invalid("drive.turnPower must not be negative");
        }
        if self.drive.dispatch_timeout_ms == 0 {
            return invalid("drive.dispatchTimeoutMs must be > 0");
        }
        if self.actuator.command.is_empty() {
            return invalid("actuator.command must not be empty");
        }
        Ok(())
    }
}

/// Listener and session settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    /// Bind address.
    pub host: String,
    /// Listen port for both WebSocket and HTTP.
    pub port: u16,
    /// Concurrent WebSocket clients before new ones are refused.
    pub max_connections: usize,
    /// Largest accepted inbound frame, in bytes.
    pub max_message_size: usize,
    /// Ping interval in seconds.
    pub heartbeat_interval_secs: u64,
    /// Close a client silent for this long, in seconds.
    pub heartbeat_timeout_secs: u64,
    /// Per-recipient send bound, in milliseconds.
    pub send_timeout_ms: u64,
}

impl ServerSettings {
    /// [`send_timeout_ms`](Self::send_timeout_ms) as a `Duration`.
    pub fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.send_timeout_ms)
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8082,
            max_connections: 64,
            max_message_size: 64 * 1024,
            heartbeat_interval_secs: 30,
            heartbeat_timeout_secs: 90,
            send_timeout_ms: 3000,
        }
    }
}

/// Translation magnitudes and pacing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DriveSettings {
    /// Wheel magnitude for forward/backward.
    pub drive_power: i32,
    /// Wheel magnitude for in-place rotation.
    pub turn_power: i32,
    /// Minimum interval between actuated commands, in milliseconds.
    pub cooldown_ms: u64,
    /// Bound on one actuator call, in milliseconds.
    pub dispatch_timeout_ms: u64,
}

impl DriveSettings {
    /// [`cooldown_ms`](Self::cooldown_ms) as a `Duration`.
    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }

    /// [`dispatch_timeout_ms`](Self::dispatch_timeout_ms) as a `Duration`.
    pub fn dispatch_timeout(&self) -> Duration {
        Duration::from_millis(self.dispatch_timeout_ms)
    }
}

impl Default for DriveSettings {
    fn default() -> Self {
        Self {
            drive_power: 2000,
            turn_power: 1500,
            cooldown_ms: 200,
            dispatch_timeout_ms: 3000,
        }
    }
}

/// How the actuator is reached.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ActuatorSettings {
    /// Program and arguments of the bot shell client.
    pub command: Vec<String>,
    /// Left wheel motor id.
    pub left_wheel: u8,
    /// Right wheel motor id.
    pub right_wheel: u8,
    /// Joints whose torque is enabled at startup and disabled at shutdown.
    pub joints: Vec<u8>,
}

impl Default for ActuatorSettings {
    fn default() -> Self {
        Self {
            command: vec![
                "adb".to_string(),
                "shell".to_string(),
                "su -c 'cd /data/data/com.ohmnilabs.telebot_rtc/files/assets/node-files && ./node bot_shell_client.js'".to_string(),
            ],
            left_wheel: 0,
            right_wheel: 1,
            joints: vec![0, 1, 3],
        }
    }
}

/// Log output.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Default filter directive when `RUST_LOG` is unset.
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_robot() {
        let s = BridgeSettings::default();
        assert_eq!(s.server.host, "0.0.0.0");
        assert_eq!(s.server.port, 8082);
        assert_eq!(s.server.max_message_size, 65_536);
        assert_eq!(s.drive.drive_power, 2000);
        assert_eq!(s.drive.turn_power, 1500);
        assert_eq!(s.drive.cooldown(), Duration::from_millis(200));
        assert_eq!(s.drive.dispatch_timeout(), Duration::from_secs(3));
        assert_eq!(s.actuator.joints, vec![0, 1, 3]);
        assert_eq!(s.actuator.command[0], "adb");
        assert_eq!(s.logging.level, "info");
        assert!(s.validate().is_ok());
    }

    #[test]
    fn serializes_camel_case() {
        let v = serde_json::to_value(BridgeSettings::default()).unwrap();
        assert_eq!(v["server"]["maxConnections"], 64);
        assert_eq!(v["drive"]["cooldownMs"], 200);
        assert_eq!(v["actuator"]["leftWheel"], 0);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let s: BridgeSettings = serde_json::from_str(r#"{"drive":{"turnPower":900}}"#).unwrap();
        assert_eq!(s.drive.turn_power, 900);
        assert_eq!(s.drive.drive_power, 2000);
        assert_eq!(s.server.port, 8082);
    }

    #[test]
    fn negative_power_rejected() {
        let mut s = BridgeSettings::default();
        s.drive.drive_power = -1;
        assert!(s.validate().is_err());
        s.drive.drive_power = 2000;
        s.drive.turn_power = -5;
        assert!(s.validate().is_err());
    }

    #[test]
    fn zero_timeouts_rejected() {
        let mut s = BridgeSettings::default();
        s.drive.dispatch_timeout_ms = 0;
        assert!(s.validate().is_err());

        let mut s = BridgeSettings::default();
        s.server.send_timeout_ms = 0;
        assert!(s.validate().is_err());
    }

    #[test]
    fn zero_cooldown_allowed() {
        let mut s = BridgeSettings::default();
        s.drive.cooldown_ms = 0;
        assert!(s.validate().is_ok());
    }

    #[test]
    fn heartbeat_timeout_below_interval_rejected() {
        let mut s = BridgeSettings::default();
        s.server.heartbeat_timeout_secs = 10;
        let err = s.validate().unwrap_err();
        assert!(err.to_string().contains("heartbeatTimeoutSecs"));
    }

    #[test]
    fn empty_actuator_command_rejected() {
        let mut s = BridgeSettings::default();
        s.actuator.command.clear();
        assert!(s.validate().is_err());
    }
}
