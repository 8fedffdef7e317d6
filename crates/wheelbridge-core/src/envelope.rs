//! JSON envelopes exchanged with clients.
//!
//! Inbound (any framing):
//! - `{"command": "<intent>"}`
//! - `{"left_speed": <int>, "right_speed": <int>}`
//! - `{"text": "<utterance>"}` (classified into an intent)
//!
//! Outbound: a reply to the sender, a `status` broadcast to everyone else,
//! a failure envelope for malformed input, and a `connected` greeting.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::errors::{BridgeError, InputError};
use crate::intent::Intent;
use crate::motion::WheelCommand;

/// `command` label used in replies to explicit wheel speeds.
pub const DUAL_WHEEL_LABEL: &str = "dual_wheel";

/// Seconds since the Unix epoch, with microsecond resolution.
#[allow(clippy::cast_precision_loss)]
pub fn epoch_seconds() -> f64 {
    chrono::Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

/// A parsed inbound command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundCommand {
    /// A symbolic movement request.
    Intent(Intent),
    /// Explicit wheel speeds, bypassing translation.
    Wheels(WheelCommand),
    /// Free text for the intent classifier.
    Utterance(String),
}

impl InboundCommand {
    /// Parse a raw message.
    pub fn parse(message: &str) -> Result<Self, InputError> {
        let value: Value =
            serde_json::from_str(message).map_err(|e| InputError::InvalidJson(e.to_string()))?;
        Self::from_value(&value)
    }

    /// Interpret an already-decoded JSON value.
    pub fn from_value(value: &Value) -> Result<Self, InputError> {
        let obj = value.as_object().ok_or(InputError::NotAnObject)?;

        if let Some(command) = obj.get("command") {
            let text = command.as_str().ok_or_else(|| InputError::InvalidValue {
                field: "command",
                reason: "expected a string".into(),
            })?;
            return Ok(Self::Intent(text.parse()?));
        }

        if obj.contains_key("left_speed") || obj.contains_key("right_speed") {
            let left = speed_field(obj, "left_speed")?;
            let right = speed_field(obj, "right_speed")?;
            return Ok(Self::Wheels(WheelCommand::new(left, right)));
        }

        if let Some(text) = obj.get("text") {
            let text = text.as_str().ok_or_else(|| InputError::InvalidValue {
                field: "text",
                reason: "expected a string".into(),
            })?;
            return Ok(Self::Utterance(text.to_owned()));
        }

        Err(InputError::MissingField("command"))
    }

    /// Read an explicit speed pair, ignoring any other fields.
    pub fn wheels_from_value(value: &Value) -> Result<WheelCommand, InputError> {
        let obj = value.as_object().ok_or(InputError::NotAnObject)?;
        let left = speed_field(obj, "left_speed")?;
        let right = speed_field(obj, "right_speed")?;
        Ok(WheelCommand::new(left, right))
    }
}

fn speed_field(obj: &Map<String, Value>, field: &'static str) -> Result<i32, InputError> {
    let value = obj.get(field).ok_or(InputError::MissingField(field))?;
    let n = value.as_i64().ok_or_else(|| InputError::InvalidValue {
        field,
        reason: "expected an integer".into(),
    })?;
    i32::try_from(n).map_err(|_| InputError::InvalidValue {
        field,
        reason: format!("{n} is out of range"),
    })
}

/// Direct reply to the client that issued a command.
#[derive(Debug, Clone, Serialize)]
pub struct CommandReply {
    /// Whether the command was carried out (no-ops count as success).
    pub success: bool,
    /// Intent name, or [`DUAL_WHEEL_LABEL`] for explicit speeds.
    pub command: String,
    /// Seconds since the Unix epoch.
    pub timestamp: f64,
    /// Echo of explicit left speed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub left_speed: Option<i32>,
    /// Echo of explicit right speed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub right_speed: Option<i32>,
    /// Why actuation failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

impl CommandReply {
    /// Reply for an intent.
    pub fn for_intent(intent: Intent, success: bool) -> Self {
        Self {
            success,
            command: intent.as_str().to_owned(),
            timestamp: epoch_seconds(),
            left_speed: None,
            right_speed: None,
            error: None,
        }
    }

    /// Reply for explicit wheel speeds.
    pub fn for_wheels(wheels: WheelCommand, success: bool) -> Self {
        Self {
            success,
            command: DUAL_WHEEL_LABEL.to_owned(),
            timestamp: epoch_seconds(),
            left_speed: Some(wheels.left),
            right_speed: Some(wheels.right),
            error: None,
        }
    }

    /// Attach the failure that made `success` false.
    #[must_use]
    pub fn with_error(mut self, error: &BridgeError) -> Self {
        self.error = Some(ErrorBody::from(error));
        self
    }

    /// Status broadcast describing the same command.
    pub fn to_status(&self) -> StatusBroadcast {
        StatusBroadcast {
            command: self.command.clone(),
            success: self.success,
            timestamp: self.timestamp,
        }
    }
}

/// Status fan-out to observers: `{"type": "status", ...}`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename = "status")]
pub struct StatusBroadcast {
    /// Intent name or [`DUAL_WHEEL_LABEL`].
    pub command: String,
    /// Whether the actuator confirmed the command.
    pub success: bool,
    /// Seconds since the Unix epoch.
    pub timestamp: f64,
}

/// Greeting sent when a persistent channel opens.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename = "connected")]
pub struct ConnectedNotice {
    /// Identifier assigned to the connection.
    #[serde(rename = "clientId")]
    pub client_id: String,
    /// Seconds since the Unix epoch.
    pub timestamp: f64,
}

impl ConnectedNotice {
    /// Greeting for `client_id`, stamped now.
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            timestamp: epoch_seconds(),
        }
    }
}

/// Machine-readable failure description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    /// Stable error code.
    pub code: String,
    /// Human-readable detail.
    pub message: String,
}

impl From<&BridgeError> for ErrorBody {
    fn from(error: &BridgeError) -> Self {
        Self {
            code: error.code().to_owned(),
            message: error.to_string(),
        }
    }
}

/// Structured failure sent only to the offending client.
#[derive(Debug, Clone, Serialize)]
pub struct FailureReply {
    /// Always `false`.
    pub success: bool,
    /// What went wrong.
    pub error: ErrorBody,
    /// Seconds since the Unix epoch.
    pub timestamp: f64,
}

impl FailureReply {
    /// Failure envelope for `error`, stamped now.
    pub fn new(error: &BridgeError) -> Self {
        Self {
            success: false,
            error: ErrorBody::from(error),
            timestamp: epoch_seconds(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ActuationError;
    use assert_matches::assert_matches;

    #[test]
    fn parse_intent_command() {
        let cmd = InboundCommand::parse(r#"{"command":"forward"}"#).unwrap();
        assert_eq!(cmd, InboundCommand::Intent(Intent::Forward));
    }

    #[test]
    fn parse_wheel_speeds() {
        let cmd = InboundCommand::parse(r#"{"left_speed":-800,"right_speed":800}"#).unwrap();
        assert_eq!(cmd, InboundCommand::Wheels(WheelCommand::new(-800, 800)));
    }

    #[test]
    fn parse_utterance() {
        let cmd = InboundCommand::parse(r#"{"text":"go left"}"#).unwrap();
        assert_eq!(cmd, InboundCommand::Utterance("go left".into()));
    }

    #[test]
    fn command_takes_precedence_over_speeds() {
        let cmd =
            InboundCommand::parse(r#"{"command":"stop","left_speed":1,"right_speed":1}"#).unwrap();
        assert_eq!(cmd, InboundCommand::Intent(Intent::Stop));
    }

    #[test]
    fn missing_command_field() {
        let err = InboundCommand::parse(r#"{"foo":"bar"}"#).unwrap_err();
        assert_eq!(err, InputError::MissingField("command"));
    }

    #[test]
    fn invalid_json() {
        let err = InboundCommand::parse("not json").unwrap_err();
        assert_matches!(err, InputError::InvalidJson(_));
    }

    #[test]
    fn non_object_json() {
        assert_eq!(
            InboundCommand::parse("[1,2]").unwrap_err(),
            InputError::NotAnObject
        );
        assert_eq!(
            InboundCommand::parse("\"forward\"").unwrap_err(),
            InputError::NotAnObject
        );
    }

    #[test]
    fn unknown_intent_is_invalid_value() {
        let err = InboundCommand::parse(r#"{"command":"fly"}"#).unwrap_err();
        assert_matches!(err, InputError::InvalidValue { field: "command", .. });
    }

    #[test]
    fn non_string_command_is_invalid_value() {
        let err = InboundCommand::parse(r#"{"command":42}"#).unwrap_err();
        assert_matches!(err, InputError::InvalidValue { field: "command", .. });
    }

    #[test]
    fn half_a_speed_pair_is_missing_field() {
        let err = InboundCommand::parse(r#"{"left_speed":100}"#).unwrap_err();
        assert_eq!(err, InputError::MissingField("right_speed"));
    }

    #[test]
    fn wheels_from_value_ignores_command() {
        let v = serde_json::json!({"command": "forward", "left_speed": 7, "right_speed": -7});
        assert_eq!(
            InboundCommand::wheels_from_value(&v).unwrap(),
            WheelCommand::new(7, -7)
        );
        let v = serde_json::json!({"command": "forward"});
        assert_eq!(
            InboundCommand::wheels_from_value(&v).unwrap_err(),
            InputError::MissingField("left_speed")
        );
    }

    #[test]
    fn fractional_speed_is_rejected() {
        let err = InboundCommand::parse(r#"{"left_speed":1.5,"right_speed":0}"#).unwrap_err();
        assert_matches!(err, InputError::InvalidValue { field: "left_speed", .. });
    }

    #[test]
    fn out_of_range_speed_is_rejected() {
        let err =
            InboundCommand::parse(r#"{"left_speed":0,"right_speed":99999999999}"#).unwrap_err();
        assert_matches!(err, InputError::InvalidValue { field: "right_speed", .. });
    }

    #[test]
    fn reply_for_intent_shape() {
        let reply = CommandReply::for_intent(Intent::Left, true);
        let v = serde_json::to_value(&reply).unwrap();
        assert_eq!(v["success"], true);
        assert_eq!(v["command"], "left");
        assert!(v["timestamp"].is_f64());
        assert!(v.get("left_speed").is_none());
        assert!(v.get("error").is_none());
    }

    #[test]
    fn reply_for_wheels_echoes_speeds() {
        let reply = CommandReply::for_wheels(WheelCommand::new(5, -5), false);
        let v = serde_json::to_value(&reply).unwrap();
        assert_eq!(v["command"], DUAL_WHEEL_LABEL);
        assert_eq!(v["left_speed"], 5);
        assert_eq!(v["right_speed"], -5);
        assert_eq!(v["success"], false);
    }

    #[test]
    fn reply_with_error_carries_code() {
        let err: BridgeError = ActuationError::Failure("exit status 1".into()).into();
        let reply = CommandReply::for_intent(Intent::Forward, false).with_error(&err);
        let v = serde_json::to_value(&reply).unwrap();
        assert_eq!(v["error"]["code"], "ACTUATION_FAILURE");
    }

    #[test]
    fn status_broadcast_shape() {
        let reply = CommandReply::for_intent(Intent::Stop, true);
        let v = serde_json::to_value(reply.to_status()).unwrap();
        assert_eq!(v["type"], "status");
        assert_eq!(v["command"], "stop");
        assert_eq!(v["success"], true);
        assert_eq!(v["timestamp"], reply.timestamp);
    }

    #[test]
    fn connected_notice_shape() {
        let v = serde_json::to_value(ConnectedNotice::new("client_1")).unwrap();
        assert_eq!(v["type"], "connected");
        assert_eq!(v["clientId"], "client_1");
        assert!(v["timestamp"].is_f64());
    }

    #[test]
    fn failure_reply_shape() {
        let err: BridgeError = InputError::MissingField("command").into();
        let v = serde_json::to_value(FailureReply::new(&err)).unwrap();
        assert_eq!(v["success"], false);
        assert_eq!(v["error"]["code"], "MALFORMED_INPUT");
        assert_eq!(v["error"]["message"], "missing field 'command'");
    }

    #[test]
    fn epoch_seconds_is_recent() {
        // 2020-01-01
        assert!(epoch_seconds() > 1_577_836_800.0);
    }
}
