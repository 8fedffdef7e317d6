//! Request/response framing: `POST /robot/command` and `POST /robot/dual_wheel`.
//!
//! Each request runs through the same controller as the `WebSocket`
//! channel. Admitted commands fan their status out to every connected
//! `WebSocket` client.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde_json::Value;
use tracing::{info, instrument, warn};
use wheelbridge_core::envelope::InboundCommand;
use wheelbridge_core::{BridgeError, InputError};

use crate::server::AppState;
use crate::websocket::handler::{Handled, execute_command};

/// `POST /robot/command`: `{"command": ...}` or `{"text": ...}`.
#[instrument(skip_all)]
pub async fn command_handler(State(state): State<AppState>, body: Bytes) -> Response {
    let command = decode(&body).and_then(|value| match InboundCommand::from_value(&value)? {
        InboundCommand::Wheels(_) => Err(InputError::MissingField("command")),
        command => Ok(command),
    });
    run(&state, command).await
}

/// `POST /robot/dual_wheel`: `{"left_speed": .., "right_speed": ..}`.
#[instrument(skip_all)]
pub async fn dual_wheel_handler(State(state): State<AppState>, body: Bytes) -> Response {
    let command = decode(&body)
        .and_then(|value| InboundCommand::wheels_from_value(&value))
        .map(InboundCommand::Wheels);
    run(&state, command).await
}

fn decode(body: &[u8]) -> Result<Value, InputError> {
    serde_json::from_slice(body).map_err(|e| InputError::InvalidJson(e.to_string()))
}

async fn run(state: &AppState, command: Result<InboundCommand, InputError>) -> Response {
    let handled = match command {
        Ok(command) => {
            execute_command(command, &state.controller, state.classifier.as_ref()).await
        }
        Err(e) => {
            warn!(error = %e, "malformed http command");
            Handled::Rejected(BridgeError::from(e))
        }
    };

    if let Some(status) = handled.status() {
        let delivered = state.broadcast.broadcast_except(None, &status).await;
        info!(command = %status.command, delivered, "http command broadcast");
    }

    (
        status_code(&handled),
        [(header::CONTENT_TYPE, "application/json")],
        handled.to_json(),
    )
        .into_response()
}

/// 200 on success, 500 when an accepted command failed to actuate, 400 when
/// the payload was rejected.
fn status_code(handled: &Handled) -> StatusCode {
    match handled {
        Handled::Rejected(_) => StatusCode::BAD_REQUEST,
        h if h.success() => StatusCode::OK,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use wheelbridge_core::envelope::CommandReply;
    use wheelbridge_core::{ActuationError, Intent};

    use super::*;

    #[test]
    fn rejected_is_bad_request() {
        let handled = Handled::Rejected(InputError::NotAnObject.into());
        assert_eq!(status_code(&handled), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn executed_success_is_ok() {
        let handled = Handled::Executed {
            reply: CommandReply::for_intent(Intent::Stop, true),
            actuated: false,
        };
        assert_eq!(status_code(&handled), StatusCode::OK);
    }

    #[test]
    fn actuation_failure_is_server_error() {
        let error = BridgeError::from(ActuationError::Failure("device offline".into()));
        let handled = Handled::Executed {
            reply: CommandReply::for_intent(Intent::Forward, false).with_error(&error),
            actuated: true,
        };
        assert_eq!(status_code(&handled), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn decode_reports_invalid_json() {
        let err = decode(b"{not json").unwrap_err();
        assert_matches!(err, InputError::InvalidJson(_));
    }
}
