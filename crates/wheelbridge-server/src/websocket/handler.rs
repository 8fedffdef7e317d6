//! Inbound command dispatch shared by both framings.
//!
//! Parses a command envelope, runs it through the motion controller and
//! builds the reply plus the status to fan out.

use tracing::{debug, instrument, warn};
use wheelbridge_core::envelope::{CommandReply, FailureReply, InboundCommand, StatusBroadcast};
use wheelbridge_core::{BridgeError, InputError, Intent, IntentClassifier};
use wheelbridge_drive::{CommandOutcome, MotionController};

/// Outcome of one inbound command.
#[derive(Debug, Clone)]
pub enum Handled {
    /// The command was understood and run (possibly as a no-op).
    Executed {
        /// Reply for the sender.
        reply: CommandReply,
        /// Whether the actuator was driven.
        actuated: bool,
    },
    /// The payload could not be turned into a command.
    Rejected(BridgeError),
}

impl Handled {
    fn from_outcome(reply: CommandReply, outcome: &CommandOutcome) -> Self {
        let reply = match &outcome.error {
            Some(e) => reply.with_error(&BridgeError::from(e.clone())),
            None => reply,
        };
        Self::Executed {
            reply,
            actuated: outcome.actuated(),
        }
    }

    /// Whether the sender should see `success: true`.
    pub fn success(&self) -> bool {
        match self {
            Self::Executed { reply, .. } => reply.success,
            Self::Rejected(_) => false,
        }
    }

    /// Status to fan out; only actuated commands produce one.
    pub fn status(&self) -> Option<StatusBroadcast> {
        match self {
            Self::Executed {
                reply,
                actuated: true,
            } => Some(reply.to_status()),
            _ => None,
        }
    }

    /// Serialized reply for the sender.
    pub fn to_json(&self) -> String {
        let json = match self {
            Self::Executed { reply, .. } => serde_json::to_string(reply),
            Self::Rejected(error) => serde_json::to_string(&FailureReply::new(error)),
        };
        json.unwrap_or_else(|e| {
            tracing::error!(error = %e, "failed to serialize reply");
            String::new()
        })
    }
}

/// Result of handling a WebSocket message.
pub struct HandleResult {
    /// Serialized JSON reply to send back.
    pub reply_json: String,
    /// Status to broadcast to the other clients, if any.
    pub status: Option<StatusBroadcast>,
}

/// Handle an incoming WebSocket text message.
#[instrument(skip_all)]
pub async fn handle_message(
    message: &str,
    controller: &MotionController,
    classifier: &dyn IntentClassifier,
) -> HandleResult {
    let handled = match InboundCommand::parse(message) {
        Ok(command) => execute_command(command, controller, classifier).await,
        Err(e) => {
            warn!(error = %e, "malformed command");
            Handled::Rejected(e.into())
        }
    };
    HandleResult {
        reply_json: handled.to_json(),
        status: handled.status(),
    }
}

/// Run a parsed command.
pub async fn execute_command(
    command: InboundCommand,
    controller: &MotionController,
    classifier: &dyn IntentClassifier,
) -> Handled {
    match command {
        InboundCommand::Intent(intent) => execute_intent(intent, controller).await,
        InboundCommand::Wheels(wheels) => {
            let outcome = controller.execute_raw(wheels).await;
            debug!(
                left = wheels.left,
                right = wheels.right,
                admission = outcome.admission.as_str(),
                "wheel speeds handled"
            );
            Handled::from_outcome(CommandReply::for_wheels(wheels, outcome.success()), &outcome)
        }
        InboundCommand::Utterance(text) => match classifier.classify(&text) {
            Some(intent) => {
                debug!(%intent, %text, "utterance classified");
                execute_intent(intent, controller).await
            }
            None => Handled::Rejected(InputError::unrecognized(&text).into()),
        },
    }
}

async fn execute_intent(intent: Intent, controller: &MotionController) -> Handled {
    let outcome = controller.execute(intent).await;
    debug!(%intent, admission = outcome.admission.as_str(), "intent handled");
    Handled::from_outcome(CommandReply::for_intent(intent, outcome.success()), &outcome)
}
