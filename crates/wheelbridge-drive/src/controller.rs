//! Motion controller: admission → translation → dispatch.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;
use wheelbridge_core::{ActuationError, Admission, Intent, MotionProfile, RateLimiter, WheelCommand};

use crate::dispatch::Dispatcher;
use crate::{BRIDGE_ACTUATION_FAILURES_TOTAL, BRIDGE_COMMANDS_TOTAL};

/// What happened to one command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandOutcome {
    /// Admission decision.
    pub admission: Admission,
    /// Speeds sent to the actuator, when admitted.
    pub wheels: Option<WheelCommand>,
    /// Actuation failure, when admitted and not confirmed.
    pub error: Option<ActuationError>,
}

impl CommandOutcome {
    fn skipped(admission: Admission) -> Self {
        Self {
            admission,
            wheels: None,
            error: None,
        }
    }

    /// No-ops count as success; only a failed actuation does not.
    pub fn success(&self) -> bool {
        self.error.is_none()
    }

    /// Whether the actuator was driven.
    pub fn actuated(&self) -> bool {
        self.admission.is_admitted()
    }
}

/// Turns intents and raw speed pairs into actuator traffic.
pub struct MotionController {
    profile: MotionProfile,
    limiter: Mutex<RateLimiter>,
    dispatcher: Arc<Dispatcher>,
}

impl MotionController {
    /// Build a controller over a shared dispatcher.
    pub fn new(profile: MotionProfile, limiter: RateLimiter, dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            profile,
            limiter: Mutex::new(limiter),
            dispatcher,
        }
    }

    /// Translation magnitudes in use.
    pub fn profile(&self) -> MotionProfile {
        self.profile
    }

    /// The dispatcher shared with the lifecycle manager.
    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// Execute a symbolic intent.
    pub async fn execute(&self, intent: Intent) -> CommandOutcome {
        let Some(mut slot) = self.dispatcher.try_claim() else {
            return record(CommandOutcome::skipped(Admission::Busy));
        };

        let admission = self.limiter.lock().admit(intent, now());
        if !admission.is_admitted() {
            debug!(%intent, admission = admission.as_str(), "command skipped");
            return record(CommandOutcome::skipped(admission));
        }

        let wheels = self.profile.translate(intent);
        let error = slot.send_wheels(wheels).await.err();
        if error.is_some() {
            self.limiter.lock().forget_last();
        }
        record(CommandOutcome {
            admission,
            wheels: Some(wheels),
            error,
        })
    }

    /// Execute explicit wheel speeds, bypassing translation and deduplication.
    pub async fn execute_raw(&self, wheels: WheelCommand) -> CommandOutcome {
        let Some(mut slot) = self.dispatcher.try_claim() else {
            return record(CommandOutcome::skipped(Admission::Busy));
        };

        let admission = self.limiter.lock().admit_raw(now());
        if !admission.is_admitted() {
            debug!(
                left = wheels.left,
                right = wheels.right,
                admission = admission.as_str(),
                "raw command skipped"
            );
            return record(CommandOutcome::skipped(admission));
        }

        let error = slot.send_wheels(wheels).await.err();
        record(CommandOutcome {
            admission,
            wheels: Some(wheels),
            error,
        })
    }
}

// Read through tokio's clock so paused-time tests drive the cooldown.
fn now() -> std::time::Instant {
    tokio::time::Instant::now().into_std()
}

fn record(outcome: CommandOutcome) -> CommandOutcome {
    metrics::counter!(BRIDGE_COMMANDS_TOTAL, "admission" => outcome.admission.as_str())
        .increment(1);
    if outcome.error.is_some() {
        metrics::counter!(BRIDGE_ACTUATION_FAILURES_TOTAL).increment(1);
    }
    outcome
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::driver::ActuatorDriver;
    use crate::mock::MockDriver;

    const COOLDOWN: Duration = Duration::from_millis(200);

    fn controller(driver: &Arc<MockDriver>) -> MotionController {
        let dispatcher = Arc::new(Dispatcher::new(
            Arc::clone(driver) as Arc<dyn ActuatorDriver>,
            Duration::from_secs(3),
        ));
        MotionController::new(MotionProfile::default(), RateLimiter::new(COOLDOWN), dispatcher)
    }

    #[tokio::test(start_paused = true)]
    async fn forward_is_actuated() {
        let driver = Arc::new(MockDriver::new());
        let c = controller(&driver);
        let outcome = c.execute(Intent::Forward).await;
        assert_eq!(outcome.admission, Admission::Admit);
        assert!(outcome.success());
        assert!(outcome.actuated());
        assert_eq!(outcome.wheels, Some(WheelCommand::new(-2000, 2000)));
        assert_eq!(driver.wheel_calls(), vec![WheelCommand::new(-2000, 2000)]);
    }

    #[tokio::test(start_paused = true)]
    async fn command_inside_cooldown_is_rate_limited() {
        let driver = Arc::new(MockDriver::new());
        let c = controller(&driver);
        let _ = c.execute(Intent::Forward).await;
        tokio::time::advance(Duration::from_millis(50)).await;
        let outcome = c.execute(Intent::Left).await;
        assert_eq!(outcome.admission, Admission::RateLimited);
        assert!(outcome.success());
        assert!(!outcome.actuated());
        assert_eq!(driver.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn repeated_intent_is_duplicate() {
        let driver = Arc::new(MockDriver::new());
        let c = controller(&driver);
        let _ = c.execute(Intent::Forward).await;
        tokio::time::advance(COOLDOWN * 2).await;
        let outcome = c.execute(Intent::Forward).await;
        assert_eq!(outcome.admission, Admission::Duplicate);
        assert!(outcome.success());
        assert_eq!(driver.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn sequence_after_cooldown_is_actuated() {
        let driver = Arc::new(MockDriver::new());
        let c = controller(&driver);
        for intent in [Intent::Forward, Intent::Left, Intent::Stop] {
            let outcome = c.execute(intent).await;
            assert_eq!(outcome.admission, Admission::Admit);
            tokio::time::advance(COOLDOWN).await;
        }
        assert_eq!(
            driver.wheel_calls(),
            vec![
                WheelCommand::new(-2000, 2000),
                WheelCommand::new(-1500, -1500),
                WheelCommand::STOP,
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn failed_actuation_allows_retry_of_same_intent() {
        let driver = Arc::new(MockDriver::failing());
        let c = controller(&driver);
        let outcome = c.execute(Intent::Forward).await;
        assert!(outcome.actuated());
        assert!(!outcome.success());
        assert!(matches!(outcome.error, Some(ActuationError::Failure(_))));

        driver.set_failing(false);
        tokio::time::advance(COOLDOWN).await;
        let outcome = c.execute(Intent::Forward).await;
        assert_eq!(outcome.admission, Admission::Admit);
        assert!(outcome.success());
        assert_eq!(driver.call_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_actuation_still_consumes_cooldown() {
        let driver = Arc::new(MockDriver::failing());
        let c = controller(&driver);
        let _ = c.execute(Intent::Forward).await;
        let outcome = c.execute(Intent::Backward).await;
        assert_eq!(outcome.admission, Admission::RateLimited);
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_is_reported() {
        let driver = Arc::new(MockDriver::new().with_delay(Duration::from_secs(10)));
        let c = controller(&driver);
        let outcome = c.execute(Intent::Right).await;
        assert_eq!(outcome.error, Some(ActuationError::Timeout(Duration::from_secs(3))));
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_command_is_busy() {
        let driver = Arc::new(MockDriver::new().with_delay(Duration::from_secs(1)));
        let c = Arc::new(controller(&driver));

        let first = {
            let c = Arc::clone(&c);
            tokio::spawn(async move { c.execute(Intent::Forward).await })
        };
        tokio::task::yield_now().await;

        let outcome = c.execute(Intent::Left).await;
        assert_eq!(outcome.admission, Admission::Busy);
        assert!(outcome.success());

        let first = first.await.unwrap();
        assert_eq!(first.admission, Admission::Admit);
        assert_eq!(driver.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn raw_speeds_skip_dedup_but_respect_cooldown() {
        let driver = Arc::new(MockDriver::new());
        let c = controller(&driver);
        let wheels = WheelCommand::new(500, -500);

        assert_eq!(c.execute_raw(wheels).await.admission, Admission::Admit);
        assert_eq!(c.execute_raw(wheels).await.admission, Admission::RateLimited);
        tokio::time::advance(COOLDOWN).await;
        assert_eq!(c.execute_raw(wheels).await.admission, Admission::Admit);
        assert_eq!(driver.wheel_calls(), vec![wheels, wheels]);
    }

    #[tokio::test(start_paused = true)]
    async fn raw_speeds_clear_intent_cache() {
        let driver = Arc::new(MockDriver::new());
        let c = controller(&driver);
        let _ = c.execute(Intent::Stop).await;
        tokio::time::advance(COOLDOWN).await;
        let _ = c.execute_raw(WheelCommand::new(100, 100)).await;
        tokio::time::advance(COOLDOWN).await;
        let outcome = c.execute(Intent::Stop).await;
        assert_eq!(outcome.admission, Admission::Admit);
    }

    #[tokio::test(start_paused = true)]
    async fn halted_dispatcher_reports_halted() {
        let driver = Arc::new(MockDriver::new());
        let c = controller(&driver);
        c.dispatcher().claim().await.halt();
        let outcome = c.execute(Intent::Forward).await;
        assert_eq!(outcome.error, Some(ActuationError::Halted));
        assert_eq!(driver.call_count(), 0);
    }
}
