//! Minimum-interval gate and last-intent deduplication.
//!
//! The limiter is a plain state machine; callers own the clock and the lock.
//! Keeping the decision and the timestamp update in one `&mut self` call
//! makes them atomic under whatever mutex wraps the limiter.

use std::time::{Duration, Instant};

use serde::Serialize;

use crate::intent::Intent;

/// Decision for one incoming command.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Admission {
    /// Forward to the actuator.
    Admit,
    /// Inside the cooldown window; treated as a successful no-op.
    RateLimited,
    /// Same intent as the last admitted one; treated as a successful no-op.
    Duplicate,
    /// Another dispatch is in flight; treated as a successful no-op.
    Busy,
}

impl Admission {
    /// Whether the command proceeds to actuation.
    pub fn is_admitted(self) -> bool {
        self == Self::Admit
    }

    /// Metric label.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admit => "admit",
            Self::RateLimited => "rate_limited",
            Self::Duplicate => "duplicate",
            Self::Busy => "busy",
        }
    }
}

/// Cooldown clock plus last-issued-intent cache.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    cooldown: Duration,
    last_intent: Option<Intent>,
    last_admitted_at: Option<Instant>,
}

impl RateLimiter {
    /// Create a limiter with the given minimum interval between admissions.
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            last_intent: None,
            last_admitted_at: None,
        }
    }

    /// Configured cooldown.
    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// Last admitted intent, if any.
    pub fn last_intent(&self) -> Option<Intent> {
        self.last_intent
    }

    /// Decide whether `intent` may be actuated at `now`.
    ///
    /// The cooldown is checked before deduplication, so a repeated intent
    /// inside the window reports `RateLimited`.
    pub fn admit(&mut self, intent: Intent, now: Instant) -> Admission {
        if self.in_cooldown(now) {
            return Admission::RateLimited;
        }
        if self.last_intent == Some(intent) {
            return Admission::Duplicate;
        }
        self.last_intent = Some(intent);
        self.last_admitted_at = Some(now);
        Admission::Admit
    }

    /// Decide whether explicit wheel speeds may be actuated at `now`.
    ///
    /// Raw speeds skip deduplication but still consume the cooldown. An
    /// admitted raw command clears the intent cache, since the wheels are no
    /// longer in any intent's steady state.
    pub fn admit_raw(&mut self, now: Instant) -> Admission {
        if self.in_cooldown(now) {
            return Admission::RateLimited;
        }
        self.last_intent = None;
        self.last_admitted_at = Some(now);
        Admission::Admit
    }

    /// Drop the cached intent after a failed actuation; the timestamp stays.
    pub fn forget_last(&mut self) {
        self.last_intent = None;
    }

    fn in_cooldown(&self, now: Instant) -> bool {
        self.last_admitted_at
            .is_some_and(|at| now.saturating_duration_since(at) < self.cooldown)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COOLDOWN: Duration = Duration::from_millis(200);

    fn limiter() -> (RateLimiter, Instant) {
        (RateLimiter::new(COOLDOWN), Instant::now())
    }

    #[test]
    fn first_command_is_admitted() {
        let (mut rl, t0) = limiter();
        assert_eq!(rl.admit(Intent::Forward, t0), Admission::Admit);
        assert_eq!(rl.last_intent(), Some(Intent::Forward));
    }

    #[test]
    fn second_command_inside_window_is_rate_limited() {
        let (mut rl, t0) = limiter();
        let _ = rl.admit(Intent::Forward, t0);
        let t1 = t0 + Duration::from_millis(50);
        assert_eq!(rl.admit(Intent::Left, t1), Admission::RateLimited);
        // state untouched
        assert_eq!(rl.last_intent(), Some(Intent::Forward));
    }

    #[test]
    fn same_intent_inside_window_is_rate_limited() {
        let (mut rl, t0) = limiter();
        let _ = rl.admit(Intent::Stop, t0);
        assert_eq!(
            rl.admit(Intent::Stop, t0 + Duration::from_millis(10)),
            Admission::RateLimited
        );
    }

    #[test]
    fn same_intent_after_window_is_duplicate() {
        let (mut rl, t0) = limiter();
        let _ = rl.admit(Intent::Forward, t0);
        assert_eq!(rl.admit(Intent::Forward, t0 + COOLDOWN), Admission::Duplicate);
    }

    #[test]
    fn duplicate_does_not_refresh_timestamp() {
        let (mut rl, t0) = limiter();
        let _ = rl.admit(Intent::Forward, t0);
        let _ = rl.admit(Intent::Forward, t0 + COOLDOWN);
        // still measured from t0, so a change at t0 + COOLDOWN is allowed
        assert_eq!(rl.admit(Intent::Left, t0 + COOLDOWN), Admission::Admit);
    }

    #[test]
    fn different_intent_after_window_is_admitted() {
        let (mut rl, t0) = limiter();
        let _ = rl.admit(Intent::Forward, t0);
        let t1 = t0 + Duration::from_millis(250);
        assert_eq!(rl.admit(Intent::Backward, t1), Admission::Admit);
        assert_eq!(rl.last_intent(), Some(Intent::Backward));
    }

    #[test]
    fn window_boundary_is_exclusive() {
        let (mut rl, t0) = limiter();
        let _ = rl.admit(Intent::Forward, t0);
        let just_before = t0 + COOLDOWN - Duration::from_millis(1);
        assert_eq!(rl.admit(Intent::Left, just_before), Admission::RateLimited);
        assert_eq!(rl.admit(Intent::Left, t0 + COOLDOWN), Admission::Admit);
    }

    #[test]
    fn raw_bypasses_dedup_but_not_cooldown() {
        let (mut rl, t0) = limiter();
        assert_eq!(rl.admit_raw(t0), Admission::Admit);
        assert_eq!(
            rl.admit_raw(t0 + Duration::from_millis(10)),
            Admission::RateLimited
        );
        assert_eq!(rl.admit_raw(t0 + COOLDOWN), Admission::Admit);
    }

    #[test]
    fn raw_clears_intent_cache() {
        let (mut rl, t0) = limiter();
        let _ = rl.admit(Intent::Forward, t0);
        let _ = rl.admit_raw(t0 + COOLDOWN);
        assert_eq!(rl.last_intent(), None);
        assert_eq!(
            rl.admit(Intent::Forward, t0 + COOLDOWN * 2),
            Admission::Admit
        );
    }

    #[test]
    fn raw_inside_window_keeps_cache() {
        let (mut rl, t0) = limiter();
        let _ = rl.admit(Intent::Left, t0);
        let _ = rl.admit_raw(t0 + Duration::from_millis(1));
        assert_eq!(rl.last_intent(), Some(Intent::Left));
    }

    #[test]
    fn forget_last_allows_retry_after_window() {
        let (mut rl, t0) = limiter();
        let _ = rl.admit(Intent::Forward, t0);
        rl.forget_last();
        assert_eq!(
            rl.admit(Intent::Forward, t0 + Duration::from_millis(10)),
            Admission::RateLimited
        );
        assert_eq!(rl.admit(Intent::Forward, t0 + COOLDOWN), Admission::Admit);
    }

    #[test]
    fn zero_cooldown_only_deduplicates() {
        let mut rl = RateLimiter::new(Duration::ZERO);
        let t0 = Instant::now();
        assert_eq!(rl.admit(Intent::Left, t0), Admission::Admit);
        assert_eq!(rl.admit(Intent::Left, t0), Admission::Duplicate);
        assert_eq!(rl.admit(Intent::Right, t0), Admission::Admit);
    }

    #[test]
    fn admission_labels() {
        assert!(Admission::Admit.is_admitted());
        assert!(!Admission::Duplicate.is_admitted());
        assert_eq!(Admission::RateLimited.as_str(), "rate_limited");
        assert_eq!(Admission::Busy.as_str(), "busy");
    }
}
