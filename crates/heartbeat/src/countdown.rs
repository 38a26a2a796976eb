//! Local idle countdown. Driven by caller ticks on the UI loop; emits each
//! signal at most once per activity window and stops entirely once
//! cancelled (unmount) so no orphaned timer fires after logout.

use chrono::{DateTime, Utc};

/// Signals the countdown hands back to the UI layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownSignal {
    /// The warning threshold was crossed; show the extend-session prompt.
    WarnExpiring { remaining_seconds: u64 },
    /// The full budget elapsed locally; log out without waiting for the
    /// server to confirm.
    Expired,
}

pub struct IdleCountdown {
    budget_secs: i64,
    warning_secs: i64,
    last_activity: DateTime<Utc>,
    warned: bool,
    expired: bool,
    cancelled: bool,
}

impl IdleCountdown {
    pub fn new(budget_minutes: i64, warning_minutes: i64, now: DateTime<Utc>) -> Self {
        Self {
            budget_secs: budget_minutes * 60,
            warning_secs: warning_minutes * 60,
            last_activity: now,
            warned: false,
            expired: false,
            cancelled: false,
        }
    }

    /// Reset the idle window. Any pending warning state is cleared.
    pub fn record_activity(&mut self, now: DateTime<Utc>) {
        self.last_activity = now;
        self.warned = false;
        self.expired = false;
    }

    /// Advance the countdown. Same strict boundary as the server: exactly
    /// at the budget is not yet expired.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Option<CountdownSignal> {
        if self.cancelled || self.expired {
            return None;
        }

        let elapsed = now.signed_duration_since(self.last_activity).num_seconds();
        let remaining = (self.budget_secs - elapsed).max(0) as u64;

        if elapsed > self.budget_secs {
            self.expired = true;
            return Some(CountdownSignal::Expired);
        }

        if !self.warned && remaining <= self.warning_secs.max(0) as u64 {
            self.warned = true;
            return Some(CountdownSignal::WarnExpiring {
                remaining_seconds: remaining,
            });
        }

        None
    }

    /// Tear the countdown down; no signal fires afterwards.
    pub fn cancel(&mut self) {
        self.cancelled = true;
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    pub fn remaining_seconds(&self, now: DateTime<Utc>) -> u64 {
        let elapsed = now.signed_duration_since(self.last_activity).num_seconds();
        (self.budget_secs - elapsed).max(0) as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_warning_fires_once_per_window() {
        let start = Utc::now();
        let mut countdown = IdleCountdown::new(60, 5, start);

        assert_eq!(countdown.tick(start + Duration::minutes(30)), None);

        let at_warning = start + Duration::minutes(56);
        assert_eq!(
            countdown.tick(at_warning),
            Some(CountdownSignal::WarnExpiring {
                remaining_seconds: 4 * 60
            })
        );
        // Still in the warning window: no repeat.
        assert_eq!(countdown.tick(start + Duration::minutes(57)), None);
    }

    #[test]
    fn test_activity_resets_warning() {
        let start = Utc::now();
        let mut countdown = IdleCountdown::new(60, 5, start);

        assert!(countdown.tick(start + Duration::minutes(56)).is_some());
        countdown.record_activity(start + Duration::minutes(57));
        assert_eq!(countdown.tick(start + Duration::minutes(58)), None);

        // A full new window later the warning fires again.
        let warn_at = start + Duration::minutes(57) + Duration::minutes(56);
        assert!(matches!(
            countdown.tick(warn_at),
            Some(CountdownSignal::WarnExpiring { .. })
        ));
    }

    #[test]
    fn test_expiry_strict_boundary_and_once() {
        let start = Utc::now();
        let mut countdown = IdleCountdown::new(60, 5, start);

        // Exactly at the budget: not expired (warning already consumed).
        countdown.tick(start + Duration::minutes(56));
        assert_eq!(countdown.tick(start + Duration::minutes(60)), None);

        assert_eq!(
            countdown.tick(start + Duration::minutes(60) + Duration::seconds(1)),
            Some(CountdownSignal::Expired)
        );
        // Expired fires once.
        assert_eq!(countdown.tick(start + Duration::minutes(62)), None);
    }

    #[test]
    fn test_cancel_silences_all_signals() {
        let start = Utc::now();
        let mut countdown = IdleCountdown::new(60, 5, start);
        countdown.cancel();

        assert!(countdown.is_cancelled());
        assert_eq!(countdown.tick(start + Duration::hours(3)), None);
    }

    #[test]
    fn test_remaining_seconds() {
        let start = Utc::now();
        let countdown = IdleCountdown::new(60, 5, start);
        assert_eq!(countdown.remaining_seconds(start + Duration::minutes(30)), 1800);
        assert_eq!(countdown.remaining_seconds(start + Duration::hours(2)), 0);
    }
}
