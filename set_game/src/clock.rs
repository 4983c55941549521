//! Round countdown.

use std::time::Duration;

use tokio::time::Instant;

use crate::config::GameConfig;

/// Deadline of the current round.
///
/// Re-armed whenever the dealer deals a fresh table or a set is scored. The
/// clock itself never sleeps; the dealer bounds its waits by
/// [`RoundClock::remaining`].
#[derive(Debug, Clone, Copy)]
pub struct RoundClock {
    duration: Duration,
    warning: Duration,
    deadline: Instant,
}

impl RoundClock {
    pub fn new(duration: Duration, warning: Duration) -> Self {
        Self {
            duration,
            warning,
            deadline: Instant::now() + duration,
        }
    }

    pub fn from_config(config: &GameConfig) -> Self {
        Self::new(config.round_duration(), config.warning_threshold())
    }

    /// Start a full round from now
    pub fn reset(&mut self) {
        self.deadline = Instant::now() + self.duration;
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Time left, zero once expired
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.deadline
    }

    /// True once the remaining time drops to the warning threshold
    pub fn is_warning(&self) -> bool {
        self.remaining() <= self.warning
    }

    /// Remaining milliseconds and the warning flag, as the UI wants them
    pub fn countdown(&self) -> (u64, bool) {
        let millis = u64::try_from(self.remaining().as_millis()).unwrap_or(u64::MAX);
        (millis, self.is_warning())
    }
}
