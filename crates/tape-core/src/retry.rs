//! Pure retry schedules shared by frame acquisition and socket
//! reconnect. The schedule only computes delays; callers own the
//! actual sleeping so this crate stays runtime-free.

use std::time::Duration;

/// Delay policy between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Same delay every attempt.
    Fixed(Duration),
    /// Delay doubles each attempt, capped at `max`.
    Exponential { base: Duration, max: Duration },
}

/// A bounded retry schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetrySchedule {
    pub max_attempts: u32,
    pub backoff: Backoff,
}

impl RetrySchedule {
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            backoff: Backoff::Fixed(delay),
        }
    }

    pub fn exponential(max_attempts: u32, base: Duration, max: Duration) -> Self {
        Self {
            max_attempts,
            backoff: Backoff::Exponential { base, max },
        }
    }

    /// Delay to wait before retry number `attempt` (1-based: the delay
    /// after the first failure is `delay_for(1)`).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        match self.backoff {
            Backoff::Fixed(delay) => delay,
            Backoff::Exponential { base, max } => {
                let exp = attempt.saturating_sub(1).min(31);
                let factor = 1u32 << exp;
                base.checked_mul(factor).unwrap_or(max).min(max)
            }
        }
    }

    /// True once `attempt` failures have used up the schedule.
    pub fn is_exhausted(&self, attempt: u32) -> bool {
        attempt >= self.max_attempts
    }
}
