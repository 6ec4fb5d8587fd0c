//! Backoff schedules shared by the OCR and summarization retry loops.

use std::time::Duration;

/// How the wait between attempts grows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// `base * attempt` before attempt `attempt` (0-indexed); nothing before the first.
    Linear(Duration),
    /// `base * 2^attempt` after failed attempt `attempt` (0-indexed).
    Exponential(Duration),
}

/// Attempt budget paired with a backoff schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Values below one are treated as one.
    pub max_attempts: u32,
    /// Schedule used to space attempts.
    pub backoff: Backoff,
}

impl RetryPolicy {
    /// Linear policy used for OCR.
    pub const fn linear(max_attempts: u32, base: Duration) -> Self {
        Self {
            max_attempts,
            backoff: Backoff::Linear(base),
        }
    }

    /// Exponential policy used for summarization providers.
    pub const fn exponential(max_attempts: u32, base: Duration) -> Self {
        Self {
            max_attempts,
            backoff: Backoff::Exponential(base),
        }
    }

    /// Number of attempts actually made.
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Delay to wait after `failed_attempt` (0-indexed) fails, or `None` when the budget is spent.
    pub fn delay_after(&self, failed_attempt: u32) -> Option<Duration> {
        let next = failed_attempt + 1;
        if next >= self.attempts() {
            return None;
        }
        Some(match self.backoff {
            Backoff::Linear(base) => base.saturating_mul(next),
            Backoff::Exponential(base) => {
                base.saturating_mul(2u32.saturating_pow(failed_attempt))
            }
        })
    }
}
