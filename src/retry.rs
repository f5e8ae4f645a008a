//! Bounded retry policies for the fetch and publish stages.
//!
//! The two stages carry independent policies with different backoff shapes:
//! the fetcher waits `base_delay * (attempt + 1)` (linear) and the publisher
//! waits `base_delay * 2^attempt` (exponential). They stay separate types of
//! the same struct rather than one generic helper so the shapes and their
//! exhaustion behaviors (raise vs. return false) remain independently
//! configurable and testable.

use std::time::Duration;

/// Delay growth shape between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// `base_delay * (attempt + 1)` — used by the fetcher.
    Linear,
    /// `base_delay * 2^attempt` — used by the publisher for connection
    /// failures. Its channel/unknown failures wait the plain base delay.
    Exponential,
}

/// Immutable retry policy, constructed once at startup and reused across
/// all cycles.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub backoff: Backoff,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, backoff: Backoff) -> Self {
        Self {
            max_attempts,
            base_delay,
            backoff,
        }
    }

    /// Delay to wait after failing `attempt` (0-indexed) before the next try.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        match self.backoff {
            Backoff::Linear => self.base_delay * (attempt + 1),
            Backoff::Exponential => self.base_delay * 2u32.saturating_pow(attempt),
        }
    }

    /// True when `attempt` (0-indexed) is the final allowed attempt.
    pub fn is_last_attempt(&self, attempt: u32) -> bool {
        attempt + 1 >= self.max_attempts
    }
}
