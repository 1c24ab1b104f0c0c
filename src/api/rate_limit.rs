//! Client-side view of the ClickUp rate limit.
//!
//! The API reports quota on every response through `X-RateLimit-Remaining`
//! and `X-RateLimit-Reset`. One [`RateLimiter`] is shared by every request a
//! client makes, so concurrent fan-out lookups see the same quota.

use std::sync::Mutex;
use std::thread;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::fanout::Deadline;

pub const REMAINING_HEADER: &str = "X-RateLimit-Remaining";
pub const RESET_HEADER: &str = "X-RateLimit-Reset";

/// Quota assumed before the first response arrives.
const INITIAL_REMAINING: i64 = 100;

/// Anything that exposes response headers by case-insensitive name.
pub trait HeaderSource {
    fn header(&self, name: &str) -> Option<&str>;
}

/// Snapshot of the limiter's state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateState {
    pub remaining: i64,
    pub reset_at: Option<SystemTime>,
}

impl Default for RateState {
    fn default() -> Self {
        Self {
            remaining: INITIAL_REMAINING,
            reset_at: None,
        }
    }
}

impl RateState {
    /// How long a request must wait before it may be sent.
    fn pause(&self) -> Duration {
        if self.remaining > 0 {
            return Duration::ZERO;
        }
        self.reset_at
            .and_then(|reset| reset.duration_since(SystemTime::now()).ok())
            .unwrap_or(Duration::ZERO)
    }
}

#[derive(Debug, Default)]
pub struct RateLimiter {
    state: Mutex<RateState>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(state: RateState) -> Self {
        Self {
            state: Mutex::new(RateState {
                remaining: state.remaining.max(0),
                ..state
            }),
        }
    }

    pub fn snapshot(&self) -> RateState {
        *self.lock()
    }

    /// Record the quota reported by a response. Missing or unparsable
    /// headers leave the previous value in place.
    pub fn update(&self, headers: &impl HeaderSource) {
        let remaining = headers
            .header(REMAINING_HEADER)
            .and_then(|v| v.trim().parse::<i64>().ok());
        let reset_at = headers
            .header(RESET_HEADER)
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(|secs| UNIX_EPOCH + Duration::from_secs(secs));

        let mut state = self.lock();
        if let Some(remaining) = remaining {
            state.remaining = remaining.max(0);
        }
        if let Some(reset_at) = reset_at {
            state.reset_at = Some(reset_at);
        }
        tracing::trace!(remaining = state.remaining, "rate limit updated");
    }

    /// Block while the quota is exhausted and the reset time is ahead.
    pub fn wait(&self) {
        self.wait_within(None);
    }

    /// Like [`wait`](Self::wait), but never sleeps past `deadline`.
    pub fn wait_within(&self, deadline: Option<Deadline>) {
        // Read under the lock, sleep without it.
        let mut pause = self.snapshot().pause();
        if let Some(deadline) = deadline {
            pause = pause.min(deadline.remaining());
        }
        if !pause.is_zero() {
            tracing::debug!(wait_ms = pause.as_millis() as u64, "rate limit exhausted, waiting for reset");
            thread::sleep(pause);
        }
    }

    pub fn should_retry(&self, status: u16) -> bool {
        status == 429
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RateState> {
        // The state is two plain values; a panic elsewhere cannot leave it torn.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
