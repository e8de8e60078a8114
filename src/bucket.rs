use std::time::Instant;

use crate::policy::Policy;

/// Per-key token count plus the instant the count was last brought forward.
///
/// Pure data and arithmetic; locking and key lookup live in the store.
#[derive(Debug, Clone)]
pub struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

impl Bucket {
    /// New buckets start full so a first-time client gets its burst allowance.
    pub fn full(policy: &Policy, now: Instant) -> Self {
        Self {
            tokens: policy.capacity(),
            last_refill: now,
        }
    }

    /// Brings `tokens` forward to `now`.
    ///
    /// `last_refill` advances unconditionally, even when the accrual is ~0 and
    /// even when the caller's consume attempt is about to fail. A stale anchor
    /// over-credits the next call; a denial path that skips time accounting
    /// starves an empty bucket forever.
    pub fn refill(&mut self, policy: &Policy, now: Instant) {
        // Instant is monotonic; saturating clamps any anomaly to zero elapsed.
        let elapsed = now.saturating_duration_since(self.last_refill);
        let added =
            elapsed.as_secs_f64() / policy.refill_period().as_secs_f64() * policy.refill_rate();
        self.tokens = (self.tokens + added).min(policy.capacity());
        self.last_refill = now;
    }

    /// Takes one token if at least one is available. Must run after `refill`
    /// for the same instant. On rejection the state set by the refill step
    /// stands; nothing is rolled back.
    pub fn try_consume(&mut self) -> bool {
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    pub fn tokens(&self) -> f64 {
        self.tokens
    }

    pub fn last_refill(&self) -> Instant {
        self.last_refill
    }
}
