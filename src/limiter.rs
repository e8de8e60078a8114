use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::policy::Policy;
use crate::store::BucketStore;

/// How many `allow` calls between amortized idle sweeps.
const SWEEP_EVERY: u64 = 1024;

/// Outcome of one admission check.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Decision {
    pub admitted: bool,
    /// Bucket capacity, echoed for response headers.
    pub limit: f64,
    /// Tokens left in the bucket after this call.
    pub remaining: f64,
    /// Seconds until at least one more token is available. Only meaningful on
    /// rejection.
    pub retry_after_secs: u64,
}

/// Per-key token-bucket admission controller.
///
/// Cheap to clone; clones share buckets. Separate instances own their state
/// outright and never interfere with each other.
#[derive(Clone)]
pub struct RateLimiter {
    inner: Arc<Inner>,
}

struct Inner {
    policy: Policy,
    store: BucketStore,
    idle_ttl: Duration,
    calls: AtomicU64,
}

impl RateLimiter {
    /// Builds a limiter with the default idle TTL of four refill periods,
    /// long enough that eviction only ever hits genuinely idle keys.
    pub fn new(policy: Policy) -> Self {
        Self::with_idle_ttl(policy, policy.refill_period() * 4)
    }

    pub fn with_idle_ttl(policy: Policy, idle_ttl: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                policy,
                store: BucketStore::new(),
                idle_ttl,
                calls: AtomicU64::new(0),
            }),
        }
    }

    /// Decides whether to admit one request for `key`. Non-blocking beyond
    /// the per-key critical section; always terminates.
    pub fn allow(&self, key: &str) -> Decision {
        let decision = self.allow_at(key, Instant::now());
        self.maybe_sweep();
        decision
    }

    /// Admission check at an explicit instant, for callers that drive time
    /// themselves. Refill and consume run under the bucket's guard, so calls
    /// for one key behave as if executed in some total order.
    pub fn allow_at(&self, key: &str, now: Instant) -> Decision {
        let policy = &self.inner.policy;
        let (admitted, remaining) = self.inner.store.with_bucket(key, policy, now, |bucket| {
            bucket.refill(policy, now);
            let admitted = bucket.try_consume();
            (admitted, bucket.tokens())
        });

        debug!(key, admitted, remaining, "admission decision");
        Decision {
            admitted,
            limit: policy.capacity(),
            remaining,
            retry_after_secs: policy.retry_after_secs(),
        }
    }

    /// One eviction pass over the store; returns how many buckets were
    /// dropped. Also runs amortized from `allow` every `SWEEP_EVERY` calls.
    pub fn sweep_idle(&self) -> usize {
        self.inner.store.sweep_idle(self.inner.idle_ttl, Instant::now())
    }

    /// Runs `sweep_idle` on a fixed interval for deployments where traffic is
    /// too bursty for the amortized sweep to keep up. The task holds a clone
    /// of the limiter; abort the handle to stop it.
    pub fn spawn_sweeper(&self, interval: Duration) -> JoinHandle<()> {
        let limiter = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // Skip the immediate first tick.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let removed = limiter.sweep_idle();
                if removed > 0 {
                    info!(removed, tracked = limiter.tracked_keys(), "idle bucket sweep");
                }
            }
        })
    }

    pub fn policy(&self) -> &Policy {
        &self.inner.policy
    }

    /// Number of keys currently holding bucket state.
    pub fn tracked_keys(&self) -> usize {
        self.inner.store.len()
    }

    fn maybe_sweep(&self) {
        let calls = self.inner.calls.fetch_add(1, Ordering::Relaxed) + 1;
        if calls % SWEEP_EVERY == 0 {
            self.sweep_idle();
        }
    }
}
