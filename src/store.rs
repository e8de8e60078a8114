use std::time::{Duration, Instant};

use dashmap::DashMap;
use tracing::debug;

use crate::bucket::Bucket;
use crate::policy::Policy;

/// Owns every bucket under one limiter instance. The map is the only shared
/// mutable structure; callers never hold bucket references across calls.
#[derive(Debug, Default)]
pub struct BucketStore {
    buckets: DashMap<String, Bucket>,
}

impl BucketStore {
    pub fn new() -> Self {
        Self {
            buckets: DashMap::new(),
        }
    }

    /// Runs `f` against the bucket for `key`, inserting a fresh full bucket
    /// first if the key is new. Insertion goes through the entry API, so
    /// concurrent creation for one key yields exactly one bucket. The entry
    /// guard is held for the duration of `f`: callers on the same key are
    /// serialized, keys on different shards do not contend.
    pub fn with_bucket<R>(
        &self,
        key: &str,
        policy: &Policy,
        now: Instant,
        f: impl FnOnce(&mut Bucket) -> R,
    ) -> R {
        let mut entry = self
            .buckets
            .entry(key.to_string())
            .or_insert_with(|| Bucket::full(policy, now));
        f(entry.value_mut())
    }

    /// Drops buckets idle for longer than `ttl`, returning how many were
    /// removed. `retain` holds the shard write lock, so a bucket that is
    /// concurrently being consulted is never reclaimed out from under the
    /// caller. An evicted key simply re-arrives later as a fresh full bucket.
    pub fn sweep_idle(&self, ttl: Duration, now: Instant) -> usize {
        let before = self.buckets.len();
        self.buckets
            .retain(|_, bucket| now.saturating_duration_since(bucket.last_refill()) <= ttl);
        let removed = before.saturating_sub(self.buckets.len());
        if removed > 0 {
            debug!(removed, tracked = self.buckets.len(), "evicted idle buckets");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}
