//! Counter storage for rate-limit buckets.
//!
//! Buckets are created on first hit, restarted when their window has ended,
//! and otherwise left alone; [`CounterStore::purge_expired`] lets a
//! background task drop buckets nobody has touched since their window closed.
use dashmap::DashMap;
use std::fmt::Debug;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BucketKey {
    pub policy: String,
    pub key: String,
}

impl BucketKey {
    pub fn new(policy: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            policy: policy.into(),
            key: key.into(),
        }
    }
}

/// Bucket state observed by the hit that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hit {
    /// Requests counted in the current window, including this one.
    pub count: u32,
    /// Time left until the window ends.
    pub resets_in: Duration,
}

/// Port for bucket storage.
///
/// `hit` must be atomic per key: the window check, the optional reset and
/// the increment happen as one step so concurrent hits are all counted.
pub trait CounterStore: Send + Sync + Debug {
    fn hit(&self, key: BucketKey, window: Duration, now: Instant) -> Hit;

    /// Drop buckets whose window ended at or before `now`; returns how many.
    fn purge_expired(&self, now: Instant) -> usize;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Copy)]
struct Bucket {
    count: u32,
    window_end: Instant,
}

/// Sharded in-process store. Each `hit` holds the shard's write lock for the
/// duration of the entry update.
#[derive(Debug, Default)]
pub struct InMemoryCounterStore {
    buckets: DashMap<BucketKey, Bucket>,
}

impl InMemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CounterStore for InMemoryCounterStore {
    fn hit(&self, key: BucketKey, window: Duration, now: Instant) -> Hit {
        let mut bucket = self.buckets.entry(key).or_insert(Bucket {
            count: 0,
            window_end: now + window,
        });
        if now >= bucket.window_end {
            bucket.count = 0;
            bucket.window_end = now + window;
        }
        bucket.count = bucket.count.saturating_add(1);
        Hit {
            count: bucket.count,
            resets_in: bucket.window_end.saturating_duration_since(now),
        }
    }

    fn purge_expired(&self, now: Instant) -> usize {
        let before = self.buckets.len();
        self.buckets.retain(|_, bucket| bucket.window_end > now);
        before.saturating_sub(self.buckets.len())
    }

    fn len(&self) -> usize {
        self.buckets.len()
    }
}
