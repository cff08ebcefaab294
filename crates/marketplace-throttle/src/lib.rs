//! Fixed-window rate limiting for marketplace HTTP services.
//!
//! # Purpose
//! Holds an immutable registry of named policies and an injected counter
//! store, and answers "may this caller make one more request under policy
//! X?" before a handler runs.
//!
//! # Architecture
//!
//! ```text
//!   Identity ──► resolve key ──► RateLimiter::check(policy)
//!                                     │
//!                   PolicyRegistry ◄──┤
//!                                     ▼
//!                              CounterStore::hit   (atomic per bucket)
//!                                     │
//!                                     ▼
//!                          Decision::Allow / Reject
//! ```
//!
//! # Key invariants
//! - Policies have `max_requests > 0` and a non-zero window, and names are
//!   unique within a registry.
//! - A bucket is keyed by `(policy, key)`; check-and-increment is a single
//!   operation under the bucket's shard lock, so concurrent callers cannot
//!   jointly exceed a quota.
//! - Windows are fixed. A rejected hit still counts; only elapsed time
//!   resets a bucket.
//!
//! # Example
//! ```rust
//! use marketplace_throttle::{Decision, Identity, RateLimiter, marketplace_policies};
//!
//! let limiter = RateLimiter::in_memory(marketplace_policies());
//! let caller = Identity::anonymous("203.0.113.9");
//! for _ in 0..3 {
//!     assert!(matches!(limiter.check("otp", &caller), Ok(Decision::Allow { .. })));
//! }
//! assert!(matches!(limiter.check("otp", &caller), Ok(Decision::Reject { .. })));
//! ```

mod clock;
mod defaults;
mod errors;
mod identity;
mod limiter;
mod policy;
mod store;

pub use clock::{Clock, SystemClock};
#[cfg(any(test, feature = "test-helpers"))]
pub use clock::ManualClock;
pub use defaults::{DEFAULT_WINDOW, marketplace_policies};
pub use errors::{ThrottleError, ThrottleResult};
pub use identity::{Identity, UNKNOWN_ADDRESS};
pub use limiter::{Decision, RateLimiter};
pub use policy::{KeySource, Policy, PolicyOverride, PolicyRegistry};
pub use store::{BucketKey, CounterStore, Hit, InMemoryCounterStore};
