//! Fixed-window policy enforcement.
use crate::clock::{Clock, SystemClock};
use crate::store::{BucketKey, CounterStore, InMemoryCounterStore};
use crate::{Identity, PolicyRegistry, ThrottleError, ThrottleResult};
use std::sync::Arc;
use std::time::Duration;

/// Admission decision for one request under one policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow {
        limit: u32,
        remaining: u32,
        resets_in_secs: u64,
    },
    Reject {
        limit: u32,
        retry_after_secs: u64,
    },
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow { .. })
    }

    pub fn limit(&self) -> u32 {
        match self {
            Decision::Allow { limit, .. } | Decision::Reject { limit, .. } => *limit,
        }
    }

    /// Requests still admitted in the current window.
    pub fn remaining(&self) -> u32 {
        match self {
            Decision::Allow { remaining, .. } => *remaining,
            Decision::Reject { .. } => 0,
        }
    }

    /// Turn a rejection into [`ThrottleError::RateLimitExceeded`].
    pub fn into_result(self, policy: &str) -> ThrottleResult<Decision> {
        match self {
            Decision::Allow { .. } => Ok(self),
            Decision::Reject {
                limit,
                retry_after_secs,
            } => Err(ThrottleError::RateLimitExceeded {
                policy: policy.to_string(),
                limit,
                retry_after_secs,
            }),
        }
    }
}

/// Policy engine: immutable registry plus injected counter store and clock.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    policies: Arc<PolicyRegistry>,
    store: Arc<dyn CounterStore>,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    pub fn new(
        policies: PolicyRegistry,
        store: Arc<dyn CounterStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            policies: Arc::new(policies),
            store,
            clock,
        }
    }

    /// Limiter backed by an in-process store and the system clock.
    pub fn in_memory(policies: PolicyRegistry) -> Self {
        Self::new(
            policies,
            Arc::new(InMemoryCounterStore::new()),
            Arc::new(SystemClock),
        )
    }

    pub fn policies(&self) -> &PolicyRegistry {
        &self.policies
    }

    /// Count one request from `identity` against `policy_name`.
    ///
    /// The hit is recorded whether or not it is admitted.
    ///
    /// # Errors
    /// - [`ThrottleError::UnknownPolicy`] when no policy has that name.
    pub fn check(&self, policy_name: &str, identity: &Identity) -> ThrottleResult<Decision> {
        let policy = self
            .policies
            .get(policy_name)
            .ok_or_else(|| ThrottleError::UnknownPolicy(policy_name.to_string()))?;
        let key = BucketKey::new(policy.name(), identity.key_for(policy.key_source()));
        let hit = self.store.hit(key, policy.window(), self.clock.now());
        let limit = policy.max_requests();

        let decision = if hit.count > limit {
            let retry_after_secs = ceil_secs(hit.resets_in).max(1);
            tracing::debug!(
                policy = policy.name(),
                key = %identity.key_for(policy.key_source()),
                count = hit.count,
                retry_after_secs,
                "rate limit exceeded"
            );
            Decision::Reject {
                limit,
                retry_after_secs,
            }
        } else {
            Decision::Allow {
                limit,
                remaining: limit - hit.count,
                resets_in_secs: ceil_secs(hit.resets_in),
            }
        };

        let outcome = if decision.is_allowed() {
            "allowed"
        } else {
            "rejected"
        };
        metrics::counter!(
            "marketplace_rate_limit_decisions_total",
            "policy" => policy.name().to_string(),
            "outcome" => outcome
        )
        .increment(1);
        Ok(decision)
    }

    /// Like [`RateLimiter::check`], with a rejection reported as
    /// [`ThrottleError::RateLimitExceeded`].
    pub fn admit(&self, policy_name: &str, identity: &Identity) -> ThrottleResult<Decision> {
        self.check(policy_name, identity)?.into_result(policy_name)
    }

    /// Drop buckets whose window has ended.
    pub fn purge_expired(&self) -> usize {
        self.store.purge_expired(self.clock.now())
    }
}

fn ceil_secs(duration: Duration) -> u64 {
    let whole = duration.as_secs();
    if duration.subsec_nanos() > 0 {
        whole + 1
    } else {
        whole
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::{KeySource, Policy, marketplace_policies};

    fn limiter_with_clock() -> (RateLimiter, ManualClock) {
        let clock = ManualClock::default();
        let limiter = RateLimiter::new(
            marketplace_policies(),
            Arc::new(InMemoryCounterStore::new()),
            Arc::new(clock.clone()),
        );
        (limiter, clock)
    }

    #[test]
    fn request_over_quota_is_rejected() {
        let (limiter, _clock) = limiter_with_clock();
        let caller = Identity::authenticated(7, "10.0.0.7");
        for n in 1..=5 {
            let decision = limiter.check("content", &caller).expect("check");
            assert_eq!(
                decision,
                Decision::Allow {
                    limit: 5,
                    remaining: 5 - n,
                    resets_in_secs: 60
                }
            );
        }
        let sixth = limiter.check("content", &caller).expect("check");
        assert_eq!(
            sixth,
            Decision::Reject {
                limit: 5,
                retry_after_secs: 60
            }
        );
    }

    #[test]
    fn window_reset_readmits_caller() {
        let (limiter, clock) = limiter_with_clock();
        let caller = Identity::anonymous("198.51.100.4");
        for _ in 0..3 {
            assert!(limiter.check("otp", &caller).expect("check").is_allowed());
        }
        clock.advance(Duration::from_secs(15));
        assert_eq!(
            limiter.check("otp", &caller).expect("check"),
            Decision::Reject {
                limit: 3,
                retry_after_secs: 45
            }
        );
        clock.advance(Duration::from_secs(45));
        assert!(limiter.check("otp", &caller).expect("check").is_allowed());
    }

    #[test]
    fn rejected_hits_still_count_until_window_ends() {
        let (limiter, clock) = limiter_with_clock();
        let caller = Identity::anonymous("198.51.100.5");
        for _ in 0..10 {
            let _ = limiter.check("otp", &caller).expect("check");
        }
        clock.advance(Duration::from_millis(59_500));
        assert_eq!(
            limiter.check("otp", &caller).expect("check"),
            Decision::Reject {
                limit: 3,
                retry_after_secs: 1
            }
        );
    }

    #[test]
    fn address_policies_ignore_authentication() {
        let (limiter, _clock) = limiter_with_clock();
        let alice = Identity::authenticated(1, "192.0.2.1");
        let bob = Identity::authenticated(2, "192.0.2.1");
        for _ in 0..3 {
            assert!(limiter.check("otp", &alice).expect("check").is_allowed());
        }
        assert!(!limiter.check("otp", &bob).expect("check").is_allowed());

        for _ in 0..5 {
            assert!(limiter.check("content", &alice).expect("check").is_allowed());
        }
        assert!(limiter.check("content", &bob).expect("check").is_allowed());
    }

    #[test]
    fn policies_count_independently() {
        let (limiter, _clock) = limiter_with_clock();
        let caller = Identity::anonymous("192.0.2.9");
        for _ in 0..3 {
            limiter.check("otp", &caller).expect("check");
        }
        assert!(limiter.check("auth", &caller).expect("check").is_allowed());
    }

    #[test]
    fn unknown_policy_is_an_error() {
        let (limiter, _clock) = limiter_with_clock();
        let err = limiter
            .check("nope", &Identity::anonymous("192.0.2.1"))
            .expect_err("unknown");
        assert_eq!(err, ThrottleError::UnknownPolicy("nope".to_string()));
    }

    #[test]
    fn into_result_maps_rejection() {
        let reject = Decision::Reject {
            limit: 5,
            retry_after_secs: 9,
        };
        assert_eq!(
            reject.into_result("content"),
            Err(ThrottleError::RateLimitExceeded {
                policy: "content".to_string(),
                limit: 5,
                retry_after_secs: 9
            })
        );
        assert_eq!(reject.remaining(), 0);
    }

    #[test]
    fn admit_reports_rejection_as_error() {
        let (limiter, _clock) = limiter_with_clock();
        let caller = Identity::anonymous("198.51.100.7");
        for n in 1..=3u32 {
            let decision = limiter.admit("otp", &caller).expect("admitted");
            assert_eq!(decision.remaining(), 3 - n);
        }
        assert_eq!(
            limiter.admit("otp", &caller),
            Err(ThrottleError::RateLimitExceeded {
                policy: "otp".to_string(),
                limit: 3,
                retry_after_secs: 60
            })
        );
        assert_eq!(
            limiter.admit("nope", &caller),
            Err(ThrottleError::UnknownPolicy("nope".to_string()))
        );
    }

    #[test]
    fn purge_uses_limiter_clock() {
        let (limiter, clock) = limiter_with_clock();
        limiter
            .check("api", &Identity::anonymous("192.0.2.1"))
            .expect("check");
        assert_eq!(limiter.purge_expired(), 0);
        clock.advance(Duration::from_secs(60));
        assert_eq!(limiter.purge_expired(), 1);
    }

    #[test]
    fn concurrent_callers_cannot_exceed_quota() {
        let mut registry = PolicyRegistry::new();
        registry
            .register(Policy::new("burst", 50, 60, KeySource::IdentityOrAddress).expect("policy"))
            .expect("register");
        let limiter = RateLimiter::in_memory(registry);
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let limiter = limiter.clone();
                std::thread::spawn(move || {
                    let caller = Identity::authenticated(1, "192.0.2.1");
                    (0..20)
                        .filter(|_| limiter.check("burst", &caller).expect("check").is_allowed())
                        .count()
                })
            })
            .collect();
        let admitted: usize = handles
            .into_iter()
            .map(|handle| handle.join().expect("join"))
            .sum();
        assert_eq!(admitted, 50);
    }
}
