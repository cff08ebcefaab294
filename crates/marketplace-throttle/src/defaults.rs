use crate::{KeySource, Policy, PolicyRegistry};

/// Window shared by every built-in marketplace policy, in seconds.
pub const DEFAULT_WINDOW: u64 = 60;

const MARKETPLACE_POLICIES: [(&str, u32, KeySource); 9] = [
    ("api", 60, KeySource::IdentityOrAddress),
    ("auth", 10, KeySource::Address),
    ("otp", 3, KeySource::Address),
    ("sensitive", 5, KeySource::Address),
    ("orders", 10, KeySource::IdentityOrAddress),
    ("content", 5, KeySource::IdentityOrAddress),
    ("refunds", 5, KeySource::IdentityOrAddress),
    ("uploads", 10, KeySource::IdentityOrAddress),
    ("search", 30, KeySource::Address),
];

/// Registry holding the per-minute policies every marketplace endpoint class uses.
pub fn marketplace_policies() -> PolicyRegistry {
    let mut registry = PolicyRegistry::new();
    for (name, max_requests, key_source) in MARKETPLACE_POLICIES {
        let policy = Policy::new(name, max_requests, DEFAULT_WINDOW, key_source)
            .expect("built-in policies have non-zero quotas");
        registry
            .register(policy)
            .expect("built-in policy names are unique");
    }
    registry
}
