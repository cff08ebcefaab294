//! Named rate-limit policies and their registry.
//!
//! A policy is a small value object: quota, window, and where its bucket key
//! comes from. The registry maps names to policies and refuses duplicates;
//! once handed to a [`RateLimiter`](crate::RateLimiter) it is never mutated.
use crate::{ThrottleError, ThrottleResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

/// Where a policy takes its bucket key from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeySource {
    /// Authenticated principal when present, otherwise the client address.
    IdentityOrAddress,
    /// Client address, even for authenticated callers.
    Address,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Policy {
    name: String,
    max_requests: u32,
    window: Duration,
    key_source: KeySource,
}

impl Policy {
    pub fn new(
        name: impl Into<String>,
        max_requests: u32,
        window_seconds: u64,
        key_source: KeySource,
    ) -> ThrottleResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ThrottleError::EmptyPolicyName);
        }
        if max_requests == 0 {
            return Err(ThrottleError::ZeroQuota(name));
        }
        if window_seconds == 0 {
            return Err(ThrottleError::ZeroWindow(name));
        }
        Ok(Self {
            name,
            max_requests,
            window: Duration::from_secs(window_seconds),
            key_source,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn key_source(&self) -> KeySource {
        self.key_source
    }

    fn with_override(&self, patch: &PolicyOverride) -> ThrottleResult<Self> {
        Policy::new(
            self.name.clone(),
            patch.max_requests.unwrap_or(self.max_requests),
            patch.window_seconds.unwrap_or(self.window.as_secs()),
            patch.key_source.unwrap_or(self.key_source),
        )
    }
}

/// Operator-supplied adjustment of a registered policy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyOverride {
    pub max_requests: Option<u32>,
    pub window_seconds: Option<u64>,
    pub key_source: Option<KeySource>,
}

#[derive(Debug, Clone, Default)]
pub struct PolicyRegistry {
    policies: HashMap<String, Policy>,
}

impl PolicyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, policy: Policy) -> ThrottleResult<()> {
        if self.policies.contains_key(policy.name()) {
            return Err(ThrottleError::DuplicatePolicy(policy.name().to_string()));
        }
        self.policies.insert(policy.name().to_string(), policy);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Policy> {
        self.policies.get(name)
    }

    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }

    /// Policy names in lexical order.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.policies.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Build a new registry with `overrides` applied.
    ///
    /// Every override must name a registered policy, and the adjusted policy
    /// must still satisfy the quota/window invariants.
    pub fn with_overrides(
        &self,
        overrides: &BTreeMap<String, PolicyOverride>,
    ) -> ThrottleResult<Self> {
        let mut policies = self.policies.clone();
        for (name, patch) in overrides {
            let current = policies
                .get(name)
                .ok_or_else(|| ThrottleError::UnknownPolicy(name.clone()))?;
            let adjusted = current.with_override(patch)?;
            policies.insert(name.clone(), adjusted);
        }
        Ok(Self { policies })
    }
}
