//! Caller identity and rate-limit key resolution.
//!
//! # Key invariants
//! - A resolved key is never empty: an authenticated caller resolves to
//!   `user:{id}`, everyone else to `ip:{address}`, and a blank address is
//!   replaced with [`UNKNOWN_ADDRESS`].
use crate::KeySource;

/// Address used when the transport did not report a peer.
pub const UNKNOWN_ADDRESS: &str = "unknown";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: Option<u64>,
    pub address: String,
}

impl Identity {
    pub fn new(user_id: Option<u64>, address: impl Into<String>) -> Self {
        let address = address.into();
        let address = if address.trim().is_empty() {
            UNKNOWN_ADDRESS.to_string()
        } else {
            address
        };
        Self { user_id, address }
    }

    pub fn anonymous(address: impl Into<String>) -> Self {
        Self::new(None, address)
    }

    pub fn authenticated(user_id: u64, address: impl Into<String>) -> Self {
        Self::new(Some(user_id), address)
    }

    /// Stable key for this caller: the principal if present, else the address.
    pub fn resolve(&self) -> String {
        match self.user_id {
            Some(id) => format!("user:{id}"),
            None => self.address_key(),
        }
    }

    /// Key for policies that count by network address only.
    pub fn address_key(&self) -> String {
        if self.address.is_empty() {
            format!("ip:{UNKNOWN_ADDRESS}")
        } else {
            format!("ip:{}", self.address)
        }
    }

    pub fn key_for(&self, source: KeySource) -> String {
        match source {
            KeySource::IdentityOrAddress => self.resolve(),
            KeySource::Address => self.address_key(),
        }
    }
}
