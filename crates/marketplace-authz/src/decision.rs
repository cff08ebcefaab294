use crate::{AuthzError, Capability};

/// Outcome of an authorization check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
}

impl Decision {
    pub fn is_allowed(self) -> bool {
        matches!(self, Decision::Allow)
    }

    /// Convert a denial into [`AuthzError::Denied`] for `?` propagation.
    pub fn require(self, capability: Capability) -> Result<(), AuthzError> {
        match self {
            Decision::Allow => Ok(()),
            Decision::Deny => Err(AuthzError::Denied {
                capability: capability.as_str().to_string(),
            }),
        }
    }
}
