//! Identifier newtypes and role/permission records.
//!
//! # Purpose
//! Keeps user, role, and permission ids from being mixed up at call sites,
//! and defines the `(name, guard)` records stored in the access graph.
//!
//! # Key invariants
//! - Ids are assigned by the graph and never reused within a process.
//! - `name` and `guard` are non-empty (enforced by the graph on insert).
use serde::{Deserialize, Serialize};

/// Guard used when callers do not name one explicitly.
pub const DEFAULT_GUARD: &str = "api";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionId(pub u64);

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Named bundle of permissions within a guard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: RoleId,
    pub name: String,
    pub guard: String,
}

/// Named capability record within a guard.
///
/// The `name` of a permission is the string form of a
/// [`Capability`](crate::Capability) when it gates a built-in operation, but
/// arbitrary names are accepted so operators can pre-provision permissions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    pub id: PermissionId,
    pub name: String,
    pub guard: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_serialize_transparently() {
        let role = Role {
            id: RoleId(2),
            name: "content-editor".to_string(),
            guard: DEFAULT_GUARD.to_string(),
        };
        let value = serde_json::to_value(&role).expect("serialize");
        assert_eq!(value["id"], 2);
        assert_eq!(value["guard"], "api");
        assert_eq!(UserId(9).to_string(), "9");
    }
}
