//! Marketplace authorization primitives shared by HTTP services.
//!
//! # Purpose
//! Models capabilities, roles, permissions, and the association graph that
//! links them to users, and answers "may this identity do that?".
//!
//! # How it fits
//! The API service keeps one [`AccessGraph`] per process (behind its store)
//! and consults it after rate-limit admission and before any mutating effect.
//!
//! # Key invariants
//! - A `(name, guard)` pair names at most one role and at most one permission.
//! - Association rows are unique per id pair; re-linking is a no-op.
//! - Denial is the default: unknown users, unknown permissions, and missing
//!   links all resolve to [`Decision::Deny`].
//!
//! # Examples
//! ```rust
//! use marketplace_authz::{AccessGraph, Capability, Decision, UserId};
//!
//! let mut graph = AccessGraph::new();
//! let editor = graph.define_role("content-editor", "api").expect("role");
//! let manage = graph
//!     .define_permission(Capability::CmsPagesManage.as_str(), "api")
//!     .expect("permission");
//! graph.give_permission_to_role(editor, manage).expect("link");
//! graph.assign_role(UserId(7), editor).expect("assign");
//!
//! assert_eq!(
//!     graph.authorize(Some(UserId(7)), Capability::CmsPagesManage, "api"),
//!     Decision::Allow
//! );
//! assert_eq!(
//!     graph.authorize(None, Capability::CmsPagesManage, "api"),
//!     Decision::Deny
//! );
//! ```

mod capability;
mod decision;
mod errors;
mod graph;
mod types;

pub use capability::Capability;
pub use decision::Decision;
pub use errors::{AuthzError, AuthzResult};
pub use graph::{AccessGraph, Linked};
pub use types::{DEFAULT_GUARD, Permission, PermissionId, Role, RoleId, UserId};
