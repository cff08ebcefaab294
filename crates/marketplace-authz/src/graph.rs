//! Role/permission association graph.
//!
//! # Purpose
//! Stores roles and permissions plus three association sets of plain id
//! pairs: role→permission, user→role, and user→permission.
//!
//! # Key invariants
//! - `(name, guard)` is unique per record kind; the index maps it to one id.
//! - Association sets never hold duplicates. Linking twice reports
//!   [`Linked::AlreadyLinked`] and leaves the graph unchanged.
//! - Links only join records that share a guard.
//! - Associations are id pairs; records hold no back-pointers.
//!
//! # Complexity
//! [`AccessGraph::authorize`] resolves the permission id by hash lookup, then
//! probes the user's direct set and each of the user's roles, so cost is
//! bounded by the number of roles a single user holds.
use crate::{
    AuthzError, AuthzResult, Capability, Decision, Permission, PermissionId, Role, RoleId, UserId,
};
use std::collections::{BTreeSet, HashMap, HashSet};

/// Result of an insert-if-absent link operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Linked {
    Created,
    AlreadyLinked,
}

impl Linked {
    fn from_inserted(inserted: bool) -> Self {
        if inserted {
            Linked::Created
        } else {
            Linked::AlreadyLinked
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct AccessGraph {
    next_role_id: u64,
    next_permission_id: u64,
    roles: HashMap<RoleId, Role>,
    role_index: HashMap<(String, String), RoleId>,
    permissions: HashMap<PermissionId, Permission>,
    permission_index: HashMap<(String, String), PermissionId>,
    role_permissions: HashMap<RoleId, HashSet<PermissionId>>,
    user_roles: HashMap<UserId, HashSet<RoleId>>,
    user_permissions: HashMap<UserId, HashSet<PermissionId>>,
}

impl AccessGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Define a new role. Fails if `(name, guard)` is already taken.
    pub fn define_role(&mut self, name: &str, guard: &str) -> AuthzResult<RoleId> {
        validate_name(name, guard)?;
        let key = (name.to_string(), guard.to_string());
        if self.role_index.contains_key(&key) {
            return Err(AuthzError::DuplicateRole {
                name: key.0,
                guard: key.1,
            });
        }
        self.next_role_id += 1;
        let id = RoleId(self.next_role_id);
        self.roles.insert(
            id,
            Role {
                id,
                name: key.0.clone(),
                guard: key.1.clone(),
            },
        );
        self.role_index.insert(key, id);
        Ok(id)
    }

    /// Return the existing role id for `(name, guard)` or define it.
    pub fn find_or_define_role(&mut self, name: &str, guard: &str) -> AuthzResult<RoleId> {
        match self.role_id(name, guard) {
            Some(id) => Ok(id),
            None => self.define_role(name, guard),
        }
    }

    /// Define a new permission. Fails if `(name, guard)` is already taken.
    pub fn define_permission(&mut self, name: &str, guard: &str) -> AuthzResult<PermissionId> {
        validate_name(name, guard)?;
        let key = (name.to_string(), guard.to_string());
        if self.permission_index.contains_key(&key) {
            return Err(AuthzError::DuplicatePermission {
                name: key.0,
                guard: key.1,
            });
        }
        self.next_permission_id += 1;
        let id = PermissionId(self.next_permission_id);
        self.permissions.insert(
            id,
            Permission {
                id,
                name: key.0.clone(),
                guard: key.1.clone(),
            },
        );
        self.permission_index.insert(key, id);
        Ok(id)
    }

    pub fn find_or_define_permission(
        &mut self,
        name: &str,
        guard: &str,
    ) -> AuthzResult<PermissionId> {
        match self.permission_id(name, guard) {
            Some(id) => Ok(id),
            None => self.define_permission(name, guard),
        }
    }

    pub fn role(&self, id: RoleId) -> Option<&Role> {
        self.roles.get(&id)
    }

    pub fn permission(&self, id: PermissionId) -> Option<&Permission> {
        self.permissions.get(&id)
    }

    pub fn role_id(&self, name: &str, guard: &str) -> Option<RoleId> {
        self.role_index
            .get(&(name.to_string(), guard.to_string()))
            .copied()
    }

    pub fn permission_id(&self, name: &str, guard: &str) -> Option<PermissionId> {
        self.permission_index
            .get(&(name.to_string(), guard.to_string()))
            .copied()
    }

    pub fn give_permission_to_role(
        &mut self,
        role: RoleId,
        permission: PermissionId,
    ) -> AuthzResult<Linked> {
        let role_guard = &self.roles.get(&role).ok_or(AuthzError::UnknownRole(role.0))?.guard;
        let permission_guard = &self
            .permissions
            .get(&permission)
            .ok_or(AuthzError::UnknownPermission(permission.0))?
            .guard;
        if role_guard != permission_guard {
            return Err(AuthzError::GuardMismatch {
                role_guard: role_guard.clone(),
                permission_guard: permission_guard.clone(),
            });
        }
        let inserted = self
            .role_permissions
            .entry(role)
            .or_default()
            .insert(permission);
        Ok(Linked::from_inserted(inserted))
    }

    pub fn assign_role(&mut self, user: UserId, role: RoleId) -> AuthzResult<Linked> {
        if !self.roles.contains_key(&role) {
            return Err(AuthzError::UnknownRole(role.0));
        }
        let inserted = self.user_roles.entry(user).or_default().insert(role);
        Ok(Linked::from_inserted(inserted))
    }

    pub fn give_permission_to_user(
        &mut self,
        user: UserId,
        permission: PermissionId,
    ) -> AuthzResult<Linked> {
        if !self.permissions.contains_key(&permission) {
            return Err(AuthzError::UnknownPermission(permission.0));
        }
        let inserted = self
            .user_permissions
            .entry(user)
            .or_default()
            .insert(permission);
        Ok(Linked::from_inserted(inserted))
    }

    /// Roles held by `user`, ordered by id.
    pub fn roles_of(&self, user: UserId) -> Vec<Role> {
        let mut roles: Vec<Role> = self
            .user_roles
            .get(&user)
            .into_iter()
            .flatten()
            .filter_map(|id| self.roles.get(id).cloned())
            .collect();
        roles.sort_by_key(|role| role.id);
        roles
    }

    /// Effective permission names for `user` within `guard`, direct and via roles.
    pub fn effective_permissions(&self, user: UserId, guard: &str) -> BTreeSet<String> {
        let via_roles = self
            .user_roles
            .get(&user)
            .into_iter()
            .flatten()
            .filter_map(|role| self.role_permissions.get(role))
            .flatten();
        let direct = self.user_permissions.get(&user).into_iter().flatten();
        via_roles
            .chain(direct)
            .filter_map(|id| self.permissions.get(id))
            .filter(|permission| permission.guard == guard)
            .map(|permission| permission.name.clone())
            .collect()
    }

    /// Decide whether `user` holds `capability` within `guard`.
    ///
    /// Anonymous callers and capabilities that were never defined as a
    /// permission are denied.
    pub fn authorize(&self, user: Option<UserId>, capability: Capability, guard: &str) -> Decision {
        let Some(user) = user else {
            return Decision::Deny;
        };
        let Some(permission) = self.permission_id(capability.as_str(), guard) else {
            return Decision::Deny;
        };
        if self
            .user_permissions
            .get(&user)
            .is_some_and(|direct| direct.contains(&permission))
        {
            return Decision::Allow;
        }
        let via_role = self.user_roles.get(&user).is_some_and(|roles| {
            roles.iter().any(|role| {
                self.role_permissions
                    .get(role)
                    .is_some_and(|granted| granted.contains(&permission))
            })
        });
        if via_role {
            Decision::Allow
        } else {
            Decision::Deny
        }
    }
}

fn validate_name(name: &str, guard: &str) -> AuthzResult<()> {
    if name.trim().is_empty() {
        return Err(AuthzError::EmptyName);
    }
    if guard.trim().is_empty() {
        return Err(AuthzError::EmptyGuard);
    }
    Ok(())
}
