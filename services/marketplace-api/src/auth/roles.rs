//! Default roles seeded by the bootstrap flow.
use crate::store::{AccessStore, StoreResult};
use marketplace_authz::{Capability, Role};

pub const SUPER_ADMIN_ROLE: &str = "super-admin";
pub const CONTENT_EDITOR_ROLE: &str = "content-editor";

/// Capabilities granted to each default role.
pub fn default_role_grants() -> [(&'static str, &'static [Capability]); 2] {
    [
        (SUPER_ADMIN_ROLE, &Capability::ALL),
        (CONTENT_EDITOR_ROLE, &[Capability::CmsPagesManage]),
    ]
}

/// Define every capability as a permission and the default roles on top of
/// them. Safe to run repeatedly.
pub async fn seed_default_roles<S>(store: &S, guard: &str) -> StoreResult<Vec<Role>>
where
    S: AccessStore + ?Sized,
{
    for capability in Capability::ALL {
        store.ensure_permission(capability.as_str(), guard).await?;
    }
    let mut roles = Vec::new();
    for (role_name, capabilities) in default_role_grants() {
        let role = store.ensure_role(role_name, guard).await?;
        for capability in capabilities {
            store
                .give_permission_to_role(role_name, capability.as_str(), guard)
                .await?;
        }
        roles.push(role);
    }
    Ok(roles)
}
