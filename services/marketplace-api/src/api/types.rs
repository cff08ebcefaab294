//! HTTP API request/response types.
//!
//! # Purpose
//! Defines shared payload shapes for the marketplace REST API and OpenAPI
//! schema generation.
use crate::model::{Block, PresentedPage, User};
use marketplace_authz::{Linked, Permission, Role};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct SystemInfo {
    pub service: String,
    pub api_version: String,
    pub storage_backend: String,
    pub durable_storage: bool,
    pub auth_guard: String,
    pub rate_limit_policies: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct HealthStatus {
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
    pub request_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<BTreeMap<String, Vec<String>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
}

/// Documented shape of a page write. The handlers validate the raw JSON
/// body themselves so every field error can be reported.
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct PageWriteRequest {
    pub slug: String,
    pub title: String,
    pub path: Option<String>,
    pub content: Option<Vec<Block>>,
    #[schema(value_type = Option<Object>)]
    pub meta: Option<serde_json::Map<String, serde_json::Value>>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct PageResponse {
    pub data: PresentedPage,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct PageListResponse {
    pub data: Vec<PresentedPage>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct UserCreateRequest {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct UserWithToken {
    pub user: User,
    /// Plain-text bearer token. Shown once.
    pub token: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct UserWithTokenResponse {
    pub data: UserWithToken,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct NamedGrantRequest {
    pub name: String,
    pub guard: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq, Eq)]
pub struct RoleView {
    pub id: u64,
    pub name: String,
    pub guard: String,
}

impl From<Role> for RoleView {
    fn from(role: Role) -> Self {
        Self {
            id: role.id.0,
            name: role.name,
            guard: role.guard,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq, Eq)]
pub struct PermissionView {
    pub id: u64,
    pub name: String,
    pub guard: String,
}

impl From<Permission> for PermissionView {
    fn from(permission: Permission) -> Self {
        Self {
            id: permission.id.0,
            name: permission.name,
            guard: permission.guard,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct RoleResponse {
    pub data: RoleView,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct PermissionResponse {
    pub data: PermissionView,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct PermissionLinkRequest {
    pub permission: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct RoleLinkRequest {
    pub role: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq, Eq)]
pub struct LinkResponse {
    /// `true` when this call created the association.
    pub created: bool,
}

impl From<Linked> for LinkResponse {
    fn from(linked: Linked) -> Self {
        Self {
            created: linked == Linked::Created,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct UserAccess {
    pub user_id: u64,
    pub roles: Vec<RoleView>,
    pub permissions: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct UserAccessResponse {
    pub data: UserAccess,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct BootstrapInitializeRequest {
    pub admin_name: String,
    pub admin_email: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct BootstrapInitializeResponse {
    pub user: User,
    pub token: String,
    pub roles: Vec<RoleView>,
    pub status: String,
}
