//! Access-control admin endpoints.
//!
//! # Purpose
//! Manage users, roles, permissions, and their associations. Every route
//! requires `rbac.manage` and is rate limited under the `sensitive` policy.
use crate::api::error::{ApiError, api_field_error, api_not_found, api_store_error};
use crate::api::parse_body;
use crate::api::types::{
    LinkResponse, NamedGrantRequest, PermissionLinkRequest, PermissionResponse, RoleLinkRequest,
    RoleResponse, UserAccess, UserAccessResponse, UserCreateRequest, UserWithToken,
    UserWithTokenResponse,
};
use crate::app::AppState;
use crate::auth::guard::require_capability;
use crate::auth::identity::Caller;
use crate::cms::MAX_STRING_LENGTH;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use marketplace_authz::{Capability, Linked, UserId};

/// Token name given to tokens minted for new users.
pub const DEFAULT_TOKEN_NAME: &str = "api";

fn required(field: &str, value: &str) -> Result<String, ApiError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(api_field_error(field, &format!("The {field} field is required.")));
    }
    if value.chars().count() > MAX_STRING_LENGTH {
        return Err(api_field_error(
            field,
            &format!("The {field} may not be greater than {MAX_STRING_LENGTH} characters."),
        ));
    }
    Ok(value.to_string())
}

fn guard_or_default(state: &AppState, guard: Option<String>) -> String {
    guard
        .map(|guard| guard.trim().to_string())
        .filter(|guard| !guard.is_empty())
        .unwrap_or_else(|| state.guard.clone())
}

fn link_status(linked: Linked) -> StatusCode {
    match linked {
        Linked::Created => StatusCode::CREATED,
        Linked::AlreadyLinked => StatusCode::OK,
    }
}

fn user_id(raw: &str) -> Result<u64, ApiError> {
    raw.parse().map_err(|_| api_not_found("user not found"))
}

#[utoipa::path(
    post,
    path = "/api/admin/users",
    tag = "admin",
    request_body = UserCreateRequest,
    responses(
        (status = 201, body = UserWithTokenResponse),
        (status = 403),
        (status = 409),
        (status = 422)
    )
)]
pub(crate) async fn create_user(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    body: Result<Json<UserCreateRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<UserWithTokenResponse>), ApiError> {
    require_capability(&state, &caller, Capability::RbacManage).await?;
    let body = parse_body(body)?;
    let name = required("name", &body.name)?;
    let email = required("email", &body.email)?;
    if !email.contains('@') {
        return Err(api_field_error(
            "email",
            "The email must be a valid email address.",
        ));
    }
    let user = state
        .store
        .create_user(&name, &email)
        .await
        .map_err(|err| api_store_error("failed to create user", err))?;
    let issued = state
        .store
        .issue_token(user.id, DEFAULT_TOKEN_NAME)
        .await
        .map_err(|err| api_store_error("failed to issue token", err))?;
    tracing::info!(user_id = user.id, created_by = ?caller.user_id(), "user created");
    Ok((
        StatusCode::CREATED,
        Json(UserWithTokenResponse {
            data: UserWithToken {
                user,
                token: issued.plain_text,
            },
        }),
    ))
}

#[utoipa::path(
    post,
    path = "/api/admin/roles",
    tag = "admin",
    request_body = NamedGrantRequest,
    responses((status = 201, body = RoleResponse), (status = 403), (status = 409), (status = 422))
)]
pub(crate) async fn create_role(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    body: Result<Json<NamedGrantRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<RoleResponse>), ApiError> {
    require_capability(&state, &caller, Capability::RbacManage).await?;
    let body = parse_body(body)?;
    let name = required("name", &body.name)?;
    let guard = guard_or_default(&state, body.guard);
    let role = state
        .store
        .define_role(&name, &guard)
        .await
        .map_err(|err| api_store_error("failed to create role", err))?;
    Ok((
        StatusCode::CREATED,
        Json(RoleResponse { data: role.into() }),
    ))
}

#[utoipa::path(
    post,
    path = "/api/admin/permissions",
    tag = "admin",
    request_body = NamedGrantRequest,
    responses(
        (status = 201, body = PermissionResponse),
        (status = 403),
        (status = 409),
        (status = 422)
    )
)]
pub(crate) async fn create_permission(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    body: Result<Json<NamedGrantRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<PermissionResponse>), ApiError> {
    require_capability(&state, &caller, Capability::RbacManage).await?;
    let body = parse_body(body)?;
    let name = required("name", &body.name)?;
    let guard = guard_or_default(&state, body.guard);
    let permission = state
        .store
        .define_permission(&name, &guard)
        .await
        .map_err(|err| api_store_error("failed to create permission", err))?;
    Ok((
        StatusCode::CREATED,
        Json(PermissionResponse {
            data: permission.into(),
        }),
    ))
}

#[utoipa::path(
    post,
    path = "/api/admin/roles/{role}/permissions",
    tag = "admin",
    params(("role" = String, Path, description = "Role name")),
    request_body = PermissionLinkRequest,
    responses(
        (status = 201, description = "Linked", body = LinkResponse),
        (status = 200, description = "Already linked", body = LinkResponse),
        (status = 403),
        (status = 404)
    )
)]
pub(crate) async fn give_permission_to_role(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(role): Path<String>,
    body: Result<Json<PermissionLinkRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<LinkResponse>), ApiError> {
    require_capability(&state, &caller, Capability::RbacManage).await?;
    let body = parse_body(body)?;
    let permission = required("permission", &body.permission)?;
    let linked = state
        .store
        .give_permission_to_role(&role, &permission, &state.guard)
        .await
        .map_err(|err| api_store_error("failed to link permission", err))?;
    Ok((link_status(linked), Json(linked.into())))
}

#[utoipa::path(
    post,
    path = "/api/admin/users/{user}/roles",
    tag = "admin",
    params(("user" = u64, Path, description = "User id")),
    request_body = RoleLinkRequest,
    responses(
        (status = 201, description = "Assigned", body = LinkResponse),
        (status = 200, description = "Already assigned", body = LinkResponse),
        (status = 403),
        (status = 404)
    )
)]
pub(crate) async fn assign_role(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(user): Path<String>,
    body: Result<Json<RoleLinkRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<LinkResponse>), ApiError> {
    require_capability(&state, &caller, Capability::RbacManage).await?;
    let user = existing_user(&state, &user).await?;
    let body = parse_body(body)?;
    let role = required("role", &body.role)?;
    let linked = state
        .store
        .assign_role(user, &role, &state.guard)
        .await
        .map_err(|err| api_store_error("failed to assign role", err))?;
    Ok((link_status(linked), Json(linked.into())))
}

#[utoipa::path(
    post,
    path = "/api/admin/users/{user}/permissions",
    tag = "admin",
    params(("user" = u64, Path, description = "User id")),
    request_body = PermissionLinkRequest,
    responses(
        (status = 201, description = "Granted", body = LinkResponse),
        (status = 200, description = "Already granted", body = LinkResponse),
        (status = 403),
        (status = 404)
    )
)]
pub(crate) async fn give_permission_to_user(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(user): Path<String>,
    body: Result<Json<PermissionLinkRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<LinkResponse>), ApiError> {
    require_capability(&state, &caller, Capability::RbacManage).await?;
    let user = existing_user(&state, &user).await?;
    let body = parse_body(body)?;
    let permission = required("permission", &body.permission)?;
    let linked = state
        .store
        .give_permission_to_user(user, &permission, &state.guard)
        .await
        .map_err(|err| api_store_error("failed to grant permission", err))?;
    Ok((link_status(linked), Json(linked.into())))
}

#[utoipa::path(
    get,
    path = "/api/admin/users/{user}/access",
    tag = "admin",
    params(("user" = u64, Path, description = "User id")),
    responses((status = 200, body = UserAccessResponse), (status = 403), (status = 404))
)]
pub(crate) async fn user_access(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(user): Path<String>,
) -> Result<Json<UserAccessResponse>, ApiError> {
    require_capability(&state, &caller, Capability::RbacManage).await?;
    let user = existing_user(&state, &user).await?;
    let roles = state
        .store
        .roles_of(user)
        .await
        .map_err(|err| api_store_error("failed to load roles", err))?;
    let permissions = state
        .store
        .permissions_of(user, &state.guard)
        .await
        .map_err(|err| api_store_error("failed to load permissions", err))?;
    Ok(Json(UserAccessResponse {
        data: UserAccess {
            user_id: user.0,
            roles: roles.into_iter().map(Into::into).collect(),
            permissions,
        },
    }))
}

async fn existing_user(state: &AppState, raw: &str) -> Result<UserId, ApiError> {
    let id = user_id(raw)?;
    state
        .store
        .find_user(id)
        .await
        .map_err(|err| api_store_error("failed to load user", err))?;
    Ok(UserId(id))
}
