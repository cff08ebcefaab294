//! Bootstrap API handlers.
//!
//! # Purpose
//! One-shot initialization of a fresh deployment: seeds the default roles
//! and permissions, creates the first administrator, and hands back its
//! token. Served on a separate internal listener.
use crate::api::error::{
    ApiError, api_conflict, api_field_error, api_internal_message, api_not_enabled,
    api_store_error, api_unauthorized,
};
use crate::api::admin::DEFAULT_TOKEN_NAME;
use crate::api::parse_body;
use crate::api::types::{BootstrapInitializeRequest, BootstrapInitializeResponse, RoleView};
use crate::app::AppState;
use crate::auth::roles::{SUPER_ADMIN_ROLE, seed_default_roles};
use crate::auth::tokens::constant_time_eq;
use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::{HeaderMap, StatusCode};
use marketplace_authz::UserId;

pub const BOOTSTRAP_TOKEN_HEADER: &str = "X-Marketplace-Bootstrap-Token";

#[utoipa::path(
    post,
    path = "/internal/bootstrap/initialize",
    tag = "bootstrap",
    request_body = BootstrapInitializeRequest,
    responses(
        (status = 201, description = "Bootstrap initialized", body = BootstrapInitializeResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Not enabled"),
        (status = 409, description = "Already initialized"),
        (status = 422, description = "Validation error")
    )
)]
pub async fn initialize(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<BootstrapInitializeRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<BootstrapInitializeResponse>), ApiError> {
    if !state.bootstrap_enabled {
        return Err(api_not_enabled("bootstrap not enabled"));
    }

    ensure_bootstrap_authorized(&state, &headers)?;

    let body = parse_body(body)?;
    let admin_name = body.admin_name.trim();
    let admin_email = body.admin_email.trim();
    if admin_name.is_empty() {
        return Err(api_field_error(
            "admin_name",
            "The admin_name field is required.",
        ));
    }
    if !admin_email.contains('@') {
        return Err(api_field_error(
            "admin_email",
            "The admin_email must be a valid email address.",
        ));
    }

    let claimed = state
        .store
        .claim_bootstrap()
        .await
        .map_err(|err| api_store_error("failed to check bootstrap state", err))?;
    if !claimed {
        return Err(api_conflict(
            "already_initialized",
            "marketplace already initialized",
        ));
    }

    let roles = seed_default_roles(&*state.store, &state.guard)
        .await
        .map_err(|err| api_store_error("failed to seed roles", err))?;
    let user = state
        .store
        .create_user(admin_name, admin_email)
        .await
        .map_err(|err| api_store_error("failed to create admin user", err))?;
    state
        .store
        .assign_role(UserId(user.id), SUPER_ADMIN_ROLE, &state.guard)
        .await
        .map_err(|err| api_store_error("failed to assign admin role", err))?;
    let issued = state
        .store
        .issue_token(user.id, DEFAULT_TOKEN_NAME)
        .await
        .map_err(|err| api_store_error("failed to issue admin token", err))?;

    tracing::info!(user_id = user.id, "marketplace bootstrap completed");
    Ok((
        StatusCode::CREATED,
        Json(BootstrapInitializeResponse {
            user,
            token: issued.plain_text,
            roles: roles.into_iter().map(RoleView::from).collect(),
            status: "initialized".to_string(),
        }),
    ))
}

fn ensure_bootstrap_authorized(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    let token = match headers.get(BOOTSTRAP_TOKEN_HEADER) {
        Some(value) => value
            .to_str()
            .map_err(|_| api_unauthorized("invalid bootstrap token"))?,
        None => return Err(api_unauthorized("missing bootstrap token")),
    };

    let expected = state
        .bootstrap_token
        .as_ref()
        .ok_or_else(|| api_internal_message("bootstrap token missing"))?;

    if !constant_time_eq(token.as_bytes(), expected.as_bytes()) {
        return Err(api_unauthorized("invalid bootstrap token"));
    }
    Ok(())
}
