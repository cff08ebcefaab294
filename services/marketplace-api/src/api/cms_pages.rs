//! CMS page API handlers.
//!
//! # Purpose
//! Public reads and capability-gated writes of CMS pages.
//!
//! # Request pipeline
//! Rate limiting has already run in middleware by the time a handler is
//! entered. Writes then check `cms.pages.manage`, validate the body, and
//! only then touch the store. Every page leaves through
//! [`present`](crate::cms::present), which puts blocks in display order.
use crate::api::error::{ApiError, api_not_found, api_store_error, api_validation_failed};
use crate::api::parse_body;
use crate::api::types::{
    ErrorResponse, MessageResponse, PageListResponse, PageResponse, PageWriteRequest,
};
use crate::app::AppState;
use crate::auth::guard::require_capability;
use crate::auth::identity::Caller;
use crate::cms::{PageCriteria, PageValidationError, present, validate_page_write};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use marketplace_authz::Capability;
use serde_json::Value;
use std::collections::HashMap;

fn page_id(raw: &str) -> Result<u64, ApiError> {
    raw.parse().map_err(|_| api_not_found("page not found"))
}

fn write_rejection(err: PageValidationError) -> ApiError {
    match err {
        PageValidationError::Invalid(errors) => api_validation_failed(errors),
        PageValidationError::Store(err) => api_store_error("failed to validate page", err),
    }
}

#[utoipa::path(
    get,
    path = "/api/cms-pages/{slug}",
    tag = "cms-pages",
    params(("slug" = String, Path, description = "Page slug")),
    responses(
        (status = 200, description = "Page with blocks in display order", body = PageResponse),
        (status = 404, description = "Page not found", body = ErrorResponse),
        (status = 429, description = "Rate limited", body = ErrorResponse)
    )
)]
pub(crate) async fn show_page(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<PageResponse>, ApiError> {
    let page = state
        .store
        .find_page_by_slug(&slug)
        .await
        .map_err(|err| api_store_error("failed to load page", err))?;
    Ok(Json(PageResponse {
        data: present(&page),
    }))
}

#[utoipa::path(
    get,
    path = "/api/cms-pages",
    tag = "cms-pages",
    params(
        ("search" = Option<String>, Query, description = "Substring of slug or title"),
        ("orderBy" = Option<String>, Query, description = "id, slug, title, created_at or updated_at"),
        ("sortedBy" = Option<String>, Query, description = "asc or desc")
    ),
    responses(
        (status = 200, description = "Pages", body = PageListResponse),
        (status = 429, description = "Rate limited", body = ErrorResponse)
    )
)]
pub(crate) async fn list_pages(
    State(state): State<AppState>,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Json<PageListResponse>, ApiError> {
    let criteria = PageCriteria::from_query(&query).unwrap_or_else(|err| {
        tracing::warn!(error = %err, "ignoring invalid page criteria");
        PageCriteria::default()
    });
    let pages = state
        .store
        .list_pages()
        .await
        .map_err(|err| api_store_error("failed to list pages", err))?;
    let data = criteria.apply(pages).iter().map(present).collect();
    Ok(Json(PageListResponse { data }))
}

#[utoipa::path(
    post,
    path = "/api/cms-pages",
    tag = "cms-pages",
    request_body = PageWriteRequest,
    responses(
        (status = 201, description = "Page created", body = PageResponse),
        (status = 403, description = "Missing cms.pages.manage", body = ErrorResponse),
        (status = 409, description = "Slug or path taken concurrently", body = ErrorResponse),
        (status = 422, description = "Validation failed", body = ErrorResponse),
        (status = 429, description = "Rate limited", body = ErrorResponse)
    )
)]
pub(crate) async fn create_page(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<PageResponse>), ApiError> {
    require_capability(&state, &caller, Capability::CmsPagesManage).await?;
    let body = parse_body(body)?;
    let draft = validate_page_write(&*state.store, &body, None)
        .await
        .map_err(write_rejection)?;
    let page = state
        .store
        .create_page(draft)
        .await
        .map_err(|err| api_store_error("failed to create page", err))?;
    tracing::info!(
        page_id = page.id,
        slug = %page.slug,
        user_id = ?caller.user_id(),
        "cms page created"
    );
    Ok((
        StatusCode::CREATED,
        Json(PageResponse {
            data: present(&page),
        }),
    ))
}

#[utoipa::path(
    put,
    path = "/api/cms-pages/{id}",
    tag = "cms-pages",
    params(("id" = u64, Path, description = "Page id")),
    request_body = PageWriteRequest,
    responses(
        (status = 200, description = "Page updated", body = PageResponse),
        (status = 403, description = "Missing cms.pages.manage", body = ErrorResponse),
        (status = 404, description = "Page not found", body = ErrorResponse),
        (status = 409, description = "Slug or path taken concurrently", body = ErrorResponse),
        (status = 422, description = "Validation failed", body = ErrorResponse),
        (status = 429, description = "Rate limited", body = ErrorResponse)
    )
)]
pub(crate) async fn update_page(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<PageResponse>, ApiError> {
    require_capability(&state, &caller, Capability::CmsPagesManage).await?;
    let id = page_id(&id)?;
    let current = state
        .store
        .find_page(id)
        .await
        .map_err(|err| api_store_error("failed to load page", err))?;
    let body = parse_body(body)?;
    let draft = validate_page_write(&*state.store, &body, Some(&current))
        .await
        .map_err(write_rejection)?;
    let page = state
        .store
        .update_page(id, draft)
        .await
        .map_err(|err| api_store_error("failed to update page", err))?;
    tracing::info!(
        page_id = page.id,
        slug = %page.slug,
        user_id = ?caller.user_id(),
        "cms page updated"
    );
    Ok(Json(PageResponse {
        data: present(&page),
    }))
}

#[utoipa::path(
    delete,
    path = "/api/cms-pages/{id}",
    tag = "cms-pages",
    params(("id" = u64, Path, description = "Page id")),
    responses(
        (status = 200, description = "Page deleted", body = MessageResponse),
        (status = 403, description = "Missing cms.pages.manage", body = ErrorResponse),
        (status = 404, description = "Page not found", body = ErrorResponse),
        (status = 429, description = "Rate limited", body = ErrorResponse)
    )
)]
pub(crate) async fn delete_page(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    require_capability(&state, &caller, Capability::CmsPagesManage).await?;
    let id = page_id(&id)?;
    state
        .store
        .delete_page(id)
        .await
        .map_err(|err| api_store_error("failed to delete page", err))?;
    tracing::info!(page_id = id, user_id = ?caller.user_id(), "cms page deleted");
    Ok(Json(MessageResponse {
        message: "Page deleted successfully.".to_string(),
    }))
}
