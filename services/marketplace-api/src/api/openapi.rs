//! OpenAPI schema aggregation for the marketplace API.
//!
//! # Purpose
//! Collects all routes and schema types into a single OpenAPI document for docs
//! and client generation.
use crate::api::{
    admin, cms_pages, system,
    types::{
        ErrorResponse, HealthStatus, LinkResponse, MessageResponse, NamedGrantRequest,
        PageListResponse, PageResponse, PageWriteRequest, PermissionLinkRequest,
        PermissionResponse, PermissionView, RoleLinkRequest, RoleResponse, RoleView, SystemInfo,
        UserAccess, UserAccessResponse, UserCreateRequest, UserWithToken, UserWithTokenResponse,
    },
};
use crate::model::{Block, Page, PresentedPage, User};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "marketplace-api",
        version = "v1",
        description = "Marketplace CMS and access-control HTTP API"
    ),
    paths(
        system::system_info,
        system::system_health,
        cms_pages::show_page,
        cms_pages::list_pages,
        cms_pages::create_page,
        cms_pages::update_page,
        cms_pages::delete_page,
        admin::create_user,
        admin::create_role,
        admin::create_permission,
        admin::give_permission_to_role,
        admin::assign_role,
        admin::give_permission_to_user,
        admin::user_access
    ),
    components(schemas(
        SystemInfo,
        HealthStatus,
        ErrorResponse,
        Block,
        Page,
        PresentedPage,
        PageWriteRequest,
        PageResponse,
        PageListResponse,
        MessageResponse,
        User,
        UserCreateRequest,
        UserWithToken,
        UserWithTokenResponse,
        NamedGrantRequest,
        RoleView,
        RoleResponse,
        PermissionView,
        PermissionResponse,
        PermissionLinkRequest,
        RoleLinkRequest,
        LinkResponse,
        UserAccess,
        UserAccessResponse
    )),
    tags(
        (name = "system", description = "System and discovery endpoints"),
        (name = "cms-pages", description = "CMS page reads and writes"),
        (name = "admin", description = "Users, roles, and permissions")
    )
)]
pub struct ApiDoc;
