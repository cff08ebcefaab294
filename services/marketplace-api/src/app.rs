//! Marketplace HTTP application wiring.
//!
//! # Purpose
//! Builds the Axum routers, assigns a rate-limit policy to each route group,
//! and defines the shared application state injected into handlers.
//!
//! # Notes
//! Route composition lives here to keep `main` small and testable. Layer
//! order per request: trace span, caller resolution, rate limit, handler.
use crate::api;
use crate::api::openapi::ApiDoc;
use crate::config::MarketplaceConfig;
use crate::middleware::{self, PolicyGate};
use crate::observability;
use crate::store::MarketplaceStore;
use crate::store::memory::InMemoryStore;
use anyhow::Context;
use axum::Router;
use axum::routing::{get, post, put};
use marketplace_throttle::{RateLimiter, marketplace_policies};
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;
use tracing_opentelemetry::OpenTelemetrySpanExt;
use utoipa::OpenApi;

pub const SERVICE_NAME: &str = "marketplace-api";

#[derive(Clone)]
pub struct AppState {
    pub service_name: String,
    pub api_version: String,
    pub store: Arc<dyn MarketplaceStore>,
    pub limiter: RateLimiter,
    /// Guard that roles and permissions are evaluated in.
    pub guard: String,
    pub trust_forwarded_for: bool,
    pub bootstrap_enabled: bool,
    pub bootstrap_token: Option<String>,
}

/// Build state from configuration with the in-memory store and the default
/// policies adjusted by any configured overrides.
pub fn build_state(config: &MarketplaceConfig) -> anyhow::Result<AppState> {
    let policies = marketplace_policies()
        .with_overrides(&config.rate_limits)
        .context("apply rate_limits overrides")?;
    Ok(AppState {
        service_name: SERVICE_NAME.to_string(),
        api_version: "v1".to_string(),
        store: Arc::new(InMemoryStore::new()),
        limiter: RateLimiter::in_memory(policies),
        guard: config.auth_guard.clone(),
        trust_forwarded_for: config.trust_forwarded_for,
        bootstrap_enabled: config.bootstrap.enabled,
        bootstrap_token: config.bootstrap.token.clone(),
    })
}

fn throttled(state: &AppState, policy: &'static str, routes: Router<AppState>) -> Router<AppState> {
    routes.route_layer(axum::middleware::from_fn_with_state(
        PolicyGate::new(state.clone(), policy),
        middleware::throttle,
    ))
}

pub fn build_router(state: AppState) -> Router {
    let trace_layer =
        TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
            let parent = observability::trace_context_from_headers(request.headers());
            let span = tracing::info_span!(
                "http.request",
                method = %request.method(),
                uri = %request.uri(),
                version = ?request.version()
            );
            span.set_parent(parent);
            span
        });

    let page_reads = throttled(
        &state,
        "api",
        Router::new().route("/api/cms-pages/:page", get(api::cms_pages::show_page)),
    );
    let page_search = throttled(
        &state,
        "search",
        Router::new().route("/api/cms-pages", get(api::cms_pages::list_pages)),
    );
    let page_writes = throttled(
        &state,
        "content",
        Router::new()
            .route("/api/cms-pages", post(api::cms_pages::create_page))
            .route(
                "/api/cms-pages/:page",
                put(api::cms_pages::update_page).delete(api::cms_pages::delete_page),
            ),
    );
    let admin = throttled(
        &state,
        "sensitive",
        Router::new()
            .route("/api/admin/users", post(api::admin::create_user))
            .route("/api/admin/roles", post(api::admin::create_role))
            .route("/api/admin/permissions", post(api::admin::create_permission))
            .route(
                "/api/admin/roles/:role/permissions",
                post(api::admin::give_permission_to_role),
            )
            .route(
                "/api/admin/users/:user/roles",
                post(api::admin::assign_role),
            )
            .route(
                "/api/admin/users/:user/permissions",
                post(api::admin::give_permission_to_user),
            )
            .route(
                "/api/admin/users/:user/access",
                get(api::admin::user_access),
            ),
    );

    Router::new()
        .route("/api/system/info", get(api::system::system_info))
        .route("/api/system/health", get(api::system::system_health))
        .merge(page_reads)
        .merge(page_search)
        .merge(page_writes)
        .merge(admin)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::authenticate,
        ))
        .merge(
            utoipa_swagger_ui::SwaggerUi::new("/docs").url("/v1/openapi.json", ApiDoc::openapi()),
        )
        .layer(trace_layer)
        .with_state(state)
}

pub fn build_bootstrap_router(state: AppState) -> Router {
    let initialize = throttled(
        &state,
        "auth",
        Router::new().route(
            "/internal/bootstrap/initialize",
            post(api::bootstrap::initialize),
        ),
    );
    initialize
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Periodically drop rate-limit buckets whose window has ended.
pub fn spawn_bucket_sweeper(limiter: RateLimiter, every: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            let purged = limiter.purge_expired();
            if purged > 0 {
                tracing::debug!(purged, "expired rate-limit buckets dropped");
            }
        }
    })
}
