#![allow(dead_code)]

use axum::Router;
use axum::extract::connect_info::MockConnectInfo;
use marketplace_api::app::{AppState, build_bootstrap_router, build_router};
use marketplace_api::auth::roles::{CONTENT_EDITOR_ROLE, SUPER_ADMIN_ROLE, seed_default_roles};
use marketplace_api::store::memory::InMemoryStore;
use marketplace_api::store::{AccessStore, IdentityStore};
use marketplace_authz::UserId;
use marketplace_throttle::{InMemoryCounterStore, ManualClock, RateLimiter, marketplace_policies};
use std::net::SocketAddr;
use std::sync::Arc;

pub const GUARD: &str = "api";
pub const BOOTSTRAP_TOKEN: &str = "bootstrap-secret";

pub async fn read_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json")
}

/// State over a fresh in-memory store whose limiter reads `clock`.
pub fn test_state(clock: &ManualClock) -> AppState {
    AppState {
        service_name: "marketplace-api".to_string(),
        api_version: "v1".to_string(),
        store: Arc::new(InMemoryStore::new()),
        limiter: RateLimiter::new(
            marketplace_policies(),
            Arc::new(InMemoryCounterStore::new()),
            Arc::new(clock.clone()),
        ),
        guard: GUARD.to_string(),
        trust_forwarded_for: false,
        bootstrap_enabled: true,
        bootstrap_token: Some(BOOTSTRAP_TOKEN.to_string()),
    }
}

/// Main router as seen from `peer`.
pub fn router_from(state: AppState, peer: &str) -> Router {
    let peer: SocketAddr = peer.parse().expect("peer");
    build_router(state).layer(MockConnectInfo(peer))
}

pub fn router(state: AppState) -> Router {
    router_from(state, "203.0.113.10:40000")
}

pub fn bootstrap_router(state: AppState) -> Router {
    let peer: SocketAddr = "127.0.0.1:50000".parse().expect("peer");
    build_bootstrap_router(state).layer(MockConnectInfo(peer))
}

/// Create a user holding `role` and return its plain-text token.
pub async fn token_with_role(state: &AppState, email: &str, role: &str) -> String {
    seed_default_roles(&*state.store, GUARD)
        .await
        .expect("seed roles");
    let user = state
        .store
        .create_user("Test User", email)
        .await
        .expect("user");
    state
        .store
        .assign_role(UserId(user.id), role, GUARD)
        .await
        .expect("assign role");
    state
        .store
        .issue_token(user.id, "test")
        .await
        .expect("token")
        .plain_text
}

pub async fn editor_token(state: &AppState) -> String {
    token_with_role(state, "editor@example.com", CONTENT_EDITOR_ROLE).await
}

pub async fn admin_token(state: &AppState) -> String {
    token_with_role(state, "admin@example.com", SUPER_ADMIN_ROLE).await
}

/// Create a user with no roles and return its plain-text token.
pub async fn plain_token(state: &AppState, email: &str) -> String {
    let user = state
        .store
        .create_user("Plain User", email)
        .await
        .expect("user");
    state
        .store
        .issue_token(user.id, "test")
        .await
        .expect("token")
        .plain_text
}
