//! Request middleware: caller resolution and rate limiting.
//!
//! # Purpose
//! [`authenticate`] runs for every API request and stores a [`Caller`] in
//! the request extensions. [`throttle`] is layered per route group with a
//! [`PolicyGate`] naming the policy that guards it; a rejected request never
//! reaches its handler.
//!
//! # Key invariants
//! - An unknown or malformed bearer token yields an anonymous caller, never
//!   an error: the authorizer is the gate for writes.
//! - Every response that passed the limiter carries `X-RateLimit-Limit` and
//!   `X-RateLimit-Remaining`.
use crate::api::error::{api_internal_message, api_rate_limited};
use crate::app::AppState;
use crate::auth::identity::{Caller, bearer_token, client_address};
use axum::extract::{ConnectInfo, Request, State};
use axum::http::{HeaderMap, HeaderValue};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use marketplace_throttle::ThrottleError;
use std::net::SocketAddr;

pub const RATE_LIMIT_LIMIT_HEADER: &str = "x-ratelimit-limit";
pub const RATE_LIMIT_REMAINING_HEADER: &str = "x-ratelimit-remaining";

/// Resolve the caller and attach it to the request.
pub async fn authenticate(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    mut request: Request,
    next: Next,
) -> Response {
    let caller = resolve_caller(&state, connect_info, request.headers()).await;
    request.extensions_mut().insert(caller);
    next.run(request).await
}

async fn resolve_caller(
    state: &AppState,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: &HeaderMap,
) -> Caller {
    let address = client_address(
        headers,
        connect_info.map(|ConnectInfo(addr)| addr),
        state.trust_forwarded_for,
    );
    let Some(token) = bearer_token(headers) else {
        return Caller::anonymous(address);
    };
    match state.store.user_for_token(token).await {
        Ok(Some(user)) => Caller::authenticated(user, address),
        Ok(None) => {
            tracing::debug!("bearer token did not match any user");
            Caller::anonymous(address)
        }
        Err(err) => {
            tracing::error!(error = ?err, "token lookup failed");
            Caller::anonymous(address)
        }
    }
}

/// Rate-limit policy guarding one group of routes.
#[derive(Clone)]
pub struct PolicyGate {
    pub state: AppState,
    pub policy: &'static str,
}

impl PolicyGate {
    pub fn new(state: AppState, policy: &'static str) -> Self {
        Self { state, policy }
    }
}

/// Admit or reject the request under the gate's policy.
pub async fn throttle(
    State(gate): State<PolicyGate>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    request: Request,
    next: Next,
) -> Response {
    let identity = match request.extensions().get::<Caller>() {
        Some(caller) => caller.identity.clone(),
        None => {
            resolve_caller(&gate.state, connect_info, request.headers())
                .await
                .identity
        }
    };
    match gate.state.limiter.admit(gate.policy, &identity) {
        Ok(decision) => {
            let mut response = next.run(request).await;
            set_limit_headers(&mut response, decision.limit(), decision.remaining());
            response
        }
        Err(ThrottleError::RateLimitExceeded {
            limit,
            retry_after_secs,
            ..
        }) => {
            tracing::warn!(
                policy = gate.policy,
                key = %identity.resolve(),
                retry_after_secs,
                "request rate limited"
            );
            let mut response = api_rate_limited(gate.policy, retry_after_secs).into_response();
            set_limit_headers(&mut response, limit, 0);
            response
        }
        Err(err) => {
            tracing::error!(error = %err, policy = gate.policy, "rate limiter misconfigured");
            api_internal_message("rate limiter unavailable").into_response()
        }
    }
}

fn set_limit_headers(response: &mut Response, limit: u32, remaining: u32) {
    let headers = response.headers_mut();
    headers.insert(RATE_LIMIT_LIMIT_HEADER, HeaderValue::from(limit));
    headers.insert(RATE_LIMIT_REMAINING_HEADER, HeaderValue::from(remaining));
}
