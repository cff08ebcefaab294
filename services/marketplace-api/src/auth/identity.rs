//! Caller resolution for inbound requests.
//!
//! # Purpose
//! Derives who is calling (bearer token owner, if any) and from where (peer
//! address, or the first `X-Forwarded-For` hop when the deployment sits
//! behind a trusted proxy).
use crate::model::User;
use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use marketplace_authz::UserId;
use marketplace_throttle::{Identity, UNKNOWN_ADDRESS};
use std::net::SocketAddr;

pub const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";

/// Resolved caller, stored in request extensions by the authentication
/// middleware.
#[derive(Debug, Clone)]
pub struct Caller {
    pub user: Option<User>,
    pub identity: Identity,
}

impl Caller {
    pub fn anonymous(address: impl Into<String>) -> Self {
        Self {
            user: None,
            identity: Identity::anonymous(address),
        }
    }

    pub fn authenticated(user: User, address: impl Into<String>) -> Self {
        let identity = Identity::authenticated(user.id, address);
        Self {
            user: Some(user),
            identity,
        }
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.user.as_ref().map(|user| UserId(user.id))
    }
}

/// Token from an `Authorization: Bearer ...` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Network address used for address-keyed rate limits.
pub fn client_address(
    headers: &HeaderMap,
    peer: Option<SocketAddr>,
    trust_forwarded_for: bool,
) -> String {
    if trust_forwarded_for {
        let forwarded = headers
            .get(FORWARDED_FOR_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(',').next())
            .map(str::trim)
            .filter(|value| !value.is_empty());
        if let Some(address) = forwarded {
            return address.to_string();
        }
    }
    match peer {
        Some(peer) => peer.ip().to_string(),
        None => UNKNOWN_ADDRESS.to_string(),
    }
}
