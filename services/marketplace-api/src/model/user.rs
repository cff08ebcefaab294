//! User and personal access token models.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq, Eq)]
pub struct User {
    pub id: u64,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

/// Stored token row. Only the SHA-256 digest of the secret is kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub id: u64,
    pub user_id: u64,
    pub name: String,
    pub token_hash: String,
    pub created_at: DateTime<Utc>,
}

/// A freshly issued token; `plain_text` is never retrievable again.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: AccessToken,
    pub plain_text: String,
}
