//! CMS page and content block models.
//!
//! # Purpose
//! Defines the stored page shape, the draft accepted by the store, and the
//! presentation shape returned by the read endpoints.
//!
//! # Key invariants
//! - `path` on a stored page always starts with `/`.
//! - Stored block order is whatever the writer submitted; sorting happens
//!   only when a page is presented.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;

/// One structured content block.
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq)]
pub struct Block {
    #[serde(rename = "type")]
    pub kind: String,
    pub order: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub props: Option<Map<String, Value>>,
}

/// Page content as persisted.
///
/// Records written through the validator are always `Blocks`; anything that
/// does not have the block shape (legacy rows, imported data) is kept as
/// `Opaque` and passed through untouched on read.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum PageContent {
    Blocks(Vec<Block>),
    Opaque(Value),
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq)]
pub struct Page {
    pub id: u64,
    pub slug: String,
    pub path: String,
    pub title: String,
    #[schema(value_type = Option<Vec<Block>>)]
    pub content: Option<PageContent>,
    #[schema(value_type = Object)]
    pub meta: Map<String, Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Validated write payload handed to the page store.
#[derive(Debug, Clone, PartialEq)]
pub struct PageDraft {
    pub slug: String,
    pub path: String,
    pub title: String,
    pub content: Option<PageContent>,
    pub meta: Map<String, Value>,
}

/// Read-side view of a page with its blocks in display order.
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq)]
pub struct PresentedPage {
    pub id: u64,
    pub slug: String,
    pub path: String,
    pub title: String,
    #[schema(value_type = Option<Vec<Block>>)]
    pub content: Option<PageContent>,
    #[schema(value_type = Object)]
    pub meta: Map<String, Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
