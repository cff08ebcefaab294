//! Storage ports for pages, identities, and access control.
//!
//! # Purpose
//! Handlers depend on these traits only. The in-memory backend in
//! [`memory`] implements all three; a durable backend would implement the
//! same traits.
//!
//! # Key invariants
//! - `slug` and `path` are unique across pages; a write that would break
//!   either fails with [`StoreError::UniqueViolation`] and changes nothing.
//! - User emails are unique; role and permission `(name, guard)` pairs are
//!   unique.
//! - Association writes are insert-if-absent and report whether a row was
//!   created.
use crate::model::{IssuedToken, Page, PageDraft, User};
use async_trait::async_trait;
use marketplace_authz::{Capability, Decision, Linked, Permission, Role, UserId};
use thiserror::Error;

pub mod memory;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },
    #[error("{field} is already taken")]
    UniqueViolation { field: &'static str },
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

impl StoreError {
    pub fn not_found(entity: &'static str, key: impl ToString) -> Self {
        StoreError::NotFound {
            entity,
            key: key.to_string(),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait PageStore: Send + Sync {
    async fn list_pages(&self) -> StoreResult<Vec<Page>>;
    async fn find_page(&self, id: u64) -> StoreResult<Page>;
    async fn find_page_by_slug(&self, slug: &str) -> StoreResult<Page>;
    async fn create_page(&self, draft: PageDraft) -> StoreResult<Page>;
    async fn update_page(&self, id: u64, draft: PageDraft) -> StoreResult<Page>;
    async fn delete_page(&self, id: u64) -> StoreResult<()>;
    /// Whether another page already uses `slug`; the page `except` is ignored.
    async fn slug_taken(&self, slug: &str, except: Option<u64>) -> StoreResult<bool>;
    async fn path_taken(&self, path: &str, except: Option<u64>) -> StoreResult<bool>;

    async fn health_check(&self) -> StoreResult<()>;
    fn is_durable(&self) -> bool;
    fn backend_name(&self) -> &'static str;
}

#[async_trait]
pub trait IdentityStore: Send + Sync {
    async fn create_user(&self, name: &str, email: &str) -> StoreResult<User>;
    async fn find_user(&self, id: u64) -> StoreResult<User>;
    async fn issue_token(&self, user_id: u64, name: &str) -> StoreResult<IssuedToken>;
    /// Owner of a plain-text token; `None` for unknown or malformed tokens.
    async fn user_for_token(&self, plain_text: &str) -> StoreResult<Option<User>>;
}

#[async_trait]
pub trait AccessStore: Send + Sync {
    async fn define_role(&self, name: &str, guard: &str) -> StoreResult<Role>;
    async fn define_permission(&self, name: &str, guard: &str) -> StoreResult<Permission>;
    async fn ensure_role(&self, name: &str, guard: &str) -> StoreResult<Role>;
    async fn ensure_permission(&self, name: &str, guard: &str) -> StoreResult<Permission>;
    async fn give_permission_to_role(
        &self,
        role: &str,
        permission: &str,
        guard: &str,
    ) -> StoreResult<Linked>;
    async fn assign_role(&self, user: UserId, role: &str, guard: &str) -> StoreResult<Linked>;
    async fn give_permission_to_user(
        &self,
        user: UserId,
        permission: &str,
        guard: &str,
    ) -> StoreResult<Linked>;
    async fn roles_of(&self, user: UserId) -> StoreResult<Vec<Role>>;
    async fn permissions_of(&self, user: UserId, guard: &str) -> StoreResult<Vec<String>>;
    async fn authorize(
        &self,
        user: Option<UserId>,
        capability: Capability,
        guard: &str,
    ) -> StoreResult<Decision>;
    /// Flip the one-shot bootstrap flag; `false` when it was already set.
    async fn claim_bootstrap(&self) -> StoreResult<bool>;
}

pub trait MarketplaceStore: PageStore + IdentityStore + AccessStore {}

impl<T> MarketplaceStore for T where T: PageStore + IdentityStore + AccessStore {}
