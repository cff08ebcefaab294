//! In-memory implementation of the marketplace stores.
//!
//! # Purpose
//! Implements [`PageStore`], [`IdentityStore`] and [`AccessStore`] with maps
//! guarded by `tokio::sync::RwLock`. Used for local development, tests, and
//! deployments that do not need durability.
//!
//! # Durability and consistency
//! - **Not durable**: all state is lost on process restart.
//! - **Single-process consistency**: each table has one lock. Uniqueness
//!   checks and the insert they guard happen under the same write guard, so
//!   two concurrent writers of the same slug cannot both succeed.
//!
//! # Metrics
//! Page mutations are counted and the page total is exported as a gauge.
use super::{AccessStore, IdentityStore, PageStore, StoreError, StoreResult};
use crate::auth::tokens;
use crate::model::{AccessToken, IssuedToken, Page, PageDraft, User};
use anyhow::anyhow;
use async_trait::async_trait;
use chrono::Utc;
use marketplace_authz::{
    AccessGraph, AuthzError, Capability, Decision, Linked, Permission, Role, UserId,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Pages plus their unique indexes.
#[derive(Default)]
struct PageTable {
    next_id: u64,
    rows: BTreeMap<u64, Page>,
    slugs: HashMap<String, u64>,
    paths: HashMap<String, u64>,
}

impl PageTable {
    /// Fails when `slug` or `path` belongs to a page other than `except`.
    fn check_unique(&self, draft: &PageDraft, except: Option<u64>) -> StoreResult<()> {
        let foreign = |owner: Option<&u64>| owner.is_some_and(|id| Some(*id) != except);
        if foreign(self.slugs.get(&draft.slug)) {
            return Err(StoreError::UniqueViolation { field: "slug" });
        }
        if foreign(self.paths.get(&draft.path)) {
            return Err(StoreError::UniqueViolation { field: "path" });
        }
        Ok(())
    }

    fn index(&mut self, page: &Page) {
        self.slugs.insert(page.slug.clone(), page.id);
        self.paths.insert(page.path.clone(), page.id);
    }

    fn unindex(&mut self, page: &Page) {
        self.slugs.remove(&page.slug);
        self.paths.remove(&page.path);
    }
}

#[derive(Default)]
struct UserTable {
    next_id: u64,
    rows: BTreeMap<u64, User>,
    emails: HashMap<String, u64>,
}

#[derive(Default)]
struct TokenTable {
    next_id: u64,
    rows: HashMap<u64, AccessToken>,
}

#[derive(Default)]
struct AccessState {
    graph: AccessGraph,
    bootstrapped: bool,
}

#[derive(Clone, Default)]
pub struct InMemoryStore {
    pages: Arc<RwLock<PageTable>>,
    users: Arc<RwLock<UserTable>>,
    tokens: Arc<RwLock<TokenTable>>,
    access: Arc<RwLock<AccessState>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn record_page_change(op: &'static str, total: usize) {
    metrics::counter!("marketplace_cms_page_changes_total", "op" => op).increment(1);
    metrics::gauge!("marketplace_cms_pages_total").set(total as f64);
}

/// Translate graph errors into store errors.
fn access_error(err: AuthzError) -> StoreError {
    match err {
        AuthzError::DuplicateRole { .. } | AuthzError::DuplicatePermission { .. } => {
            StoreError::UniqueViolation { field: "name" }
        }
        AuthzError::UnknownRole(id) => StoreError::not_found("role", id),
        AuthzError::UnknownPermission(id) => StoreError::not_found("permission", id),
        other => StoreError::Unexpected(anyhow!(other)),
    }
}

#[async_trait]
impl PageStore for InMemoryStore {
    async fn list_pages(&self) -> StoreResult<Vec<Page>> {
        Ok(self.pages.read().await.rows.values().cloned().collect())
    }

    async fn find_page(&self, id: u64) -> StoreResult<Page> {
        self.pages
            .read()
            .await
            .rows
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("page", id))
    }

    async fn find_page_by_slug(&self, slug: &str) -> StoreResult<Page> {
        let pages = self.pages.read().await;
        pages
            .slugs
            .get(slug)
            .and_then(|id| pages.rows.get(id))
            .cloned()
            .ok_or_else(|| StoreError::not_found("page", slug))
    }

    async fn create_page(&self, draft: PageDraft) -> StoreResult<Page> {
        let mut pages = self.pages.write().await;
        pages.check_unique(&draft, None)?;
        pages.next_id += 1;
        let now = Utc::now();
        let page = Page {
            id: pages.next_id,
            slug: draft.slug,
            path: draft.path,
            title: draft.title,
            content: draft.content,
            meta: draft.meta,
            created_at: now,
            updated_at: now,
        };
        pages.index(&page);
        pages.rows.insert(page.id, page.clone());
        record_page_change("created", pages.rows.len());
        Ok(page)
    }

    async fn update_page(&self, id: u64, draft: PageDraft) -> StoreResult<Page> {
        let mut pages = self.pages.write().await;
        let current = pages
            .rows
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("page", id))?;
        pages.check_unique(&draft, Some(id))?;
        let page = Page {
            id,
            slug: draft.slug,
            path: draft.path,
            title: draft.title,
            content: draft.content,
            meta: draft.meta,
            created_at: current.created_at,
            updated_at: Utc::now(),
        };
        pages.unindex(&current);
        pages.index(&page);
        pages.rows.insert(id, page.clone());
        record_page_change("updated", pages.rows.len());
        Ok(page)
    }

    async fn delete_page(&self, id: u64) -> StoreResult<()> {
        let mut pages = self.pages.write().await;
        let page = pages
            .rows
            .remove(&id)
            .ok_or_else(|| StoreError::not_found("page", id))?;
        pages.unindex(&page);
        record_page_change("deleted", pages.rows.len());
        Ok(())
    }

    async fn slug_taken(&self, slug: &str, except: Option<u64>) -> StoreResult<bool> {
        let pages = self.pages.read().await;
        Ok(pages
            .slugs
            .get(slug)
            .is_some_and(|id| Some(*id) != except))
    }

    async fn path_taken(&self, path: &str, except: Option<u64>) -> StoreResult<bool> {
        let pages = self.pages.read().await;
        Ok(pages
            .paths
            .get(path)
            .is_some_and(|id| Some(*id) != except))
    }

    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }

    fn is_durable(&self) -> bool {
        false
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[async_trait]
impl IdentityStore for InMemoryStore {
    async fn create_user(&self, name: &str, email: &str) -> StoreResult<User> {
        let email_key = email.to_lowercase();
        let mut users = self.users.write().await;
        if users.emails.contains_key(&email_key) {
            return Err(StoreError::UniqueViolation { field: "email" });
        }
        users.next_id += 1;
        let user = User {
            id: users.next_id,
            name: name.to_string(),
            email: email.to_string(),
            created_at: Utc::now(),
        };
        users.emails.insert(email_key, user.id);
        users.rows.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_user(&self, id: u64) -> StoreResult<User> {
        self.users
            .read()
            .await
            .rows
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("user", id))
    }

    async fn issue_token(&self, user_id: u64, name: &str) -> StoreResult<IssuedToken> {
        if !self.users.read().await.rows.contains_key(&user_id) {
            return Err(StoreError::not_found("user", user_id));
        }
        let secret = tokens::generate_secret();
        let mut table = self.tokens.write().await;
        table.next_id += 1;
        let token = AccessToken {
            id: table.next_id,
            user_id,
            name: name.to_string(),
            token_hash: tokens::hash_secret(&secret),
            created_at: Utc::now(),
        };
        table.rows.insert(token.id, token.clone());
        let plain_text = tokens::plain_text_token(token.id, &secret);
        Ok(IssuedToken { token, plain_text })
    }

    async fn user_for_token(&self, plain_text: &str) -> StoreResult<Option<User>> {
        let Some((token_id, secret)) = tokens::split_token(plain_text) else {
            return Ok(None);
        };
        let user_id = {
            let table = self.tokens.read().await;
            match table.rows.get(&token_id) {
                Some(token)
                    if tokens::constant_time_eq(
                        token.token_hash.as_bytes(),
                        tokens::hash_secret(secret).as_bytes(),
                    ) =>
                {
                    token.user_id
                }
                _ => return Ok(None),
            }
        };
        Ok(self.users.read().await.rows.get(&user_id).cloned())
    }
}

#[async_trait]
impl AccessStore for InMemoryStore {
    async fn define_role(&self, name: &str, guard: &str) -> StoreResult<Role> {
        let mut access = self.access.write().await;
        let id = access.graph.define_role(name, guard).map_err(access_error)?;
        role_by_id(&access.graph, id)
    }

    async fn define_permission(&self, name: &str, guard: &str) -> StoreResult<Permission> {
        let mut access = self.access.write().await;
        let id = access
            .graph
            .define_permission(name, guard)
            .map_err(access_error)?;
        permission_by_id(&access.graph, id)
    }

    async fn ensure_role(&self, name: &str, guard: &str) -> StoreResult<Role> {
        let mut access = self.access.write().await;
        let id = access
            .graph
            .find_or_define_role(name, guard)
            .map_err(access_error)?;
        role_by_id(&access.graph, id)
    }

    async fn ensure_permission(&self, name: &str, guard: &str) -> StoreResult<Permission> {
        let mut access = self.access.write().await;
        let id = access
            .graph
            .find_or_define_permission(name, guard)
            .map_err(access_error)?;
        permission_by_id(&access.graph, id)
    }

    async fn give_permission_to_role(
        &self,
        role: &str,
        permission: &str,
        guard: &str,
    ) -> StoreResult<Linked> {
        let mut access = self.access.write().await;
        let role_id = access
            .graph
            .role_id(role, guard)
            .ok_or_else(|| StoreError::not_found("role", role))?;
        let permission_id = access
            .graph
            .permission_id(permission, guard)
            .ok_or_else(|| StoreError::not_found("permission", permission))?;
        access
            .graph
            .give_permission_to_role(role_id, permission_id)
            .map_err(access_error)
    }

    async fn assign_role(&self, user: UserId, role: &str, guard: &str) -> StoreResult<Linked> {
        let mut access = self.access.write().await;
        let role_id = access
            .graph
            .role_id(role, guard)
            .ok_or_else(|| StoreError::not_found("role", role))?;
        access
            .graph
            .assign_role(user, role_id)
            .map_err(access_error)
    }

    async fn give_permission_to_user(
        &self,
        user: UserId,
        permission: &str,
        guard: &str,
    ) -> StoreResult<Linked> {
        let mut access = self.access.write().await;
        let permission_id = access
            .graph
            .permission_id(permission, guard)
            .ok_or_else(|| StoreError::not_found("permission", permission))?;
        access
            .graph
            .give_permission_to_user(user, permission_id)
            .map_err(access_error)
    }

    async fn roles_of(&self, user: UserId) -> StoreResult<Vec<Role>> {
        Ok(self.access.read().await.graph.roles_of(user))
    }

    async fn permissions_of(&self, user: UserId, guard: &str) -> StoreResult<Vec<String>> {
        Ok(self
            .access
            .read()
            .await
            .graph
            .effective_permissions(user, guard)
            .into_iter()
            .collect())
    }

    async fn authorize(
        &self,
        user: Option<UserId>,
        capability: Capability,
        guard: &str,
    ) -> StoreResult<Decision> {
        Ok(self
            .access
            .read()
            .await
            .graph
            .authorize(user, capability, guard))
    }

    async fn claim_bootstrap(&self) -> StoreResult<bool> {
        let mut access = self.access.write().await;
        if access.bootstrapped {
            return Ok(false);
        }
        access.bootstrapped = true;
        Ok(true)
    }
}

fn role_by_id(graph: &AccessGraph, id: marketplace_authz::RoleId) -> StoreResult<Role> {
    graph
        .role(id)
        .cloned()
        .ok_or_else(|| StoreError::not_found("role", id.0))
}

fn permission_by_id(
    graph: &AccessGraph,
    id: marketplace_authz::PermissionId,
) -> StoreResult<Permission> {
    graph
        .permission(id)
        .cloned()
        .ok_or_else(|| StoreError::not_found("permission", id.0))
}
