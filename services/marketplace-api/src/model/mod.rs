//! Marketplace data model module.
//!
//! # Purpose
//! Re-exports the CMS page, content block, user, and access-token models
//! shared by the store, CMS pipeline, and API layers.
mod page;
mod user;

pub use page::{Block, Page, PageContent, PageDraft, PresentedPage};
pub use user::{AccessToken, IssuedToken, User};
