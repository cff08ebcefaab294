//! CMS content ordering pipeline.
//!
//! # Purpose
//! Everything that happens to page content between the HTTP layer and the
//! page store: write-side validation, path derivation, read-side block
//! ordering, and the best-effort list criteria.
//!
//! # How it fits
//! Handlers call [`validate::validate_page_write`] before any store write and
//! [`present::present`] on every page they return. Nothing in this module
//! mutates stored content.
pub mod criteria;
pub mod path;
pub mod present;
pub mod validate;

pub use criteria::{CriteriaError, PageCriteria, SortDirection, SortField};
pub use path::derive_path;
pub use present::{present, sort_blocks};
pub use validate::{
    MAX_STRING_LENGTH, PageValidationError, ValidationErrors, validate_page, validate_page_write,
};
