//! Authentication and authorization glue for the marketplace API.
//!
//! # Purpose
//! Turns bearer tokens into users, derives the caller's rate-limit identity,
//! and enforces capabilities before mutating handlers touch the store.
pub mod guard;
pub mod identity;
pub mod roles;
pub mod tokens;
