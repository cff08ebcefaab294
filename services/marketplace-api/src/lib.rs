//! Marketplace API service library crate.
//!
//! # Purpose
//! Exposes the HTTP surface, request middleware, CMS pipeline, configuration,
//! and storage implementations for use by the binary and tests.
//!
//! # Notes
//! Module boundaries mirror the request pipeline: `middleware` admits or
//! rejects, `auth` authorizes, `cms` validates and presents, `store` persists.
pub mod api;
pub mod app;
pub mod auth;
pub mod cms;
pub mod config;
pub mod middleware;
pub mod model;
pub mod observability;
pub mod store;
