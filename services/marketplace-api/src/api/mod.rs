//! Marketplace HTTP API module.
//!
//! # Purpose
//! Exposes route handler modules and shared helpers for body parsing.
pub mod admin;
pub mod bootstrap;
pub mod cms_pages;
pub mod error;
pub mod openapi;
pub mod system;
pub mod types;

use crate::api::error::{ApiError, api_field_error};
use axum::Json;
use axum::extract::rejection::JsonRejection;

/// Unwrap a JSON body extracted as `Result`, reporting rejections as 422.
///
/// Handlers extract bodies this way so authorization can run before the body
/// is looked at.
pub(crate) fn parse_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    match body {
        Ok(Json(value)) => Ok(value),
        Err(rejection) => Err(api_field_error("body", &rejection.body_text())),
    }
}
