//! API error types and helpers.
//!
//! # Purpose and responsibility
//! Centralizes HTTP error response construction so every endpoint returns the
//! same `{code, message, request_id, errors?, retry_after?}` body.
//!
//! # Where it fits
//! Handlers and middleware use these helpers to turn rate-limit rejections,
//! authorization denials, validation failures, and store errors into HTTP
//! responses. This is the only place that mapping happens.
//!
//! # Key invariants and assumptions
//! - Error responses must include a stable `code` and human-readable `message`.
//! - Status codes must align with the error category.
//! - A `rate_limited` error always carries `Retry-After`.
//!
//! # Security considerations
//! - Internal errors log details server-side but return generic messages.
use crate::api::types::ErrorResponse;
use crate::cms::ValidationErrors;
use crate::store::StoreError;
use axum::Json;
use axum::http::header::RETRY_AFTER;
use axum::http::{HeaderValue, StatusCode};
use axum::response::IntoResponse;

/// Structured API error returned by handlers.
///
/// # What it does
/// Couples an HTTP status code with a JSON error body.
///
/// # Invariants
/// - `status` must match the semantics of `body.code`.
///
/// # Example
/// ```rust
/// use axum::http::StatusCode;
/// use marketplace_api::api::error::api_not_found;
///
/// let err = api_not_found("page not found");
/// assert_eq!(err.status, StatusCode::NOT_FOUND);
/// assert_eq!(err.body.code, "not_found");
/// ```
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorResponse,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let retry_after = self.body.retry_after;
        let mut response = (self.status, Json(self.body)).into_response();
        if let Some(seconds) = retry_after {
            response
                .headers_mut()
                .insert(RETRY_AFTER, HeaderValue::from(seconds));
        }
        response
    }
}

fn error(status: StatusCode, code: &str, message: &str) -> ApiError {
    ApiError {
        status,
        body: ErrorResponse {
            code: code.to_string(),
            message: message.to_string(),
            request_id: None,
            errors: None,
            retry_after: None,
        },
    }
}

/// Build a 404 Not Found error.
pub fn api_not_found(message: &str) -> ApiError {
    error(StatusCode::NOT_FOUND, "not_found", message)
}

/// Build a 404 error for disabled features.
///
/// Uses NOT_FOUND so a disabled endpoint is indistinguishable from a missing one.
pub fn api_not_enabled(message: &str) -> ApiError {
    error(StatusCode::NOT_FOUND, "not_enabled", message)
}

/// Build a 409 Conflict error with a caller-provided code.
pub fn api_conflict(code: &str, message: &str) -> ApiError {
    error(StatusCode::CONFLICT, code, message)
}

/// Build a 409 error for a write that lost a uniqueness race.
pub fn api_unique_violation(field: &str) -> ApiError {
    api_conflict("unique_violation", &format!("the {field} has already been taken"))
}

/// Build a 500 Internal Server Error from a store error.
///
/// # What it does
/// Logs the store error and returns a generic internal error response.
pub fn api_internal(message: &str, err: &StoreError) -> ApiError {
    tracing::error!(error = ?err, "marketplace storage error");
    error(StatusCode::INTERNAL_SERVER_ERROR, "internal", message)
}

/// Build a 500 Internal Server Error without a store error.
pub fn api_internal_message(message: &str) -> ApiError {
    error(StatusCode::INTERNAL_SERVER_ERROR, "internal", message)
}

/// Build a 401 Unauthorized error.
pub fn api_unauthorized(message: &str) -> ApiError {
    error(StatusCode::UNAUTHORIZED, "unauthorized", message)
}

/// Build a 403 Forbidden error.
pub fn api_forbidden(message: &str) -> ApiError {
    error(StatusCode::FORBIDDEN, "forbidden", message)
}

/// Build a 422 error carrying the per-field messages.
///
/// The summary `message` is the first field message, followed by a count of
/// the remaining ones.
pub fn api_validation_failed(errors: ValidationErrors) -> ApiError {
    let total: usize = errors.clone().into_map().values().map(Vec::len).sum();
    let first = errors
        .first_message()
        .unwrap_or("The given data was invalid.")
        .to_string();
    let message = match total {
        0 | 1 => first,
        n => format!("{first} (and {} more errors)", n - 1),
    };
    let mut err = error(StatusCode::UNPROCESSABLE_ENTITY, "validation_failed", &message);
    err.body.errors = Some(errors.into_map());
    err
}

/// Build a 422 error for a single field.
pub fn api_field_error(field: &str, message: &str) -> ApiError {
    let mut errors = ValidationErrors::new();
    errors.add(field, message);
    api_validation_failed(errors)
}

/// Build a 429 error for a rejected request.
pub fn api_rate_limited(policy: &str, retry_after_secs: u64) -> ApiError {
    let mut err = error(
        StatusCode::TOO_MANY_REQUESTS,
        "rate_limited",
        &format!("too many requests for {policy}; retry after {retry_after_secs} seconds"),
    );
    err.body.retry_after = Some(retry_after_secs);
    err
}

/// Map a store error to its HTTP shape.
///
/// `NotFound` and `UniqueViolation` become 404 and 409; anything else is
/// logged and reported as a generic 500 with `message`.
pub fn api_store_error(message: &str, err: StoreError) -> ApiError {
    match err {
        StoreError::NotFound { entity, .. } => api_not_found(&format!("{entity} not found")),
        StoreError::UniqueViolation { field } => api_unique_violation(field),
        other => api_internal(message, &other),
    }
}
