use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ThrottleError {
    #[error("policy {0} is already registered")]
    DuplicatePolicy(String),
    #[error("policy {0} is not registered")]
    UnknownPolicy(String),
    #[error("policy name must not be empty")]
    EmptyPolicyName,
    #[error("policy {0} must allow at least one request")]
    ZeroQuota(String),
    #[error("policy {0} must have a window of at least one second")]
    ZeroWindow(String),
    #[error("rate limit exceeded for policy {policy}; retry after {retry_after_secs}s")]
    RateLimitExceeded {
        policy: String,
        limit: u32,
        retry_after_secs: u64,
    },
}

pub type ThrottleResult<T> = Result<T, ThrottleError>;
