use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthzError {
    #[error("name must not be empty")]
    EmptyName,
    #[error("guard must not be empty")]
    EmptyGuard,
    #[error("role {name} already exists for guard {guard}")]
    DuplicateRole { name: String, guard: String },
    #[error("permission {name} already exists for guard {guard}")]
    DuplicatePermission { name: String, guard: String },
    #[error("unknown role id {0}")]
    UnknownRole(u64),
    #[error("unknown permission id {0}")]
    UnknownPermission(u64),
    #[error("role and permission guards differ: {role_guard} vs {permission_guard}")]
    GuardMismatch {
        role_guard: String,
        permission_guard: String,
    },
    #[error("authorization denied for {capability}")]
    Denied { capability: String },
}

pub type AuthzResult<T> = Result<T, AuthzError>;
