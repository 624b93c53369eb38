use thiserror::Error;

/// Result type for authorization checks.
pub type AuthResult<T> = Result<T, AuthError>;

/// Identity/authorization failure at the request boundary.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// The caller could not be identified (missing or malformed identity).
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The caller is identified but lacks the required capability.
    #[error("forbidden: {0}")]
    Forbidden(String),
}

impl AuthError {
    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }
}
