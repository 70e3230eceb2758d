//! Errors raised while building domain values from untrusted input.

use thiserror::Error;

pub type DomainResult<T> = Result<T, DomainError>;

/// Rejection of a catalog field or an identifier. Both are the caller's to fix.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A field such as a label, price or username was out of range.
    #[error("validation failed: {0}")]
    Validation(String),

    /// An id was not a positive integer.
    #[error("invalid identifier: {0}")]
    InvalidId(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }
}
