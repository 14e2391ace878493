//! Application error model
//!
//! Defines a typed error hierarchy using `thiserror` for internal error
//! handling. These errors never reach an operation caller directly: the
//! operation layer is total and converts every failure into the sentinel
//! result shapes documented on the operation types.

use thiserror::Error;

/// Application error type
///
/// Covers the failure cases the gateway, the normalizer, and the external
/// text-transformation client may encounter.
#[derive(Debug, Error)]
pub enum AppError {
    /// Invalid input (validation failed, malformed request)
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Resource not found (mailbox, message, stored record)
    #[error("not found: {0}")]
    NotFound(String),
    /// Authentication failure (bad credentials, account disabled)
    #[error("authentication failed: {0}")]
    AuthFailed(String),
    /// Operation timeout (TCP connect, TLS handshake, IMAP response)
    #[error("operation timed out: {0}")]
    Timeout(String),
    /// External service failure (non-2xx status, undecodable reply)
    #[error("upstream error: {0}")]
    Upstream(String),
    /// Internal error (unexpected failure, external crate error)
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Convenience constructor for `InvalidInput`
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Convenience constructor for `Upstream`
    pub fn upstream(msg: impl Into<String>) -> Self {
        Self::Upstream(msg.into())
    }
}

/// Type alias for fallible return values
///
/// Use this for all internal functions that can fail. Provides a consistent
/// error type throughout the codebase.
pub type AppResult<T> = Result<T, AppError>;
