//! Error types for predicates and bundles.

use thiserror::Error;

/// Result type for auth operations.
pub type Result<T> = std::result::Result<T, AuthError>;

/// Errors from predicate verification and bundle decoding.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("predicate signature verification failed")]
    BadSignature,

    #[error("predicate kind does not match its slot")]
    KindMismatch,

    #[error("predicate bound to a different principal")]
    AddressMismatch,

    #[error("malformed bundle: {0}")]
    Malformed(String),
}
