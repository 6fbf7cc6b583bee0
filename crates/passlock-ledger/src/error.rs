//! Ledger error types.

use thiserror::Error;

use passlock_auth::AuthError;
use passlock_core::AppId;
use passlock_validator::Rejection;

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;

/// Errors from submitting to or querying a ledger.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("unknown app {0}")]
    UnknownApp(AppId),

    #[error("operation not authorized")]
    NotAuthorized,

    #[error("credential error: {0}")]
    Auth(#[from] AuthError),

    #[error("validator rejected the call: {0}")]
    Rejected(#[from] Rejection),

    #[error("batch group binding is missing or inconsistent")]
    BadGroup,

    #[error("empty batch")]
    EmptyBatch,
}
