//! Client error types.

use thiserror::Error;

use passlock_auth::AuthError;
use passlock_ledger::LedgerError;

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors from the protocol orchestrator.
///
/// `StateConflict` and `ChainExhausted` are terminal for the current
/// flow: the session fails closed and the caller must re-read state (or
/// re-setup) before trying again. Ledger rejections are never retried.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("on-ledger state does not match the expected mark; flow aborted")]
    StateConflict,

    #[error("hash chain exhausted; a new setup is required")]
    ChainExhausted,

    #[error("no matching credentials or state found")]
    NotFound,

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Auth(#[from] AuthError),
}
