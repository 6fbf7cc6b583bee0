//! Rejection reasons produced by the validator.
//!
//! A rejection is final for the submitted payload: retrying the same
//! value cannot succeed, the caller must recompute from a correct chain
//! position (or re-run setup).

use thiserror::Error;

/// Why the validator refused a call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("principal already registered")]
    AlreadyRegistered,

    #[error("principal not registered")]
    NotRegistered,

    #[error("caller is not the app root")]
    NotAuthorized,

    #[error("a prepare is already pending (mark non-empty)")]
    MarkBusy,

    #[error("no pending prepare to consume")]
    MarkMissing,

    #[error("mark does not match this operation's identifier")]
    MarkMismatch,

    #[error("revealed value does not chain to the current secret")]
    ChainMismatch,

    #[error("chain exhausted: counter would underflow")]
    ChainExhausted,

    #[error("malformed call: {0}")]
    MalformedCall(&'static str),
}
