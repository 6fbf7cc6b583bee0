//! # Passlock Client
//!
//! The protocol orchestrator: arm a hash chain from a password,
//! authorize protected operations through the prepare/confirm two-step
//! under pre-signed predicates, cancel pending steps, and resume a
//! session from nothing but the password via the on-ledger credential
//! registry.
//!
//! The orchestrator is deliberately paranoid: both mark gates are
//! mandatory, a mismatch aborts the flow, and the protected operation
//! only ever travels inside its atomic batch.

pub mod boundary;
pub mod error;
pub mod registry;
pub mod session;

pub use boundary::next_prepare_boundary;
pub use error::ClientError;
pub use session::{check_password, Session, DEFAULT_CHAIN_LENGTH};
