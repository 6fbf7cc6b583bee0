//! Error types for Passlock core.

use thiserror::Error;

/// Core errors that can occur during cryptographic operations.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid signature")]
    InvalidSignature,

    #[error("invalid public key")]
    InvalidKey,
}
