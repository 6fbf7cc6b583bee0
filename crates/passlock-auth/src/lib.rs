//! # Passlock Auth
//!
//! Delegated authorization predicates and the credential bundle codec.
//!
//! A predicate is a narrowly-scoped capability pre-signed by a
//! principal's root key: whoever holds it may submit operations matching
//! its exact shape, and nothing else. Four predicates cover the protocol
//! surface (`prepare`, `confirm`, `cancel`, and the batch-position-bound
//! `confirmLink`); bundled together with the principal's address they
//! form the credential blob persisted in the ledger's note log.

pub mod bundle;
pub mod error;
pub mod predicate;

pub use bundle::CredentialBundle;
pub use error::AuthError;
pub use predicate::{Predicate, PredicateKind};
