//! # Passlock Core
//!
//! Pure primitives for the Passlock protocol: hash-chain credential
//! derivation, the closed vocabulary of ledger operations, and canonical
//! encoding.
//!
//! This crate contains no I/O, no storage, no networking. It is pure
//! computation over cryptographic data structures.
//!
//! ## Key Types
//!
//! - [`Digest`] - A 32-byte Blake3 digest, the hash-chain element
//! - [`Address`] - A principal's address (Ed25519 public key bytes)
//! - [`Operation`] - The closed tagged union of submittable operations
//! - [`OpId`] - Content-addressed operation identifier
//!
//! ## Derivation
//!
//! [`derive::chain`] walks the one-way hash chain; [`derive::stretch`]
//! hardens a raw password with salted PBKDF2 before chaining.

pub mod canonical;
pub mod crypto;
pub mod derive;
pub mod error;
pub mod operation;

pub use canonical::{assign_group, canonical_bytes, canonical_value_bytes, group_id, op_id};
pub use crypto::{Address, Digest, Keypair, Signature};
pub use derive::{chain, gen_password, gen_salt, stretch, DEFAULT_STRETCH_ITERATIONS, SALT_LEN};
pub use error::CoreError;
pub use operation::{AppId, Call, GroupId, Mark, OpId, Operation};
