//! # Passlock Ledger
//!
//! The ledger abstraction the protocol runs against, plus an in-memory
//! implementation.
//!
//! A ledger accepts authorized operations (singly or as all-or-nothing
//! batches), runs app calls through the validator's transition function,
//! and exposes two read paths: per-principal validator state and a
//! note-prefix search over the committed log. The client crate drives
//! the whole protocol through these traits and never sees a concrete
//! backend.

pub mod error;
pub mod memory;
pub mod traits;

pub use error::LedgerError;
pub use memory::MemoryLedger;
pub use traits::{
    AppInfo, Authorization, Ledger, LogEntry, LogSearch, Receipt, SubmittedOp,
};
