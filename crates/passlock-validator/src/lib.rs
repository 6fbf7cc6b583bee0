//! # Passlock Validator
//!
//! The deterministic state validator: a pure transition function over a
//! principal's persisted `{counter, secret, mark}` triple, evaluated by
//! the ledger on every submitted call.
//!
//! No I/O and no external calls. The ledger owns the persisted state and
//! exercises a read-then-validate-then-write contract per operation,
//! expressed here as `(state, call) -> Result<Transition, Rejection>`.
//!
//! ## Invariants
//!
//! - `mark` is empty before any `prepare`, non-empty immediately after an
//!   accepted `prepare`, and reset by the next accepted `confirm` or
//!   `cancel`.
//! - `secret` always equals `chain(seed, counter)` for the seed fixed at
//!   the last `setup`.
//! - `counter` only decreases; `setup` is the only call permitted to
//!   increase it.
//! - `counter` never wraps: a decrement that would underflow rejects.

pub mod error;
pub mod state;
pub mod transition;

pub use error::Rejection;
pub use state::{PrincipalState, StatePosition};
pub use transition::{apply, prepare_span, CallContext, Transition};
