//! Boundary math for the prepare step.
//!
//! Chain positions are laid out so that every prepare lands on a
//! multiple of 3: a boundary leaves exactly the two positions a confirm
//! needs (or the one a cancel needs) before the next boundary. Both
//! sides compute the same boundary independently from the public
//! counter, so the revealed value is never ambiguous.

use passlock_validator::prepare_span;

use crate::error::{ClientError, Result};

/// The multiple-of-3 boundary the next prepare from `counter` lands on.
///
/// `counter % 3 == 0` steps a full 3 (a boundary is a landing spot, not
/// a launch pad); otherwise the counter drops to the boundary just
/// below. Errors with [`ClientError::ChainExhausted`] when the chain
/// has no room left for the step.
pub fn next_prepare_boundary(counter: u64) -> Result<u64> {
    let span = prepare_span(counter);
    counter
        .checked_sub(span)
        .ok_or(ClientError::ChainExhausted)
}
