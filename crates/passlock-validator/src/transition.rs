//! The transition function.
//!
//! One entry point, [`apply`], evaluated per submitted call. The original
//! validator advanced `prepare` with a bounded reveal-and-rehash loop;
//! here that loop is the closed-form span below, which is equivalent and
//! removes the off-by-one risk.

use passlock_core::{chain, Address, Call, OpId};

use crate::error::Rejection;
use crate::state::PrincipalState;

/// How many chain positions a prepare at `counter` consumes.
///
/// The prepare always lands on the next multiple-of-3 boundary strictly
/// below `counter`, so the span is in `{1, 2, 3}`. A boundary leaves room
/// for exactly one of {confirm (2 positions), cancel (1 position)}, and
/// any observer can recompute the boundary from the last counter value
/// alone.
pub fn prepare_span(counter: u64) -> u64 {
    match counter % 3 {
        0 => 3,
        rem => rem,
    }
}

/// Facts about the submitted operation the transition needs beyond the
/// call payload.
#[derive(Debug, Clone)]
pub struct CallContext {
    /// The calling principal (whose state is addressed).
    pub sender: Address,
    /// The root principal that created this validator instance.
    pub root: Address,
    /// This operation's own content-addressed identifier. `confirm`
    /// checks it against the pending mark.
    pub op_id: OpId,
}

/// Effect of an accepted call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Replace the caller's state.
    Updated(PrincipalState),
    /// Remove the caller's state.
    Cleared,
    /// Replace the validator program (app-level effect).
    AppUpdated,
    /// Delete the validator instance (app-level effect).
    AppDeleted,
}

/// Evaluate one call against the caller's current state.
///
/// `state` is `None` when the caller has never registered. Pure: the
/// ledger applies the returned transition only after the whole batch is
/// accepted.
pub fn apply(
    state: Option<&PrincipalState>,
    ctx: &CallContext,
    call: &Call,
) -> Result<Transition, Rejection> {
    match call {
        Call::Register => {
            if state.is_some() {
                return Err(Rejection::AlreadyRegistered);
            }
            Ok(Transition::Updated(PrincipalState::registered()))
        }

        Call::Update => {
            if ctx.sender != ctx.root {
                return Err(Rejection::NotAuthorized);
            }
            Ok(Transition::AppUpdated)
        }

        Call::Delete => {
            if ctx.sender != ctx.root {
                return Err(Rejection::NotAuthorized);
            }
            Ok(Transition::AppDeleted)
        }

        Call::Clear => {
            state.ok_or(Rejection::NotRegistered)?;
            Ok(Transition::Cleared)
        }

        // Setup carries no delegated predicate, so reaching this point
        // already required the caller's own root signature.
        Call::Setup { top, length } => {
            state.ok_or(Rejection::NotRegistered)?;
            if *length == 0 {
                return Err(Rejection::MalformedCall("setup length must be positive"));
            }
            Ok(Transition::Updated(PrincipalState {
                counter: *length,
                secret: Some(*top),
                mark: None,
            }))
        }

        Call::Prepare { reveal, mark } => {
            let state = state.ok_or(Rejection::NotRegistered)?;
            if state.mark.is_some() {
                return Err(Rejection::MarkBusy);
            }
            if mark.is_empty() {
                return Err(Rejection::MalformedCall("prepare mark must be non-empty"));
            }
            let secret = state.secret.ok_or(Rejection::ChainMismatch)?;

            let span = prepare_span(state.counter);
            if state.counter < span {
                return Err(Rejection::ChainExhausted);
            }
            if chain(reveal, span) != secret {
                return Err(Rejection::ChainMismatch);
            }

            Ok(Transition::Updated(PrincipalState {
                counter: state.counter - span,
                secret: Some(*reveal),
                mark: Some(mark.clone()),
            }))
        }

        Call::Confirm { reveal } => {
            let state = state.ok_or(Rejection::NotRegistered)?;
            let mark = state.mark.as_ref().ok_or(Rejection::MarkMissing)?;
            if state.counter < 2 {
                return Err(Rejection::ChainExhausted);
            }
            let secret = state.secret.ok_or(Rejection::ChainMismatch)?;
            if chain(reveal, 2) != secret {
                return Err(Rejection::ChainMismatch);
            }
            // Self-referential binding: the prepare's mark must name this
            // exact operation instance. The orchestrator precomputes the
            // id before submission, so this is an ordinary byte compare.
            if mark.as_bytes() != ctx.op_id.as_bytes() {
                return Err(Rejection::MarkMismatch);
            }

            Ok(Transition::Updated(PrincipalState {
                counter: state.counter - 2,
                secret: Some(*reveal),
                mark: None,
            }))
        }

        Call::Cancel { reveal } => {
            let state = state.ok_or(Rejection::NotRegistered)?;
            if state.counter < 1 {
                return Err(Rejection::ChainExhausted);
            }
            let secret = state.secret.ok_or(Rejection::ChainMismatch)?;
            if chain(reveal, 1) != secret {
                return Err(Rejection::ChainMismatch);
            }

            Ok(Transition::Updated(PrincipalState {
                counter: state.counter - 1,
                secret: Some(*reveal),
                mark: None,
            }))
        }
    }
}
