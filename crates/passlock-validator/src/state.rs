//! Per-principal persisted state.

use serde::{Deserialize, Serialize};

use passlock_core::{Digest, Mark};

/// The persisted `{counter, secret, mark}` triple for one principal on
/// one validator instance.
///
/// Owned exclusively by the validator; mutated only through accepted
/// calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrincipalState {
    /// Current position in the chain; strictly non-increasing between
    /// setups.
    pub counter: u64,

    /// The chain value currently considered "next to be revealed
    /// downward". Empty only before the first setup.
    pub secret: Option<Digest>,

    /// Non-empty exactly while a prepare has been accepted and no
    /// matching confirm/cancel has consumed it.
    pub mark: Option<Mark>,
}

/// Where in the protocol a principal's state sits, as an observer can
/// tell from the triple alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatePosition {
    /// Registered but never armed: no secret yet.
    WaitSetup,
    /// Armed, no prepare pending: the next move is a prepare (or cancel).
    WaitPrepare,
    /// A prepare is pending: the next move is its confirm or a cancel.
    WaitConfirm,
}

impl PrincipalState {
    /// The freshly-registered state: everything zeroed.
    pub fn registered() -> Self {
        Self {
            counter: 0,
            secret: None,
            mark: None,
        }
    }

    /// Classify the state.
    pub fn position(&self) -> StatePosition {
        if self.secret.is_none() {
            StatePosition::WaitSetup
        } else if self.mark.is_some() {
            StatePosition::WaitConfirm
        } else {
            StatePosition::WaitPrepare
        }
    }

    /// Whether the chain is exhausted for further prepares.
    pub fn exhausted(&self) -> bool {
        let span = crate::transition::prepare_span(self.counter);
        self.counter < span
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use passlock_core::Mark;

    #[test]
    fn test_registered_state_is_wait_setup() {
        let state = PrincipalState::registered();
        assert_eq!(state.position(), StatePosition::WaitSetup);
        assert_eq!(state.counter, 0);
    }

    #[test]
    fn test_position_transitions() {
        let mut state = PrincipalState {
            counter: 999,
            secret: Some(Digest::hash(b"secret")),
            mark: None,
        };
        assert_eq!(state.position(), StatePosition::WaitPrepare);

        state.mark = Some(Mark::from_bytes(vec![1; 32]));
        assert_eq!(state.position(), StatePosition::WaitConfirm);
    }

    #[test]
    fn test_exhausted() {
        let armed = |counter| PrincipalState {
            counter,
            secret: Some(Digest::hash(b"secret")),
            mark: None,
        };
        assert!(armed(0).exhausted());
        assert!(!armed(1).exhausted());
        assert!(!armed(2).exhausted());
        // counter 3 needs the full span of 3
        assert!(!armed(3).exhausted());
    }
}
