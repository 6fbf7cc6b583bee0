//! Proptest generators for property-based testing.

use proptest::prelude::*;

use passlock_core::{chain, Address, Call, Digest, Keypair, Mark, Operation};
use passlock_validator::PrincipalState;

/// Generate a random keypair.
pub fn keypair() -> impl Strategy<Value = Keypair> {
    any::<[u8; 32]>().prop_map(|seed| Keypair::from_seed(&seed))
}

/// Generate a random digest.
pub fn digest() -> impl Strategy<Value = Digest> {
    any::<[u8; 32]>().prop_map(Digest::from_bytes)
}

/// Generate a random address.
pub fn address() -> impl Strategy<Value = Address> {
    keypair().prop_map(|kp| kp.address())
}

/// Generate a non-empty mark.
pub fn mark() -> impl Strategy<Value = Mark> {
    prop::collection::vec(any::<u8>(), 1..=64).prop_map(Mark::from_bytes)
}

/// Generate a chain length with room for at least one full cycle.
pub fn chain_length() -> impl Strategy<Value = u64> {
    5u64..=2000
}

/// Generate an armed state with a consistent `(seed, state)` pair: the
/// secret is the chain value at the counter.
pub fn armed_state() -> impl Strategy<Value = (Digest, PrincipalState)> {
    (digest(), chain_length()).prop_map(|(seed, counter)| {
        let state = PrincipalState {
            counter,
            secret: Some(chain(&seed, counter)),
            mark: None,
        };
        (seed, state)
    })
}

/// Generate an arbitrary call, valid or not.
pub fn call() -> impl Strategy<Value = Call> {
    prop_oneof![
        Just(Call::Register),
        (digest(), 1u64..=2000).prop_map(|(top, length)| Call::Setup { top, length }),
        (digest(), mark()).prop_map(|(reveal, mark)| Call::Prepare { reveal, mark }),
        digest().prop_map(|reveal| Call::Confirm { reveal }),
        digest().prop_map(|reveal| Call::Cancel { reveal }),
        Just(Call::Update),
        Just(Call::Delete),
        Just(Call::Clear),
    ]
}

/// Generate note bytes up to `max_len`.
pub fn note(max_len: usize) -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..=max_len)
}

/// Generate an arbitrary ungrouped operation.
pub fn operation() -> impl Strategy<Value = Operation> {
    prop_oneof![
        (address(), 1u64..=100, call(), note(64)).prop_map(|(sender, app_id, call, note)| {
            Operation::app_call(sender, app_id, call).with_note(note)
        }),
        (address(), address(), any::<u64>(), note(64)).prop_map(
            |(sender, receiver, amount, note)| {
                Operation::payment(sender, receiver, amount).with_note(note)
            }
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use passlock_core::{op_id, OpId};
    use passlock_validator::{apply, CallContext, Transition};

    proptest! {
        #[test]
        fn test_op_id_deterministic(op in operation()) {
            prop_assert_eq!(op_id(&op), op_id(&op));
        }

        #[test]
        fn test_op_id_changes_with_note(op in operation()) {
            let mut tagged = op.clone().with_note(b"different".to_vec());
            if tagged == op {
                tagged = op.clone().with_note(b"different!".to_vec());
            }
            prop_assert_ne!(op_id(&op), op_id(&tagged));
        }

        // The transition function must never panic, whatever the
        // state/call combination.
        #[test]
        fn test_apply_total(
            state in proptest::option::of(armed_state().prop_map(|(_, s)| s)),
            call in call(),
            sender in address(),
            root in address(),
        ) {
            let ctx = CallContext {
                sender,
                root,
                op_id: OpId::from_bytes([0xCC; 32]),
            };
            let _ = apply(state.as_ref(), &ctx, &call);
        }

        // Accepted chain calls only ever move the counter down.
        #[test]
        fn test_counter_monotone((seed, state) in armed_state(), m in mark()) {
            let ctx = CallContext {
                sender: Address::from_bytes([1; 32]),
                root: Address::from_bytes([1; 32]),
                op_id: OpId::from_bytes([0xCC; 32]),
            };
            let span = passlock_validator::prepare_span(state.counter);
            let call = Call::Prepare {
                reveal: chain(&seed, state.counter - span),
                mark: m,
            };
            if let Ok(Transition::Updated(next)) = apply(Some(&state), &ctx, &call) {
                prop_assert!(next.counter < state.counter);
                prop_assert_eq!(next.counter % 3, 0);
            }
        }
    }
}
