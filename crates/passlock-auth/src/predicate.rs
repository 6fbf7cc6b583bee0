//! Delegated authorization predicates.
//!
//! Each predicate is a boolean filter over a candidate operation, bound
//! to one principal and one validator instance at creation time by a
//! root-key signature. Possessing the predicate (without the root key)
//! authorizes submitting operations matching it - and nothing wider.

use ciborium::value::Value;

use passlock_core::{canonical_value_bytes, Address, AppId, Call, Keypair, Operation, Signature};

use crate::error::{AuthError, Result};

/// Domain separator for predicate signatures.
const PREDICATE_DOMAIN: &str = "passlock/predicate/v1";

/// Which shape a predicate authorizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PredicateKind {
    /// App call whose call is `prepare`.
    Prepare,
    /// App call whose call is `confirm`.
    Confirm,
    /// App call whose call is `cancel`.
    Cancel,
    /// An arbitrary operation, valid only alongside a `confirm` sibling
    /// at a stated position in the same atomic batch.
    ConfirmLink,
}

impl PredicateKind {
    fn tag(self) -> u64 {
        match self {
            PredicateKind::Prepare => 0,
            PredicateKind::Confirm => 1,
            PredicateKind::Cancel => 2,
            PredicateKind::ConfirmLink => 3,
        }
    }

    pub(crate) fn from_tag(tag: u64) -> Option<Self> {
        match tag {
            0 => Some(PredicateKind::Prepare),
            1 => Some(PredicateKind::Confirm),
            2 => Some(PredicateKind::Cancel),
            3 => Some(PredicateKind::ConfirmLink),
            _ => None,
        }
    }
}

/// A pre-signed, narrowly-scoped capability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Predicate {
    /// The shape this predicate authorizes.
    pub kind: PredicateKind,
    /// The validator instance it is bound to.
    pub app_id: AppId,
    /// The principal it is bound to.
    pub address: Address,
    /// Root-key signature over the binding.
    pub signature: Signature,
}

impl Predicate {
    /// Pre-authorize a predicate with the principal's root key.
    pub fn authorize(kind: PredicateKind, app_id: AppId, keypair: &Keypair) -> Self {
        let address = keypair.address();
        let message = signing_message(kind, app_id, &address);
        Self {
            kind,
            app_id,
            address,
            signature: keypair.sign(&message),
        }
    }

    /// Verify the root-key signature binding this predicate.
    pub fn verify(&self) -> Result<()> {
        let message = signing_message(self.kind, self.app_id, &self.address);
        self.address
            .verify(&message, &self.signature)
            .map_err(|_| AuthError::BadSignature)
    }

    /// Does this predicate authorize `op` on its own?
    ///
    /// Only the three fixed-shape predicates can: the op must target the
    /// bound validator instance, come from the bound principal, and be
    /// the matching call variant. `ConfirmLink` always answers false
    /// here; it needs batch context (see [`Predicate::allows_linked`]).
    pub fn allows(&self, op: &Operation) -> bool {
        let (sender, app_id, call) = match op {
            Operation::AppCall {
                sender,
                app_id,
                call,
                ..
            } => (sender, *app_id, call),
            Operation::Payment { .. } => return false,
        };

        if *sender != self.address || app_id != self.app_id {
            return false;
        }

        matches!(
            (self.kind, call),
            (PredicateKind::Prepare, Call::Prepare { .. })
                | (PredicateKind::Confirm, Call::Confirm { .. })
                | (PredicateKind::Cancel, Call::Cancel { .. })
        )
    }

    /// Does this `ConfirmLink` predicate authorize `op` given its atomic
    /// batch and the claimed confirm position?
    ///
    /// The protected operation may be anything (typically a payment) as
    /// long as the batch member at `index`: (i) is sent by the same
    /// address, (ii) targets the bound validator instance, and (iii) is a
    /// `confirm` call. Batch membership and position are checked
    /// together, so neither side can be replayed alone.
    pub fn allows_linked(&self, op: &Operation, batch: &[Operation], index: u64) -> bool {
        if self.kind != PredicateKind::ConfirmLink {
            return false;
        }
        if *op.sender() != self.address {
            return false;
        }

        let sibling = match usize::try_from(index).ok().and_then(|i| batch.get(i)) {
            Some(sibling) => sibling,
            None => return false,
        };

        sibling.sender() == op.sender()
            && sibling.app_id() == Some(self.app_id)
            && matches!(sibling.call(), Some(Call::Confirm { .. }))
    }

    /// Encode to a CBOR value (used by the bundle codec).
    pub(crate) fn to_cbor_value(&self) -> Value {
        Value::Array(vec![
            Value::Integer(self.kind.tag().into()),
            Value::Integer(self.app_id.into()),
            Value::Bytes(self.address.as_bytes().to_vec()),
            Value::Bytes(self.signature.as_bytes().to_vec()),
        ])
    }

    /// Decode from a CBOR value (used by the bundle codec).
    pub(crate) fn from_cbor_value(value: &Value) -> Result<Self> {
        let items = match value {
            Value::Array(items) if items.len() == 4 => items,
            _ => return Err(AuthError::Malformed("predicate must be a 4-array".into())),
        };

        let tag = as_u64(&items[0]).ok_or_else(|| malformed("predicate kind"))?;
        let kind = PredicateKind::from_tag(tag).ok_or_else(|| malformed("predicate kind"))?;
        let app_id = as_u64(&items[1]).ok_or_else(|| malformed("predicate app id"))?;
        let address = Address::from_bytes(as_array::<32>(&items[2]).ok_or_else(|| malformed("predicate address"))?);
        let signature =
            Signature::from_bytes(as_array::<64>(&items[3]).ok_or_else(|| malformed("predicate signature"))?);

        Ok(Self {
            kind,
            app_id,
            address,
            signature,
        })
    }
}

/// The exact byte string the root key signs for a predicate.
fn signing_message(kind: PredicateKind, app_id: AppId, address: &Address) -> Vec<u8> {
    canonical_value_bytes(&Value::Array(vec![
        Value::Text(PREDICATE_DOMAIN.into()),
        Value::Integer(kind.tag().into()),
        Value::Integer(app_id.into()),
        Value::Bytes(address.as_bytes().to_vec()),
    ]))
}

fn malformed(what: &str) -> AuthError {
    AuthError::Malformed(what.into())
}

pub(crate) fn as_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Integer(i) => u64::try_from(i128::from(*i)).ok(),
        _ => None,
    }
}

pub(crate) fn as_array<const N: usize>(value: &Value) -> Option<[u8; N]> {
    match value {
        Value::Bytes(b) => b.as_slice().try_into().ok(),
        _ => None,
    }
}
