//! The credential bundle: four predicates plus the principal's address,
//! packed into an opaque blob.
//!
//! The packing is a fixed, versionless canonical-CBOR array. Each setup
//! is self-contained, so no forward compatibility is attempted; decode
//! rejects anything truncated or structurally off.

use ciborium::value::Value;

use passlock_core::{canonical_value_bytes, Address, AppId, Keypair};

use crate::error::{AuthError, Result};
use crate::predicate::{as_array, Predicate, PredicateKind};

/// The full set of delegated credentials for one principal on one
/// validator instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialBundle {
    /// The bound principal.
    pub address: Address,
    /// Authorizes `prepare` calls.
    pub prepare: Predicate,
    /// Authorizes `confirm` calls.
    pub confirm: Predicate,
    /// Authorizes the protected operation, bound to a batch position.
    pub confirm_link: Predicate,
    /// Authorizes `cancel` calls.
    pub cancel: Predicate,
}

impl CredentialBundle {
    /// Authorize a complete bundle with the principal's root key.
    pub fn authorize(app_id: AppId, keypair: &Keypair) -> Self {
        Self {
            address: keypair.address(),
            prepare: Predicate::authorize(PredicateKind::Prepare, app_id, keypair),
            confirm: Predicate::authorize(PredicateKind::Confirm, app_id, keypair),
            confirm_link: Predicate::authorize(PredicateKind::ConfirmLink, app_id, keypair),
            cancel: Predicate::authorize(PredicateKind::Cancel, app_id, keypair),
        }
    }

    /// Verify every predicate: correct kind in each slot, all bound to
    /// the bundle address, all root-key signatures valid.
    pub fn verify(&self) -> Result<()> {
        let slots = [
            (&self.prepare, PredicateKind::Prepare),
            (&self.confirm, PredicateKind::Confirm),
            (&self.confirm_link, PredicateKind::ConfirmLink),
            (&self.cancel, PredicateKind::Cancel),
        ];
        for (predicate, expected_kind) in slots {
            if predicate.kind != expected_kind {
                return Err(AuthError::KindMismatch);
            }
            if predicate.address != self.address {
                return Err(AuthError::AddressMismatch);
            }
            predicate.verify()?;
        }
        Ok(())
    }

    /// The validator instance this bundle is bound to.
    pub fn app_id(&self) -> AppId {
        self.prepare.app_id
    }

    /// Deterministic, reversible serialization.
    pub fn encode(&self) -> Vec<u8> {
        canonical_value_bytes(&Value::Array(vec![
            Value::Bytes(self.address.as_bytes().to_vec()),
            self.prepare.to_cbor_value(),
            self.confirm.to_cbor_value(),
            self.confirm_link.to_cbor_value(),
            self.cancel.to_cbor_value(),
        ]))
    }

    /// Decode a bundle; rejects truncated or malformed input.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let value: Value = ciborium::from_reader(bytes)
            .map_err(|e| AuthError::Malformed(e.to_string()))?;

        let items = match &value {
            Value::Array(items) if items.len() == 5 => items,
            _ => return Err(AuthError::Malformed("bundle must be a 5-array".into())),
        };

        let address = Address::from_bytes(
            as_array::<32>(&items[0])
                .ok_or_else(|| AuthError::Malformed("bundle address".into()))?,
        );

        Ok(Self {
            address,
            prepare: Predicate::from_cbor_value(&items[1])?,
            confirm: Predicate::from_cbor_value(&items[2])?,
            confirm_link: Predicate::from_cbor_value(&items[3])?,
            cancel: Predicate::from_cbor_value(&items[4])?,
        })
    }
}
