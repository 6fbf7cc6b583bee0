//! The closed vocabulary of ledger operations.
//!
//! The validator's original call surface was a dynamic argument list; here
//! it is a closed tagged union with fixed-field records, so exhaustive
//! matching replaces runtime argument-count checks.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::crypto::{Address, Digest};

/// Identifier of one validator instance (app).
pub type AppId = u64;

/// A 32-byte content-addressed operation identifier.
///
/// Computed as Blake3 over the operation's canonical bytes, group field
/// included, so grouping an operation changes its identity.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OpId(pub [u8; 32]);

impl OpId {
    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for OpId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OpId({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for OpId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.to_hex()[..16])
    }
}

impl AsRef<[u8]> for OpId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Identifier of an atomic batch, shared by its members.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupId(pub [u8; 32]);

impl GroupId {
    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GroupId({})", &self.to_hex()[..16])
    }
}

/// Opaque binder set by an accepted `prepare` and consumed by the next
/// accepted `confirm` or `cancel`.
///
/// In practice this is the 32-byte [`OpId`] of the companion confirm
/// operation, but the validator treats it as opaque bytes.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Mark(pub Vec<u8>);

impl Mark {
    /// Create from arbitrary bytes.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// An empty mark carries no binding and is rejected by `prepare`.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Mark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Mark({})", hex::encode(&self.0[..self.0.len().min(8)]))
    }
}

impl From<OpId> for Mark {
    fn from(id: OpId) -> Self {
        Self(id.0.to_vec())
    }
}

/// A call into a validator instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    /// Create this principal's state, zeroed. (Opt-in.)
    Register,
    /// Arm the chain: fix the top-of-chain digest and the chain length.
    /// Root-signed; the setup note carries the credential bundle.
    Setup {
        /// `chain(seed, length)` - the first value to be matched downward.
        top: Digest,
        /// Number of usable chain positions.
        length: u64,
    },
    /// Reveal one chain value and post a mark binding the next confirm.
    Prepare {
        /// The chain value at the next prepare boundary.
        reveal: Digest,
        /// Binder for the companion confirm operation.
        mark: Mark,
    },
    /// Consume the mark; reveal the value two positions below the secret.
    Confirm {
        /// The chain value at `counter - 2`.
        reveal: Digest,
    },
    /// Sanctioned forward abort; reveal one position below the secret.
    Cancel {
        /// The chain value at `counter - 1`.
        reveal: Digest,
    },
    /// Replace the validator program. Root only.
    Update,
    /// Delete the validator instance. Root only.
    Delete,
    /// Remove the caller's own state. Any caller.
    Clear,
}

impl Call {
    /// Short name of the call, matching the original wire literals.
    pub fn name(&self) -> &'static str {
        match self {
            Call::Register => "register",
            Call::Setup { .. } => "setup",
            Call::Prepare { .. } => "prepare",
            Call::Confirm { .. } => "confirm",
            Call::Cancel { .. } => "cancel",
            Call::Update => "update",
            Call::Delete => "delete",
            Call::Clear => "clear",
        }
    }
}

/// A submittable ledger operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// A call into a validator instance.
    AppCall {
        /// The calling principal.
        sender: Address,
        /// Target validator instance.
        app_id: AppId,
        /// The call itself.
        call: Call,
        /// Free-form note channel (carries the credential bundle on setup).
        note: Vec<u8>,
        /// Atomic batch membership, if any.
        group: Option<GroupId>,
    },
    /// A plain payment; the protected operation in the delegation flow.
    Payment {
        /// Paying principal.
        sender: Address,
        /// Receiving principal.
        receiver: Address,
        /// Amount in base units.
        amount: u64,
        /// Free-form note channel.
        note: Vec<u8>,
        /// Atomic batch membership, if any.
        group: Option<GroupId>,
    },
}

impl Operation {
    /// Build an app call with an empty note, ungrouped.
    pub fn app_call(sender: Address, app_id: AppId, call: Call) -> Self {
        Operation::AppCall {
            sender,
            app_id,
            call,
            note: Vec::new(),
            group: None,
        }
    }

    /// Build a payment, ungrouped.
    pub fn payment(sender: Address, receiver: Address, amount: u64) -> Self {
        Operation::Payment {
            sender,
            receiver,
            amount,
            note: Vec::new(),
            group: None,
        }
    }

    /// Attach a note.
    pub fn with_note(mut self, bytes: Vec<u8>) -> Self {
        match &mut self {
            Operation::AppCall { note, .. } | Operation::Payment { note, .. } => *note = bytes,
        }
        self
    }

    /// The sending principal.
    pub fn sender(&self) -> &Address {
        match self {
            Operation::AppCall { sender, .. } | Operation::Payment { sender, .. } => sender,
        }
    }

    /// The note bytes.
    pub fn note(&self) -> &[u8] {
        match self {
            Operation::AppCall { note, .. } | Operation::Payment { note, .. } => note,
        }
    }

    /// Batch membership.
    pub fn group(&self) -> Option<&GroupId> {
        match self {
            Operation::AppCall { group, .. } | Operation::Payment { group, .. } => group.as_ref(),
        }
    }

    /// Set or clear batch membership.
    pub fn set_group(&mut self, id: Option<GroupId>) {
        match self {
            Operation::AppCall { group, .. } | Operation::Payment { group, .. } => *group = id,
        }
    }

    /// The target app id, if this is an app call.
    pub fn app_id(&self) -> Option<AppId> {
        match self {
            Operation::AppCall { app_id, .. } => Some(*app_id),
            Operation::Payment { .. } => None,
        }
    }

    /// The call, if this is an app call.
    pub fn call(&self) -> Option<&Call> {
        match self {
            Operation::AppCall { call, .. } => Some(call),
            Operation::Payment { .. } => None,
        }
    }
}
