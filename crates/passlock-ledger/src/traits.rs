//! Ledger traits: the abstract interface the client orchestrates against.
//!
//! Two capabilities, split so backends can offer them independently:
//! [`Ledger`] accepts operations and answers state queries, [`LogSearch`]
//! scans the committed note log. The in-memory backend implements both.

use async_trait::async_trait;

use passlock_auth::Predicate;
use passlock_core::{Address, AppId, OpId, Operation, Signature, SALT_LEN};
use passlock_validator::PrincipalState;

use crate::error::Result;

/// How a submitted operation proves it may run.
#[derive(Debug, Clone)]
pub enum Authorization {
    /// The sender's own signature over the operation's canonical bytes.
    Root(Signature),
    /// A pre-signed predicate; the submitter need not hold the root key.
    ///
    /// `link_index` is set only for the protected operation of a batch,
    /// naming the position of its companion confirm.
    Delegated {
        /// The capability authorizing this operation.
        predicate: Predicate,
        /// Position of the confirm sibling, for `confirmLink` predicates.
        link_index: Option<u64>,
    },
}

/// An operation paired with its authorization.
#[derive(Debug, Clone)]
pub struct SubmittedOp {
    /// The operation itself.
    pub op: Operation,
    /// Proof that it may run.
    pub auth: Authorization,
}

impl SubmittedOp {
    /// Pair an operation with a root signature.
    pub fn root(op: Operation, signature: Signature) -> Self {
        Self {
            op,
            auth: Authorization::Root(signature),
        }
    }

    /// Pair an operation with a standalone predicate.
    pub fn delegated(op: Operation, predicate: Predicate) -> Self {
        Self {
            op,
            auth: Authorization::Delegated {
                predicate,
                link_index: None,
            },
        }
    }

    /// Pair an operation with a batch-position-bound predicate.
    pub fn linked(op: Operation, predicate: Predicate, link_index: u64) -> Self {
        Self {
            op,
            auth: Authorization::Delegated {
                predicate,
                link_index: Some(link_index),
            },
        }
    }
}

/// Proof of commitment returned by a successful submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    /// The round the batch was committed in.
    pub round: u64,
    /// Identifiers of the committed operations, in batch order.
    pub op_ids: Vec<OpId>,
}

/// One committed operation as seen by log search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    /// Commit round.
    pub round: u64,
    /// The operation's content-addressed identifier.
    pub op_id: OpId,
    /// The sending principal.
    pub sender: Address,
    /// The note bytes the operation carried.
    pub note: Vec<u8>,
}

/// Public descriptor of a validator instance.
///
/// Everything a holder of nothing but the password needs in order to
/// re-derive their credentials: the salt and iteration count fix the
/// stretch, the app id locates the instance, the root identifies its
/// creator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppInfo {
    /// The validator instance.
    pub app_id: AppId,
    /// The principal that created the instance.
    pub root: Address,
    /// Salt for the password stretch.
    pub salt: [u8; SALT_LEN],
    /// Iteration count for the password stretch.
    pub stretch_iterations: u32,
}

/// The ledger: accepts authorized operations, atomically or singly, and
/// answers state queries.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Submit a single ungrouped operation.
    async fn submit(&self, op: SubmittedOp) -> Result<Receipt>;

    /// Submit a batch that commits all-or-nothing.
    ///
    /// Every member must carry the batch's group id, and the id must
    /// match the members' contents and order.
    async fn submit_atomic(&self, ops: Vec<SubmittedOp>) -> Result<Receipt>;

    /// Block until the receipt's round is final.
    ///
    /// State read back after this returns reflects the committed batch.
    async fn wait_for_finality(&self, receipt: &Receipt) -> Result<()>;

    /// The per-principal state held by a validator instance, if any.
    async fn query_state(
        &self,
        app_id: AppId,
        address: &Address,
    ) -> Result<Option<PrincipalState>>;

    /// The public descriptor of a validator instance.
    async fn app_info(&self, app_id: AppId) -> Result<AppInfo>;
}

/// Note-log retrieval.
#[async_trait]
pub trait LogSearch: Send + Sync {
    /// All committed operations against `app_id` whose note starts with
    /// `prefix`, newest first.
    async fn search_by_note_prefix(&self, app_id: AppId, prefix: &[u8]) -> Result<Vec<LogEntry>>;
}
