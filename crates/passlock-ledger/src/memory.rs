//! In-memory ledger.
//!
//! Single-process stand-in for a real chain, with the same observable
//! contract: authorization is checked per operation, batches commit
//! all-or-nothing, validator state mutates only through accepted calls,
//! and every committed operation lands in a searchable note log. Rounds
//! advance one per commit; a commit is final as soon as it returns, so
//! [`Ledger::wait_for_finality`] is immediate here.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use passlock_core::{
    canonical_bytes, gen_salt, group_id, op_id, Address, AppId, Operation,
    DEFAULT_STRETCH_ITERATIONS, SALT_LEN,
};
use passlock_validator::{apply, CallContext, PrincipalState, Transition};

use crate::error::{LedgerError, Result};
use crate::traits::{
    AppInfo, Authorization, Ledger, LogEntry, LogSearch, Receipt, SubmittedOp,
};

/// In-memory ledger implementation.
///
/// All data is lost when dropped. Thread-safe via an async RwLock.
pub struct MemoryLedger {
    inner: RwLock<LedgerInner>,
}

struct LedgerInner {
    /// Last committed round; 0 means nothing committed yet.
    round: u64,

    /// Live validator instances.
    apps: HashMap<AppId, AppRecord>,

    /// Next app id to hand out.
    next_app_id: AppId,

    /// Committed operations, append order. `app_id` is `None` for
    /// payments.
    log: Vec<(Option<AppId>, LogEntry)>,
}

#[derive(Clone)]
struct AppRecord {
    info: AppInfo,
    states: HashMap<Address, PrincipalState>,
}

impl MemoryLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(LedgerInner {
                round: 0,
                apps: HashMap::new(),
                next_app_id: 1,
                log: Vec::new(),
            }),
        }
    }

    /// Create a validator instance with a fresh random salt and the
    /// standard stretch iteration count.
    pub async fn create_app(&self, root: Address) -> AppInfo {
        self.create_app_with(root, gen_salt(), DEFAULT_STRETCH_ITERATIONS)
            .await
    }

    /// Create a validator instance with explicit stretch parameters.
    pub async fn create_app_with(
        &self,
        root: Address,
        salt: [u8; SALT_LEN],
        stretch_iterations: u32,
    ) -> AppInfo {
        let mut inner = self.inner.write().await;
        let app_id = inner.next_app_id;
        inner.next_app_id += 1;

        let info = AppInfo {
            app_id,
            root,
            salt,
            stretch_iterations,
        };
        inner.apps.insert(
            app_id,
            AppRecord {
                info: info.clone(),
                states: HashMap::new(),
            },
        );
        debug!(app_id, "created validator instance");
        info
    }

    /// The last committed round.
    pub async fn round(&self) -> u64 {
        self.inner.read().await.round
    }

    /// Check one member's authorization against its batch.
    fn check_auth(sub: &SubmittedOp, batch: &[Operation]) -> Result<()> {
        match &sub.auth {
            Authorization::Root(signature) => sub
                .op
                .sender()
                .verify(&canonical_bytes(&sub.op), signature)
                .map_err(|_| LedgerError::NotAuthorized),
            Authorization::Delegated {
                predicate,
                link_index,
            } => {
                predicate.verify()?;
                let allowed = match link_index {
                    Some(index) => predicate.allows_linked(&sub.op, batch, *index),
                    None => predicate.allows(&sub.op),
                };
                if allowed {
                    Ok(())
                } else {
                    Err(LedgerError::NotAuthorized)
                }
            }
        }
    }

    /// Validate and commit a batch. `grouped` selects whether members
    /// must carry a matching group binding.
    async fn commit(&self, subs: Vec<SubmittedOp>, grouped: bool) -> Result<Receipt> {
        if subs.is_empty() {
            return Err(LedgerError::EmptyBatch);
        }

        let ops: Vec<Operation> = subs.iter().map(|s| s.op.clone()).collect();

        if grouped {
            let expected = group_id(&ops);
            if ops.iter().any(|op| op.group() != Some(&expected)) {
                return Err(LedgerError::BadGroup);
            }
        } else if ops.iter().any(|op| op.group().is_some()) {
            return Err(LedgerError::BadGroup);
        }

        for sub in &subs {
            Self::check_auth(sub, &ops)?;
        }

        let mut inner = self.inner.write().await;

        // Evaluate against a scratch copy; commit only if every member
        // is accepted. `None` marks an app deleted mid-batch.
        let mut scratch: HashMap<AppId, Option<AppRecord>> = HashMap::new();
        let mut op_ids = Vec::with_capacity(ops.len());

        for op in &ops {
            let id = op_id(op);
            op_ids.push(id);

            let (app_id, call) = match (op.app_id(), op.call()) {
                (Some(app_id), Some(call)) => (app_id, call),
                _ => continue, // payments carry no validator effect
            };

            let record = match scratch.entry(app_id).or_insert_with(|| {
                inner.apps.get(&app_id).cloned()
            }) {
                Some(record) => record,
                None => return Err(LedgerError::UnknownApp(app_id)),
            };

            let sender = *op.sender();
            let ctx = CallContext {
                sender,
                root: record.info.root,
                op_id: id,
            };

            match apply(record.states.get(&sender), &ctx, call)? {
                Transition::Updated(state) => {
                    record.states.insert(sender, state);
                }
                Transition::Cleared => {
                    record.states.remove(&sender);
                }
                Transition::AppUpdated => {}
                Transition::AppDeleted => {
                    scratch.insert(app_id, None);
                }
            }
        }

        // Whole batch accepted: commit scratch, advance the round,
        // append the log.
        inner.round += 1;
        let round = inner.round;

        for (app_id, record) in scratch {
            match record {
                Some(record) => {
                    inner.apps.insert(app_id, record);
                }
                None => {
                    inner.apps.remove(&app_id);
                }
            }
        }

        for (op, id) in ops.iter().zip(&op_ids) {
            inner.log.push((
                op.app_id(),
                LogEntry {
                    round,
                    op_id: *id,
                    sender: *op.sender(),
                    note: op.note().to_vec(),
                },
            ));
        }

        debug!(round, ops = ops.len(), "committed batch");
        Ok(Receipt { round, op_ids })
    }
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Ledger for MemoryLedger {
    async fn submit(&self, op: SubmittedOp) -> Result<Receipt> {
        self.commit(vec![op], false).await
    }

    async fn submit_atomic(&self, ops: Vec<SubmittedOp>) -> Result<Receipt> {
        self.commit(ops, true).await
    }

    async fn wait_for_finality(&self, _receipt: &Receipt) -> Result<()> {
        // Commits are synchronous here; the receipt's round is already
        // final when the submit call returns.
        Ok(())
    }

    async fn query_state(
        &self,
        app_id: AppId,
        address: &Address,
    ) -> Result<Option<PrincipalState>> {
        let inner = self.inner.read().await;
        let record = inner
            .apps
            .get(&app_id)
            .ok_or(LedgerError::UnknownApp(app_id))?;
        Ok(record.states.get(address).cloned())
    }

    async fn app_info(&self, app_id: AppId) -> Result<AppInfo> {
        let inner = self.inner.read().await;
        inner
            .apps
            .get(&app_id)
            .map(|record| record.info.clone())
            .ok_or(LedgerError::UnknownApp(app_id))
    }
}

#[async_trait]
impl LogSearch for MemoryLedger {
    async fn search_by_note_prefix(&self, app_id: AppId, prefix: &[u8]) -> Result<Vec<LogEntry>> {
        let inner = self.inner.read().await;
        Ok(inner
            .log
            .iter()
            .rev()
            .filter(|(entry_app, entry)| {
                *entry_app == Some(app_id) && entry.note.starts_with(prefix)
            })
            .map(|(_, entry)| entry.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use passlock_auth::{Predicate, PredicateKind};
    use passlock_core::{assign_group, chain, Call, Digest, Keypair, Mark};
    use passlock_validator::Rejection;

    fn seed() -> Digest {
        Digest::hash(b"ledger test seed")
    }

    fn root_signed(kp: &Keypair, op: Operation) -> SubmittedOp {
        let signature = kp.sign(&canonical_bytes(&op));
        SubmittedOp::root(op, signature)
    }

    /// Create an app, register the principal, and arm the chain at
    /// `length`.
    async fn armed_app(ledger: &MemoryLedger, kp: &Keypair, length: u64) -> AppId {
        let info = ledger.create_app(kp.address()).await;
        let app_id = info.app_id;

        let register = Operation::app_call(kp.address(), app_id, Call::Register);
        ledger.submit(root_signed(kp, register)).await.unwrap();

        let setup = Operation::app_call(
            kp.address(),
            app_id,
            Call::Setup {
                top: chain(&seed(), length),
                length,
            },
        );
        ledger.submit(root_signed(kp, setup)).await.unwrap();

        app_id
    }

    #[tokio::test]
    async fn test_register_and_setup() {
        let kp = Keypair::generate();
        let ledger = MemoryLedger::new();
        let app_id = armed_app(&ledger, &kp, 10).await;

        let state = ledger
            .query_state(app_id, &kp.address())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(state.counter, 10);
        assert_eq!(state.secret, Some(chain(&seed(), 10)));
    }

    #[tokio::test]
    async fn test_delegated_full_cycle() {
        let kp = Keypair::generate();
        let receiver = Keypair::generate();
        let ledger = MemoryLedger::new();
        // 10 mod 3 = 1, so the first prepare lands on 9.
        let app_id = armed_app(&ledger, &kp, 10).await;

        // Build the protected batch first: its confirm's op id is the
        // mark the prepare must carry.
        let payment = Operation::payment(kp.address(), receiver.address(), 250);
        let confirm = Operation::app_call(
            kp.address(),
            app_id,
            Call::Confirm {
                reveal: chain(&seed(), 7),
            },
        );
        let mut batch = vec![payment, confirm];
        assign_group(&mut batch);
        let confirm_id = op_id(&batch[1]);

        let prepare = Operation::app_call(
            kp.address(),
            app_id,
            Call::Prepare {
                reveal: chain(&seed(), 9),
                mark: Mark::from(confirm_id),
            },
        );
        let prepare_pred = Predicate::authorize(PredicateKind::Prepare, app_id, &kp);
        ledger
            .submit(SubmittedOp::delegated(prepare, prepare_pred))
            .await
            .unwrap();

        let state = ledger
            .query_state(app_id, &kp.address())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(state.counter, 9);
        assert_eq!(state.mark, Some(Mark::from(confirm_id)));

        let link_pred = Predicate::authorize(PredicateKind::ConfirmLink, app_id, &kp);
        let confirm_pred = Predicate::authorize(PredicateKind::Confirm, app_id, &kp);
        let receipt = ledger
            .submit_atomic(vec![
                SubmittedOp::linked(batch[0].clone(), link_pred, 1),
                SubmittedOp::delegated(batch[1].clone(), confirm_pred),
            ])
            .await
            .unwrap();
        ledger.wait_for_finality(&receipt).await.unwrap();

        let state = ledger
            .query_state(app_id, &kp.address())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(state.counter, 7);
        assert_eq!(state.secret, Some(chain(&seed(), 7)));
        assert_eq!(state.mark, None);
    }

    #[tokio::test]
    async fn test_predicate_scope_enforced() {
        let kp = Keypair::generate();
        let ledger = MemoryLedger::new();
        let app_id = armed_app(&ledger, &kp, 10).await;

        // A prepare predicate must not authorize a cancel.
        let cancel = Operation::app_call(
            kp.address(),
            app_id,
            Call::Cancel {
                reveal: chain(&seed(), 9),
            },
        );
        let prepare_pred = Predicate::authorize(PredicateKind::Prepare, app_id, &kp);
        let err = ledger
            .submit(SubmittedOp::delegated(cancel, prepare_pred))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::NotAuthorized));

        // State untouched.
        let state = ledger
            .query_state(app_id, &kp.address())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(state.counter, 10);
    }

    #[tokio::test]
    async fn test_atomic_rollback() {
        let kp = Keypair::generate();
        let receiver = Keypair::generate();
        let ledger = MemoryLedger::new();
        let app_id = armed_app(&ledger, &kp, 10).await;

        let payment = Operation::payment(kp.address(), receiver.address(), 250);
        // Wrong reveal: the confirm will be rejected.
        let confirm = Operation::app_call(
            kp.address(),
            app_id,
            Call::Confirm {
                reveal: Digest::ZERO,
            },
        );
        let mut batch = vec![payment, confirm];
        assign_group(&mut batch);
        let confirm_id = op_id(&batch[1]);

        let prepare = Operation::app_call(
            kp.address(),
            app_id,
            Call::Prepare {
                reveal: chain(&seed(), 9),
                mark: Mark::from(confirm_id),
            },
        );
        let prepare_pred = Predicate::authorize(PredicateKind::Prepare, app_id, &kp);
        ledger
            .submit(SubmittedOp::delegated(prepare, prepare_pred))
            .await
            .unwrap();

        let link_pred = Predicate::authorize(PredicateKind::ConfirmLink, app_id, &kp);
        let confirm_pred = Predicate::authorize(PredicateKind::Confirm, app_id, &kp);
        let err = ledger
            .submit_atomic(vec![
                SubmittedOp::linked(batch[0].clone(), link_pred, 1),
                SubmittedOp::delegated(batch[1].clone(), confirm_pred),
            ])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Rejected(Rejection::ChainMismatch)
        ));

        // The prepare's effect stands; the failed batch left no trace.
        let state = ledger
            .query_state(app_id, &kp.address())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(state.counter, 9);
        assert_eq!(state.mark, Some(Mark::from(confirm_id)));
    }

    #[tokio::test]
    async fn test_atomic_requires_group_binding() {
        let kp = Keypair::generate();
        let receiver = Keypair::generate();
        let ledger = MemoryLedger::new();
        let app_id = armed_app(&ledger, &kp, 10).await;

        // Ungrouped members in an atomic submit are rejected outright.
        let payment = Operation::payment(kp.address(), receiver.address(), 250);
        let confirm = Operation::app_call(
            kp.address(),
            app_id,
            Call::Confirm {
                reveal: chain(&seed(), 7),
            },
        );
        let err = ledger
            .submit_atomic(vec![
                root_signed(&kp, payment),
                root_signed(&kp, confirm),
            ])
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::BadGroup));
    }

    #[tokio::test]
    async fn test_tampered_root_signature_rejected() {
        let kp = Keypair::generate();
        let ledger = MemoryLedger::new();
        let info = ledger.create_app(kp.address()).await;

        let register = Operation::app_call(kp.address(), info.app_id, Call::Register);
        let other = Operation::app_call(kp.address(), info.app_id, Call::Clear);
        // Signature over a different operation.
        let signature = kp.sign(&canonical_bytes(&other));
        let err = ledger
            .submit(SubmittedOp::root(register, signature))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::NotAuthorized));
    }

    #[tokio::test]
    async fn test_note_log_search_newest_first() {
        let kp = Keypair::generate();
        let ledger = MemoryLedger::new();
        let info = ledger.create_app(kp.address()).await;
        let app_id = info.app_id;

        let register = Operation::app_call(kp.address(), app_id, Call::Register)
            .with_note(b"prefix:one".to_vec());
        ledger.submit(root_signed(&kp, register)).await.unwrap();

        let setup = Operation::app_call(
            kp.address(),
            app_id,
            Call::Setup {
                top: chain(&seed(), 10),
                length: 10,
            },
        )
        .with_note(b"prefix:two".to_vec());
        ledger.submit(root_signed(&kp, setup)).await.unwrap();

        let hits = ledger
            .search_by_note_prefix(app_id, b"prefix:")
            .await
            .unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].note, b"prefix:two");
        assert_eq!(hits[1].note, b"prefix:one");

        let none = ledger
            .search_by_note_prefix(app_id, b"other:")
            .await
            .unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_create_app_defaults() {
        let kp = Keypair::generate();
        let ledger = MemoryLedger::new();

        let a = ledger.create_app(kp.address()).await;
        let b = ledger.create_app(kp.address()).await;

        assert_eq!(a.stretch_iterations, DEFAULT_STRETCH_ITERATIONS);
        assert!(a.stretch_iterations >= 1_000_000);
        // Salts are drawn fresh per descriptor.
        assert_ne!(a.salt, b.salt);
        assert_ne!(a.salt, [0u8; SALT_LEN]);
    }

    #[tokio::test]
    async fn test_delete_removes_app() {
        let kp = Keypair::generate();
        let ledger = MemoryLedger::new();
        let app_id = armed_app(&ledger, &kp, 10).await;

        let delete = Operation::app_call(kp.address(), app_id, Call::Delete);
        ledger.submit(root_signed(&kp, delete)).await.unwrap();

        let err = ledger.query_state(app_id, &kp.address()).await.unwrap_err();
        assert!(matches!(err, LedgerError::UnknownApp(_)));
    }
}
