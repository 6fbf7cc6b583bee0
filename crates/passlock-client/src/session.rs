//! The protocol orchestrator.
//!
//! A [`Session`] is bound to one principal on one validator instance and
//! drives the full delegation flow: arm the chain, authorize protected
//! operations through the prepare/confirm two-step, or abort with a
//! cancel. It holds the stretched seed and the decoded credential
//! bundle; it never holds the root key after setup.
//!
//! Every flow reloads state after ledger finality and re-checks the
//! mark before acting on it. A mismatch means someone else moved the
//! state underneath us; the flow fails closed with
//! [`ClientError::StateConflict`] rather than guessing.

use std::fmt;

use tracing::{debug, warn};

use passlock_auth::CredentialBundle;
use passlock_core::{
    assign_group, canonical_bytes, chain, op_id, stretch, Address, AppId, Call, Digest, Keypair,
    Mark, Operation,
};
use passlock_ledger::{AppInfo, Ledger, LogSearch, Receipt, SubmittedOp};
use passlock_validator::PrincipalState;

use crate::boundary::next_prepare_boundary;
use crate::error::{ClientError, Result};
use crate::registry;

/// Chain length used when the caller does not pick one. Roughly a
/// thousand authorizations per setup.
pub const DEFAULT_CHAIN_LENGTH: u64 = 1000;

/// Position of the confirm call inside an authorization batch
/// `[protected, confirm]`.
const CONFIRM_POSITION: u64 = 1;

/// A live protocol session for one principal on one validator instance.
pub struct Session<'a, L> {
    ledger: &'a L,
    info: AppInfo,
    seed: Digest,
    bundle: CredentialBundle,
    state: PrincipalState,
}

impl<'a, L: Ledger + LogSearch> Session<'a, L> {
    /// Arm a fresh chain and publish the credentials. Root-signed; the
    /// only flow that needs the keypair.
    ///
    /// Registers the principal if this is its first contact with the
    /// instance, then submits the setup call whose note carries
    /// `prefix || bundle` for later password-only resumption.
    pub async fn setup(
        ledger: &'a L,
        app_id: AppId,
        keypair: &Keypair,
        password: &str,
        length: u64,
    ) -> Result<Self> {
        let info = ledger.app_info(app_id).await?;
        let seed = stretch(password, &info.salt, info.stretch_iterations);
        let top = chain(&seed, length);
        let bundle = CredentialBundle::authorize(app_id, keypair);

        let address = keypair.address();
        if ledger.query_state(app_id, &address).await?.is_none() {
            let register = Operation::app_call(address, app_id, Call::Register);
            let receipt = Self::submit_root(ledger, keypair, register).await?;
            ledger.wait_for_finality(&receipt).await?;
        }

        let setup = Operation::app_call(address, app_id, Call::Setup { top, length })
            .with_note(registry::setup_note(&top, &bundle));
        let receipt = Self::submit_root(ledger, keypair, setup).await?;
        ledger.wait_for_finality(&receipt).await?;

        debug!(app_id, length, "chain armed");
        let mut session = Self {
            ledger,
            info,
            seed,
            bundle,
            state: PrincipalState::registered(),
        };
        session.reload().await?;
        Ok(session)
    }

    /// Rebuild a session from nothing but the password.
    ///
    /// Stretches the password with the instance's public salt, locates
    /// the credential bundle by its chain-top note prefix, and reads
    /// the current counter. `length` must be the length the setup used.
    pub async fn resume(ledger: &'a L, app_id: AppId, password: &str, length: u64) -> Result<Self> {
        let info = ledger.app_info(app_id).await?;
        let seed = stretch(password, &info.salt, info.stretch_iterations);
        let prefix = chain(&seed, length);
        let bundle = registry::retrieve(ledger, app_id, &prefix).await?;

        let mut session = Self {
            ledger,
            info,
            seed,
            bundle,
            state: PrincipalState::registered(),
        };
        session.reload().await?;
        Ok(session)
    }

    /// The principal this session acts for.
    pub fn address(&self) -> Address {
        self.bundle.address
    }

    /// The instance descriptor.
    pub fn app_info(&self) -> &AppInfo {
        &self.info
    }

    /// The last loaded state. Call [`Session::reload`] for a fresh view.
    pub fn current_position(&self) -> &PrincipalState {
        &self.state
    }

    /// Re-read this principal's state from the ledger.
    pub async fn reload(&mut self) -> Result<&PrincipalState> {
        let state = self
            .ledger
            .query_state(self.info.app_id, &self.bundle.address)
            .await?
            .ok_or(ClientError::NotFound)?;
        self.state = state;
        Ok(&self.state)
    }

    /// Authorize one protected operation through the full two-step.
    ///
    /// Builds the atomic `[protected, confirm]` batch up front so the
    /// confirm's identifier can ride in the prepare's mark, submits the
    /// prepare under the delegated predicate, waits for finality, then
    /// submits the batch. The protected operation is never submitted
    /// outside its batch. Returns the batch receipt.
    pub async fn authorize(&mut self, protected_op: Operation) -> Result<Receipt> {
        self.reload().await?;
        self.check_mark_clear()?;

        let counter = self.state.counter;
        let boundary = next_prepare_boundary(counter)?;
        if boundary < 2 {
            // A confirm from the boundary needs two more positions.
            return Err(ClientError::ChainExhausted);
        }

        let (batch, expected_mark) = self.bind_to_batch(protected_op, boundary);

        let prepare = Operation::app_call(
            self.bundle.address,
            self.info.app_id,
            Call::Prepare {
                reveal: chain(&self.seed, boundary),
                mark: expected_mark.clone(),
            },
        );
        let receipt = self
            .ledger
            .submit(SubmittedOp::delegated(prepare, self.bundle.prepare.clone()))
            .await?;
        self.ledger.wait_for_finality(&receipt).await?;

        self.reload().await?;
        self.check_mark_matches(&expected_mark)?;

        let [protected_op, confirm] = batch;
        let receipt = self
            .ledger
            .submit_atomic(vec![
                SubmittedOp::linked(
                    protected_op,
                    self.bundle.confirm_link.clone(),
                    CONFIRM_POSITION,
                ),
                SubmittedOp::delegated(confirm, self.bundle.confirm.clone()),
            ])
            .await?;
        self.ledger.wait_for_finality(&receipt).await?;
        self.reload().await?;

        debug!(counter = self.state.counter, "authorization committed");
        Ok(receipt)
    }

    /// Abort the pending (or upcoming) step by burning one chain
    /// position. Also the way to clear a stale mark.
    pub async fn cancel(&mut self) -> Result<Receipt> {
        self.reload().await?;
        let counter = self.state.counter;
        if counter < 1 {
            return Err(ClientError::ChainExhausted);
        }

        let cancel = Operation::app_call(
            self.bundle.address,
            self.info.app_id,
            Call::Cancel {
                reveal: chain(&self.seed, counter - 1),
            },
        );
        let receipt = self
            .ledger
            .submit(SubmittedOp::delegated(cancel, self.bundle.cancel.clone()))
            .await?;
        self.ledger.wait_for_finality(&receipt).await?;
        self.reload().await?;

        debug!(counter = self.state.counter, "cancelled");
        Ok(receipt)
    }

    /// Build the grouped `[protected, confirm]` batch for a prepare
    /// landing on `boundary`, and the mark binding the two steps.
    ///
    /// The mark is the confirm's content-addressed identifier, computed
    /// after grouping so it also pins the batch shape and the protected
    /// operation itself.
    fn bind_to_batch(&self, protected_op: Operation, boundary: u64) -> ([Operation; 2], Mark) {
        let confirm = Operation::app_call(
            self.bundle.address,
            self.info.app_id,
            Call::Confirm {
                reveal: chain(&self.seed, boundary - 2),
            },
        );
        let mut batch = [protected_op, confirm];
        assign_group(&mut batch);

        let mark = Mark::from(op_id(&batch[CONFIRM_POSITION as usize]));
        (batch, mark)
    }

    /// Gate: no prepare may be pending when a new flow starts.
    fn check_mark_clear(&self) -> Result<()> {
        match &self.state.mark {
            None => Ok(()),
            Some(_) => {
                warn!("stale mark on state; cancel before authorizing");
                Err(ClientError::StateConflict)
            }
        }
    }

    /// Gate: after the prepare lands, the on-ledger mark must be
    /// exactly the one we posted.
    fn check_mark_matches(&self, expected: &Mark) -> Result<()> {
        match &self.state.mark {
            Some(mark) if mark == expected => Ok(()),
            _ => {
                warn!("on-ledger mark does not match the prepared batch");
                Err(ClientError::StateConflict)
            }
        }
    }

    async fn submit_root(ledger: &L, keypair: &Keypair, op: Operation) -> Result<Receipt> {
        let signature = keypair.sign(&canonical_bytes(&op));
        Ok(ledger.submit(SubmittedOp::root(op, signature)).await?)
    }
}

// The seed stays out of the output.
impl<'a, L> fmt::Debug for Session<'a, L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("app_id", &self.info.app_id)
            .field("address", &self.bundle.address)
            .field("counter", &self.state.counter)
            .finish_non_exhaustive()
    }
}

/// Verify a candidate password against on-ledger state without
/// submitting anything.
///
/// Correct in both the wait-prepare and wait-confirm positions: the
/// secret is always the chain value at the current counter, so the
/// candidate checks out exactly when its stretch re-derives it.
pub async fn check_password<L: Ledger + LogSearch>(
    ledger: &L,
    app_id: AppId,
    password: &str,
    length: u64,
) -> Result<bool> {
    let info = ledger.app_info(app_id).await?;
    let seed = stretch(password, &info.salt, info.stretch_iterations);
    let prefix = chain(&seed, length);

    let bundle = match registry::retrieve(ledger, app_id, &prefix).await {
        Ok(bundle) => bundle,
        Err(ClientError::NotFound) => return Ok(false),
        Err(e) => return Err(e),
    };

    let state = match ledger.query_state(app_id, &bundle.address).await? {
        Some(state) => state,
        None => return Ok(false),
    };
    let Some(secret) = state.secret else {
        return Ok(false);
    };

    Ok(chain(&seed, state.counter) == secret)
}
