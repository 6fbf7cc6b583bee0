//! Test fixtures and helpers.
//!
//! Common setup code for integration tests: a principal with its
//! keypair, an in-memory ledger, and shortcuts for arming a chain.

use passlock_auth::CredentialBundle;
use passlock_core::{
    canonical_bytes, chain, stretch, AppId, Call, Digest, Keypair, Operation, SALT_LEN,
};
use passlock_ledger::{Ledger, MemoryLedger, SubmittedOp};

/// Stretch iterations used by fixtures. Full strength is pointless in
/// tests.
pub const FIXTURE_ITERATIONS: u32 = 1_000;

/// A test fixture with a keypair and an in-memory ledger.
pub struct TestFixture {
    pub keypair: Keypair,
    pub ledger: MemoryLedger,
}

impl TestFixture {
    /// Create a new fixture with a random keypair.
    pub fn new() -> Self {
        Self {
            keypair: Keypair::generate(),
            ledger: MemoryLedger::new(),
        }
    }

    /// Create with a deterministic keypair from seed.
    pub fn with_seed(seed: [u8; 32]) -> Self {
        Self {
            keypair: Keypair::from_seed(&seed),
            ledger: MemoryLedger::new(),
        }
    }

    /// The fixture principal's address.
    pub fn address(&self) -> passlock_core::Address {
        self.keypair.address()
    }

    /// Sign an operation with the fixture's root key.
    pub fn root_signed(&self, op: Operation) -> SubmittedOp {
        let signature = self.keypair.sign(&canonical_bytes(&op));
        SubmittedOp::root(op, signature)
    }

    /// Create a validator instance, register the principal, and arm a
    /// chain of `length` from `password`.
    ///
    /// The setup call carries the `prefix || bundle` note, so registry
    /// retrieval works against the fixture ledger. Returns the app id
    /// and the stretched seed.
    pub async fn armed_app(&self, password: &str, length: u64) -> (AppId, Digest) {
        let salt = [0x42; SALT_LEN];
        let info = self
            .ledger
            .create_app_with(self.address(), salt, FIXTURE_ITERATIONS)
            .await;
        let app_id = info.app_id;
        let seed = stretch(password, &salt, FIXTURE_ITERATIONS);

        let register = Operation::app_call(self.address(), app_id, Call::Register);
        self.ledger
            .submit(self.root_signed(register))
            .await
            .expect("register");

        let top = chain(&seed, length);
        let bundle = CredentialBundle::authorize(app_id, &self.keypair);
        let mut note = top.as_bytes().to_vec();
        note.extend_from_slice(&bundle.encode());

        let setup = Operation::app_call(self.address(), app_id, Call::Setup { top, length })
            .with_note(note);
        self.ledger
            .submit(self.root_signed(setup))
            .await
            .expect("setup");

        (app_id, seed)
    }

    /// The fixture's credential bundle for `app_id`.
    pub fn bundle(&self, app_id: AppId) -> CredentialBundle {
        CredentialBundle::authorize(app_id, &self.keypair)
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Create multiple fixtures with distinct deterministic keys.
pub fn multi_party_fixtures(count: usize) -> Vec<TestFixture> {
    (0..count)
        .map(|i| {
            let mut seed = [0u8; 32];
            seed[0] = i as u8;
            seed[1] = 0xF1;
            TestFixture::with_seed(seed)
        })
        .collect()
}
