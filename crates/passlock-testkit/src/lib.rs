//! # Passlock Testkit
//!
//! Testing utilities shared by the Passlock crates.
//!
//! - **Generators**: proptest strategies for digests, marks, calls,
//!   operations, and consistent armed states.
//! - **Fixtures**: a principal plus in-memory ledger with shortcuts for
//!   arming a chain, for integration-style tests.
//! - **Vectors**: deterministic chain derivation vectors.
//!
//! ## Property testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use passlock_testkit::generators::armed_state;
//!
//! proptest! {
//!     #[test]
//!     fn secret_matches_counter((seed, state) in armed_state()) {
//!         prop_assert_eq!(
//!             state.secret,
//!             Some(passlock_core::chain(&seed, state.counter))
//!         );
//!     }
//! }
//! ```
//!
//! ## Fixtures
//!
//! ```rust,ignore
//! use passlock_testkit::fixtures::TestFixture;
//!
//! let fixture = TestFixture::new();
//! let (app_id, seed) = fixture.armed_app("password", 1000).await;
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{multi_party_fixtures, TestFixture, FIXTURE_ITERATIONS};
pub use vectors::{all_vectors, top_for_vector, verify_all_vectors, ChainVector};
