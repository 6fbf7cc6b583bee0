//! Deterministic test vectors for the chain derivation.
//!
//! These vectors pin the chain function across implementations: the
//! same seed and length must always yield the same top-of-chain digest,
//! and walking down from the top must re-derive every intermediate
//! value.

use passlock_core::{chain, Digest};

/// A chain derivation vector.
#[derive(Debug, Clone)]
pub struct ChainVector {
    /// Human-readable name.
    pub name: &'static str,
    /// Raw chain seed (in production this is the stretched password).
    pub seed: [u8; 32],
    /// Chain length.
    pub length: u64,
    /// Expected top-of-chain digest (hex).
    pub expected_top: &'static str,
}

/// All chain vectors.
pub fn all_vectors() -> Vec<ChainVector> {
    vec![
        ChainVector {
            name: "zero seed, length 1",
            seed: [0x00; 32],
            length: 1,
            expected_top: "2ada83c1819a5372dae1238fc1ded123c8104fdaa15862aaee69428a1820fcda",
        },
        ChainVector {
            name: "patterned seed, length 3",
            seed: [0xAB; 32],
            length: 3,
            expected_top: "2d3011894fa818c505497890054894c90f22ee7f0171aacc9356476606dbc2d8",
        },
        ChainVector {
            name: "patterned seed, full-size chain",
            seed: [0x42; 32],
            length: 1000,
            expected_top: "e5ad9bf7eb0bce6e7b16a7a55cb7f82cf52130504c37d8fa5f516e49b9ddceea",
        },
    ]
}

/// Compute the top-of-chain digest for a vector.
pub fn top_for_vector(vector: &ChainVector) -> Digest {
    chain(&Digest::from_bytes(vector.seed), vector.length)
}

/// Verify all vectors; returns `(name, matched, actual hex)` per vector.
pub fn verify_all_vectors() -> Vec<(String, bool, String)> {
    all_vectors()
        .iter()
        .map(|v| {
            let actual = top_for_vector(v).to_hex();
            let matched = actual == v.expected_top;
            (v.name.to_string(), matched, actual)
        })
        .collect()
}
