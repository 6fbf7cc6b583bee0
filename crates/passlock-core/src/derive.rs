//! Credential derivation: the one-way hash chain and password stretching.
//!
//! A session's secrets are the ordered sequence `chain(seed, 0..k)` where
//! the seed is a stretched password. Revealing `chain(seed, i)` proves
//! knowledge of a pre-image of `chain(seed, i+1)` without disclosing any
//! lower position.

use pbkdf2::pbkdf2_hmac;
use rand::Rng;
use sha2::Sha256;

use crate::crypto::Digest;

/// Iteration floor for password stretching. Callers may go higher, never
/// lower.
pub const DEFAULT_STRETCH_ITERATIONS: u32 = 1_000_000;

/// Length of the per-setup random salt, in bytes.
pub const SALT_LEN: usize = 32;

/// Walk the hash chain: `k` applications of the one-way hash to `seed`.
///
/// `chain(seed, 0) == seed`. Total for all `k`.
pub fn chain(seed: &Digest, k: u64) -> Digest {
    let mut digest = *seed;
    for _ in 0..k {
        digest = Digest::hash(digest.as_bytes());
    }
    digest
}

/// Stretch a raw password into a chain seed.
///
/// Salted PBKDF2-HMAC-SHA256. Deterministic for the same inputs. The salt
/// is not secret; it only defeats precomputation, and is persisted in the
/// public app descriptor.
pub fn stretch(password: &str, salt: &[u8], iterations: u32) -> Digest {
    let mut out = [0u8; 32];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, iterations, &mut out);
    Digest::from_bytes(out)
}

/// Generate a fresh random salt for a setup.
pub fn gen_salt() -> [u8; SALT_LEN] {
    let mut salt = [0u8; SALT_LEN];
    rand::thread_rng().fill(&mut salt);
    salt
}

/// Word list for generated passwords. Short common words; entropy comes
/// from the selection, hardening from [`stretch`].
const WORDS: [&str; 64] = [
    "acid", "apex", "atom", "bark", "bell", "bolt", "cape", "cave", "clay", "coal", "cork",
    "dawn", "deck", "dome", "dusk", "echo", "fern", "flux", "foam", "gale", "glen", "grid",
    "hawk", "haze", "iris", "jade", "kelp", "kiln", "lake", "lark", "lime", "loom", "mast",
    "mesa", "mint", "moss", "node", "nook", "opal", "orb", "peak", "pine", "pith", "quay",
    "reef", "rift", "rook", "rust", "sage", "silt", "slate", "spar", "tarn", "thaw", "tide",
    "vale", "vane", "veil", "wick", "wisp", "wolf", "yarn", "zeal", "zinc",
];

/// Generate a four-word password.
///
/// Convenience only; any string works as a password.
pub fn gen_password() -> String {
    let mut rng = rand::thread_rng();
    let words: Vec<&str> = (0..4)
        .map(|_| WORDS[rng.gen_range(0..WORDS.len())])
        .collect();
    words.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_chain_zero_is_seed() {
        let seed = Digest::hash(b"seed");
        assert_eq!(chain(&seed, 0), seed);
    }

    #[test]
    fn test_chain_one_is_hash() {
        let seed = Digest::hash(b"seed");
        assert_eq!(chain(&seed, 1), Digest::hash(seed.as_bytes()));
    }

    #[test]
    fn test_stretch_deterministic() {
        let salt = [7u8; SALT_LEN];
        let a = stretch("correct horse", &salt, 10);
        let b = stretch("correct horse", &salt, 10);
        assert_eq!(a, b);
    }

    #[test]
    fn test_stretch_salt_sensitive() {
        let a = stretch("correct horse", &[1u8; SALT_LEN], 10);
        let b = stretch("correct horse", &[2u8; SALT_LEN], 10);
        assert_ne!(a, b);
    }

    #[test]
    fn test_stretch_iteration_sensitive() {
        let salt = [7u8; SALT_LEN];
        assert_ne!(stretch("pw", &salt, 10), stretch("pw", &salt, 11));
    }

    #[test]
    fn test_gen_password_four_words() {
        let pw = gen_password();
        assert_eq!(pw.split(' ').count(), 4);
    }

    proptest! {
        // chain(seed, a+b) == chain(chain(seed, a), b)
        #[test]
        fn test_chain_composes(seed in any::<[u8; 32]>(), a in 0u64..200, b in 0u64..200) {
            let seed = Digest::from_bytes(seed);
            prop_assert_eq!(chain(&seed, a + b), chain(&chain(&seed, a), b));
        }

        #[test]
        fn test_chain_injective_positions(seed in any::<[u8; 32]>(), k in 1u64..100) {
            let seed = Digest::from_bytes(seed);
            prop_assert_ne!(chain(&seed, k), chain(&seed, k - 1));
        }
    }
}
