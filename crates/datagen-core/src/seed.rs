//! # Seed Fabric
//!
//! Derives a fresh, independent RNG for any `(master_seed, scope)` pair.
//! Scopes are tuples of strings — typically `(node, column)` or
//! `(node, column, "modifier", index)` — encoded with an explicit
//! length prefix per component so that no concatenation of components can
//! collide with a different split of the same bytes (`("ab", "c")` and
//! `("a", "bc")` must never derive the same seed).
//!
//! The derivation hashes the canonical encoding with SHA-256 and takes the
//! first 8 bytes as a `u64` seed for `StdRng` (ChaCha12-based in `rand`
//! 0.9): long period, passes standard statistical batteries, and is neither
//! a linear congruential generator nor a Mersenne Twister.

use rand::SeedableRng;
use rand::rngs::StdRng;
use sha2::{Digest, Sha256};

/// Derive a fresh RNG scoped to `(master_seed, scope)`.
///
/// Calling this twice with the same arguments always yields an RNG in the
/// same internal state; calling it with a different scope yields an
/// effectively independent stream.
pub fn derive(master_seed: u64, scope: &[&str]) -> StdRng {
    StdRng::seed_from_u64(derive_u64(master_seed, scope))
}

/// Derive the raw `u64` seed for a scope, without constructing an RNG.
/// Exposed for callers (the effect engine, property tests) that need the
/// seed value itself rather than a ready RNG.
pub fn derive_u64(master_seed: u64, scope: &[&str]) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(master_seed.to_le_bytes());
    for component in scope {
        let bytes = component.as_bytes();
        hasher.update((bytes.len() as u64).to_le_bytes());
        hasher.update(bytes);
    }
    let digest = hasher.finalize();
    let mut seed_bytes = [0u8; 8];
    seed_bytes.copy_from_slice(&digest[0..8]);
    u64::from_le_bytes(seed_bytes)
}
