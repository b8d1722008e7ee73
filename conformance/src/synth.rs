//! Identifiers for objects that were never uploaded.
//!
//! Ids form a hash chain: one random byte is fed into a running SHA-256 per
//! object and the running digest is taken as the id. No content hashes to
//! these ids, so a compliant server can never have them.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use sha2::{Digest, Sha256};

use crate::fixture::{TestObject, random_size};

/// Generator for the missing set, seeded from the object count.
pub fn missing_rng(count: usize) -> ChaCha20Rng {
    ChaCha20Rng::seed_from_u64(count as u64)
}

/// Produce `count` objects with synthetic ids and sizes in
/// [`MIN_SIZE`](crate::fixture::MIN_SIZE)..=[`MAX_SIZE`](crate::fixture::MAX_SIZE).
pub fn synthesize_missing<R: Rng + ?Sized>(rng: &mut R, count: usize) -> Vec<TestObject> {
    let mut running = Sha256::new();
    let mut objects = Vec::with_capacity(count);
    for _ in 0..count {
        running.update([rng.gen_range(0..=u8::MAX)]);
        let oid = hex::encode(running.clone().finalize());
        let size = random_size(rng) as i64;
        objects.push(TestObject::new(oid, size));
    }
    objects
}
