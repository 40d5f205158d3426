/*
 * This Source Code Form is subject to the terms of the Mozilla Public License,
 * v. 2.0. If a copy of the MPL was not distributed with this file, You can
 * obtain one at http://mozilla.org/MPL/2.0/.
 *
 *
 * Copyright 2019 Clemens Lutz, German Research Center for Artificial Intelligence
 * Author: Clemens Lutz <clemens.lutz@dfki.de>
 */

//! Hash functions for hash table insert and probe operations.

use crate::RAND_SEED;

/// Computes two 64-bit hash values of a join key.
///
/// The build phase places a key with the first value. The probe phase looks
/// up a key twice, once with each value.
///
/// Implementations must be deterministic, because the probe phase recomputes
/// the hash of each key and expects the same slot as the build phase.
pub trait KeyHasher: Send + Sync {
    fn hash128(&self, key: u64) -> (u64, u64);
}

/// MurmurHash3, x64 128-bit variant.
///
/// Non-cryptographic, but well distributed and fast for 8-byte keys.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Murmur3Hasher {
    seed: u32,
}

impl Murmur3Hasher {
    pub fn new(seed: u32) -> Self {
        Self { seed }
    }
}

impl Default for Murmur3Hasher {
    fn default() -> Self {
        Self::new(RAND_SEED)
    }
}

impl KeyHasher for Murmur3Hasher {
    /// Hashes the little-endian bytes of `key`. The first value is the low
    /// half of the 128-bit hash, the second value is the high half.
    #[inline]
    fn hash128(&self, key: u64) -> (u64, u64) {
        let bytes = key.to_le_bytes();
        let hash = murmur3::murmur3_x64_128(&mut &bytes[..], self.seed)
            .expect("Reading from a byte slice can't fail");
        (hash as u64, (hash >> 64) as u64)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn known_hash_of_key() {
        let hasher = Murmur3Hasher::default();
        assert_eq!(
            hasher.hash128(1),
            (0xd3fe_46e1_12f0_4c44, 0xba42_4eae_26bf_6f4a)
        );
    }

    #[test]
    fn hash_is_deterministic() {
        let a = Murmur3Hasher::new(7);
        let b = Murmur3Hasher::new(7);
        assert!((0..100).all(|key| a.hash128(key) == b.hash128(key)));
    }

    #[test]
    fn seed_changes_hash() {
        let a = Murmur3Hasher::new(1);
        let b = Murmur3Hasher::new(2);
        assert_ne!(a.hash128(42), b.hash128(42));
    }

    #[test]
    fn halves_are_independent() {
        let hasher = Murmur3Hasher::default();
        let differing = (0..1000).filter(|&key| {
            let (h0, h1) = hasher.hash128(key);
            h0 != h1
        });
        assert_eq!(differing.count(), 1000);
    }
}
