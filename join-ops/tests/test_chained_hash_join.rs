/*
 * This Source Code Form is subject to the terms of the Mozilla Public License,
 * v. 2.0. If a copy of the MPL was not distributed with this file, You can
 * obtain one at http://mozilla.org/MPL/2.0/.
 *
 *
 * Copyright 2021 Clemens Lutz
 * Author: Clemens Lutz <lutzcle@cml.li>
 */

use join_ops::join::{
    ChainedHashTable, ChainedHashTableBuilder, CpuProbeBuilder, KeyHasher, OuterTable,
};
use std::error::Error;

/// Places each key in the slot of its value, with both hash halves.
#[derive(Clone)]
struct IdentityHasher;

impl KeyHasher for IdentityHasher {
    fn hash128(&self, key: u64) -> (u64, u64) {
        (key, key)
    }
}

/// Places each key in the slot of its value, but looks up the second half
/// in the last slot.
#[derive(Clone)]
struct LastSlotHasher {
    hash_size: u64,
}

impl KeyHasher for LastSlotHasher {
    fn hash128(&self, key: u64) -> (u64, u64) {
        (key, self.hash_size - 1)
    }
}

fn chains<H>(table: &ChainedHashTable<H>) -> Vec<Vec<u64>> {
    (0..table.hash_size())
        .map(|slot| table.chain(slot).collect())
        .collect()
}

fn probe_matches<H: KeyHasher>(
    table: &ChainedHashTable<H>,
    outer_size: usize,
    lookups: usize,
    threads: usize,
) -> Result<u64, Box<dyn Error>> {
    let outer = OuterTable::build(outer_size, None);
    let probe = CpuProbeBuilder::default().threads(threads).build()?;
    Ok(probe.probe(table, &outer, lookups)?.matches)
}

#[test]
fn identity_hash_chains() -> Result<(), Box<dyn Error>> {
    let table = ChainedHashTableBuilder::default()
        .hasher(IdentityHasher)
        .hash_size(8)
        .inner_size(4)
        .key_stride(1)
        .build()?;

    let expected: Vec<Vec<u64>> = vec![
        vec![],
        vec![1],
        vec![2],
        vec![3],
        vec![4],
        vec![],
        vec![],
        vec![],
    ];
    assert_eq!(chains(&table), expected);
    assert_eq!(table.collisions(), 0);
    Ok(())
}

#[test]
fn identity_first_half_matches_once() -> Result<(), Box<dyn Error>> {
    let table = ChainedHashTableBuilder::default()
        .hasher(LastSlotHasher { hash_size: 8 })
        .hash_size(8)
        .inner_size(4)
        .key_stride(1)
        .build()?;

    // Outer keys {0, 1, 2, 3}: key 0 is not an inner key, 1-3 match once
    assert_eq!(probe_matches(&table, 4, 1, 1)?, 3);
    Ok(())
}

#[test]
fn identity_both_halves_match_twice() -> Result<(), Box<dyn Error>> {
    let table = ChainedHashTableBuilder::default()
        .hasher(IdentityHasher)
        .hash_size(8)
        .inner_size(4)
        .key_stride(1)
        .build()?;

    // Both halves select the same slot, and lookups are not deduplicated
    assert_eq!(probe_matches(&table, 4, 1, 2)?, 6);
    Ok(())
}

#[test]
fn collisions_are_inserts_into_occupied_slots() -> Result<(), Box<dyn Error>> {
    for &(hash_size, inner_size) in &[(1024, 512), (1024, 1024), (100, 5000), (7, 3)] {
        let table = ChainedHashTableBuilder::default()
            .hash_size(hash_size)
            .inner_size(inner_size)
            .build()?;

        assert_eq!(
            table.collisions(),
            (inner_size - table.occupied_slots()) as u64
        );
    }
    Ok(())
}

#[test]
fn every_key_is_chained_in_its_slot() -> Result<(), Box<dyn Error>> {
    let table = ChainedHashTableBuilder::default()
        .hash_size(257)
        .inner_size(4000)
        .build()?;

    let mut keys: Vec<u64> = Vec::new();
    for slot in 0..table.hash_size() {
        for key in table.chain(slot) {
            assert_eq!(table.slots(key).0, slot);
            keys.push(key);
        }
    }

    keys.sort_unstable();
    let expected: Vec<u64> = (1..=4000).map(|i| i * join_ops::INNER_KEY_STRIDE).collect();
    assert_eq!(keys, expected);
    Ok(())
}

#[test]
fn build_is_deterministic() -> Result<(), Box<dyn Error>> {
    let builder = ChainedHashTableBuilder::default()
        .hash_size(512)
        .inner_size(3000);

    let first = builder.build()?;
    let second = builder.build()?;

    assert_eq!(chains(&first), chains(&second));
    assert_eq!(first.collisions(), second.collisions());
    Ok(())
}

#[test]
fn empty_outer_table_has_no_matches() -> Result<(), Box<dyn Error>> {
    let table = ChainedHashTableBuilder::default()
        .hash_size(64)
        .inner_size(100)
        .build()?;

    assert_eq!(probe_matches(&table, 0, 5, 4)?, 0);
    Ok(())
}

#[test]
fn empty_inner_table_has_no_matches() -> Result<(), Box<dyn Error>> {
    let table = ChainedHashTableBuilder::default()
        .hash_size(64)
        .inner_size(0)
        .build()?;

    assert_eq!(table.occupied_slots(), 0);
    assert_eq!(table.collisions(), 0);
    assert_eq!(probe_matches(&table, 1000, 3, 2)?, 0);
    Ok(())
}

#[test]
fn matches_scale_linearly_with_lookups() -> Result<(), Box<dyn Error>> {
    let table = ChainedHashTableBuilder::default()
        .hash_size(4096)
        .inner_size(10_000)
        .build()?;

    let once = probe_matches(&table, 50_000, 1, 4)?;
    assert!(once > 0);

    for &lookups in &[0, 2, 5] {
        assert_eq!(
            probe_matches(&table, 50_000, lookups, 4)?,
            lookups as u64 * once
        );
    }
    Ok(())
}

#[test]
fn matches_are_bounded_by_two_per_inner_key() -> Result<(), Box<dyn Error>> {
    let table = ChainedHashTableBuilder::default()
        .hash_size(1 << 12)
        .inner_size(1000)
        .build()?;

    // Outer keys cover all inner keys, i.e., 1000 keys with stride 4
    let matches = probe_matches(&table, 4001, 1, 3)?;
    assert!(matches >= 1000);
    assert!(matches <= 2000);
    Ok(())
}

#[test]
fn more_threads_than_keys() -> Result<(), Box<dyn Error>> {
    let table = ChainedHashTableBuilder::default()
        .hasher(IdentityHasher)
        .hash_size(8)
        .inner_size(4)
        .key_stride(1)
        .build()?;

    assert_eq!(probe_matches(&table, 4, 1, 16)?, 6);
    Ok(())
}
