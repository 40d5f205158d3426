/*
 * This Source Code Form is subject to the terms of the Mozilla Public License,
 * v. 2.0. If a copy of the MPL was not distributed with this file, You can
 * obtain one at http://mozilla.org/MPL/2.0/.
 *
 *
 * Copyright 2019-2021 Clemens Lutz
 * Author: Clemens Lutz <lutzcle@cml.li>
 */

//! A hash table with separate chaining over a pre-allocated node pool.
//!
//! The table consists of two regions:
//!
//! - the *directory*, an array of `hash_size` chain heads, and
//! - the *node pool*, an array of `inner_size` nodes that hold the keys.
//!
//! Chains are linked by pool index instead of by pointer. Index `0` denotes
//! the end of a chain, and index `i + 1` refers to the `i`-th node. Thus, a
//! zeroed directory is a valid, empty directory, and the allocator's zeroed
//! memory can be used without a separate initialization pass.
//!
//! A new node always becomes the head of its chain. Chains are thus ordered
//! by descending insertion index.

use crate::error::{ErrorKind, Result};
use crate::join::hasher::{KeyHasher, Murmur3Hasher};
use crate::{CACHE_LINE_SIZE, INNER_KEY_STRIDE, LARGE_PAGE_SIZE};
use numa_rt::runtime::allocator::{Allocator, MemType};
use numa_rt::runtime::memory::{AlignedMemory, ZeroInit};
use std::convert::TryInto;
use std::mem::size_of;
use tracing::debug;

/// Reference to a node in the node pool, or the end of a chain.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[repr(transparent)]
pub struct ChainLink(usize);

impl ChainLink {
    const NULL: Self = Self(0);

    #[inline]
    fn to(index: usize) -> Self {
        Self(index + 1)
    }

    #[inline]
    fn index(self) -> Option<usize> {
        self.0.checked_sub(1)
    }

    #[inline]
    pub fn is_null(self) -> bool {
        self == Self::NULL
    }
}

/// An inserted inner key.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[repr(C)]
pub struct HashNode {
    pub key: u64,
    next: ChainLink,
}

unsafe impl ZeroInit for ChainLink {}
unsafe impl ZeroInit for HashNode {}

/// A chained hash table over a contiguous node pool.
///
/// The table is immutable after the build and can be shared between
/// probe threads without locking.
pub struct ChainedHashTable<H = Murmur3Hasher> {
    hasher: H,
    directory: AlignedMemory<ChainLink>,
    nodes: AlignedMemory<HashNode>,
    collisions: u64,
}

/// Build a `ChainedHashTable`.
#[derive(Clone, Debug)]
pub struct ChainedHashTableBuilder<H = Murmur3Hasher> {
    hasher: H,
    hash_size: usize,
    inner_size: usize,
    key_stride: u64,
    huge_pages: Option<bool>,
}

impl Default for ChainedHashTableBuilder<Murmur3Hasher> {
    fn default() -> Self {
        Self {
            hasher: Murmur3Hasher::default(),
            hash_size: crate::DEFAULT_HASH_SIZE,
            inner_size: crate::DEFAULT_INNER_SIZE,
            key_stride: INNER_KEY_STRIDE,
            huge_pages: None,
        }
    }
}

impl<H: KeyHasher> ChainedHashTableBuilder<H> {
    /// Replaces the hash function, e.g. with a hash function that has a known
    /// slot assignment for testing.
    pub fn hasher<G: KeyHasher>(self, hasher: G) -> ChainedHashTableBuilder<G> {
        ChainedHashTableBuilder {
            hasher,
            hash_size: self.hash_size,
            inner_size: self.inner_size,
            key_stride: self.key_stride,
            huge_pages: self.huge_pages,
        }
    }

    /// Number of directory slots.
    pub fn hash_size(mut self, hash_size: usize) -> Self {
        self.hash_size = hash_size;
        self
    }

    /// Number of inner keys to insert.
    pub fn inner_size(mut self, inner_size: usize) -> Self {
        self.inner_size = inner_size;
        self
    }

    /// Distance between two consecutive inner keys.
    pub fn key_stride(mut self, key_stride: u64) -> Self {
        self.key_stride = key_stride;
        self
    }

    /// Transparent huge page advice for the node pool.
    pub fn huge_pages(mut self, huge_pages: Option<bool>) -> Self {
        self.huge_pages = huge_pages;
        self
    }
}

impl<H: KeyHasher + Clone> ChainedHashTableBuilder<H> {
    /// Allocates the table and inserts the inner keys.
    ///
    /// The `i`-th inner key is `(i + 1) * key_stride`. All keys are distinct
    /// and non-zero for a non-zero stride.
    ///
    /// A directory that is smaller than the inner relation is valid, and
    /// results in longer chains.
    pub fn build(&self) -> Result<ChainedHashTable<H>> {
        if self.hash_size == 0 {
            Err(ErrorKind::InvalidArgument(
                "Hash table size must be at least one slot".to_string(),
            ))?;
        }
        if self.key_stride == 0 {
            Err(ErrorKind::InvalidArgument(
                "Key stride must be non-zero to yield distinct keys".to_string(),
            ))?;
        }

        let inner_size: u64 = self.inner_size.try_into().map_err(|_| {
            ErrorKind::IntegerOverflow("Inner size doesn't fit into a u64".to_string())
        })?;
        inner_size.checked_mul(self.key_stride).ok_or_else(|| {
            ErrorKind::IntegerOverflow(format!(
                "Largest inner key {} * {} overflows a u64",
                inner_size, self.key_stride
            ))
        })?;

        let directory =
            Allocator::alloc_mem(MemType::AlignedSysMem(CACHE_LINE_SIZE), self.hash_size);
        let nodes = Allocator::alloc_mem(
            MemType::AdvisedSysMem(LARGE_PAGE_SIZE, self.huge_pages),
            self.inner_size,
        );

        let mut table = ChainedHashTable {
            hasher: self.hasher.clone(),
            directory,
            nodes,
            collisions: 0,
        };
        table.insert_all(self.key_stride);

        debug!(
            "built hash table with {} slots, {} keys, {} collisions",
            self.hash_size, self.inner_size, table.collisions
        );

        Ok(table)
    }
}

impl<H: KeyHasher> ChainedHashTable<H> {
    /// Inserts the pool's nodes in index order.
    fn insert_all(&mut self, key_stride: u64) {
        let hash_size = self.directory.len() as u64;
        let directory = self.directory.as_mut_slice();

        for (i, node) in self.nodes.as_mut_slice().iter_mut().enumerate() {
            let key = (i as u64 + 1) * key_stride;
            let slot = (self.hasher.hash128(key).0 % hash_size) as usize;

            let head = &mut directory[slot];
            if !head.is_null() {
                self.collisions += 1;
            }

            node.key = key;
            node.next = *head;
            *head = ChainLink::to(i);
        }
    }

    /// Returns the directory slots of both hash halves of `key`.
    #[inline]
    pub fn slots(&self, key: u64) -> (usize, usize) {
        let hash_size = self.directory.len() as u64;
        let (h0, h1) = self.hasher.hash128(key);
        ((h0 % hash_size) as usize, (h1 % hash_size) as usize)
    }

    /// Checks if `key` is in the chain of `slot`. Stops at the first match.
    #[inline]
    pub fn contains_in_slot(&self, slot: usize, key: u64) -> bool {
        self.chain(slot).any(|k| k == key)
    }

    /// Looks up `key` once in the slot of each hash half.
    ///
    /// Returns the number of matches, i.e., 0, 1, or 2. The two lookups are
    /// independent. If both halves select the same slot, a present key
    /// matches twice.
    #[inline]
    pub fn probe_key(&self, key: u64) -> u64 {
        let (s0, s1) = self.slots(key);
        self.contains_in_slot(s0, key) as u64 + self.contains_in_slot(s1, key) as u64
    }
}

impl<H> ChainedHashTable<H> {
    /// Returns an iterator over the keys in the chain of `slot`, starting at
    /// the chain head.
    ///
    /// Panics if `slot` is out-of-bounds.
    pub fn chain(&self, slot: usize) -> Chain<'_> {
        Chain {
            nodes: self.nodes.as_slice(),
            link: self.directory[slot],
        }
    }

    pub fn hash_size(&self) -> usize {
        self.directory.len()
    }

    pub fn inner_size(&self) -> usize {
        self.nodes.len()
    }

    /// Number of insertions into a slot that already had a chain head.
    pub fn collisions(&self) -> u64 {
        self.collisions
    }

    /// Number of slots with a non-empty chain.
    pub fn occupied_slots(&self) -> usize {
        self.directory.iter().filter(|link| !link.is_null()).count()
    }

    /// Size of the directory in bytes.
    pub fn directory_bytes(&self) -> usize {
        self.directory.len() * size_of::<ChainLink>()
    }

    /// Size of the node pool in bytes.
    pub fn pool_bytes(&self) -> usize {
        self.nodes.len() * size_of::<HashNode>()
    }
}

/// Iterator over the keys of a chain.
#[derive(Clone, Debug)]
pub struct Chain<'t> {
    nodes: &'t [HashNode],
    link: ChainLink,
}

impl<'t> Iterator for Chain<'t> {
    type Item = u64;

    #[inline]
    fn next(&mut self) -> Option<u64> {
        let node = &self.nodes[self.link.index()?];
        self.link = node.next;
        Some(node.key)
    }
}
