/*
 * This Source Code Form is subject to the terms of the Mozilla Public License,
 * v. 2.0. If a copy of the MPL was not distributed with this file, You can
 * obtain one at http://mozilla.org/MPL/2.0/.
 *
 *
 * Copyright 2019-2021 Clemens Lutz
 * Author: Clemens Lutz <lutzcle@cml.li>
 */

//! # The Join Operator Library
//!
//! `join-ops` implements the building blocks of a synthetic hash join that
//! stresses the memory subsystem:
//!
//! - a chained hash table built over a pre-allocated node pool,
//! - an outer table of probe keys,
//! - a parallel probe kernel that looks up each outer key twice, once per
//!   half of a 128-bit hash.
//!
//! The join only counts matches. It does not materialize results.
//!
//! # Tuning parameters
//!
//! Several tuning parameters are defined as constant values. These affect
//! the memory footprint and placement and should be adjusted if necessary.
//!
//! ## CPU cacheline size
//!
//! `CACHE_LINE_SIZE` defines the alignment of the hash table directory.
//!
//! ## Large page size
//!
//! `LARGE_PAGE_SIZE` defines the alignment of the node pool and the outer
//! table. Aligning large regions to a 2 MiB boundary allows the OS to back
//! them with transparent huge pages, which reduces TLB pressure.
//!
//! ## Random seed
//!
//! `RAND_SEED` seeds the hash function. A fixed seed makes the hash table
//! layout, and thus the collision count, reproducible across runs.
//!
//! ## Inner key stride
//!
//! `INNER_KEY_STRIDE` spaces the inner keys. The `i`-th inner key is
//! `(i + 1) * INNER_KEY_STRIDE`. Thus, only every `INNER_KEY_STRIDE`-th outer
//! key can find a match.
//!
//! ## Element tuple size
//!
//! `ELEMENT_TUPLE_SIZE` defines the number of 8-byte payload attributes of an
//! outer table row. The payload is never read, but it widens the row and thus
//! the stride of the outer table scan.

pub mod error;
pub mod join;

/// Alignment of the hash table directory in bytes.
pub const CACHE_LINE_SIZE: usize = 64;

/// Alignment of the node pool and the outer table in bytes.
pub const LARGE_PAGE_SIZE: usize = 2 * 1024 * 1024;

/// Seed of the hash function.
pub const RAND_SEED: u32 = 42;

/// Distance between two consecutive inner keys.
pub const INNER_KEY_STRIDE: u64 = 4;

/// Number of payload attributes in an outer table row.
pub const ELEMENT_TUPLE_SIZE: usize = 3;

/// Default number of hash table directory slots.
pub const DEFAULT_HASH_SIZE: usize = 8 * 1024 * 1024;

/// Default number of probe passes over the outer table.
pub const DEFAULT_NUM_LOOKUPS: usize = 8;

/// Default number of outer table rows.
pub const DEFAULT_OUTER_SIZE: usize = 8 * 1024 * 1024;

/// Default number of inner keys.
pub const DEFAULT_INNER_SIZE: usize = 8 * 1024 * 1024;
