/*
 * This Source Code Form is subject to the terms of the Mozilla Public License,
 * v. 2.0. If a copy of the MPL was not distributed with this file, You can
 * obtain one at http://mozilla.org/MPL/2.0/.
 *
 *
 * Copyright 2018-2021 Clemens Lutz
 * Author: Clemens Lutz <lutzcle@cml.li>
 */

pub mod chained_hash_table;
mod hasher;
pub mod outer_table;
pub mod probe;

pub use chained_hash_table::{Chain, ChainedHashTable, ChainedHashTableBuilder, HashNode};
pub use hasher::{KeyHasher, Murmur3Hasher};
pub use outer_table::{Element, OuterTable};
pub use probe::{CpuProbe, CpuProbeBuilder, ProbeResult};
