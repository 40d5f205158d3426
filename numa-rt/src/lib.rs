/*
 * This Source Code Form is subject to the terms of the Mozilla Public License,
 * v. 2.0. If a copy of the MPL was not distributed with this file, You can
 * obtain one at http://mozilla.org/MPL/2.0/.
 *
 *
 * Copyright 2021 Clemens Lutz
 * Author: Clemens Lutz <lutzcle@cml.li>
 */

//! # The NUMA Runtime
//!
//! `numa-rt` places memory and threads for CPU benchmarks. It provides:
//!
//! - an allocator for large, zeroed, alignment-constrained regions that are
//!   optionally advised to use transparent huge pages,
//! - hardware information such as the page and cacheline sizes,
//! - CPU core affinity for worker threads,
//! - cache padding to avoid false sharing between workers.
//!
//! Allocation failures are not recoverable. Benchmarks built on this crate
//! depend on exact memory placement, and thus the allocator terminates the
//! process instead of returning an error.

pub mod error;
pub mod runtime;
pub mod utils;
