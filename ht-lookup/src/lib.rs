/*
 * This Source Code Form is subject to the terms of the Mozilla Public License,
 * v. 2.0. If a copy of the MPL was not distributed with this file, You can
 * obtain one at http://mozilla.org/MPL/2.0/.
 *
 *
 * Copyright 2021 Clemens Lutz
 * Author: Clemens Lutz <lutzcle@cml.li>
 */

//! # Hash Table Lookup Benchmark
//!
//! Measures the lookup throughput of a chained hash table. The benchmark
//! builds the hash table and an outer table, and then times repeated
//! lookups of all outer keys.
//!
//! The benchmark is designed to run alongside an external observer, e.g., a
//! tool that samples the page tables of the process. The observer is
//! synchronized with two sentinel files:
//!
//! - `<base>.ready` is created after the build, right before the timed
//!   lookups start.
//! - `<base>.done` is created after the lookups finish, or when the process
//!   is terminated by `SIGUSR1` or `SIGTERM`.
//!
//! Only the existence and the creation time of the files is meaningful.

pub mod config;
pub mod error;
pub mod lifecycle;
pub mod measurement;
pub mod report;
pub mod signal;
