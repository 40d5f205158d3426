/*
 * This Source Code Form is subject to the terms of the Mozilla Public License,
 * v. 2.0. If a copy of the MPL was not distributed with this file, You can
 * obtain one at http://mozilla.org/MPL/2.0/.
 *
 *
 * Copyright 2019-2021 Clemens Lutz
 * Author: Clemens Lutz <lutzcle@cml.li>
 */

//! Parallel probe of a chained hash table.
//!
//! The probe repeats a scan of the outer relation `lookups` times. The
//! resulting `lookups * outer_size` iteration space is split into one
//! contiguous range per worker thread. Each worker counts its matches in a
//! private, cache-padded slot, and the slots are summed after all workers
//! are finished.
//!
//! Note that each outer key is looked up twice, once with each half of its
//! 128-bit hash, in the *same* directory. The lookups are not deduplicated.
//! This is not a relational join result. Instead, it models the memory access
//! pattern of two independent random lookups per key.

use crate::error::{ErrorKind, Result};
use crate::join::chained_hash_table::ChainedHashTable;
use crate::join::hasher::KeyHasher;
use crate::join::outer_table::{Element, OuterTable};
use numa_rt::runtime::cpu_affinity::CpuAffinity;
use numa_rt::utils::CachePadded;
use rayon::ThreadPool;
use std::ops::Range;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Result of a probe run.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ProbeResult {
    /// Total matches over all repetitions.
    pub matches: u64,

    /// Wall-clock time of all repetitions.
    pub elapsed: Duration,
}

impl ProbeResult {
    /// Returns the matches of a single repetition.
    ///
    /// Returns `None` if there were no repetitions.
    pub fn matches_per_lookup(&self, lookups: usize) -> Option<u64> {
        match lookups {
            0 => None,
            n => Some(self.matches / n as u64),
        }
    }
}

/// Build a `CpuProbe`.
#[derive(Clone, Debug)]
pub struct CpuProbeBuilder {
    threads: usize,
    cpu_affinity: Option<CpuAffinity>,
}

impl Default for CpuProbeBuilder {
    fn default() -> Self {
        Self {
            threads: 1,
            cpu_affinity: None,
        }
    }
}

impl CpuProbeBuilder {
    pub fn threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    /// Pins worker `i` to the `i`-th core of the affinity list.
    pub fn cpu_affinity(mut self, cpu_affinity: CpuAffinity) -> Self {
        self.cpu_affinity = Some(cpu_affinity);
        self
    }

    /// Spawns the worker threads.
    pub fn build(&self) -> Result<CpuProbe> {
        if self.threads == 0 {
            Err(ErrorKind::InvalidArgument(
                "Probe requires at least one thread".to_string(),
            ))?;
        }

        let mut pool_builder = rayon::ThreadPoolBuilder::new().num_threads(self.threads);

        if let Some(cpu_affinity) = &self.cpu_affinity {
            if cpu_affinity.len() < self.threads {
                Err(ErrorKind::InvalidArgument(format!(
                    "CPU affinity list has {} cores, but {} threads are requested",
                    cpu_affinity.len(),
                    self.threads
                )))?;
            }

            let boxed_cpu_affinity = Arc::new(cpu_affinity.clone());
            pool_builder = pool_builder.start_handler(move |tid| {
                if let Err(e) = boxed_cpu_affinity.set_affinity(tid as u16) {
                    warn!("Couldn't set CPU core affinity of thread {}: {}", tid, e);
                }
            });
        }

        Ok(CpuProbe {
            threads: self.threads,
            thread_pool: pool_builder.build()?,
        })
    }
}

/// Probes a hash table on the CPU with a fixed number of worker threads.
#[derive(Debug)]
pub struct CpuProbe {
    threads: usize,
    thread_pool: ThreadPool,
}

impl CpuProbe {
    pub fn threads(&self) -> usize {
        self.threads
    }

    /// Looks up every outer key in `table`, repeated `lookups` times, and
    /// counts the matches.
    ///
    /// The hash table and the outer table are only read. The elapsed time
    /// excludes thread pool creation.
    pub fn probe<H: KeyHasher>(
        &self,
        table: &ChainedHashTable<H>,
        outer: &OuterTable,
        lookups: usize,
    ) -> Result<ProbeResult> {
        let total = lookups.checked_mul(outer.len()).ok_or_else(|| {
            ErrorKind::IntegerOverflow(format!(
                "Probe iteration space {} * {} overflows",
                lookups,
                outer.len()
            ))
        })?;

        let rows = outer.as_slice();
        let mut partial_matches: Vec<_> = (0..self.threads)
            .map(|_| CachePadded::new(0_u64))
            .collect();

        debug!(
            "probing {} keys with {} threads in chunks of {}",
            total,
            self.threads,
            chunk_len(total, self.threads)
        );

        let timer = Instant::now();
        self.thread_pool.scope(|s| {
            for (tid, matches) in partial_matches.iter_mut().enumerate() {
                let range = thread_range(total, self.threads, tid);
                s.spawn(move |_| {
                    **matches = probe_range(table, rows, range);
                });
            }
        });
        let elapsed = timer.elapsed();

        Ok(ProbeResult {
            matches: partial_matches.iter().map(|m| **m).sum(),
            elapsed,
        })
    }
}

/// Length of a thread's chunk, i.e., `total / threads` rounded up.
fn chunk_len(total: usize, threads: usize) -> usize {
    total / threads + (total % threads != 0) as usize
}

/// The part of the iteration space that thread `tid` probes.
fn thread_range(total: usize, threads: usize, tid: usize) -> Range<usize> {
    let chunk = chunk_len(total, threads);
    let begin = tid.saturating_mul(chunk).min(total);
    let end = begin.saturating_add(chunk).min(total);
    begin..end
}

/// Probes a range of the flattened `lookups * rows.len()` iteration space.
///
/// Position `i` refers to row `i % rows.len()`.
fn probe_range<H: KeyHasher>(
    table: &ChainedHashTable<H>,
    rows: &[Element],
    range: Range<usize>,
) -> u64 {
    if rows.is_empty() {
        return 0;
    }

    let mut matches = 0;
    let mut row = range.start % rows.len();
    for _ in range {
        matches += table.probe_key(rows[row].key);
        row += 1;
        if row == rows.len() {
            row = 0;
        }
    }

    matches
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::join::chained_hash_table::ChainedHashTableBuilder;
    use std::error::Error;

    #[test]
    fn matches_per_lookup_guards_zero() {
        let result = ProbeResult {
            matches: 10,
            elapsed: Duration::from_secs(1),
        };
        assert_eq!(result.matches_per_lookup(0), None);
        assert_eq!(result.matches_per_lookup(2), Some(5));
    }

    #[test]
    fn zero_threads_is_rejected() {
        assert!(CpuProbeBuilder::default().threads(0).build().is_err());
    }

    #[test]
    fn short_affinity_list_is_rejected() {
        let result = CpuProbeBuilder::default()
            .threads(2)
            .cpu_affinity(CpuAffinity::from_slice(&[0]))
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn thread_ranges_cover_iteration_space() {
        for &(total, threads) in &[(0, 3), (10, 3), (9, 3), (2, 7), (1000, 1)] {
            let ranges: Vec<_> = (0..threads)
                .map(|tid| thread_range(total, threads, tid))
                .collect();
            assert_eq!(ranges[0].start, 0);
            assert_eq!(ranges[threads - 1].end, total);
            assert!(ranges.windows(2).all(|w| w[0].end == w[1].start));
        }
    }

    #[test]
    fn thread_ranges_near_usize_max() {
        let total = usize::max_value();
        assert_eq!(chunk_len(total, 2), total / 2 + 1);

        let first = thread_range(total, 2, 0);
        let second = thread_range(total, 2, 1);
        assert_eq!(first, 0..total / 2 + 1);
        assert_eq!(second, total / 2 + 1..total);
        assert_eq!(first.len() + second.len(), total);
    }

    #[test]
    fn range_wraps_around_outer_table() -> std::result::Result<(), Box<dyn Error>> {
        let table = ChainedHashTableBuilder::default()
            .hash_size(64)
            .inner_size(16)
            .key_stride(1)
            .build()?;
        let outer = OuterTable::build(8, None);

        let single_pass = probe_range(&table, outer.as_slice(), 0..8);
        let wrapped = probe_range(&table, outer.as_slice(), 5..21);
        assert_eq!(wrapped, 2 * single_pass);
        Ok(())
    }

    #[test]
    fn thread_count_does_not_change_matches() -> std::result::Result<(), Box<dyn Error>> {
        let table = ChainedHashTableBuilder::default()
            .hash_size(1024)
            .inner_size(2000)
            .build()?;
        let outer = OuterTable::build(10_000, None);

        let single = CpuProbeBuilder::default().threads(1).build()?;
        let expected = single.probe(&table, &outer, 3)?.matches;

        for &threads in &[2, 3, 7] {
            let probe = CpuProbeBuilder::default().threads(threads).build()?;
            assert_eq!(probe.probe(&table, &outer, 3)?.matches, expected);
        }
        Ok(())
    }
}
