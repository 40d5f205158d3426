/*
 * This Source Code Form is subject to the terms of the Mozilla Public License,
 * v. 2.0. If a copy of the MPL was not distributed with this file, You can
 * obtain one at http://mozilla.org/MPL/2.0/.
 *
 *
 * Copyright 2018-2021 German Research Center for Artificial Intelligence (DFKI)
 * Author: Clemens Lutz <clemens.lutz@dfki.de>
 */

use crate::config::BenchConfig;
use crate::error::Result;
use crate::lifecycle::{CancellationToken, SentinelFiles};
use join_ops::join::{ChainedHashTableBuilder, CpuProbeBuilder, OuterTable, ProbeResult};
use join_ops::INNER_KEY_STRIDE;
use std::thread;
use std::time::{Duration, Instant};
use tracing::info;

/// Pause between announcing readiness and starting the timed lookups.
const READY_PAUSE: Duration = Duration::from_micros(100);

/// Measurements of a completed run.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LookupPoint {
    pub collisions: u64,
    pub matches: u64,

    /// Hash table allocation and inserts
    pub build_time: Duration,

    /// Outer table allocation and initialization
    pub malloc_time: Duration,

    /// All lookups, i.e., the timed phase
    pub probe_time: Duration,
}

impl LookupPoint {
    /// Returns the matches of a single scan over the outer table, or `None`
    /// for zero lookups.
    pub fn matches_per_lookup(&self, lookups: usize) -> Option<u64> {
        ProbeResult {
            matches: self.matches,
            elapsed: self.probe_time,
        }
        .matches_per_lookup(lookups)
    }
}

/// How a run ended.
#[derive(Clone, Debug, PartialEq)]
pub enum RunOutcome {
    Completed(LookupPoint),

    /// Stopped at a phase boundary. The done sentinel is written, but there
    /// are no measurements.
    Cancelled,
}

/// Runs the build phase, announces readiness, and times the lookups.
pub struct LookupBench<'c> {
    config: &'c BenchConfig,
    sentinels: SentinelFiles,
    token: CancellationToken,
}

impl<'c> LookupBench<'c> {
    pub fn new(
        config: &'c BenchConfig,
        sentinels: SentinelFiles,
        token: CancellationToken,
    ) -> Self {
        Self {
            config,
            sentinels,
            token,
        }
    }

    pub fn run(&self) -> Result<RunOutcome> {
        let config = self.config;
        config.validate()?;

        let mut probe_builder = CpuProbeBuilder::default().threads(config.threads);
        if let Some(affinity) = &config.cpu_affinity {
            probe_builder = probe_builder.cpu_affinity(affinity.clone());
        }
        let probe = probe_builder.build()?;

        let build_timer = Instant::now();
        let table = ChainedHashTableBuilder::default()
            .hash_size(config.hash_size)
            .inner_size(config.inner_size)
            .key_stride(INNER_KEY_STRIDE)
            .huge_pages(config.huge_pages)
            .build()?;
        let build_time = build_timer.elapsed();

        let malloc_timer = Instant::now();
        let outer = OuterTable::build(config.outer_size, config.huge_pages);
        let malloc_time = malloc_timer.elapsed();

        info!(
            "built hash table with {} collisions in {:?}",
            table.collisions(),
            build_time
        );

        if self.token.is_cancelled() {
            return self.cancel();
        }

        self.sentinels.signal_ready()?;
        thread::sleep(READY_PAUSE);

        if self.token.is_cancelled() {
            return self.cancel();
        }

        let result = probe.probe(&table, &outer, config.lookups)?;
        self.sentinels.signal_done()?;

        Ok(RunOutcome::Completed(LookupPoint {
            collisions: table.collisions(),
            matches: result.matches,
            build_time,
            malloc_time,
            probe_time: result.elapsed,
        }))
    }

    fn cancel(&self) -> Result<RunOutcome> {
        info!("run cancelled");
        self.sentinels.signal_done()?;
        Ok(RunOutcome::Cancelled)
    }
}
