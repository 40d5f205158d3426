/*
 * This Source Code Form is subject to the terms of the Mozilla Public License,
 * v. 2.0. If a copy of the MPL was not distributed with this file, You can
 * obtain one at http://mozilla.org/MPL/2.0/.
 *
 *
 * Copyright 2021 Clemens Lutz
 * Author: Clemens Lutz <lutzcle@cml.li>
 */

use crate::error::{ErrorKind, Result};
use numa_rt::runtime::cpu_affinity::CpuAffinity;
use std::path::PathBuf;

/// Default base path of the sentinel files.
pub const DEFAULT_SENTINEL_BASE: &str = "/tmp/alloctest-bench";

/// Parameters of a benchmark run.
///
/// Constructed once at startup and passed into the benchmark by reference.
#[derive(Clone, Debug, PartialEq)]
pub struct BenchConfig {
    /// Number of hash table directory slots
    pub hash_size: usize,

    /// Number of scans over the outer table
    pub lookups: usize,

    /// Number of outer table rows
    pub outer_size: usize,

    /// Number of inner keys inserted into the hash table
    pub inner_size: usize,

    /// Number of probe worker threads
    pub threads: usize,

    /// Pins probe worker `i` to the `i`-th core, if set
    pub cpu_affinity: Option<CpuAffinity>,

    /// Transparent huge page advice for the node pool and outer table
    pub huge_pages: Option<bool>,

    /// Sentinel files are `<sentinel_base>.ready` and `<sentinel_base>.done`
    pub sentinel_base: PathBuf,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            hash_size: join_ops::DEFAULT_HASH_SIZE,
            lookups: join_ops::DEFAULT_NUM_LOOKUPS,
            outer_size: join_ops::DEFAULT_OUTER_SIZE,
            inner_size: join_ops::DEFAULT_INNER_SIZE,
            threads: 1,
            cpu_affinity: None,
            huge_pages: None,
            sentinel_base: PathBuf::from(DEFAULT_SENTINEL_BASE),
        }
    }
}

impl BenchConfig {
    /// Checks that the configuration can be run.
    ///
    /// Zero lookups and empty tables are valid.
    pub fn validate(&self) -> Result<()> {
        if self.hash_size == 0 {
            Err(ErrorKind::InvalidArgument(
                "Hash table size must be at least 1".to_string(),
            ))?;
        }

        if self.threads == 0 {
            Err(ErrorKind::InvalidArgument(
                "Number of threads must be at least 1".to_string(),
            ))?;
        }

        if let Some(affinity) = &self.cpu_affinity {
            if affinity.len() < self.threads {
                Err(ErrorKind::InvalidArgument(format!(
                    "CPU list contains {} cores, but {} threads are requested",
                    affinity.len(),
                    self.threads
                )))?;
            }
        }

        self.lookups.checked_mul(self.outer_size).ok_or_else(|| {
            ErrorKind::IntegerOverflow(format!(
                "{} lookups over {} outer rows overflow",
                self.lookups, self.outer_size
            ))
        })?;

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn default_is_valid() -> Result<()> {
        BenchConfig::default().validate()
    }

    #[test]
    fn degenerate_sizes_are_valid() -> Result<()> {
        let config = BenchConfig {
            lookups: 0,
            outer_size: 0,
            inner_size: 0,
            ..BenchConfig::default()
        };
        config.validate()
    }

    #[test]
    fn zero_hash_size_is_invalid() {
        let config = BenchConfig {
            hash_size: 0,
            ..BenchConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_threads_is_invalid() {
        let config = BenchConfig {
            threads: 0,
            ..BenchConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn short_cpu_list_is_invalid() {
        let config = BenchConfig {
            threads: 3,
            cpu_affinity: Some(CpuAffinity::from_slice(&[0, 1])),
            ..BenchConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn iteration_space_overflow_is_invalid() {
        let config = BenchConfig {
            lookups: usize::max_value(),
            outer_size: 2,
            ..BenchConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
