/*
 * This Source Code Form is subject to the terms of the Mozilla Public License,
 * v. 2.0. If a copy of the MPL was not distributed with this file, You can
 * obtain one at http://mozilla.org/MPL/2.0/.
 *
 *
 * Copyright 2021 Clemens Lutz
 * Author: Clemens Lutz <lutzcle@cml.li>
 */

//! Human-readable benchmark output.
//!
//! The benchmark writes two outputs. The summary is printed to stdout. The
//! benchmark log is an XML-like record of the run that is appended to a log
//! file, e.g. to collect multiple runs in one file:
//!
//! ```text
//! <benchmark exec="ht-lookup">
//! <config>
//!   <threads>4</threads></config>
//! <run>
//! </run>
//! Took: 2.345
//! </benchmark>
//! ```

use crate::config::BenchConfig;
use crate::error::Result;
use crate::measurement::lookup_bench::LookupPoint;
use join_ops::join::chained_hash_table::ChainLink;
use join_ops::join::{Element, HashNode};
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::mem::size_of;
use std::os::unix::io::{AsRawFd, RawFd};
use std::path::Path;
use std::time::Duration;
use tracing::warn;

/// Formats a duration as `seconds.milliseconds`, e.g. `2.045`.
pub fn format_seconds(duration: Duration) -> String {
    format!("{}.{:03}", duration.as_secs(), duration.subsec_millis())
}

/// Memory footprint of the benchmark's data structures.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct MemoryFootprint {
    /// Hash table directory
    pub hash_table_bytes: usize,
    /// Outer table
    pub data_table_bytes: usize,
    /// Hash table node pool
    pub element_bytes: usize,
}

impl MemoryFootprint {
    pub fn new(config: &BenchConfig) -> Self {
        Self {
            hash_table_bytes: config.hash_size.saturating_mul(size_of::<ChainLink>()),
            data_table_bytes: config.outer_size.saturating_mul(size_of::<Element>()),
            element_bytes: config.inner_size.saturating_mul(size_of::<HashNode>()),
        }
    }

    pub fn total_bytes(&self) -> usize {
        self.hash_table_bytes
            .saturating_add(self.data_table_bytes)
            .saturating_add(self.element_bytes)
    }
}

impl fmt::Display for MemoryFootprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Hashtable Size: {}MB", self.hash_table_bytes >> 20)?;
        writeln!(f, "Datatable Size: {}MB", self.data_table_bytes >> 20)?;
        writeln!(f, "Element Size: {} MB", self.element_bytes >> 20)?;
        write!(f, "Total: {} MB", self.total_bytes() >> 20)
    }
}

/// Summary of a completed run.
pub struct Summary<'a> {
    pub point: &'a LookupPoint,
    pub lookups: usize,
    pub outer_size: usize,
}

impl<'a> fmt::Display for Summary<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let per_lookup = self
            .point
            .matches_per_lookup(self.lookups)
            .map_or_else(|| "n/a".to_string(), |m| m.to_string());

        writeln!(
            f,
            "got {} matches / {} matches per iteration of {}",
            self.point.matches,
            per_lookup,
            self.outer_size.saturating_mul(2)
        )?;
        writeln!(f, "hashtable conflicts = {}", self.point.collisions)?;
        write!(f, "Lookup time: {}", format_seconds(self.point.probe_time))
    }
}

enum LogTarget {
    Stdout(io::Stdout),
    File(File),
}

/// The XML-like benchmark log.
///
/// Each record is flushed immediately, because the termination signal
/// handler appends to the same file descriptor.
pub struct BenchLog {
    target: LogTarget,
}

impl BenchLog {
    /// Appends to the log file at `path`, or writes to stdout.
    ///
    /// Falls back to stdout if the file can't be opened.
    pub fn open(path: Option<&Path>) -> Self {
        let target = match path {
            None => LogTarget::Stdout(io::stdout()),
            Some(path) => match OpenOptions::new().create(true).append(true).open(path) {
                Ok(file) => LogTarget::File(file),
                Err(e) => {
                    warn!(
                        "Could not open the file '{}' switching to stdout: {}",
                        path.display(),
                        e
                    );
                    LogTarget::Stdout(io::stdout())
                }
            },
        };

        Self { target }
    }

    pub fn is_stdout(&self) -> bool {
        matches!(self.target, LogTarget::Stdout(_))
    }

    pub fn begin(&mut self, exec: &str) -> Result<()> {
        self.record(format_args!("<benchmark exec=\"{}\">", exec))
    }

    pub fn config(&mut self, config: &BenchConfig) -> Result<()> {
        self.record(format_args!(
            "<config>\n  <threads>{}</threads></config>",
            config.threads
        ))
    }

    pub fn run_begin(&mut self) -> Result<()> {
        self.record(format_args!("<run>"))
    }

    pub fn run_end(&mut self) -> Result<()> {
        self.record(format_args!("</run>"))
    }

    pub fn took(&mut self, duration: Duration) -> Result<()> {
        self.record(format_args!("Took: {}", format_seconds(duration)))
    }

    pub fn end(&mut self) -> Result<()> {
        self.record(format_args!("</benchmark>"))
    }

    fn record(&mut self, line: fmt::Arguments<'_>) -> Result<()> {
        match &mut self.target {
            LogTarget::Stdout(stdout) => {
                let mut lock = stdout.lock();
                lock.write_fmt(line)?;
                lock.write_all(b"\n")?;
                lock.flush()?;
            }
            LogTarget::File(file) => {
                file.write_fmt(line)?;
                file.write_all(b"\n")?;
            }
        }
        Ok(())
    }
}

impl AsRawFd for BenchLog {
    fn as_raw_fd(&self) -> RawFd {
        match &self.target {
            LogTarget::Stdout(stdout) => stdout.as_raw_fd(),
            LogTarget::File(file) => file.as_raw_fd(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::error::Error;
    use std::fs;

    #[test]
    fn seconds_have_three_decimals() {
        assert_eq!(format_seconds(Duration::from_millis(2045)), "2.045");
        assert_eq!(format_seconds(Duration::from_micros(999)), "0.000");
        assert_eq!(format_seconds(Duration::from_secs(10)), "10.000");
    }

    #[test]
    fn footprint_of_default_config() {
        let footprint = MemoryFootprint::new(&BenchConfig::default());
        assert_eq!(footprint.hash_table_bytes, 64 << 20);
        assert_eq!(footprint.data_table_bytes, 256 << 20);
        assert_eq!(footprint.element_bytes, 128 << 20);

        let text = footprint.to_string();
        assert!(text.contains("Hashtable Size: 64MB"));
        assert!(text.contains("Total: 448 MB"));
    }

    #[test]
    fn summary_without_lookups() {
        let point = LookupPoint {
            matches: 0,
            collisions: 7,
            ..LookupPoint::default()
        };
        let text = Summary {
            point: &point,
            lookups: 0,
            outer_size: 5,
        }
        .to_string();

        assert!(text.contains("got 0 matches / n/a matches per iteration of 10"));
        assert!(text.contains("hashtable conflicts = 7"));
    }

    #[test]
    fn log_appends_to_file() -> std::result::Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("bench.log");
        fs::write(&path, "previous\n")?;

        let mut log = BenchLog::open(Some(path.as_path()));
        assert!(!log.is_stdout());
        log.begin("ht-lookup")?;
        log.config(&BenchConfig {
            threads: 4,
            ..BenchConfig::default()
        })?;
        log.run_begin()?;
        log.run_end()?;
        log.took(Duration::from_millis(1500))?;
        log.end()?;

        let contents = fs::read_to_string(&path)?;
        assert_eq!(
            contents,
            "previous\n\
             <benchmark exec=\"ht-lookup\">\n\
             <config>\n  <threads>4</threads></config>\n\
             <run>\n\
             </run>\n\
             Took: 1.500\n\
             </benchmark>\n"
        );
        Ok(())
    }

    #[test]
    fn unopenable_log_falls_back_to_stdout() {
        let log = BenchLog::open(Some(Path::new("/nonexistent-directory/bench.log")));
        assert!(log.is_stdout());
        assert_eq!(log.as_raw_fd(), libc::STDOUT_FILENO);
    }
}
