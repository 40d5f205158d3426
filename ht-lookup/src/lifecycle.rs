/*
 * This Source Code Form is subject to the terms of the Mozilla Public License,
 * v. 2.0. If a copy of the MPL was not distributed with this file, You can
 * obtain one at http://mozilla.org/MPL/2.0/.
 *
 *
 * Copyright 2021 Clemens Lutz
 * Author: Clemens Lutz <lutzcle@cml.li>
 */

//! Announces the benchmark phases to an external observer.

use crate::error::{Result, ResultExt};
use std::ffi::OsString;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

const READY_SUFFIX: &str = ".ready";
const DONE_SUFFIX: &str = ".done";

/// The pair of sentinel files `<base>.ready` and `<base>.done`.
///
/// Creating a sentinel truncates an existing file, so that its modification
/// time marks the latest run.
#[derive(Clone, Debug, PartialEq)]
pub struct SentinelFiles {
    ready: PathBuf,
    done: PathBuf,
}

impl SentinelFiles {
    pub fn new<P: AsRef<Path>>(base: P) -> Self {
        let with_suffix = |suffix: &str| {
            let mut path = OsString::from(base.as_ref().as_os_str());
            path.push(suffix);
            PathBuf::from(path)
        };

        Self {
            ready: with_suffix(READY_SUFFIX),
            done: with_suffix(DONE_SUFFIX),
        }
    }

    pub fn ready_path(&self) -> &Path {
        &self.ready
    }

    pub fn done_path(&self) -> &Path {
        &self.done
    }

    /// Announces that the timed phase is about to start.
    pub fn signal_ready(&self) -> Result<()> {
        info!("signalling readyness to {}", self.ready.display());
        Self::create(&self.ready)
    }

    /// Announces that the timed phase has finished.
    pub fn signal_done(&self) -> Result<()> {
        info!("signalling done to {}", self.done.display());
        Self::create(&self.done)
    }

    fn create(path: &Path) -> Result<()> {
        File::create(path)
            .map(|_| ())
            .chain_err(|| {
                format!(
                    "could not create the shared memory file descriptor {}",
                    path.display()
                )
            })
    }
}

/// Requests a running benchmark to stop at its next phase boundary.
///
/// Clones share the same state.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock-free and thus safe to call from a signal handler.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}
