/*
 * This Source Code Form is subject to the terms of the Mozilla Public License,
 * v. 2.0. If a copy of the MPL was not distributed with this file, You can
 * obtain one at http://mozilla.org/MPL/2.0/.
 *
 *
 * Copyright 2019-2021 Clemens Lutz
 * Author: Clemens Lutz <lutzcle@cml.li>
 */

//! Set the CPU core affinity of a thread.

use crate::error::{ErrorKind, Result};
use crate::runtime::linux_wrapper::{self, CpuSet};
use std::str::FromStr;

/// Maps worker thread IDs to CPU core IDs.
#[derive(Clone, Debug, PartialEq)]
pub struct CpuAffinity {
    affinity_list: Vec<u16>,
}

impl CpuAffinity {
    /// Takes a slice containing CPU core affinities.
    pub fn from_slice(affinity_list: &[u16]) -> Self {
        Self {
            affinity_list: Vec::from(affinity_list),
        }
    }

    /// Maps a thread ID to a CPU core ID.
    ///
    /// Returns a CPU core ID, or `None` if the thread ID is out-of-bounds.
    /// Core IDs are guaranteed to be in the order given on construction.
    pub fn thread_to_cpu(&self, tid: u16) -> Option<u16> {
        self.affinity_list.get(usize::from(tid)).copied()
    }

    /// Binds the current thread to the CPU core by the given thread ID.
    pub fn set_affinity(&self, tid: u16) -> Result<()> {
        let core_id = self.thread_to_cpu(tid).ok_or_else(|| {
            ErrorKind::InvalidArgument(format!("Thread ID {} is out-of-bounds", tid))
        })?;

        let mut cpu_set = CpuSet::new();
        cpu_set.add(core_id);
        linux_wrapper::sched_setaffinity(&cpu_set)
    }

    /// Returns the number of CPU core IDs currently stored in the mapping.
    pub fn len(&self) -> usize {
        self.affinity_list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.affinity_list.is_empty()
    }

    /// Returns the CPU core ID that the calling thread is currently running on.
    pub fn get_cpu() -> Result<u16> {
        linux_wrapper::sched_getcpu()
    }

    /// Returns the CPU cores that the process is currently allowed to run on.
    pub fn from_current_mask() -> Result<Self> {
        let cpu_set = linux_wrapper::sched_getaffinity()?;
        Ok(Self {
            affinity_list: cpu_set.ids(),
        })
    }
}

/// Parses a Linux CPU list, e.g. `0-3,8,10-11`.
///
/// This is the format used by `taskset -c` and `/sys/devices/system/cpu/online`.
/// Order is preserved, thus `4,0` maps thread 0 to core 4.
impl FromStr for CpuAffinity {
    type Err = crate::error::Error;

    fn from_str(list: &str) -> Result<Self> {
        let invalid = |item: &str| {
            ErrorKind::InvalidArgument(format!("Invalid CPU list item '{}'", item))
        };

        let mut affinity_list = Vec::new();
        for item in list.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let (first, last) = match item.find('-') {
                Some(pos) => (&item[..pos], &item[pos + 1..]),
                None => (item, item),
            };
            let first: u16 = first.trim().parse().map_err(|_| invalid(item))?;
            let last: u16 = last.trim().parse().map_err(|_| invalid(item))?;
            if first > last || last >= CpuSet::MAX_LEN {
                Err(invalid(item))?;
            }
            affinity_list.extend(first..=last);
        }

        if affinity_list.is_empty() {
            Err(ErrorKind::InvalidArgument("Empty CPU list".to_string()))?;
        }

        Ok(Self { affinity_list })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parse_cpu_list() -> Result<()> {
        let affinity: CpuAffinity = "0-3, 8,10-11".parse()?;
        assert_eq!(
            affinity,
            CpuAffinity::from_slice(&[0, 1, 2, 3, 8, 10, 11])
        );
        assert_eq!(affinity.thread_to_cpu(4), Some(8));
        assert_eq!(affinity.thread_to_cpu(7), None);
        Ok(())
    }

    #[test]
    fn parse_cpu_list_keeps_order() -> Result<()> {
        let affinity: CpuAffinity = "4,0".parse()?;
        assert_eq!(affinity.thread_to_cpu(0), Some(4));
        assert_eq!(affinity.thread_to_cpu(1), Some(0));
        Ok(())
    }

    #[test]
    fn parse_invalid_cpu_list() {
        assert!("".parse::<CpuAffinity>().is_err());
        assert!("3-1".parse::<CpuAffinity>().is_err());
        assert!("a,b".parse::<CpuAffinity>().is_err());
        assert!("0-5000".parse::<CpuAffinity>().is_err());
    }

    #[test]
    fn pin_to_first_allowed_core() -> Result<()> {
        let affinity = CpuAffinity::from_current_mask()?;
        assert!(!affinity.is_empty());

        // Pin a scratch thread so that the test harness thread stays unpinned
        let expected = affinity.thread_to_cpu(0);
        let observed = std::thread::spawn(move || -> Result<u16> {
            affinity.set_affinity(0)?;
            CpuAffinity::get_cpu()
        })
        .join()
        .expect("Pinned thread panicked")?;

        assert_eq!(Some(observed), expected);
        Ok(())
    }

    #[test]
    fn out_of_bounds_thread_is_rejected() {
        let affinity = CpuAffinity::from_slice(&[0]);
        assert!(affinity.set_affinity(1).is_err());
    }
}
