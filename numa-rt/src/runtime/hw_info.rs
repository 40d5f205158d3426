/*
 * This Source Code Form is subject to the terms of the Mozilla Public License,
 * v. 2.0. If a copy of the MPL was not distributed with this file, You can
 * obtain one at http://mozilla.org/MPL/2.0/.
 *
 *
 * Copyright 2018-2021 German Research Center for Artificial Intelligence (DFKI)
 * Author: Clemens Lutz <clemens.lutz@dfki.de>
 */

use crate::error::{ErrorKind, Result};
use procfs::CpuInfo;
use std::fmt;
use std::fs;

/// Fallback cacheline size if the OS doesn't report one.
const DEFAULT_CACHE_LINE_SIZE: usize = 64;

pub struct ProcessorCache {}

impl ProcessorCache {
    fn sysconf(name: libc::c_int) -> Option<usize> {
        match unsafe { libc::sysconf(name) } {
            size if size <= 0 => None,
            size => Some(size as usize),
        }
    }

    #[allow(non_snake_case)]
    pub fn L1D_size() -> Option<usize> {
        Self::sysconf(libc::_SC_LEVEL1_DCACHE_SIZE)
    }

    #[allow(non_snake_case)]
    pub fn L2_size() -> Option<usize> {
        Self::sysconf(libc::_SC_LEVEL2_CACHE_SIZE)
    }

    #[allow(non_snake_case)]
    pub fn L3_size() -> Option<usize> {
        Self::sysconf(libc::_SC_LEVEL3_CACHE_SIZE)
    }

    /// Returns the L1 data cacheline size
    ///
    /// Some virtualized environments report zero, in which case 64 bytes are
    /// assumed.
    pub fn cache_line_size() -> usize {
        Self::sysconf(libc::_SC_LEVEL1_DCACHE_LINESIZE).unwrap_or(DEFAULT_CACHE_LINE_SIZE)
    }

    /// Returns the small page size
    pub fn page_size() -> usize {
        let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
        size as usize
    }

    /// Returns the transparent huge page size
    ///
    /// Example
    /// ```
    /// # use numa_rt::runtime::hw_info::ProcessorCache;
    /// # use std::error::Error;
    /// # fn main() -> Result<(), Box<dyn Error>> {
    /// if let Ok(size) = ProcessorCache::huge_page_size() {
    ///     assert!(size >= ProcessorCache::page_size());
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub fn huge_page_size() -> Result<usize> {
        let contents = fs::read_to_string("/sys/kernel/mm/transparent_hugepage/hpage_pmd_size")?;

        let huge_page_size: usize = contents.trim().parse().map_err(|_| {
            ErrorKind::RuntimeError("Failed to parse Linux huge page size".to_string())
        })?;

        Ok(huge_page_size)
    }
}

impl fmt::Display for ProcessorCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let show =
            |size: Option<usize>| size.map_or_else(|| "unknown".to_string(), |s| s.to_string());

        write!(
            f,
            concat!(
                "L1 cache size: {}\nL2 cache size: {}\nL3 cache size: {}\n",
                "cacheline size: {}\npage size: {}"
            ),
            show(Self::L1D_size()),
            show(Self::L2_size()),
            show(Self::L3_size()),
            Self::cache_line_size(),
            Self::page_size()
        )
    }
}

/// Returns the codename of the current CPU.
///
/// For example: `Intel(R) Core(TM) i7-5600U CPU @ 2.60GHz`
#[cfg(not(target_arch = "powerpc64"))]
pub fn cpu_codename() -> Result<String> {
    let cpu_id = 0;
    CpuInfo::new()?
        .model_name(cpu_id)
        .map(|name| name.to_string())
        .ok_or_else(|| ErrorKind::RuntimeError("Failed to get CPU codename".to_string()).into())
}

/// Returns the codename of the current CPU.
///
/// For example: `POWER9, altivec supported`
#[cfg(target_arch = "powerpc64")]
pub fn cpu_codename() -> Result<String> {
    let cpu_id = 0;
    CpuInfo::new()?
        .get_info(cpu_id)
        .and_then(|mut m| m.remove("cpu"))
        .map(|name| name.to_string())
        .ok_or_else(|| ErrorKind::RuntimeError("Failed to get CPU codename".to_string()).into())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn page_size_is_power_of_two() {
        assert!(ProcessorCache::page_size().is_power_of_two());
    }

    #[test]
    fn cache_line_size_is_power_of_two() {
        let size = ProcessorCache::cache_line_size();
        assert!(size.is_power_of_two());
        assert!(size >= 16);
    }
}
