/*
 * This Source Code Form is subject to the terms of the Mozilla Public License,
 * v. 2.0. If a copy of the MPL was not distributed with this file, You can
 * obtain one at http://mozilla.org/MPL/2.0/.
 *
 *
 * Copyright 2019 German Research Center for Artificial Intelligence (DFKI)
 * Author: Clemens Lutz <clemens.lutz@dfki.de>
 */

//! Thin wrappers around the Linux system calls used by the runtime.

use crate::error::{ErrorKind, Result};
use std::io::Error as IoError;
use std::mem::size_of;

/// CPU set to create CPU core masks.
///
/// Inspired by Linux's `cpu_set_t`, see the `cpu_set` manual page.
///
/// Limitations
/// ===========
///
/// The set is restricted to 1024 entries, which matches the size of glibc's
/// `cpu_set_t`. Therefore, IDs must be smaller than 1024.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct CpuSet {
    mask: [u64; 16],
}

impl CpuSet {
    pub const MAX_LEN: u16 = 1024;
    const ENTRY_LEN: u16 = 64;

    /// Create an empty CPU set.
    pub fn new() -> Self {
        Self { mask: [0; 16] }
    }

    /// Add an ID to the set.
    pub fn add(&mut self, id: u16) {
        assert!(id < Self::MAX_LEN);

        let entry = &mut self.mask[(id / Self::ENTRY_LEN) as usize];
        *entry |= 1 << (id % Self::ENTRY_LEN);
    }

    /// Query if an ID is included in the set.
    pub fn is_set(&self, id: u16) -> bool {
        assert!(id < Self::MAX_LEN);

        let entry = self.mask[(id / Self::ENTRY_LEN) as usize];
        entry & (1 << (id % Self::ENTRY_LEN)) != 0
    }

    /// Returns the number of IDs in the set.
    pub fn count(&self) -> usize {
        self.mask.iter().map(|e| e.count_ones() as usize).sum()
    }

    /// Returns the IDs contained in the set in ascending order.
    pub fn ids(&self) -> Vec<u16> {
        (0..Self::MAX_LEN).filter(|&id| self.is_set(id)).collect()
    }

    /// Size of the set in bytes, as expected by `sched_setaffinity`.
    pub fn bytes(&self) -> usize {
        self.mask.len() * size_of::<u64>()
    }

    fn as_ptr(&self) -> *const libc::cpu_set_t {
        self.mask.as_ptr() as *const libc::cpu_set_t
    }

    fn as_mut_ptr(&mut self) -> *mut libc::cpu_set_t {
        self.mask.as_mut_ptr() as *mut libc::cpu_set_t
    }
}

impl Default for CpuSet {
    fn default() -> Self {
        Self::new()
    }
}

/// Restricts the calling thread to the CPU cores in the set.
pub fn sched_setaffinity(cpu_set: &CpuSet) -> Result<()> {
    let ret = unsafe { libc::sched_setaffinity(0, cpu_set.bytes(), cpu_set.as_ptr()) };
    if ret == -1 {
        Err(ErrorKind::Io(IoError::last_os_error()))?;
    }
    Ok(())
}

/// Returns the CPU cores that the calling thread is allowed to run on.
pub fn sched_getaffinity() -> Result<CpuSet> {
    let mut cpu_set = CpuSet::new();
    let ret = unsafe { libc::sched_getaffinity(0, cpu_set.bytes(), cpu_set.as_mut_ptr()) };
    if ret == -1 {
        Err(ErrorKind::Io(IoError::last_os_error()))?;
    }
    Ok(cpu_set)
}

/// Returns the CPU core that the calling thread is currently running on.
pub fn sched_getcpu() -> Result<u16> {
    match unsafe { libc::sched_getcpu() } {
        -1 => Err(ErrorKind::Io(IoError::last_os_error()))?,
        cpu_id => Ok(cpu_id as u16),
    }
}

/// Page size advice given to the kernel with `madvise`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PageAdvice {
    /// Back the region with transparent huge pages if possible.
    HugePage,
    /// Never back the region with transparent huge pages.
    NoHugePage,
}

impl From<bool> for PageAdvice {
    fn from(huge_pages: bool) -> Self {
        if huge_pages {
            PageAdvice::HugePage
        } else {
            PageAdvice::NoHugePage
        }
    }
}

/// Advises the kernel about the page size to use for a memory region.
///
/// The region must start at a page boundary. Note that the effect depends on
/// `/sys/kernel/mm/transparent_hugepage/enabled`. If it is set to `never`, the
/// advice is ignored.
pub fn madvise<T>(data: &[T], advice: PageAdvice) -> Result<()> {
    let flag = match advice {
        PageAdvice::HugePage => libc::MADV_HUGEPAGE,
        PageAdvice::NoHugePage => libc::MADV_NOHUGEPAGE,
    };

    let ret = unsafe {
        libc::madvise(
            data.as_ptr() as *mut T as *mut libc::c_void,
            data.len() * size_of::<T>(),
            flag,
        )
    };
    if ret == -1 {
        Err(ErrorKind::Io(IoError::last_os_error()))?;
    }
    Ok(())
}
