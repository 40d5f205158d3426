/*
 * This Source Code Form is subject to the terms of the Mozilla Public License,
 * v. 2.0. If a copy of the MPL was not distributed with this file, You can
 * obtain one at http://mozilla.org/MPL/2.0/.
 *
 *
 * Copyright 2019-2021 German Research Center for Artificial Intelligence (DFKI)
 * Author: Clemens Lutz <clemens.lutz@dfki.de>
 */

//! Aligned memory allocator.
//!
//! Allocates large, zeroed memory regions with an alignment constraint, e.g.
//! cacheline alignment for small, hot data structures or huge page alignment
//! for large regions to reduce TLB pressure.
//!
//! Allocation failures are fatal. The allocator reports the failed request
//! and terminates the process. There is no retry and no fallback to a
//! smaller or differently placed region.

use std::alloc::{self, Layout};
use std::mem::size_of;
use std::ptr::NonNull;

use tracing::{info, warn};

use super::hw_info::ProcessorCache;
use super::linux_wrapper::{madvise, PageAdvice};
use super::memory::{AlignedMemory, ZeroInit};
use super::utils::Prefault;

/// Aligned memory allocator.
pub struct Allocator;

/// Memory type specifier
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MemType {
    /// Zeroed system memory aligned to the specified number of bytes
    AlignedSysMem(usize),
    /// Zeroed system memory aligned to the specified number of bytes, with
    /// the specified transparent huge page option
    ///
    /// `None` keeps the OS default. The advice only takes effect if the
    /// alignment is a multiple of the page size.
    AdvisedSysMem(usize, Option<bool>),
}

impl MemType {
    /// Returns the alignment in bytes.
    pub fn alignment(&self) -> usize {
        match *self {
            MemType::AlignedSysMem(alignment) | MemType::AdvisedSysMem(alignment, _) => alignment,
        }
    }

    fn huge_pages(&self) -> Option<bool> {
        match *self {
            MemType::AlignedSysMem(_) => None,
            MemType::AdvisedSysMem(_, huge_pages) => huge_pages,
        }
    }
}

impl Allocator {
    /// Allocates zeroed memory of the specified type
    ///
    /// Terminates the process if the memory cannot be allocated.
    pub fn alloc_mem<T: ZeroInit>(mem_type: MemType, len: usize) -> AlignedMemory<T> {
        Self::alloc_zeroed(len, mem_type.alignment(), mem_type.huge_pages())
    }

    /// Allocates `len` zeroed instances of `T` aligned to `alignment` bytes.
    ///
    /// All pages are touched before returning, so that the region is backed
    /// by physical memory.
    ///
    /// Terminates the process if the memory cannot be allocated, or if the
    /// alignment is not a power of two.
    pub fn alloc_zeroed<T: ZeroInit>(
        len: usize,
        alignment: usize,
        huge_pages: Option<bool>,
    ) -> AlignedMemory<T> {
        let size = len.checked_mul(size_of::<T>()).unwrap_or_else(|| {
            fatal(&format!(
                "allocation of {} elements of {} bytes overflows",
                len,
                size_of::<T>()
            ))
        });

        info!(
            "allocating {} MB memory with alignment {}",
            size >> 20,
            alignment
        );

        let layout = Layout::from_size_align(size, alignment).unwrap_or_else(|_| {
            fatal(&format!(
                "invalid allocation of {} bytes with alignment {}",
                size, alignment
            ))
        });

        if size == 0 {
            return AlignedMemory::empty();
        }

        let pointer = match NonNull::new(unsafe { alloc::alloc_zeroed(layout) } as *mut T) {
            Some(p) => p,
            None => {
                eprintln!("ENOMEM");
                alloc::handle_alloc_error(layout)
            }
        };

        let mut mem = unsafe { AlignedMemory::from_raw_parts(pointer, len, Some(layout)) };

        let page_size = ProcessorCache::page_size();
        if let Some(hp) = huge_pages {
            if alignment % page_size == 0 {
                if let Err(e) = madvise(mem.as_slice(), PageAdvice::from(hp)) {
                    warn!("Failed to madvise memory: {}", e);
                }
            } else {
                warn!(
                    "Skipping huge page advice, alignment {} is not page aligned",
                    alignment
                );
            }
        }

        mem.as_mut_slice().prefault(page_size);
        mem
    }
}

/// Reports an unsatisfiable allocation and terminates the process.
fn fatal(msg: &str) -> ! {
    eprintln!("ERROR: {}", msg);
    std::process::abort()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn alloc_is_aligned_and_zeroed() {
        for &alignment in &[64, 4096, 2 * 1024 * 1024] {
            let mem = Allocator::alloc_zeroed::<u64>(10_000, alignment, None);
            assert_eq!(mem.len(), 10_000);
            assert_eq!(mem.as_ptr() as usize % alignment, 0);
            assert!(mem.iter().all(|&x| x == 0));
        }
    }

    #[test]
    fn alloc_empty() {
        let mem = Allocator::alloc_zeroed::<u64>(0, 64, Some(true));
        assert!(mem.is_empty());
        assert_eq!(mem.bytes(), 0);
        assert_eq!(mem.alignment(), None);
    }

    #[test]
    fn alloc_with_huge_page_advice() {
        let mut mem = Allocator::alloc_zeroed::<u64>(1 << 20, 2 * 1024 * 1024, Some(true));
        assert_eq!(mem.bytes(), 8 << 20);
        mem.iter_mut().zip(0..).for_each(|(x, i)| *x = i);
        assert_eq!(mem[12345], 12345);
    }

    #[test]
    fn alloc_mem_uses_mem_type() {
        let mem = Allocator::alloc_mem::<u32>(MemType::AdvisedSysMem(4096, Some(false)), 1000);
        assert_eq!(mem.alignment(), Some(4096));
        assert_eq!(mem.len(), 1000);
    }
}
