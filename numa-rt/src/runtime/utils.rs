/*
 * This Source Code Form is subject to the terms of the Mozilla Public License,
 * v. 2.0. If a copy of the MPL was not distributed with this file, You can
 * obtain one at http://mozilla.org/MPL/2.0/.
 *
 *
 * Copyright 2018 German Research Center for Artificial Intelligence (DFKI)
 * Author: Clemens Lutz <clemens.lutz@dfki.de>
 */

use std::mem;
use std::ptr;

/// Ensure that zeroed memory is backed by physical pages
///
/// Zeroed allocations are typically served by mapping the shared zero page.
/// Physical pages are only allocated on the first write. A benchmark that
/// first touches its buffers inside the measured interval thus measures page
/// faults instead of memory accesses, and an external observer sampling the
/// page tables sees an incomplete mapping.
///
/// This function forces the OS to back all pages with physical memory by
/// rewriting one byte in each page with its current value. The contents are
/// left unchanged.
pub trait Prefault {
    fn prefault(&mut self, page_size: usize);
}

impl<T> Prefault for [T] {
    #[inline(never)]
    fn prefault(&mut self, page_size: usize) {
        let bytes = self.len() * mem::size_of::<T>();
        if bytes == 0 || page_size == 0 {
            return;
        }

        let base = self.as_mut_ptr() as *mut u8;
        (0..bytes)
            .step_by(page_size)
            .chain(std::iter::once(bytes - 1))
            .for_each(|offset| unsafe {
                let byte = base.add(offset);
                ptr::write_volatile(byte, ptr::read_volatile(byte));
            });
    }
}
