/*
 * This Source Code Form is subject to the terms of the Mozilla Public License,
 * v. 2.0. If a copy of the MPL was not distributed with this file, You can
 * obtain one at http://mozilla.org/MPL/2.0/.
 *
 *
 * Copyright 2018-2021 German Research Center for Artificial Intelligence (DFKI)
 * Author: Clemens Lutz <clemens.lutz@dfki.de>
 */

use std::alloc::{self, Layout};
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::ptr::NonNull;
use std::slice;

/// Marks types for which the all-zero bit pattern is a valid value.
///
/// The allocator hands out zeroed memory and never runs constructors. Thus,
/// only types that are valid when zeroed can be allocated.
///
/// # Safety
///
/// Implementors must guarantee that a value whose bytes are all zero is a
/// valid instance of the type.
pub unsafe trait ZeroInit: Sized {}

unsafe impl ZeroInit for u8 {}
unsafe impl ZeroInit for u32 {}
unsafe impl ZeroInit for u64 {}
unsafe impl ZeroInit for usize {}
unsafe impl<T: ZeroInit, const N: usize> ZeroInit for [T; N] {}

/// A contiguous, aligned, and zero-initialized memory region.
///
/// The region is allocated with Rust's global allocator using an explicit
/// `Layout`. In contrast to `Vec`, the alignment can exceed the alignment of
/// `T`, e.g. to align a region to a cacheline or a huge page.
pub struct AlignedMemory<T> {
    pointer: NonNull<T>,
    len: usize,
    layout: Option<Layout>,
}

impl<T: ZeroInit> AlignedMemory<T> {
    /// Takes ownership of a zeroed allocation.
    ///
    /// # Safety
    ///
    /// `pointer` must be allocated by the global allocator with `layout`, and
    /// the layout must cover `len` instances of `T`. A `None` layout denotes
    /// an empty region with a dangling pointer.
    pub(crate) unsafe fn from_raw_parts(
        pointer: NonNull<T>,
        len: usize,
        layout: Option<Layout>,
    ) -> Self {
        Self {
            pointer,
            len,
            layout,
        }
    }

    /// Returns an empty region that owns no allocation.
    pub fn empty() -> Self {
        Self {
            pointer: NonNull::dangling(),
            len: 0,
            layout: None,
        }
    }
}

impl<T> AlignedMemory<T> {
    /// Extracts a slice of the entire memory region.
    pub fn as_slice(&self) -> &[T] {
        unsafe { slice::from_raw_parts(self.pointer.as_ptr(), self.len) }
    }

    /// Extracts a mutable slice of the entire memory region.
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        unsafe { slice::from_raw_parts_mut(self.pointer.as_ptr(), self.len) }
    }

    /// Returns the alignment of the region in bytes.
    pub fn alignment(&self) -> Option<usize> {
        self.layout.map(|l| l.align())
    }

    /// Returns the size of the region in bytes.
    pub fn bytes(&self) -> usize {
        self.layout.map_or(0, |l| l.size())
    }
}

impl<T> Deref for AlignedMemory<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T> DerefMut for AlignedMemory<T> {
    fn deref_mut(&mut self) -> &mut [T] {
        self.as_mut_slice()
    }
}

impl<T> Drop for AlignedMemory<T> {
    fn drop(&mut self) {
        if let Some(layout) = self.layout {
            unsafe { alloc::dealloc(self.pointer.as_ptr() as *mut u8, layout) };
        }
    }
}

impl<T> fmt::Debug for AlignedMemory<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AlignedMemory")
            .field("pointer", &self.pointer)
            .field("len", &self.len)
            .field("layout", &self.layout)
            .finish()
    }
}

unsafe impl<T: Send> Send for AlignedMemory<T> {}
unsafe impl<T: Sync> Sync for AlignedMemory<T> {}
