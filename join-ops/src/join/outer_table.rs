/*
 * This Source Code Form is subject to the terms of the Mozilla Public License,
 * v. 2.0. If a copy of the MPL was not distributed with this file, You can
 * obtain one at http://mozilla.org/MPL/2.0/.
 *
 *
 * Copyright 2019-2021 Clemens Lutz
 * Author: Clemens Lutz <lutzcle@cml.li>
 */

use crate::{ELEMENT_TUPLE_SIZE, LARGE_PAGE_SIZE};
use numa_rt::runtime::allocator::{Allocator, MemType};
use numa_rt::runtime::memory::{AlignedMemory, ZeroInit};
use std::mem::size_of;

/// A row of the outer relation.
///
/// Only the key is read by the probe. The payload widens the row.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[repr(C)]
pub struct Element {
    pub key: u64,
    pub payload: [u64; ELEMENT_TUPLE_SIZE],
}

unsafe impl ZeroInit for Element {}

/// The outer relation, i.e., the source of probe keys.
///
/// The key of the `i`-th row is `i`. The keys thus span the dense range
/// `[0, len)`.
#[derive(Debug)]
pub struct OuterTable {
    rows: AlignedMemory<Element>,
}

impl OuterTable {
    pub fn build(outer_size: usize, huge_pages: Option<bool>) -> Self {
        let mut rows: AlignedMemory<Element> =
            Allocator::alloc_mem(MemType::AdvisedSysMem(LARGE_PAGE_SIZE, huge_pages), outer_size);
        rows.iter_mut()
            .zip(0_u64..)
            .for_each(|(row, key)| row.key = key);

        Self { rows }
    }

    pub fn as_slice(&self) -> &[Element] {
        self.rows.as_slice()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Size of the table in bytes.
    pub fn bytes(&self) -> usize {
        self.rows.len() * size_of::<Element>()
    }
}
