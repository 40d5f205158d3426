// Copyright 2020-2022 Clemens Lutz
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::ops::{Deref, DerefMut};

/// Cache pad a value to avoid false sharing between threads.
///
/// Pads the value to 128 bytes, because Intel Sandy Bridge and later pre-fetch
/// two 64-byte cache lines, and IBM POWER processors have 128-byte cache lines.
///
/// Probe workers each own one padded counter. Without padding, neighboring
/// counters share a cache line and every increment invalidates the line on
/// all other cores.
#[derive(Clone, Copy, Debug, Default, Hash, PartialEq, Eq)]
#[repr(align(128))]
pub struct CachePadded<T> {
    pub value: T,
}

impl<T> CachePadded<T> {
    pub const fn new(value: T) -> Self {
        Self { value }
    }

    pub fn into_inner(self) -> T {
        self.value
    }
}

impl<T> Deref for CachePadded<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

impl<T> DerefMut for CachePadded<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.value
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::mem::{align_of, size_of};

    #[test]
    fn padded_counters_do_not_share_a_line() {
        assert_eq!(align_of::<CachePadded<u64>>(), 128);
        assert_eq!(size_of::<CachePadded<u64>>(), 128);

        let counters = vec![CachePadded::new(0_u64); 2];
        let first = &counters[0] as *const _ as usize;
        let second = &counters[1] as *const _ as usize;
        assert_eq!(second - first, 128);
    }

    #[test]
    fn deref_reaches_the_value() {
        let mut count = CachePadded::<u64>::default();
        *count += 3;
        assert_eq!(*count, 3);
        assert_eq!(count.into_inner(), 3);
    }
}
