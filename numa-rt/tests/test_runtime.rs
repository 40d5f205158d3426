/*
 * This Source Code Form is subject to the terms of the Mozilla Public License,
 * v. 2.0. If a copy of the MPL was not distributed with this file, You can
 * obtain one at http://mozilla.org/MPL/2.0/.
 *
 *
 * Copyright (c) 2021, Clemens Lutz <lutzcle@cml.li>
 * Author: Clemens Lutz <clemens.lutz@dfki.de>
 */

use numa_rt::runtime::allocator::{Allocator, MemType};
use numa_rt::runtime::cpu_affinity::CpuAffinity;
use numa_rt::utils::CachePadded;
use std::error::Error;
use std::sync::Arc;
use std::thread;

#[test]
fn threads_pin_to_cores_of_current_mask() -> Result<(), Box<dyn Error>> {
    let affinity = Arc::new(CpuAffinity::from_current_mask()?);
    let threads = affinity.len().min(4) as u16;

    let handles: Vec<_> = (0..threads)
        .map(|tid| {
            let affinity = affinity.clone();
            thread::spawn(move || -> numa_rt::error::Result<(u16, u16)> {
                affinity.set_affinity(tid)?;
                Ok((tid, CpuAffinity::get_cpu()?))
            })
        })
        .collect();

    for handle in handles {
        let (tid, cpu) = handle.join().map_err(|_| "Worker thread panicked")??;
        assert_eq!(affinity.thread_to_cpu(tid), Some(cpu));
    }
    Ok(())
}

#[test]
fn threads_sum_shared_memory_into_padded_slots() -> Result<(), Box<dyn Error>> {
    let threads = 4;
    let len = 1 << 16;

    let mut data = Allocator::alloc_mem::<u64>(MemType::AdvisedSysMem(2 * 1024 * 1024, None), len);
    data.iter_mut().zip(0..).for_each(|(x, i)| *x = i);
    let data = Arc::new(data);

    let chunk_len = len / threads;
    let handles: Vec<_> = (0..threads)
        .map(|tid| {
            let data = data.clone();
            thread::spawn(move || {
                let sum = data[tid * chunk_len..(tid + 1) * chunk_len].iter().sum::<u64>();
                CachePadded::new(sum)
            })
        })
        .collect();

    let total: u64 = handles
        .into_iter()
        .map(|h| h.join().map(CachePadded::into_inner))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| "Worker thread panicked")?
        .into_iter()
        .sum();

    let n = len as u64;
    assert_eq!(total, n * (n - 1) / 2);
    Ok(())
}
