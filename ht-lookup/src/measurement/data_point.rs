/*
 * This Source Code Form is subject to the terms of the Mozilla Public License,
 * v. 2.0. If a copy of the MPL was not distributed with this file, You can
 * obtain one at http://mozilla.org/MPL/2.0/.
 *
 *
 * Copyright (c) 2019, Clemens Lutz <lutzcle@cml.li>
 * Author: Clemens Lutz <clemens.lutz@dfki.de>
 */

use super::lookup_bench::LookupPoint;
use crate::config::BenchConfig;
use crate::error::Result;
use numa_rt::runtime::hw_info::cpu_codename;
use serde_derive::Serialize;

/// A CSV row of measurements.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct DataPoint {
    pub hostname: String,
    pub cpu_codename: Option<String>,
    pub threads: Option<usize>,
    pub hash_size: Option<usize>,
    pub inner_size: Option<usize>,
    pub outer_size: Option<usize>,
    pub lookups: Option<usize>,
    pub collisions: Option<u64>,
    pub matches: Option<u64>,
    pub build_ns: Option<f64>,
    pub probe_ns: Option<f64>,
    pub malloc_ns: Option<f64>,
}

impl DataPoint {
    pub fn new() -> Result<DataPoint> {
        let hostname = hostname::get_hostname().ok_or_else(|| "Couldn't get hostname")?;

        let dp = DataPoint {
            hostname,
            cpu_codename: cpu_codename().ok(),
            ..DataPoint::default()
        };

        Ok(dp)
    }

    pub fn fill_from_config(&self, config: &BenchConfig) -> DataPoint {
        DataPoint {
            threads: Some(config.threads),
            hash_size: Some(config.hash_size),
            inner_size: Some(config.inner_size),
            outer_size: Some(config.outer_size),
            lookups: Some(config.lookups),
            ..self.clone()
        }
    }

    pub fn fill_from_lookup_point(&self, point: &LookupPoint) -> DataPoint {
        DataPoint {
            collisions: Some(point.collisions),
            matches: Some(point.matches),
            build_ns: Some(point.build_time.as_nanos() as f64),
            probe_ns: Some(point.probe_time.as_nanos() as f64),
            malloc_ns: Some(point.malloc_time.as_nanos() as f64),
            ..self.clone()
        }
    }
}
