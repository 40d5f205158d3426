/*
 * This Source Code Form is subject to the terms of the Mozilla Public License,
 * v. 2.0. If a copy of the MPL was not distributed with this file, You can
 * obtain one at http://mozilla.org/MPL/2.0/.
 *
 *
 * Copyright 2018 German Research Center for Artificial Intelligence (DFKI)
 * Author: Clemens Lutz <clemens.lutz@dfki.de>
 */

use ht_lookup::config::BenchConfig;
use ht_lookup::error::Result;
use ht_lookup::lifecycle::{CancellationToken, SentinelFiles};
use ht_lookup::measurement::data_point::DataPoint;
use ht_lookup::measurement::harness;
use ht_lookup::measurement::lookup_bench::{LookupBench, RunOutcome};
use ht_lookup::report::{format_seconds, BenchLog, MemoryFootprint, Summary};
use ht_lookup::signal;

use numa_rt::runtime::cpu_affinity::CpuAffinity;
use numa_rt::runtime::hw_info::ProcessorCache;

use std::os::unix::io::AsRawFd;
use std::path::PathBuf;
use std::time::Instant;

use structopt::StructOpt;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let timer = Instant::now();

    // Echo the command line for the benchmark log
    let args: Vec<String> = std::env::args().collect();
    println!("{}", args.join(" "));

    install_tracing_subscriber();

    // Parse commandline arguments
    let cmd = CmdOpt::from_args();
    let config = args_to_config(&cmd)?;

    debug!("{}", ProcessorCache {});
    match ProcessorCache::huge_page_size() {
        Ok(size) => debug!("huge page size: {}", size),
        Err(e) => debug!("huge page size unknown: {}", e),
    }

    let mut log = BenchLog::open(cmd.log_file.as_deref());
    log.begin(args.first().map_or("ht-lookup", String::as_str))?;
    log.config(&config)?;

    let sentinels = SentinelFiles::new(&config.sentinel_base);
    let token = CancellationToken::new();
    signal::install_termination_handler(&sentinels, token.clone(), log.as_raw_fd())?;

    println!("{}", MemoryFootprint::new(&config));

    log.run_begin()?;
    let outcome = LookupBench::new(&config, sentinels.clone(), token).run()?;

    let point = match outcome {
        RunOutcome::Completed(point) => point,
        RunOutcome::Cancelled => {
            log.end()?;
            return Ok(());
        }
    };

    println!(
        "{}",
        Summary {
            point: &point,
            lookups: config.lookups,
            outer_size: config.outer_size,
        }
    );
    log.run_end()?;

    sentinels.signal_done()?;

    if let Some(csv) = &cmd.csv {
        let dp = DataPoint::new()?
            .fill_from_config(&config)
            .fill_from_lookup_point(&point);
        harness::write_measurements(csv, &[dp])?;
        info!("wrote measurements to {}", csv.display());
    }

    let took = timer.elapsed();
    if !log.is_stdout() {
        println!("Took: {}", format_seconds(took));
    }
    log.took(took)?;
    log.end()?;

    Ok(())
}

fn install_tracing_subscriber() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn args_to_config(cmd: &CmdOpt) -> Result<BenchConfig> {
    let threads = match cmd.threads {
        Some(threads) => threads,
        None => match &cmd.cpu_list {
            Some(cpu_list) => cpu_list.len(),
            None => CpuAffinity::from_current_mask()?.len(),
        },
    };

    let defaults = BenchConfig::default();
    let config = BenchConfig {
        hash_size: cmd.hash_size.unwrap_or(defaults.hash_size),
        lookups: cmd.lookups.unwrap_or(defaults.lookups),
        outer_size: cmd.outer_size.unwrap_or(defaults.outer_size),
        inner_size: cmd.inner_size.unwrap_or(defaults.inner_size),
        threads,
        cpu_affinity: cmd.cpu_list.clone(),
        huge_pages: cmd.huge_pages,
        sentinel_base: cmd
            .sentinel_base
            .clone()
            .unwrap_or(defaults.sentinel_base),
    };
    config.validate()?;

    Ok(config)
}

#[derive(StructOpt)]
#[structopt(
    name = "ht-lookup",
    about = "A benchmark for chained hash table lookups"
)]
struct CmdOpt {
    /// Number of hash table directory slots
    #[structopt(short = "s", long = "hash-size")]
    hash_size: Option<usize>,

    /// Number of lookup passes over the outer table
    #[structopt(short = "n", long = "lookups")]
    lookups: Option<usize>,

    /// Number of outer table rows
    #[structopt(short = "o", long = "outer-size")]
    outer_size: Option<usize>,

    /// Number of inner keys inserted into the hash table
    #[structopt(short = "i", long = "inner-size")]
    inner_size: Option<usize>,

    /// Number of probe threads (default: the number of CPUs in the affinity mask)
    #[structopt(short = "t", long = "threads")]
    threads: Option<usize>,

    /// Pin probe threads to CPU cores, e.g.: 0-3,8
    #[structopt(long = "cpu-list")]
    cpu_list: Option<CpuAffinity>,

    /// Advise the OS to use transparent huge pages (default: OS setting)
    #[structopt(long = "huge-pages")]
    huge_pages: Option<bool>,

    /// Base path of the .ready and .done sentinel files
    #[structopt(long = "sentinel-base", parse(from_os_str))]
    sentinel_base: Option<PathBuf>,

    /// Append the benchmark log to this file (default: stdout)
    #[structopt(long = "log-file", parse(from_os_str))]
    log_file: Option<PathBuf>,

    /// Output filename for measurement CSV file
    #[structopt(long = "csv", parse(from_os_str))]
    csv: Option<PathBuf>,
}
