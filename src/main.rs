//! CLI front end (SPEC_FULL.md §10.4): a thin `clap` shell over the engine.
//! `find` drives a real search to completion and writes KeyStore V3 output;
//! `bench` drives the identical search loop against an unreachable pattern
//! and reports the steady-state throughput the stats collector observes.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use vanity_eth::engine::{spawn_progress_sampler, WorkerPool};
use vanity_eth::kdf::KdfRegistry;
use vanity_eth::keystore::retry::RetryPolicy;
use vanity_eth::keystore::storage::persist_wallet;
use vanity_eth::{EngineConfig, GenerationCriteria};

#[derive(Parser)]
#[command(name = "vanity-eth", about = "Parallel Ethereum vanity address generator")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Search for address(es) matching a prefix/suffix and write KeyStore V3 files.
    Find {
        #[arg(long, default_value = "")]
        prefix: String,
        #[arg(long, default_value = "")]
        suffix: String,
        #[arg(long)]
        checksum: bool,
        #[arg(long)]
        mnemonic: bool,
        #[arg(long, default_value_t = 1)]
        count: u32,
        #[arg(long)]
        kdf: Option<String>,
        #[arg(long)]
        workers: Option<u32>,
        #[arg(long = "out")]
        output_dir: Option<String>,
    },
    /// Run the search loop against an unreachable pattern to measure throughput.
    Bench {
        #[arg(long, default_value_t = 10)]
        duration: u64,
    },
}

fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let config = EngineConfig::from_env()?;
    tracing_subscriber::fmt().with_env_filter(EnvFilter::new(&config.log_level)).init();

    let cli = Cli::parse();
    match cli.command {
        Command::Find { prefix, suffix, checksum, mnemonic, count, kdf, workers, output_dir } => {
            run_find(&config, prefix, suffix, checksum, mnemonic, count, kdf, workers, output_dir)
        }
        Command::Bench { duration } => run_bench(&config, duration),
    }
}

fn build_pool(config: &EngineConfig, worker_count: Option<u32>) -> anyhow::Result<WorkerPool> {
    let mut pool = WorkerPool::new(
        worker_count.unwrap_or(config.worker_count),
        config.batch_size,
        config.shutdown_timeout(),
        config.estimated_single_thread_speed,
    );
    pool.start()?;
    Ok(pool)
}

#[allow(clippy::too_many_arguments)]
fn run_find(
    config: &EngineConfig,
    prefix: String,
    suffix: String,
    checksum: bool,
    mnemonic: bool,
    count: u32,
    kdf: Option<String>,
    workers: Option<u32>,
    output_dir: Option<String>,
) -> anyhow::Result<()> {
    let criteria = GenerationCriteria::new(&prefix, &suffix, checksum, mnemonic)?;
    info!(
        difficulty = criteria.difficulty(),
        probability50 = criteria.probability50(),
        "starting search"
    );

    let mut pool = build_pool(config, workers)?;
    let cancel = Arc::new(AtomicBool::new(false));
    let matched = Arc::new(AtomicU32::new(0));
    let stop_sampler = Arc::new(AtomicBool::new(false));
    let (sampler_handle, progress_rx) = spawn_progress_sampler(
        pool.new_stats_collector(config.stats_window()),
        criteria.difficulty(),
        count,
        Arc::clone(&matched),
        Arc::clone(&stop_sampler),
    );

    let search_result = pool.generate_wallets(criteria, count, &cancel);

    stop_sampler.store(true, Ordering::Relaxed);
    let _ = sampler_handle.join();
    if let Some(snapshot) = progress_rx.try_recv() {
        info!(attempts = snapshot.attempts, speed = snapshot.speed, "final progress sample");
    }

    let results = search_result?;
    let registry = KdfRegistry::new(config.scrypt_memory_budget_bytes());
    let kdf_name = kdf.unwrap_or(config.kdf.clone());
    let output_dir: std::path::PathBuf = output_dir.unwrap_or(config.output_dir.clone()).into();

    for result in &results {
        matched.fetch_add(1, Ordering::Relaxed);
        let paths = persist_wallet(&registry, &output_dir, &result.wallet, &kdf_name, RetryPolicy::default())?;
        println!(
            "0x{} found after {} attempts in {:.2}s by worker {} -> {}",
            result.wallet.address_checksum_hex(),
            result.attempts,
            result.duration.as_secs_f64(),
            result.worker_id,
            paths.keystore.display()
        );
    }

    if let Err(e) = pool.shutdown() {
        error!(error = %e, "worker pool did not drain cleanly");
    }
    Ok(())
}

fn run_bench(config: &EngineConfig, duration_secs: u64) -> anyhow::Result<()> {
    // No wallet can ever match this; the pool runs at full tilt until the
    // timer below cancels it, so the stats collector's last sample is the
    // steady-state throughput for this machine and worker count.
    let criteria = GenerationCriteria::new("ffffffffff", "", false, false)?;
    let mut pool = build_pool(config, None)?;
    let mut collector = pool.new_stats_collector(config.stats_window());
    let cancel = Arc::new(AtomicBool::new(false));

    let timer_cancel = Arc::clone(&cancel);
    std::thread::spawn(move || {
        std::thread::sleep(Duration::from_secs(duration_secs));
        timer_cancel.store(true, Ordering::Relaxed);
    });

    let _ = pool.generate_wallet(criteria, &cancel);

    let snapshot = collector.sample();
    println!(
        "{} workers, batch size {}: {:.0} addr/s (peak {:.0}, balance {:.2}, efficiency {:.2})",
        pool.worker_count(),
        pool.batch_size(),
        snapshot.total_speed,
        snapshot.peak_speed,
        snapshot.per_worker_balance_score,
        snapshot.efficiency_ratio
    );

    pool.shutdown()?;
    Ok(())
}
