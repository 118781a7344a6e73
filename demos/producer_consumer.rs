//! Producer/consumer throughput demo
//!
//! Producers enqueue random integers, consumers drain their share with a
//! sleep-and-retry loop, and the run reports the total consumed and the
//! elapsed time.
//!
//! ```text
//! RUST_LOG=info cargo run --release --example producer_consumer -- -p 4 -c 4 -n 100000
//! ```

use anyhow::{ensure, Context, Result};
use clap::{value_parser, Arg, ArgMatches, Command};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info};
use twinlock::{BackoffConfig, TwoLockQueue};

#[derive(Debug, Clone)]
struct HarnessConfig {
    producers: usize,
    consumers: usize,
    items_per_producer: usize,
    max_value: u32,
    backoff: Duration,
}

impl HarnessConfig {
    fn command() -> Command {
        Command::new("producer_consumer")
            .about("Drive a two-lock queue with concurrent producers and consumers")
            .arg(
                Arg::new("producers")
                    .short('p')
                    .long("producers")
                    .value_name("COUNT")
                    .help("Number of producer threads")
                    .value_parser(value_parser!(usize))
                    .default_value("2"),
            )
            .arg(
                Arg::new("consumers")
                    .short('c')
                    .long("consumers")
                    .value_name("COUNT")
                    .help("Number of consumer threads")
                    .value_parser(value_parser!(usize))
                    .default_value("2"),
            )
            .arg(
                Arg::new("items")
                    .short('n')
                    .long("items")
                    .value_name("COUNT")
                    .help("Items enqueued by each producer")
                    .value_parser(value_parser!(usize))
                    .default_value("5000"),
            )
            .arg(
                Arg::new("max-value")
                    .long("max-value")
                    .value_name("N")
                    .help("Payloads are drawn uniformly from 1..=N")
                    .value_parser(value_parser!(u32))
                    .default_value("1000"),
            )
            .arg(
                Arg::new("backoff-us")
                    .long("backoff-us")
                    .value_name("MICROS")
                    .help("Sleep between polls of an empty queue")
                    .value_parser(value_parser!(u64))
                    .default_value("100"),
            )
    }

    fn from_matches(matches: &ArgMatches) -> Result<Self> {
        let get = |name: &str| {
            matches
                .get_one::<usize>(name)
                .copied()
                .with_context(|| format!("missing --{name}"))
        };

        let config = Self {
            producers: get("producers")?,
            consumers: get("consumers")?,
            items_per_producer: get("items")?,
            max_value: matches
                .get_one::<u32>("max-value")
                .copied()
                .context("missing --max-value")?,
            backoff: Duration::from_micros(
                matches
                    .get_one::<u64>("backoff-us")
                    .copied()
                    .context("missing --backoff-us")?,
            ),
        };

        ensure!(config.producers > 0, "need at least one producer");
        ensure!(config.consumers > 0, "need at least one consumer");
        ensure!(config.max_value > 0, "--max-value must be positive");
        Ok(config)
    }

    fn total_items(&self) -> usize {
        self.producers * self.items_per_producer
    }
}

fn producer(queue: &TwoLockQueue<u32>, count: usize, max_value: u32) {
    for _ in 0..count {
        queue.enqueue(fastrand::u32(1..=max_value));
    }
}

fn consumer(queue: &TwoLockQueue<u32>, count: usize, backoff: &BackoffConfig) -> Vec<u32> {
    (0..count).map(|_| queue.dequeue_wait_with(backoff)).collect()
}

fn run(config: &HarnessConfig) -> Result<Vec<u32>> {
    let queue = Arc::new(TwoLockQueue::new());
    let backoff = BackoffConfig::new(config.backoff, config.backoff);
    let total = config.total_items();

    let producers: Vec<_> = (0..config.producers)
        .map(|id| {
            let queue = Arc::clone(&queue);
            let (count, max_value) = (config.items_per_producer, config.max_value);
            thread::Builder::new()
                .name(format!("producer-{id}"))
                .spawn(move || producer(&queue, count, max_value))
                .context("failed to spawn producer")
        })
        .collect::<Result<_>>()?;

    let consumers: Vec<_> = (0..config.consumers)
        .map(|id| {
            let queue = Arc::clone(&queue);
            let share = total / config.consumers + if id == 0 { total % config.consumers } else { 0 };
            debug!(consumer = id, share, "starting consumer");
            thread::Builder::new()
                .name(format!("consumer-{id}"))
                .spawn(move || consumer(&queue, share, &backoff))
                .context("failed to spawn consumer")
        })
        .collect::<Result<_>>()?;

    for handle in producers {
        handle
            .join()
            .map_err(|_| anyhow::anyhow!("producer thread panicked"))?;
    }

    let mut collected = Vec::with_capacity(total);
    for handle in consumers {
        let items = handle
            .join()
            .map_err(|_| anyhow::anyhow!("consumer thread panicked"))?;
        collected.extend(items);
    }

    Ok(collected)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = HarnessConfig::from_matches(&HarnessConfig::command().get_matches())?;
    info!(?config, "starting run");

    let start = Instant::now();
    let collected = run(&config)?;
    let elapsed = start.elapsed();

    ensure!(
        collected.len() == config.total_items(),
        "consumed {} items, expected {}",
        collected.len(),
        config.total_items()
    );

    info!("all producers/consumers have finished");
    info!(total = collected.len(), "total items consumed");
    info!(
        elapsed_secs = elapsed.as_secs_f64(),
        items_per_sec = (collected.len() as f64 / elapsed.as_secs_f64()) as u64,
        "elapsed time: {:.4} seconds",
        elapsed.as_secs_f64()
    );
    Ok(())
}
