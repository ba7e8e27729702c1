//! Supervisor: owns the candidate channel, drains candidate arc sets, and
//! reports the best one seen on stdout.

use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use minfas::constants::DEFAULT_TAG;
use minfas::graph::CandidateSet;
use minfas::ring::Collector;
use minfas::signal::install_terminate_handler;
use minfas::Result;

#[derive(Parser)]
#[command(
    name = "supervisor",
    version,
    about = "Drains candidate feedback arc sets from generators and reports the best one"
)]
struct Args {
    /// Stop after this many candidates (0 = unlimited)
    #[arg(short = 'n', value_name = "LIMIT", default_value_t = 0)]
    limit: u64,

    /// Seconds to wait before draining, giving generators time to start
    #[arg(short = 'w', value_name = "DELAY", default_value_t = 0)]
    delay: u64,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let collector = Collector::create(DEFAULT_TAG).context("creating the candidate channel")?;
    install_terminate_handler(collector.terminate_flag())
        .context("installing the shutdown signal handler")?;

    if args.delay > 0 {
        info!(seconds = args.delay, "delaying before draining");
        // nap in one-second steps so a shutdown signal is honored promptly
        for _ in 0..args.delay {
            if collector.terminated() {
                break;
            }
            std::thread::sleep(Duration::from_secs(1));
        }
    }

    drain(&collector, args.limit)?;
    Ok(())
}

/// Drain candidates until the graph is proven acyclic, the limit is reached,
/// or a shutdown signal arrives. Only improvements are reported.
fn drain(collector: &Collector, limit: u64) -> Result<()> {
    let mut best: Option<CandidateSet> = None;
    let mut acyclic = false;

    while !collector.terminated() && (limit == 0 || (collector.solutions_seen() as u64) < limit) {
        let candidate = match collector.next() {
            Ok(candidate) => candidate,
            Err(err) if err.is_shutdown() => break,
            Err(err) => return Err(err),
        };

        if candidate.is_empty() {
            println!("The graph is acyclic!");
            collector.request_terminate();
            acyclic = true;
            break;
        }

        if best.map_or(true, |b| candidate.len() < b.len()) {
            println!("Solution with {} edges: {}", candidate.len(), candidate);
            best = Some(candidate);
        }
    }

    if !acyclic && limit > 0 && (collector.solutions_seen() as u64) >= limit {
        if let Some(best) = best {
            println!(
                "The graph might not be acyclic, best solution removes {} edges.",
                best.len()
            );
        }
    }
    Ok(())
}
