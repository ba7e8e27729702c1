//! Generator: samples random vertex orderings and publishes the edge sets
//! that contradict them as feedback-arc-set candidates.

use anyhow::Context;
use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use minfas::constants::DEFAULT_TAG;
use minfas::graph::EdgeList;
use minfas::ring::Producer;
use minfas::search::{process_seed, CandidateSearch};
use minfas::Result;

#[derive(Parser)]
#[command(
    name = "generator",
    version,
    about = "Publishes randomized feedback-arc-set candidates to a running supervisor",
    after_help = "Example: generator 0-1 1-2 1-3 1-4 2-4 3-6 4-3 4-5 6-0"
)]
struct Args {
    /// Directed edges as <u>-<v> tokens
    #[arg(value_name = "EDGE", required = true)]
    edges: Vec<String>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let edges = EdgeList::parse(&args.edges).context("parsing the edge list")?;

    let producer = Producer::open(DEFAULT_TAG).context("attaching to the candidate channel")?;

    let seed = process_seed();
    debug!(seed, edges = edges.edges().len(), vertices = edges.vertex_count(), "starting search");
    let mut search = CandidateSearch::new(&edges, seed);

    run(&producer, &mut search)?;
    Ok(())
}

/// Sample and publish until the supervisor raises the terminate flag or a
/// signal interrupts a wait.
fn run(producer: &Producer, search: &mut CandidateSearch) -> Result<()> {
    while !producer.terminated() {
        let Some(candidate) = search.next_candidate() else {
            continue;
        };
        match producer.publish(&candidate) {
            Ok(()) => {}
            Err(err) if err.is_shutdown() => break,
            Err(err) => return Err(err),
        }
    }
    Ok(())
}
