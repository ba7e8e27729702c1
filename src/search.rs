//! Randomized candidate generation.
//!
//! Each sample draws a uniformly random vertex ordering (Fisher-Yates via
//! `SliceRandom::shuffle`) and collects every edge that runs from a later to
//! an earlier vertex. Removing those edges makes the sampled ordering
//! topological, so every collected set is a feedback arc set. Samples that
//! reach [`crate::constants::MAX_SET`] edges are discarded: the search only
//! ever reports improvements, and sets that large are useless as
//! improvements.

use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use nix::time::{clock_gettime, ClockId};

use crate::graph::{CandidateSet, Edge, EdgeList};

/// Per-process seed mixing wall clock, monotonic clock, and pid. Two
/// generators launched in the same millisecond still diverge through the pid
/// term.
pub fn process_seed() -> u64 {
    let wall = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0);
    let mono = clock_gettime(ClockId::CLOCK_MONOTONIC)
        .map(|ts| (ts.tv_sec() as u64).wrapping_mul(1_000_000_000).wrapping_add(ts.tv_nsec() as u64))
        .unwrap_or(0);
    let pid = std::process::id() as u64;
    wall.wrapping_mul(mono | 1).wrapping_mul(pid | 1)
}

/// Monte-Carlo search state for one generator process.
pub struct CandidateSearch {
    edges: Vec<Edge>,
    rank: Vec<usize>,
    rng: SmallRng,
}

impl CandidateSearch {
    /// Set up the search over a parsed edge list.
    pub fn new(edges: &EdgeList, seed: u64) -> Self {
        Self {
            edges: edges.edges().to_vec(),
            rank: (0..edges.vertex_count()).collect(),
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    /// Draw one sample. Returns `None` when the sample hit the pruning cap
    /// and was discarded.
    pub fn next_candidate(&mut self) -> Option<CandidateSet> {
        // a shuffle of the previous permutation is again uniform, so the
        // rank array never needs re-initialization
        self.rank.shuffle(&mut self.rng);

        let mut candidate = CandidateSet::default();
        for edge in &self.edges {
            if self.rank[edge.u as usize] > self.rank[edge.v as usize] {
                candidate.push(*edge);
                if candidate.is_full() {
                    return None;
                }
            }
        }
        Some(candidate)
    }
}
