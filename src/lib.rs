//! minfas - randomized feedback arc set search over a shared-memory ring.
//!
//! Two executables cooperate through one named shared-memory region and three
//! named semaphores. The `supervisor` creates the channel and drains candidate
//! arc sets; any number of `generator` processes sample random vertex
//! orderings and publish the edges that contradict them. Every published set
//! is a feedback arc set; the supervisor keeps the smallest one seen.
//!
//! ## Architecture
//!
//! ```text
//! generator 1 ─┐
//! generator 2 ─┼─ publish ──► [25-slot ring in named shm] ── drain ──► supervisor ──► stdout
//! generator N ─┘              FREE / USED / MUTEX semaphores
//! ```
//!
//! Producers block on `FREE` slot credits, serialize on `MUTEX`, and hand
//! filled slots to the consumer via `USED`. Shutdown is cooperative: the
//! supervisor raises a terminate flag in the region and posts `FREE` once per
//! registered generator so nobody stays blocked.

pub mod constants;
pub mod error;
pub mod graph;
pub mod ring;
pub mod search;
pub mod sem;
pub mod shm;
pub mod signal;

pub use error::{MinfasError, Result};
pub use graph::{CandidateSet, Edge, EdgeList};
pub use ring::{ChannelNames, Collector, Producer};
pub use search::CandidateSearch;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
