//! Channel stress tests.
//!
//! Exercises the producer/consumer protocol across threads: many producers,
//! one collector, candidates must arrive intact and exactly once, and
//! shutdown must wake every blocked producer.

use std::thread;
use std::time::{Duration, Instant};

use minfas::constants::BUF_CAP;
use minfas::graph::{CandidateSet, Edge};
use minfas::ring::{Collector, Producer};

const JOIN_TIMEOUT: Duration = Duration::from_secs(10);

fn test_tag(case: &str) -> String {
    format!("minfas-stress-{}-{case}", std::process::id())
}

fn candidate(u: i64, v: i64) -> CandidateSet {
    let mut set = CandidateSet::default();
    set.push(Edge::new(u, v));
    set
}

fn join_all_within(handles: Vec<thread::JoinHandle<()>>, timeout: Duration) {
    let deadline = Instant::now() + timeout;
    for handle in &handles {
        while !handle.is_finished() {
            assert!(Instant::now() < deadline, "thread still blocked after {timeout:?}");
            thread::sleep(Duration::from_millis(10));
        }
    }
    for handle in handles {
        handle.join().unwrap();
    }
}

/// Mutual exclusion of writers: with N producers publishing M candidates
/// each, the collector drains exactly N*M, none duplicated, none torn.
#[test]
fn test_concurrent_producers_drain_exactly_once() {
    const PRODUCERS: usize = 4;
    const PER_PRODUCER: usize = 300;

    let tag = test_tag("mpsc");
    let collector = Collector::create(&tag).unwrap();

    let handles: Vec<_> = (0..PRODUCERS)
        .map(|p| {
            let tag = tag.clone();
            thread::spawn(move || {
                let producer = Producer::open(&tag).unwrap();
                for i in 0..PER_PRODUCER {
                    // encode origin and sequence into the edge so duplicates
                    // and torn slots are detectable at the collector
                    producer.publish(&candidate(p as i64, i as i64)).unwrap();
                }
            })
        })
        .collect();

    let mut seen = vec![vec![false; PER_PRODUCER]; PRODUCERS];
    for _ in 0..PRODUCERS * PER_PRODUCER {
        let drained = collector.next().unwrap();
        assert_eq!(drained.len(), 1, "torn slot: {drained:?}");
        let edge = drained.edges()[0];
        let (p, i) = (edge.u as usize, edge.v as usize);
        assert!(p < PRODUCERS && i < PER_PRODUCER, "torn slot: {drained:?}");
        assert!(!seen[p][i], "candidate {p}/{i} drained twice");
        seen[p][i] = true;
    }

    join_all_within(handles, JOIN_TIMEOUT);
    assert_eq!(collector.solutions_seen() as usize, PRODUCERS * PER_PRODUCER);
}

/// No lost wake-ups: producers blocked on slot credits all exit in bounded
/// time once the collector shuts the channel down.
#[test]
fn test_shutdown_wakes_blocked_producers() {
    const PRODUCERS: usize = 3;

    let tag = test_tag("wakeup");
    let collector = Collector::create(&tag).unwrap();

    let handles: Vec<_> = (0..PRODUCERS)
        .map(|p| {
            let tag = tag.clone();
            thread::spawn(move || {
                let producer = Producer::open(&tag).unwrap();
                let mut i = 0i64;
                loop {
                    match producer.publish(&candidate(p as i64, i)) {
                        Ok(()) => i += 1,
                        Err(err) => {
                            assert!(err.is_shutdown(), "unexpected failure: {err}");
                            break;
                        }
                    }
                }
            })
        })
        .collect();

    // nothing is drained, so the ring fills and every producer ends up
    // blocked on FREE
    thread::sleep(Duration::from_millis(300));
    assert_eq!(collector.generators(), PRODUCERS as i32);

    drop(collector);
    join_all_within(handles, JOIN_TIMEOUT);
}

/// Bounded buffer: exactly BUF_CAP candidates fit before a producer blocks,
/// and draining one slot unblocks it.
#[test]
fn test_backpressure_holds_at_capacity() {
    let tag = test_tag("backpressure");
    let collector = Collector::create(&tag).unwrap();

    let handle = {
        let tag = tag.clone();
        thread::spawn(move || {
            let producer = Producer::open(&tag).unwrap();
            for i in 0..(BUF_CAP as i64) + 1 {
                producer.publish(&candidate(0, i)).unwrap();
            }
        })
    };

    // the first BUF_CAP publishes go through, the extra one must block
    thread::sleep(Duration::from_millis(300));
    assert!(!handle.is_finished(), "publish beyond capacity did not block");

    assert_eq!(collector.next().unwrap(), candidate(0, 0));
    join_all_within(vec![handle], JOIN_TIMEOUT);

    // drain the rest; order is FIFO with a single producer
    for i in 1..(BUF_CAP as i64) + 1 {
        assert_eq!(collector.next().unwrap(), candidate(0, i));
    }
}

/// Census and drain counter stay consistent through a full session.
#[test]
fn test_session_accounting() {
    let tag = test_tag("accounting");
    let collector = Collector::create(&tag).unwrap();

    {
        let producer = Producer::open(&tag).unwrap();
        assert_eq!(collector.generators(), 1);
        for i in 0..10 {
            producer.publish(&candidate(1, i)).unwrap();
        }
        for _ in 0..10 {
            collector.next().unwrap();
        }
    }

    assert_eq!(collector.generators(), 0);
    assert_eq!(collector.solutions_seen(), 10);
}
