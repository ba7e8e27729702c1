//! Producer and consumer halves of the candidate channel.
//!
//! The channel is a classical bounded buffer over the shared region and the
//! semaphore triad:
//!
//! ```text
//! FREE  (init 25)  slot credits, producers wait / supervisor posts
//! USED  (init 0)   item credits, supervisor waits / producers post
//! MUTEX (init 1)   serializes concurrent producers
//! ```
//!
//! [`Collector`] is the supervisor side: it creates every named object
//! exclusively, drains candidates, and on drop runs the full teardown
//! (terminate flag, producer wake-ups, unlink of all four names).
//! [`Producer`] is the generator side: it opens the existing objects,
//! registers itself in the census, and publishes through the writer critical
//! section. Producers never unlink anything.

use std::cell::Cell;
use std::sync::atomic::{AtomicU32, Ordering};

use tracing::{debug, warn};

use crate::constants::{free_name, mutex_name, shm_name, used_name, BUF_CAP};
use crate::error::{MinfasError, Result};
use crate::graph::CandidateSet;
use crate::sem::NamedSem;
use crate::shm::ShmRegion;

/// Kernel object names derived from one channel tag.
#[derive(Debug, Clone)]
pub struct ChannelNames {
    /// Shared-memory region name
    pub shm: String,
    /// Free-slot-credit semaphore name
    pub free: String,
    /// Filled-slot-credit semaphore name
    pub used: String,
    /// Writer-mutex semaphore name
    pub mutex: String,
}

impl ChannelNames {
    /// Derive the four names for a tag
    pub fn for_tag(tag: &str) -> Self {
        Self {
            shm: shm_name(tag),
            free: free_name(tag),
            used: used_name(tag),
            mutex: mutex_name(tag),
        }
    }
}

/// Supervisor side of the channel: owner of the named objects and sole
/// consumer of the ring.
#[derive(Debug)]
pub struct Collector {
    region: ShmRegion,
    free: NamedSem,
    used: NamedSem,
    _mutex: NamedSem,
    names: ChannelNames,
}

impl Collector {
    /// Create the region and the semaphore triad exclusively.
    ///
    /// A name left bound by an unclean shutdown fails the whole startup with
    /// [`MinfasError::StaleChannel`]; objects created earlier in this attempt
    /// are released again, stale ones are left for the operator.
    pub fn create(tag: &str) -> Result<Self> {
        let names = ChannelNames::for_tag(tag);
        let region = ShmRegion::create(&names.shm)?;

        let free = match NamedSem::create(&names.free, BUF_CAP as u32) {
            Ok(sem) => sem,
            Err(err) => {
                release_partial(&names.shm, &[]);
                return Err(err);
            }
        };
        let used = match NamedSem::create(&names.used, 0) {
            Ok(sem) => sem,
            Err(err) => {
                release_partial(&names.shm, &[names.free.as_str()]);
                return Err(err);
            }
        };
        let mutex = match NamedSem::create(&names.mutex, 1) {
            Ok(sem) => sem,
            Err(err) => {
                release_partial(&names.shm, &[names.free.as_str(), names.used.as_str()]);
                return Err(err);
            }
        };

        Ok(Self {
            region,
            free,
            used,
            _mutex: mutex,
            names,
        })
    }

    /// Block until the next published candidate and drain it.
    ///
    /// Returns [`MinfasError::Terminated`] once the terminate flag is up and
    /// [`MinfasError::WaitInterrupted`] when a signal cut the wait short;
    /// both are clean-shutdown conditions.
    pub fn next(&self) -> Result<CandidateSet> {
        self.used.wait()?;
        if self.terminated() {
            return Err(MinfasError::Terminated);
        }

        let region = self.region.region();
        let pos = region.read_pos.load(Ordering::Acquire);
        let candidate = self.region.read_slot(pos);
        region
            .read_pos
            .store((pos + 1) % (BUF_CAP as u32), Ordering::Release);
        self.free.post()?;
        region.solutions_seen.fetch_add(1, Ordering::AcqRel);
        Ok(candidate)
    }

    /// Candidates drained so far
    pub fn solutions_seen(&self) -> i64 {
        self.region.region().solutions_seen.load(Ordering::Acquire)
    }

    /// Live-generator census (best effort)
    pub fn generators(&self) -> i32 {
        self.region.region().generators.load(Ordering::Acquire)
    }

    /// Raise the terminate flag
    pub fn request_terminate(&self) {
        self.region.region().terminate.store(1, Ordering::Release);
    }

    /// True once the terminate flag is up
    pub fn terminated(&self) -> bool {
        self.region.region().terminate.load(Ordering::Acquire) == 1
    }

    /// The mapped terminate flag, for wiring up the signal handler. The flag
    /// stays mapped for as long as this collector lives.
    pub fn terminate_flag(&self) -> &AtomicU32 {
        &self.region.region().terminate
    }
}

impl Drop for Collector {
    fn drop(&mut self) {
        let region = self.region.region();
        region.terminate.store(1, Ordering::Release);

        // Wake every producer that may be blocked on a slot credit.
        // Over-posting is harmless: excess credits make producers fall
        // through to the terminate check and exit.
        let live = region.generators.load(Ordering::Acquire).max(0);
        for _ in 0..live {
            if let Err(err) = self.free.post() {
                warn!(error = %err, "failed to wake a blocked generator");
            }
        }

        for name in [&self.names.free, &self.names.used, &self.names.mutex] {
            if let Err(err) = NamedSem::unlink(name) {
                warn!(error = %err, "failed to unlink semaphore");
            }
        }
        if let Err(err) = ShmRegion::unlink(&self.names.shm) {
            warn!(error = %err, "failed to unlink shared region");
        }
        // handle closes and the unmap run in the field drops
    }
}

fn release_partial(shm: &str, sems: &[&str]) {
    let _ = ShmRegion::unlink(shm);
    for name in sems {
        let _ = NamedSem::unlink(name);
    }
}

/// Generator side of the channel: one of possibly many concurrent writers.
#[derive(Debug)]
pub struct Producer {
    region: ShmRegion,
    free: NamedSem,
    used: NamedSem,
    mutex: NamedSem,
    /// True exactly while this producer holds MUTEX
    in_critical: Cell<bool>,
}

impl Producer {
    /// Attach to an existing channel and register in the census.
    ///
    /// Fails with [`MinfasError::SupervisorNotRunning`] when the supervisor
    /// has not created the channel yet.
    pub fn open(tag: &str) -> Result<Self> {
        let names = ChannelNames::for_tag(tag);
        let region = ShmRegion::open(&names.shm)?;
        let used = NamedSem::open(&names.used)?;
        let free = NamedSem::open(&names.free)?;
        let mutex = NamedSem::open(&names.mutex)?;

        region.region().generators.fetch_add(1, Ordering::AcqRel);

        Ok(Self {
            region,
            free,
            used,
            mutex,
            in_critical: Cell::new(false),
        })
    }

    /// True once the terminate flag is up
    pub fn terminated(&self) -> bool {
        self.region.region().terminate.load(Ordering::Acquire) == 1
    }

    /// Publish one candidate through the writer critical section.
    ///
    /// Blocks on a slot credit, re-checks the terminate flag after every
    /// acquired semaphore, and matches each successful wait with exactly one
    /// post. Shutdown surfaces as [`MinfasError::Terminated`] or
    /// [`MinfasError::WaitInterrupted`].
    pub fn publish(&self, candidate: &CandidateSet) -> Result<()> {
        self.free.wait()?;
        if self.terminated() {
            return Err(MinfasError::Terminated);
        }

        self.mutex.wait()?;
        self.in_critical.set(true);
        if self.terminated() {
            self.mutex.post()?;
            self.in_critical.set(false);
            return Err(MinfasError::Terminated);
        }

        let region = self.region.region();
        let pos = region.write_pos.load(Ordering::Acquire);
        self.region.write_slot(pos, *candidate);
        region
            .write_pos
            .store((pos + 1) % (BUF_CAP as u32), Ordering::Release);

        self.mutex.post()?;
        self.in_critical.set(false);
        self.used.post()?;
        Ok(())
    }
}

impl Drop for Producer {
    fn drop(&mut self) {
        self.region.region().generators.fetch_sub(1, Ordering::AcqRel);

        // A producer torn down mid-publish (unwind, early exit) still holds
        // MUTEX; one post resolves the potential deadlock. A balanced
        // publish must not post here, that would admit a second writer.
        if self.in_critical.get() {
            if let Err(err) = self.mutex.post() {
                debug!(error = %err, "mutex release during shutdown");
            }
        }
    }
}
