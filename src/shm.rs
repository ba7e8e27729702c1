//! Shared region - the memory-mapped struct both executables compile against.
//!
//! The supervisor creates the region exclusively; generators open it
//! read-write. The layout is fixed, so there is no version negotiation: the
//! ring storage sits at offset zero, followed by the control fields.
//!
//! ## Memory Layout
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │ slots[25]       25 × CandidateSet (136 B)    │
//! ├──────────────────────────────────────────────┤
//! │ read_pos        u32, consumer cursor         │
//! │ write_pos       u32, producer cursor (MUTEX) │
//! │ terminate       u32, 0/1, never reset        │
//! │ generators      i32, live-producer census    │
//! │ solutions_seen  i64, drained-candidate count │
//! └──────────────────────────────────────────────┘
//! ```

use std::fs::File;
use std::mem;
use std::ptr;
use std::sync::atomic::{AtomicI32, AtomicI64, AtomicU32};

use memmap2::{MmapMut, MmapOptions};
use nix::errno::Errno;
use nix::fcntl::OFlag;
use nix::sys::mman::{shm_open, shm_unlink};
use nix::sys::stat::Mode;
use nix::unistd::ftruncate;
use static_assertions::const_assert_eq;

use crate::constants::BUF_CAP;
use crate::error::{MinfasError, Result};
use crate::graph::CandidateSet;

/// Control block of the shared region. The scalar fields are atomics because
/// every cooperating process maps the same physical pages; the slots are
/// plain storage handed over via the semaphore protocol.
#[repr(C)]
pub struct SharedRegion {
    /// Ring storage; `slots[write_pos]` is only touched by the MUTEX holder
    pub slots: [CandidateSet; BUF_CAP],
    /// Next slot to drain; written only by the supervisor
    pub read_pos: AtomicU32,
    /// Next slot to fill; written only under MUTEX
    pub write_pos: AtomicU32,
    /// Cooperative shutdown flag; once 1, never reset
    pub terminate: AtomicU32,
    /// Census of live generators, best-effort (bounds shutdown wake-ups)
    pub generators: AtomicI32,
    /// Candidates drained so far; written only by the supervisor
    pub solutions_seen: AtomicI64,
}

/// Size of the mapped region in bytes
pub const REGION_SIZE: usize = mem::size_of::<SharedRegion>();

// The scalar tail packs without padding: 4 × u32/i32 then one 8-aligned i64.
const_assert_eq!(REGION_SIZE, BUF_CAP * mem::size_of::<CandidateSet>() + 24);
const_assert_eq!(mem::align_of::<SharedRegion>(), 8);

/// A process-local read-write mapping of the named shared region.
///
/// Dropping the handle releases the mapping only; the global name survives
/// until [`ShmRegion::unlink`], which only the supervisor calls.
#[derive(Debug)]
pub struct ShmRegion {
    ptr: *mut u8,
    _map: MmapMut,
}

impl ShmRegion {
    /// Create the region exclusively and map it (supervisor side).
    ///
    /// Fails with [`MinfasError::StaleChannel`] when a prior unclean shutdown
    /// left the name bound. The fresh region is zeroed, which is exactly the
    /// protocol's initial state.
    pub fn create(name: &str) -> Result<Self> {
        let fd = match shm_open(
            name,
            OFlag::O_RDWR | OFlag::O_CREAT | OFlag::O_EXCL,
            Mode::S_IRUSR | Mode::S_IWUSR,
        ) {
            Ok(fd) => fd,
            Err(Errno::EEXIST) => {
                return Err(MinfasError::StaleChannel {
                    name: name.to_owned(),
                })
            }
            Err(err) => return Err(MinfasError::shared_memory(format!("creating {name}: {err}"))),
        };

        if let Err(err) = ftruncate(&fd, REGION_SIZE as i64) {
            let _ = Self::unlink(name);
            return Err(MinfasError::shared_memory(format!("sizing {name}: {err}")));
        }

        let file = File::from(fd);
        let mut map = match unsafe { MmapOptions::new().len(REGION_SIZE).map_mut(&file) } {
            Ok(map) => map,
            Err(err) => {
                let _ = Self::unlink(name);
                return Err(MinfasError::shared_memory(format!("mapping {name}: {err}")));
            }
        };

        let ptr = map.as_mut_ptr();
        unsafe { ptr::write_bytes(ptr, 0, REGION_SIZE) };

        Ok(Self { ptr, _map: map })
    }

    /// Map an existing region (generator side).
    ///
    /// Fails with [`MinfasError::SupervisorNotRunning`] when the name is not
    /// bound yet.
    pub fn open(name: &str) -> Result<Self> {
        let fd = match shm_open(name, OFlag::O_RDWR, Mode::empty()) {
            Ok(fd) => fd,
            Err(Errno::ENOENT) => return Err(MinfasError::SupervisorNotRunning),
            Err(err) => return Err(MinfasError::shared_memory(format!("opening {name}: {err}"))),
        };

        let file = File::from(fd);
        let len = file.metadata()?.len() as usize;
        if len < REGION_SIZE {
            return Err(MinfasError::shared_memory(format!(
                "{name} is {len} bytes, expected at least {REGION_SIZE}"
            )));
        }

        let mut map = unsafe { MmapOptions::new().len(REGION_SIZE).map_mut(&file) }
            .map_err(|err| MinfasError::shared_memory(format!("mapping {name}: {err}")))?;

        let ptr = map.as_mut_ptr();
        Ok(Self { ptr, _map: map })
    }

    /// The mapped control block
    #[inline]
    pub fn region(&self) -> &SharedRegion {
        unsafe { &*(self.ptr as *const SharedRegion) }
    }

    #[inline]
    fn slot_ptr(&self, index: u32) -> *mut CandidateSet {
        debug_assert!((index as usize) < BUF_CAP);
        // slots sit at offset zero of the region
        let base = self.ptr as *mut CandidateSet;
        unsafe { base.add(index as usize) }
    }

    /// Copy a candidate into a slot. Caller must hold the writer mutex.
    #[inline]
    pub fn write_slot(&self, index: u32, value: CandidateSet) {
        unsafe { ptr::write_volatile(self.slot_ptr(index), value) }
    }

    /// Copy a candidate out of a slot. Caller must own the matching USED
    /// credit for this slot.
    #[inline]
    pub fn read_slot(&self, index: u32) -> CandidateSet {
        unsafe { ptr::read_volatile(self.slot_ptr(index)) }
    }

    /// Remove the global name. Missing names are tolerated so shutdown paths
    /// can run after partial startup.
    pub fn unlink(name: &str) -> Result<()> {
        match shm_unlink(name) {
            Ok(()) | Err(Errno::ENOENT) => Ok(()),
            Err(err) => Err(MinfasError::shared_memory(format!(
                "unlinking {name}: {err}"
            ))),
        }
    }
}

// The handle owns its mapping; concurrent access to the region itself is
// governed by the semaphore protocol, not by Rust aliasing.
unsafe impl Send for ShmRegion {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Edge;
    use std::sync::atomic::Ordering;

    fn test_name(case: &str) -> String {
        format!("/minfas-shm-test-{}-{case}", std::process::id())
    }

    #[test]
    fn test_layout_matches_wire_contract() {
        assert_eq!(mem::size_of::<Edge>(), 16);
        assert_eq!(mem::size_of::<CandidateSet>(), 136);
        assert_eq!(REGION_SIZE, 25 * 136 + 24);
    }

    #[test]
    fn test_create_open_roundtrip() {
        let name = test_name("roundtrip");
        let creator = ShmRegion::create(&name).unwrap();
        let opener = ShmRegion::open(&name).unwrap();

        let mut candidate = CandidateSet::default();
        candidate.push(Edge::new(3, 7));
        creator.write_slot(4, candidate);

        assert_eq!(opener.read_slot(4), candidate);
        assert_eq!(opener.region().read_pos.load(Ordering::Acquire), 0);

        ShmRegion::unlink(&name).unwrap();
    }

    #[test]
    fn test_flags_visible_across_handles() {
        let name = test_name("flags");
        let creator = ShmRegion::create(&name).unwrap();
        let opener = ShmRegion::open(&name).unwrap();

        creator.region().terminate.store(1, Ordering::Release);
        opener.region().generators.fetch_add(2, Ordering::AcqRel);

        assert_eq!(opener.region().terminate.load(Ordering::Acquire), 1);
        assert_eq!(creator.region().generators.load(Ordering::Acquire), 2);

        ShmRegion::unlink(&name).unwrap();
    }

    #[test]
    fn test_open_without_create_fails() {
        let err = ShmRegion::open(&test_name("missing")).unwrap_err();
        assert!(matches!(err, MinfasError::SupervisorNotRunning));
    }

    #[test]
    fn test_double_create_detects_stale_name() {
        let name = test_name("stale");
        let _first = ShmRegion::create(&name).unwrap();
        let err = ShmRegion::create(&name).unwrap_err();
        assert!(err.is_stale_channel());
        ShmRegion::unlink(&name).unwrap();
    }

    #[test]
    fn test_unlink_is_idempotent() {
        let name = test_name("unlink");
        let _region = ShmRegion::create(&name).unwrap();
        ShmRegion::unlink(&name).unwrap();
        ShmRegion::unlink(&name).unwrap();
    }
}
