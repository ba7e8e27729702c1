//! Channel constants shared by the supervisor and generator executables.
//!
//! Both programs compile against the same region layout, so these values and
//! `crate::shm::SharedRegion` must move together.

/// Number of candidate slots in the ring buffer.
pub const BUF_CAP: usize = 25;

/// Candidate sets reaching this size are discarded by producers; only sets
/// with fewer edges are ever published.
pub const MAX_SET: usize = 8;

/// Channel tag used by the shipped binaries. Tests derive their own tags so
/// concurrent runs never collide on the kernel object names.
pub const DEFAULT_TAG: &str = "minfas";

/// Name of the shared-memory region for a channel tag.
pub fn shm_name(tag: &str) -> String {
    format!("/{tag}_shm")
}

/// Name of the free-slot-credit semaphore for a channel tag.
pub fn free_name(tag: &str) -> String {
    format!("/{tag}_free")
}

/// Name of the filled-slot-credit semaphore for a channel tag.
pub fn used_name(tag: &str) -> String {
    format!("/{tag}_used")
}

/// Name of the writer-serialization semaphore for a channel tag.
pub fn mutex_name(tag: &str) -> String {
    format!("/{tag}_mutex")
}
