//! Named POSIX semaphores.
//!
//! nix does not wrap the `sem_open` family, so this module sits directly on
//! libc. A wait that returns `EINTR` is surfaced as
//! [`MinfasError::WaitInterrupted`] and never retried: for this protocol an
//! interrupted wait is a shutdown request.

use std::ffi::CString;
use std::io;

use tracing::warn;

use crate::error::{MinfasError, Result};

/// Handle to one named semaphore. Closing (on drop) releases the handle
/// only; the global name survives until [`NamedSem::unlink`].
#[derive(Debug)]
pub struct NamedSem {
    sem: *mut libc::sem_t,
    name: String,
}

impl NamedSem {
    /// Create the semaphore exclusively with an initial value (supervisor
    /// side). Permissions are owner read/write.
    pub fn create(name: &str, initial: u32) -> Result<Self> {
        let c_name = cstring(name)?;
        let sem = unsafe {
            libc::sem_open(
                c_name.as_ptr(),
                libc::O_CREAT | libc::O_EXCL,
                0o600 as libc::mode_t,
                initial as libc::c_uint,
            )
        };
        if sem == libc::SEM_FAILED {
            let err = io::Error::last_os_error();
            return Err(match err.raw_os_error() {
                Some(libc::EEXIST) => MinfasError::StaleChannel {
                    name: name.to_owned(),
                },
                _ => MinfasError::semaphore(format!("creating {name}: {err}")),
            });
        }
        Ok(Self {
            sem,
            name: name.to_owned(),
        })
    }

    /// Open an existing semaphore (generator side).
    pub fn open(name: &str) -> Result<Self> {
        let c_name = cstring(name)?;
        let sem = unsafe { libc::sem_open(c_name.as_ptr(), 0) };
        if sem == libc::SEM_FAILED {
            let err = io::Error::last_os_error();
            return Err(match err.raw_os_error() {
                Some(libc::ENOENT) => MinfasError::SupervisorNotRunning,
                _ => MinfasError::semaphore(format!("opening {name}: {err}")),
            });
        }
        Ok(Self {
            sem,
            name: name.to_owned(),
        })
    }

    /// Block until a credit is available.
    pub fn wait(&self) -> Result<()> {
        if unsafe { libc::sem_wait(self.sem) } == 0 {
            return Ok(());
        }
        let err = io::Error::last_os_error();
        if err.raw_os_error() == Some(libc::EINTR) {
            return Err(MinfasError::WaitInterrupted);
        }
        Err(MinfasError::semaphore(format!(
            "waiting on {}: {err}",
            self.name
        )))
    }

    /// Release one credit.
    pub fn post(&self) -> Result<()> {
        if unsafe { libc::sem_post(self.sem) } == 0 {
            return Ok(());
        }
        Err(MinfasError::semaphore(format!(
            "posting {}: {}",
            self.name,
            io::Error::last_os_error()
        )))
    }

    /// Current value, for diagnostics and tests. Racy by nature: the value
    /// can change the moment it is read.
    pub fn value(&self) -> Result<i32> {
        let mut value = 0;
        if unsafe { libc::sem_getvalue(self.sem, &mut value) } == 0 {
            return Ok(value);
        }
        Err(MinfasError::semaphore(format!(
            "reading {}: {}",
            self.name,
            io::Error::last_os_error()
        )))
    }

    /// Remove the global name. Missing names are tolerated so shutdown paths
    /// can run after partial startup.
    pub fn unlink(name: &str) -> Result<()> {
        let c_name = cstring(name)?;
        if unsafe { libc::sem_unlink(c_name.as_ptr()) } == 0 {
            return Ok(());
        }
        let err = io::Error::last_os_error();
        if err.raw_os_error() == Some(libc::ENOENT) {
            return Ok(());
        }
        Err(MinfasError::semaphore(format!("unlinking {name}: {err}")))
    }
}

impl Drop for NamedSem {
    fn drop(&mut self) {
        if unsafe { libc::sem_close(self.sem) } != 0 {
            warn!(
                name = %self.name,
                error = %io::Error::last_os_error(),
                "failed to close semaphore"
            );
        }
    }
}

// A sem_t handle may be used from any thread of the process.
unsafe impl Send for NamedSem {}

fn cstring(name: &str) -> Result<CString> {
    CString::new(name)
        .map_err(|_| MinfasError::semaphore(format!("name {name:?} contains a NUL byte")))
}
