//! Shutdown signal handling for the supervisor.
//!
//! The handler does exactly one thing: store 1 into the mapped terminate
//! flag. No allocation, no I/O, no semaphore posts; the drain loop and the
//! teardown in [`crate::ring::Collector`] do the wake-ups. Handlers are
//! installed without `SA_RESTART` so a blocked semaphore wait returns
//! `EINTR`, which the protocol treats as a shutdown request.

use std::ptr;
use std::sync::atomic::{AtomicPtr, AtomicU32, Ordering};

use nix::sys::signal::{sigaction, SaFlags, SigAction, SigHandler, SigSet, Signal};

use crate::error::Result;

static TERMINATE_FLAG: AtomicPtr<AtomicU32> = AtomicPtr::new(ptr::null_mut());

extern "C" fn on_shutdown_signal(_signal: libc::c_int) {
    // async-signal-safe: a single lock-free store into the mapped flag
    let flag = TERMINATE_FLAG.load(Ordering::Acquire);
    if !flag.is_null() {
        unsafe { (*flag).store(1, Ordering::Release) };
    }
}

/// Route SIGINT and SIGTERM to the channel's terminate flag.
///
/// The flag must stay mapped for the rest of the process lifetime; the
/// supervisor keeps its collector alive until exit, which satisfies this.
pub fn install_terminate_handler(flag: &AtomicU32) -> Result<()> {
    TERMINATE_FLAG.store(
        flag as *const AtomicU32 as *mut AtomicU32,
        Ordering::Release,
    );

    let action = SigAction::new(
        SigHandler::Handler(on_shutdown_signal),
        SaFlags::empty(),
        SigSet::empty(),
    );
    unsafe {
        sigaction(Signal::SIGINT, &action)?;
        sigaction(Signal::SIGTERM, &action)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use nix::sys::signal::raise;

    #[test]
    fn test_handler_stores_into_registered_flag() {
        let flag = AtomicU32::new(0);
        install_terminate_handler(&flag).unwrap();

        raise(Signal::SIGTERM).unwrap();

        assert_eq!(flag.load(Ordering::Acquire), 1);
        // the flag lives on this stack frame; detach it so a later signal
        // in this test process cannot scribble on a dead slot
        TERMINATE_FLAG.store(ptr::null_mut(), Ordering::Release);
    }
}
