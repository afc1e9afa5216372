//! Platform queries that help with sizing an [`Executor`](crate::Executor).
//!
//! Nothing in this crate consults these on its own.

use std::{io, thread};

/// Gets the number of threads the hardware can run in parallel.
///
/// Falls back to 1 when the platform can't tell.
pub fn hardware_parallelism() -> usize {
    thread::available_parallelism()
        .map(|p| p.get())
        .unwrap_or(1)
}

/// Gets the soft limit on open file descriptors for this process.
#[cfg(unix)]
pub fn open_file_limit() -> io::Result<u64> {
    let mut limit = libc::rlimit {
        rlim_cur: 0,
        rlim_max: 0,
    };

    // SAFETY: `limit` is a valid, writable `rlimit` for the call.
    if unsafe { libc::getrlimit(libc::RLIMIT_NOFILE, &mut limit) } == -1 {
        return Err(io::Error::last_os_error());
    }

    Ok(u64::from(limit.rlim_cur))
}

/// Gets the soft limit on open file descriptors for this process.
///
/// This is not supported on the current platform.
#[cfg(not(unix))]
pub fn open_file_limit() -> io::Result<u64> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "open file limits are not supported on this platform",
    ))
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn open_file_limit_is_positive() {
        assert!(open_file_limit().unwrap() > 0);
    }
}
