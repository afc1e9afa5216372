use std::{fs, io, path::Path};

use crate::OpenFlags;

/// Opens a file in the filesystem.
///
/// The permission bits are respected on UNIX platforms when a new
/// file gets created, but are ignored everywhere else.
pub fn open_file(path: &Path, flags: OpenFlags, _mode: u32) -> io::Result<fs::File> {
    let mut opts = fs::OpenOptions::new();

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        opts.mode(_mode);
    }

    opts.read(flags.contains(OpenFlags::READ))
        .write(flags.contains(OpenFlags::WRITE))
        .append(flags.contains(OpenFlags::APPEND))
        .truncate(flags.contains(OpenFlags::TRUNCATE))
        .create(flags.contains(OpenFlags::CREATE))
        .create_new(flags.contains(OpenFlags::CREATE_NEW))
        .open(path)
}

/// Closes a file and reports the error from the OS, if any.
#[cfg(unix)]
pub fn close_file(file: fs::File) -> io::Result<()> {
    use std::os::unix::io::IntoRawFd;

    let fd = file.into_raw_fd();

    // SAFETY: `into_raw_fd` released ownership of `fd` to us and
    // nothing else refers to it anymore.
    if unsafe { libc::close(fd) } == -1 {
        return Err(io::Error::last_os_error());
    }

    Ok(())
}

/// Closes a file.
///
/// Errors from the OS are not observable on this platform.
#[cfg(not(unix))]
pub fn close_file(file: fs::File) -> io::Result<()> {
    drop(file);
    Ok(())
}
