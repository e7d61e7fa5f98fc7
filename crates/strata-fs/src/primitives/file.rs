use std::fs::{File, OpenOptions};
use std::path::Path;

use crate::{Error, Op, Result};

/// Maximum absolute path length accepted on Windows hosts.
pub const WINDOWS_MAX_PATH_LEN: usize = 260;

/// Create a new file, failing if anything already exists at `path`.
pub fn create_new(path: &Path, mode: u32) -> Result<File> {
    let mut options = OpenOptions::new();
    options.write(true).create_new(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(mode);
    }
    #[cfg(not(unix))]
    let _ = mode;

    options
        .open(path)
        .map_err(|e| Error::io(Op::CreateFile, path, e))
}

/// Reject paths that the host cannot address.
///
/// Only Windows has a fixed limit; elsewhere this is a no-op.
pub fn check_path_len(path: &Path) -> Result<()> {
    if cfg!(windows) {
        ensure_within(path, WINDOWS_MAX_PATH_LEN)
    } else {
        Ok(())
    }
}

pub(crate) fn ensure_within(path: &Path, max: usize) -> Result<()> {
    let absolute = std::path::absolute(path).map_err(|e| Error::io(Op::Absolutize, path, e))?;
    let len = absolute.as_os_str().len();
    if len > max {
        return Err(Error::PathTooLong {
            path: absolute,
            len,
            max,
        });
    }
    Ok(())
}
