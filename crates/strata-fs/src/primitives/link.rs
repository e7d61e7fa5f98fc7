use std::fs;
use std::path::{Path, PathBuf};

use crate::{Error, Op, Result};

/// Create a symbolic link at `link` containing the literal text `target`.
pub fn symlink(target: &Path, link: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        std::os::unix::fs::symlink(target, link).map_err(|e| Error::io(Op::Symlink, link, e))
    }

    #[cfg(windows)]
    {
        let created = if target.is_dir() {
            std::os::windows::fs::symlink_dir(target, link)
        } else {
            std::os::windows::fs::symlink_file(target, link)
        };
        created.map_err(|e| Error::io(Op::Symlink, link, e))
    }
}

pub fn hard_link(original: &Path, link: &Path) -> Result<()> {
    fs::hard_link(original, link).map_err(|e| Error::io(Op::Hardlink, link, e))
}

pub fn read_link(path: &Path) -> Result<PathBuf> {
    fs::read_link(path).map_err(|e| Error::io(Op::ReadLink, path, e))
}
