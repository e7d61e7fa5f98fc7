use std::path::{Path, PathBuf};

use crate::Result;

/// Id used on platforms without numeric process ids.
pub const FALLBACK_ID: u32 = 500;

pub const SETUID: u32 = 0o4000;
pub const SETGID: u32 = 0o2000;

/// Numeric host owner of an extracted object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Owner {
    pub uid: u32,
    pub gid: u32,
}

impl Owner {
    pub const fn new(uid: u32, gid: u32) -> Self {
        Self { uid, gid }
    }

    /// The invoking user and their primary group.
    ///
    /// The real ids of the process are always known on unix, so [`FALLBACK_ID`]
    /// is never used here. Without a passwd entry the primary group is the real
    /// gid of the process.
    #[cfg(unix)]
    pub fn current() -> Self {
        use nix::unistd::{User, getgid, getuid};

        let uid = getuid();
        match User::from_uid(uid) {
            Ok(Some(user)) => Self::new(user.uid.as_raw(), user.gid.as_raw()),
            _ => Self::new(uid.as_raw(), getgid().as_raw()),
        }
    }

    #[cfg(not(unix))]
    pub fn current() -> Self {
        Self::new(FALLBACK_ID, FALLBACK_ID)
    }
}

impl Default for Owner {
    fn default() -> Self {
        Self::current()
    }
}

/// Change ownership of `path`, following a symlink found there.
pub fn chown(path: &Path, owner: Owner) -> Result<()> {
    #[cfg(unix)]
    std::os::unix::fs::chown(path, Some(owner.uid), Some(owner.gid))
        .map_err(|e| crate::Error::io(crate::Op::Chown, path, e))?;
    #[cfg(not(unix))]
    let _ = (path, owner);
    Ok(())
}

/// Change ownership of the symlink itself.
pub fn lchown(path: &Path, owner: Owner) -> Result<()> {
    #[cfg(unix)]
    std::os::unix::fs::lchown(path, Some(owner.uid), Some(owner.gid))
        .map_err(|e| crate::Error::io(crate::Op::Chown, path, e))?;
    #[cfg(not(unix))]
    let _ = (path, owner);
    Ok(())
}

/// Setuid/setgid bits that must be put back once ownership is final.
///
/// `chown` clears both bits on most platforms, so a file that carries them
/// is created, chmodded and chowned first and then handed to [`SpecialBits::restore`].
#[derive(Debug, PartialEq, Eq)]
#[must_use = "special bits are only applied by `restore`"]
pub struct SpecialBits {
    path: PathBuf,
    bits: u32,
}

impl SpecialBits {
    /// Capture the setuid/setgid part of `mode`, if any.
    pub fn capture(path: &Path, mode: u32) -> Option<Self> {
        let bits = mode & (SETUID | SETGID);
        (bits != 0).then(|| Self {
            path: path.to_path_buf(),
            bits,
        })
    }

    pub fn bits(&self) -> u32 {
        self.bits
    }

    /// Re-apply the captured bits on top of the current mode.
    pub fn restore(self) -> Result<()> {
        #[cfg(unix)]
        {
            let current = crate::permissions::mode_of(&self.path)?;
            crate::PermissionMode::custom(current | self.bits).apply_to_path(&self.path)?;
        }
        Ok(())
    }
}
