use std::path::Path;

use crate::{Error, Op, Result};

/// Permission bits applied to an extracted object.
///
/// `Directory` and `ReadWrite` are the defaults used when archive modes are
/// not preserved; `Custom` carries archive bits, including setuid, setgid
/// and sticky.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PermissionMode {
    /// `0o755` (rwxr-xr-x)
    Directory,
    /// `0o644` (rw-r--r--)
    ReadWrite,
    /// Explicit mode bits, masked to `0o7777`.
    Custom(u32),
}

impl PermissionMode {
    pub fn custom(mode: u32) -> Self {
        Self::Custom(mode & 0o7777)
    }

    pub fn bits(self) -> u32 {
        match self {
            Self::Directory => 0o755,
            Self::ReadWrite => 0o644,
            Self::Custom(mode) => mode,
        }
    }

    /// OR additional bits into the mode.
    pub fn with_mask(self, mask: u32) -> Self {
        Self::custom(self.bits() | mask)
    }

    pub fn is_writable(self) -> bool {
        self.bits() & 0o222 != 0
    }

    /// Apply the mode explicitly, overriding whatever the process umask left behind.
    ///
    /// # Platform Behavior
    /// - **Unix**: sets mode bits via `PermissionsExt::from_mode()`
    /// - **Windows**: only the `readonly` attribute is derived from the write bits
    pub fn apply_to_path(self, path: &Path) -> Result<()> {
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(self.bits());
            std::fs::set_permissions(path, perms).map_err(|e| Error::io(Op::Chmod, path, e))?;
        }

        #[cfg(windows)]
        {
            let mut perms = std::fs::metadata(path)
                .map_err(|e| Error::io(Op::Stat, path, e))?
                .permissions();
            perms.set_readonly(!self.is_writable());
            std::fs::set_permissions(path, perms).map_err(|e| Error::io(Op::Chmod, path, e))?;
        }

        Ok(())
    }
}

impl From<u32> for PermissionMode {
    fn from(mode: u32) -> Self {
        Self::custom(mode)
    }
}

/// Current permission bits of `path`, following symlinks.
#[cfg(unix)]
pub fn mode_of(path: &Path) -> Result<u32> {
    use std::os::unix::fs::PermissionsExt;
    let meta = std::fs::metadata(path).map_err(|e| Error::io(Op::Stat, path, e))?;
    Ok(meta.permissions().mode() & 0o7777)
}
