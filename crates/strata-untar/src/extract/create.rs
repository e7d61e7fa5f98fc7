use std::io::{self, Read};
use std::path::Path;

use strata_fs::{NodeKind, Op, Owner, PermissionMode, SpecialBits};
use tracing::{debug, warn};

use super::Untar;
use crate::entry::{EntryHeader, EntryKind};
use crate::error::{Error, Result, UnsafeReason};
use crate::sanitize::clamp_relative;

impl Untar {
    pub(super) fn create_directory(
        &mut self,
        header: &EntryHeader,
        path: &Path,
        owner: Owner,
    ) -> Result<()> {
        let mode = self.permissions(header, PermissionMode::Directory);
        strata_fs::create_dir(path, mode.bits())?;
        // the umask applied at creation time is overridden here
        mode.apply_to_path(path)?;
        strata_fs::chown(path, owner)?;
        Ok(())
    }

    pub(super) fn create_symlink(
        &mut self,
        header: &EntryHeader,
        path: &Path,
        owner: Owner,
    ) -> Result<()> {
        let target = header
            .link_target()
            .ok_or_else(|| Error::unsafe_path(&header.path, UnsafeReason::EmptyLinkTarget))?;

        // links to themselves have been seen in the wild
        if target == path || target == header.path {
            debug!(path = %header.path.display(), "ignoring self-referential symlink");
            return Ok(());
        }

        strata_fs::symlink(target, path)?;
        if let Err(e) = strata_fs::lchown(path, owner) {
            warn!(path = %path.display(), error = %e, "failed to set owner of symlink");
        }
        Ok(())
    }

    /// Hard links pick up mode and owner from their source.
    pub(super) fn create_hardlink(&mut self, header: &EntryHeader, path: &Path) -> Result<()> {
        let target = header
            .link_target()
            .ok_or_else(|| Error::unsafe_path(&header.path, UnsafeReason::EmptyLinkTarget))?;

        let source = self.existing(&clamp_relative(target))?;
        if source == self.target {
            return Err(Error::unsafe_path(&header.path, UnsafeReason::TargetRoot));
        }

        strata_fs::hard_link(&source, path)?;
        Ok(())
    }

    pub(super) fn create_file(
        &mut self,
        header: &EntryHeader,
        path: &Path,
        owner: Owner,
        content: &mut dyn Read,
    ) -> Result<()> {
        let mode = self.permissions(header, PermissionMode::ReadWrite);

        // the path was cleared above; anything there now is a conflict
        let mut file = strata_fs::create_new(path, mode.bits())?;
        mode.apply_to_path(path)?;
        let special = SpecialBits::capture(path, header.mode);

        let written = copy_exact(content, &mut file, header.size)
            .map_err(|e| strata_fs::Error::io(Op::Write, path, e))?;
        if written != header.size {
            return Err(Error::ShortCopy {
                path: header.path.clone(),
                expected: header.size,
                actual: written,
            });
        }
        drop(file);
        self.report.bytes_written += written;

        strata_fs::chown(path, owner)?;
        if let Some(special) = special {
            special.restore()?;
        }
        Ok(())
    }

    pub(super) fn create_node(
        &mut self,
        header: &EntryHeader,
        path: &Path,
        owner: Owner,
    ) -> Result<()> {
        if self.options.skip_special_devices {
            debug!(path = %header.path.display(), "skipping special device");
            self.report.skipped += 1;
            return Ok(());
        }

        let kind = match header.kind {
            EntryKind::CharDevice => NodeKind::Char,
            EntryKind::BlockDevice => NodeKind::Block,
            _ => NodeKind::Fifo,
        };
        let mode = self.permissions(header, PermissionMode::ReadWrite);

        strata_fs::make_node(
            path,
            kind,
            mode.bits(),
            header.device_major,
            header.device_minor,
        )?;
        mode.apply_to_path(path)?;
        strata_fs::chown(path, owner)?;
        Ok(())
    }
}

/// Copy `size` bytes, reporting how many the stream really had.
///
/// One byte past `size` is read, so an overlong stream also shows up as a mismatch.
fn copy_exact(content: &mut dyn Read, out: &mut impl io::Write, size: u64) -> io::Result<u64> {
    let copied = io::copy(&mut (&mut *content).take(size), out)?;
    if copied < size {
        return Ok(copied);
    }

    let mut extra = [0u8; 1];
    loop {
        match content.read(&mut extra) {
            Ok(0) => return Ok(copied),
            Ok(_) => return Ok(copied + 1),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
}
