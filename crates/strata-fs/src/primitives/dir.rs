use std::fs;
use std::io;
use std::path::Path;

use tracing::trace;

use crate::{Error, Op, Result};

/// Create a single directory. Returns `false` if something already exists at `path`.
pub fn create_dir(path: &Path, mode: u32) -> Result<bool> {
    let mut builder = fs::DirBuilder::new();
    set_builder_mode(&mut builder, mode);

    match builder.create(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(false),
        Err(e) => Err(Error::io(Op::CreateDir, path, e)),
    }
}

/// Create `path` and any missing parents. Existing directories are not an error.
pub fn create_dir_all(path: &Path, mode: u32) -> Result<()> {
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    set_builder_mode(&mut builder, mode);
    builder
        .create(path)
        .map_err(|e| Error::io(Op::CreateDir, path, e))
}

#[cfg(unix)]
fn set_builder_mode(builder: &mut fs::DirBuilder, mode: u32) {
    use std::os::unix::fs::DirBuilderExt;
    builder.mode(mode);
}

#[cfg(not(unix))]
fn set_builder_mode(_builder: &mut fs::DirBuilder, _mode: u32) {}

/// Remove whatever occupies `path`, without following a symlink found there.
///
/// A missing path is not an error.
pub fn remove_all(path: &Path) -> Result<()> {
    let meta = match fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(Error::io(Op::Stat, path, e)),
    };

    trace!(path = %path.display(), dir = meta.is_dir(), "removing existing object");
    let removed = if meta.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };
    removed.map_err(|e| Error::io(Op::Remove, path, e))
}

/// Remove the object at `path` unless it is a real directory.
///
/// Returns `true` when a directory was kept in place.
pub fn remove_unless_dir(path: &Path) -> Result<bool> {
    match fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => Ok(true),
        Ok(_) => remove_all(path).map(|()| false),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(Error::io(Op::Stat, path, e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn create_dir_reports_existing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a");

        assert!(create_dir(&path, 0o755).unwrap());
        assert!(!create_dir(&path, 0o755).unwrap());
        assert!(path.is_dir());
    }

    #[test]
    fn create_dir_fails_without_parent() {
        let dir = tempdir().unwrap();
        let err = create_dir(&dir.path().join("missing/child"), 0o755).unwrap_err();
        assert_eq!(err.io_kind(), Some(io::ErrorKind::NotFound));
    }

    #[test]
    fn remove_all_handles_every_kind() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("file");
        let tree = dir.path().join("tree");
        fs::write(&file, "x").unwrap();
        fs::create_dir_all(tree.join("nested")).unwrap();
        fs::write(tree.join("nested/leaf"), "y").unwrap();

        remove_all(&file).unwrap();
        remove_all(&tree).unwrap();
        remove_all(&dir.path().join("never-existed")).unwrap();

        assert!(!file.exists());
        assert!(!tree.exists());
    }

    #[cfg(unix)]
    #[test]
    fn remove_all_does_not_follow_symlinks() {
        let dir = tempdir().unwrap();
        let real = dir.path().join("real");
        let link = dir.path().join("link");
        fs::create_dir(&real).unwrap();
        fs::write(real.join("keep"), "k").unwrap();
        std::os::unix::fs::symlink(&real, &link).unwrap();

        remove_all(&link).unwrap();

        assert!(fs::symlink_metadata(&link).is_err());
        assert!(real.join("keep").exists());
    }

    #[test]
    fn remove_unless_dir_keeps_directories() {
        let dir = tempdir().unwrap();
        let sub = dir.path().join("sub");
        let file = dir.path().join("file");
        fs::create_dir(&sub).unwrap();
        fs::write(&file, "x").unwrap();

        assert!(remove_unless_dir(&sub).unwrap());
        assert!(!remove_unless_dir(&file).unwrap());
        assert!(sub.is_dir());
        assert!(!file.exists());
    }
}
