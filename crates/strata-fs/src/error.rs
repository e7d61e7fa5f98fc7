use std::fmt;
use std::io;
use std::path::PathBuf;

/// Filesystem operation that failed, used to label [`Error::Io`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Op {
    Stat,
    ReadLink,
    CreateDir,
    CreateFile,
    Write,
    Remove,
    Chmod,
    Chown,
    Symlink,
    Hardlink,
    Mknod,
    Absolutize,
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self {
            Self::Stat => "stat",
            Self::ReadLink => "read link",
            Self::CreateDir => "create directory",
            Self::CreateFile => "create file",
            Self::Write => "write",
            Self::Remove => "remove",
            Self::Chmod => "chmod",
            Self::Chown => "chown",
            Self::Symlink => "create symlink",
            Self::Hardlink => "create hard link",
            Self::Mknod => "create device node",
            Self::Absolutize => "absolutize",
        };
        f.write_str(op)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to {op} '{}': {source}", path.display())]
    Io {
        op: Op,
        path: PathBuf,
        source: io::Error,
    },

    #[error("path length of '{}' is {len} chars (max: {max} chars)", path.display())]
    PathTooLong {
        path: PathBuf,
        len: usize,
        max: usize,
    },

    #[error("device nodes are not supported on this platform")]
    Unsupported,
}

impl Error {
    pub fn io(op: Op, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            op,
            path: path.into(),
            source,
        }
    }

    /// Kind of the underlying OS error, if this wraps one.
    pub fn io_kind(&self) -> Option<io::ErrorKind> {
        match self {
            Self::Io { source, .. } => Some(source.kind()),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
