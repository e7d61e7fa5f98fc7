use std::fmt;
use std::io;
use std::path::PathBuf;

use crate::owner::{IdKind, MappingError};
use crate::handler::HandlerError;

/// Why an entry path or link target was rejected before touching the filesystem.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnsafeReason {
    Empty,
    Absolute,
    EmptyComponent,
    ParentDir,
    EmptyLinkTarget,
    TargetRoot,
    RootNotDirectory,
}

impl fmt::Display for UnsafeReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Self::Empty => "no name given for entry",
            Self::Absolute => "absolute paths are not allowed",
            Self::EmptyComponent => "empty component in path",
            Self::ParentDir => "parent directory references are not allowed",
            Self::EmptyLinkTarget => "no link target given",
            Self::TargetRoot => "only a directory may name the extraction root",
            Self::RootNotDirectory => "extraction root is not a real directory",
        };
        f.write_str(reason)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("unsafe entry path '{}': {reason}", path.display())]
    UnsafePath { path: PathBuf, reason: UnsafeReason },

    #[error("unsupported compression: {0}")]
    UnsupportedCompression(String),

    #[error("path length of extracted file '{}' is {len} chars (max: {max} chars)", path.display())]
    PathTooLong {
        path: PathBuf,
        len: usize,
        max: usize,
    },

    #[error("failed to map {kind} {id} for '{}': {source}", path.display())]
    OwnerMappingFailed {
        path: PathBuf,
        kind: IdKind,
        id: u32,
        source: MappingError,
    },

    #[error("short copy while writing '{}': expected {expected} bytes, got {actual}", path.display())]
    ShortCopy {
        path: PathBuf,
        expected: u64,
        actual: u64,
    },

    #[error("unrecognized entry type {flag:#04x} for '{}'", path.display())]
    UnrecognizedEntryType { path: PathBuf, flag: u8 },

    #[error(transparent)]
    Filesystem(strata_fs::Error),

    #[error("too many levels of symbolic links while resolving '{}'", path.display())]
    SymlinkLoop { path: PathBuf },

    #[error(transparent)]
    Handler(HandlerError),

    #[error("failed to read archive: {0}")]
    Archive(#[source] io::Error),
}

impl From<strata_fs::Error> for Error {
    fn from(e: strata_fs::Error) -> Self {
        match e {
            strata_fs::Error::PathTooLong { path, len, max } => {
                Self::PathTooLong { path, len, max }
            }
            other => Self::Filesystem(other),
        }
    }
}

impl Error {
    pub(crate) fn unsafe_path(path: impl Into<PathBuf>, reason: UnsafeReason) -> Self {
        Self::UnsafePath {
            path: path.into(),
            reason,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
