use std::path::{Path, PathBuf};

use strata_fs::ownership::{SETGID, SETUID};

/// Type of object an archive entry describes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntryKind {
    Directory,
    File,
    Symlink,
    Hardlink,
    CharDevice,
    BlockDevice,
    Fifo,
    /// Any other type flag, kept so it can be reported.
    Unknown(u8),
}

impl EntryKind {
    pub fn from_tar(entry_type: tar::EntryType) -> Self {
        use tar::EntryType;

        match entry_type {
            EntryType::Regular | EntryType::Continuous | EntryType::GNUSparse => Self::File,
            EntryType::Directory => Self::Directory,
            EntryType::Symlink => Self::Symlink,
            EntryType::Link => Self::Hardlink,
            EntryType::Char => Self::CharDevice,
            EntryType::Block => Self::BlockDevice,
            EntryType::Fifo => Self::Fifo,
            other => Self::Unknown(other.as_byte()),
        }
    }

    pub fn is_special(self) -> bool {
        matches!(self, Self::CharDevice | Self::BlockDevice | Self::Fifo)
    }
}

/// Header of one archive entry, as seen by the extractor and custom handlers.
///
/// `uid` and `gid` hold the archive ids until ownership mapping has run; custom
/// handlers always see the mapped host ids.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntryHeader {
    pub path: PathBuf,
    pub kind: EntryKind,
    pub link_target: Option<PathBuf>,
    pub size: u64,
    pub mode: u32,
    pub uid: u32,
    pub gid: u32,
    pub device_major: u32,
    pub device_minor: u32,
}

impl EntryHeader {
    pub fn new(path: impl Into<PathBuf>, kind: EntryKind) -> Self {
        Self {
            path: path.into(),
            kind,
            link_target: None,
            size: 0,
            mode: 0,
            uid: 0,
            gid: 0,
            device_major: 0,
            device_minor: 0,
        }
    }

    pub fn with_link_target(mut self, target: impl Into<PathBuf>) -> Self {
        self.link_target = Some(target.into());
        self
    }

    pub fn with_size(mut self, size: u64) -> Self {
        self.size = size;
        self
    }

    pub fn with_mode(mut self, mode: u32) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_owner(mut self, uid: u32, gid: u32) -> Self {
        self.uid = uid;
        self.gid = gid;
        self
    }

    pub fn with_device(mut self, major: u32, minor: u32) -> Self {
        self.device_major = major;
        self.device_minor = minor;
        self
    }

    /// Permission bits including setuid, setgid and sticky.
    pub fn permissions(&self) -> u32 {
        self.mode & 0o7777
    }

    pub fn has_setuid(&self) -> bool {
        self.mode & SETUID != 0
    }

    pub fn has_setgid(&self) -> bool {
        self.mode & SETGID != 0
    }

    pub fn link_target(&self) -> Option<&Path> {
        self.link_target.as_deref()
    }
}
