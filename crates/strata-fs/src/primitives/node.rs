use std::path::Path;

use crate::Result;

/// Special filesystem node types an archive may describe.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeKind {
    Char,
    Block,
    Fifo,
}

/// Create a device node or FIFO with `perm` bits and the given device numbers.
#[cfg(unix)]
pub fn make_node(path: &Path, kind: NodeKind, perm: u32, major: u32, minor: u32) -> Result<()> {
    use nix::libc::mode_t;
    use nix::sys::stat::{Mode, SFlag, makedev, mknod};

    let flag = match kind {
        NodeKind::Char => SFlag::S_IFCHR,
        NodeKind::Block => SFlag::S_IFBLK,
        NodeKind::Fifo => SFlag::S_IFIFO,
    };
    let dev = makedev(u64::from(major), u64::from(minor));
    mknod(path, flag, Mode::from_bits_truncate(perm as mode_t), dev)
        .map_err(|e| crate::Error::io(crate::Op::Mknod, path, e.into()))
}

#[cfg(not(unix))]
pub fn make_node(
    _path: &Path,
    _kind: NodeKind,
    _perm: u32,
    _major: u32,
    _minor: u32,
) -> Result<()> {
    Err(crate::Error::Unsupported)
}
