#![allow(dead_code)]

use std::collections::VecDeque;
use std::io::{Cursor, Write};
use std::os::unix::fs::{MetadataExt, PermissionsExt};
use std::path::Path;

use strata_untar::{EntryHeader, EntrySource, ExtractOptions, RawEntry, Result};
use tar::{EntryType, Header};

/// Builds tar streams with names written verbatim into the header, so that
/// hostile paths `tar::Header::set_path` refuses can be produced.
pub struct TarBuilder {
    builder: tar::Builder<Vec<u8>>,
}

impl TarBuilder {
    pub fn new() -> Self {
        Self {
            builder: tar::Builder::new(Vec::new()),
        }
    }

    pub fn dir(self, name: &str) -> Self {
        self.dir_with(name, 0o755)
    }

    pub fn dir_with(mut self, name: &str, mode: u32) -> Self {
        let header = header(&format!("{name}/"), EntryType::Directory, mode, 0);
        self.append(header, &[]);
        self
    }

    pub fn file(self, name: &str, contents: &str) -> Self {
        self.file_with(name, contents, 0o644, 0, 0)
    }

    pub fn file_with(mut self, name: &str, contents: &str, mode: u32, uid: u64, gid: u64) -> Self {
        let mut header = header(name, EntryType::Regular, mode, contents.len() as u64);
        header.set_uid(uid);
        header.set_gid(gid);
        self.append(header, contents.as_bytes());
        self
    }

    pub fn symlink(self, name: &str, target: &str) -> Self {
        self.link(name, target, EntryType::Symlink)
    }

    pub fn hardlink(self, name: &str, target: &str) -> Self {
        self.link(name, target, EntryType::Link)
    }

    pub fn special(mut self, name: &str, kind: EntryType, major: u32, minor: u32) -> Self {
        let mut header = header(name, kind, 0o644, 0);
        header.set_device_major(major).unwrap();
        header.set_device_minor(minor).unwrap();
        self.append(header, &[]);
        self
    }

    pub fn raw(mut self, name: &str, kind: EntryType) -> Self {
        self.append(header(name, kind, 0o644, 0), &[]);
        self
    }

    pub fn finish(self) -> Vec<u8> {
        self.builder.into_inner().unwrap()
    }

    pub fn gzip(self) -> Vec<u8> {
        let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(&self.finish()).unwrap();
        encoder.finish().unwrap()
    }

    pub fn bzip2(self) -> Vec<u8> {
        let mut encoder = bzip2::write::BzEncoder::new(Vec::new(), bzip2::Compression::default());
        encoder.write_all(&self.finish()).unwrap();
        encoder.finish().unwrap()
    }

    fn link(mut self, name: &str, target: &str, kind: EntryType) -> Self {
        let mut header = header(name, kind, 0o777, 0);
        let linkname = &mut header.as_old_mut().linkname;
        linkname[..target.len()].copy_from_slice(target.as_bytes());
        header.set_cksum();
        self.append(header, &[]);
        self
    }

    fn append(&mut self, mut header: Header, data: &[u8]) {
        header.set_cksum();
        self.builder.append(&header, data).unwrap();
    }
}

fn header(name: &str, kind: EntryType, mode: u32, size: u64) -> Header {
    let mut header = Header::new_ustar();
    let field = &mut header.as_old_mut().name;
    field[..name.len()].copy_from_slice(name.as_bytes());
    header.set_entry_type(kind);
    header.set_mode(mode);
    header.set_size(size);
    header.set_uid(0);
    header.set_gid(0);
    header.set_mtime(0);
    header.set_cksum();
    header
}

/// In-memory entry stream, used to model archives the tar writer cannot produce.
pub struct VecSource {
    entries: VecDeque<(EntryHeader, Vec<u8>)>,
}

impl VecSource {
    pub fn new(entries: impl IntoIterator<Item = (EntryHeader, Vec<u8>)>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
        }
    }
}

impl EntrySource for VecSource {
    fn next_entry(&mut self) -> Option<Result<RawEntry<'_>>> {
        let (header, data) = self.entries.pop_front()?;
        Some(Ok(RawEntry {
            header,
            content: Box::new(Cursor::new(data)),
        }))
    }
}

/// Scratch directory owned by the invoking user.
pub struct Scratch {
    pub dir: tempfile::TempDir,
}

impl Scratch {
    pub fn new() -> Self {
        Self {
            dir: tempfile::Builder::new().prefix("strata-test-").tempdir().unwrap(),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn uid(&self) -> u32 {
        self.root().metadata().unwrap().uid()
    }

    pub fn gid(&self) -> u32 {
        self.root().metadata().unwrap().gid()
    }

    /// Options owning everything by the user running the test.
    pub fn options(&self) -> ExtractOptions {
        ExtractOptions::default().owner(self.uid(), self.gid())
    }

    pub fn read(&self, rel: &str) -> String {
        std::fs::read_to_string(self.root().join(rel)).unwrap()
    }

    pub fn exists(&self, rel: &str) -> bool {
        self.root().join(rel).symlink_metadata().is_ok()
    }

    /// Permission bits of `rel`, following symlinks.
    pub fn mode(&self, rel: &str) -> u32 {
        let meta = self.root().join(rel).metadata().unwrap();
        meta.permissions().mode() & 0o7777
    }

    pub fn link(&self, rel: &str) -> std::path::PathBuf {
        std::fs::read_link(self.root().join(rel)).unwrap()
    }
}
