use std::io::{self, Read};

use crate::entry::{EntryHeader, EntryKind};
use crate::error::{Error, Result};

/// One entry pulled from an archive: its header and its content stream.
///
/// Only regular files carry meaningful content; the stream yields the entry's
/// data exactly once.
pub struct RawEntry<'a> {
    pub header: EntryHeader,
    pub content: Box<dyn Read + 'a>,
}

/// Archive-specific producer of entries, consumed in archive order.
pub trait EntrySource {
    fn next_entry(&mut self) -> Option<Result<RawEntry<'_>>>;
}

/// [`EntrySource`] over a `tar` archive.
pub struct TarSource<'a, R: 'a + Read> {
    entries: tar::Entries<'a, R>,
}

impl<'a, R: Read + 'a> TarSource<'a, R> {
    pub fn new(archive: &'a mut tar::Archive<R>) -> Result<Self> {
        Ok(Self {
            entries: archive.entries().map_err(Error::Archive)?,
        })
    }
}

impl<'a, R: Read + 'a> EntrySource for TarSource<'a, R> {
    fn next_entry(&mut self) -> Option<Result<RawEntry<'_>>> {
        loop {
            let entry = match self.entries.next()? {
                Ok(entry) => entry,
                Err(e) => return Some(Err(Error::Archive(e))),
            };

            // pax global headers only carry defaults for later records
            if entry.header().entry_type() == tar::EntryType::XGlobalHeader {
                continue;
            }

            return Some(read_header(&entry).map(|header| RawEntry {
                header,
                content: Box::new(entry),
            }));
        }
    }
}

fn read_header<R: Read>(entry: &tar::Entry<'_, R>) -> Result<EntryHeader> {
    let header = entry.header();
    let kind = EntryKind::from_tar(header.entry_type());

    let path = entry.path().map_err(Error::Archive)?.into_owned();
    let link_target = entry
        .link_name()
        .map_err(Error::Archive)?
        .map(|target| target.into_owned());

    let (device_major, device_minor) = if kind.is_special() {
        (
            header.device_major().map_err(Error::Archive)?.unwrap_or(0),
            header.device_minor().map_err(Error::Archive)?.unwrap_or(0),
        )
    } else {
        (0, 0)
    };

    Ok(EntryHeader {
        path,
        kind,
        link_target,
        size: entry.size(),
        mode: header.mode().map_err(Error::Archive)?,
        uid: narrow_id(header.uid().map_err(Error::Archive)?)?,
        gid: narrow_id(header.gid().map_err(Error::Archive)?)?,
        device_major,
        device_minor,
    })
}

fn narrow_id(id: u64) -> Result<u32> {
    u32::try_from(id).map_err(|_| {
        Error::Archive(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("owner id {id} does not fit in 32 bits"),
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build() -> Vec<u8> {
        let mut builder = tar::Builder::new(Vec::new());

        let mut dir = tar::Header::new_gnu();
        dir.set_path("usr/").unwrap();
        dir.set_entry_type(tar::EntryType::Directory);
        dir.set_mode(0o755);
        dir.set_uid(0);
        dir.set_gid(0);
        dir.set_size(0);
        dir.set_cksum();
        builder.append(&dir, io::empty()).unwrap();

        let mut file = tar::Header::new_gnu();
        file.set_path("usr/hello").unwrap();
        file.set_mode(0o4755);
        file.set_uid(1000);
        file.set_gid(100);
        file.set_size(5);
        file.set_cksum();
        builder.append(&file, &b"hello"[..]).unwrap();

        let mut link = tar::Header::new_gnu();
        link.set_path("usr/hi").unwrap();
        link.set_entry_type(tar::EntryType::Symlink);
        link.set_link_name("hello").unwrap();
        link.set_mode(0o777);
        link.set_uid(0);
        link.set_gid(0);
        link.set_size(0);
        link.set_cksum();
        builder.append(&link, io::empty()).unwrap();

        builder.into_inner().unwrap()
    }

    #[test]
    fn tar_source_yields_headers_in_order() {
        let data = build();
        let mut archive = tar::Archive::new(&data[..]);
        let mut source = TarSource::new(&mut archive).unwrap();

        let dir = source.next_entry().unwrap().unwrap();
        assert_eq!(dir.header.kind, EntryKind::Directory);
        drop(dir);

        let mut file = source.next_entry().unwrap().unwrap();
        assert_eq!(file.header.path, std::path::PathBuf::from("usr/hello"));
        assert_eq!(file.header.size, 5);
        assert_eq!(file.header.uid, 1000);
        assert_eq!(file.header.gid, 100);
        assert!(file.header.has_setuid());
        let mut content = String::new();
        file.content.read_to_string(&mut content).unwrap();
        assert_eq!(content, "hello");
        drop(file);

        let link = source.next_entry().unwrap().unwrap();
        assert_eq!(link.header.kind, EntryKind::Symlink);
        assert_eq!(
            link.header.link_target(),
            Some(std::path::Path::new("hello"))
        );
        drop(link);

        assert!(source.next_entry().is_none());
    }

    #[test]
    fn narrow_id_rejects_large_ids() {
        assert_eq!(narrow_id(65534).unwrap(), 65534);
        assert!(matches!(
            narrow_id(u64::from(u32::MAX) + 1),
            Err(Error::Archive(_))
        ));
    }
}
