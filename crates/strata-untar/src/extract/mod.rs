use std::io::Read;
use std::path::{Path, PathBuf};

use strata_fs::{Owner, PermissionMode};
use tracing::{debug, info, warn};

use crate::entry::{EntryHeader, EntryKind};
use crate::error::{Error, Result, UnsafeReason};
use crate::format::{Compression, sniff};
use crate::handler::HandlerOutcome;
use crate::options::ExtractOptions;
use crate::owner::OwnerMapper;
use crate::resolve::{LinkResolver, absolutize};
use crate::sanitize::{clamp_relative, validate_link_target, validate_name};
use crate::source::{EntrySource, RawEntry, TarSource};

mod create;

/// Summary of a successful extraction.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExtractReport {
    /// Entries read from the archive.
    pub entries: u64,
    /// Entries dropped by the whitelist or because special devices are skipped.
    pub skipped: u64,
    /// Entries claimed by a custom handler.
    pub handled: u64,
    pub bytes_written: u64,
}

/// One extraction session: options, ownership mapper and resolved-link cache.
///
/// A session processes a single archive, strictly in archive order, and stops
/// at the first error.
pub struct Untar {
    target: PathBuf,
    options: ExtractOptions,
    owners: OwnerMapper,
    resolver: LinkResolver,
    implicit_owner: Option<Owner>,
    report: ExtractReport,
}

impl Untar {
    pub fn new(target: impl AsRef<Path>, options: ExtractOptions) -> Result<Self> {
        let target = absolutize(target.as_ref())?;
        let absolute_root = match &options.absolute_root {
            Some(root) => absolutize(root)?,
            None => target.clone(),
        };

        Ok(Self {
            owners: options.owner_mapper_for_session(),
            resolver: LinkResolver::new(target.clone(), absolute_root),
            target,
            options,
            implicit_owner: None,
            report: ExtractReport::default(),
        })
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Decompress `reader` as configured and extract the tar stream it carries.
    pub fn extract<R: Read>(self, reader: R) -> Result<ExtractReport> {
        match self.options.compression {
            Compression::Detect => {
                let (compression, reader) = sniff(reader)?;
                debug!(%compression, "detected archive compression");
                self.extract_decoded(compression, reader)
            }
            compression => self.extract_decoded(compression, reader),
        }
    }

    fn extract_decoded<R: Read>(
        self,
        compression: Compression,
        reader: R,
    ) -> Result<ExtractReport> {
        let mut archive = tar::Archive::new(compression.decoder(reader)?);
        let mut source = TarSource::new(&mut archive)?;
        self.extract_from_source(&mut source)
    }

    /// Extract every entry `source` yields.
    pub fn extract_from_source<S: EntrySource>(mut self, source: &mut S) -> Result<ExtractReport> {
        info!(
            target_dir = %self.target.display(),
            absolute_root = %self.resolver.absolute_root().display(),
            "extracting archive"
        );
        strata_fs::create_dir_all(&self.target, PermissionMode::Directory.bits())?;

        while let Some(entry) = source.next_entry() {
            self.report.entries += 1;
            self.process_entry(entry?)?;
        }

        info!(
            entries = self.report.entries,
            skipped = self.report.skipped,
            handled = self.report.handled,
            bytes = self.report.bytes_written,
            "extraction finished"
        );
        Ok(self.report)
    }

    fn process_entry(&mut self, entry: RawEntry<'_>) -> Result<()> {
        let RawEntry {
            mut header,
            mut content,
        } = entry;

        validate_name(&header.path)?;
        if matches!(header.kind, EntryKind::Symlink | EntryKind::Hardlink) {
            validate_link_target(&header.path, header.link_target())?;
        }

        if !self.options.whitelist.allows(&header.path, header.kind) {
            debug!(path = %header.path.display(), "not in whitelist, skipping");
            self.report.skipped += 1;
            return Ok(());
        }

        let destination = self.destination(&header.path)?;
        if header.kind != EntryKind::Directory && self.resolver.is_root_path(&destination) {
            return Err(Error::unsafe_path(&header.path, UnsafeReason::TargetRoot));
        }
        strata_fs::check_path_len(&destination)?;

        self.clear(&destination, header.kind)?;

        let owner = self.owners.map(&header.path, header.uid, header.gid)?;
        header.uid = owner.uid;
        header.gid = owner.gid;

        for handler in &self.options.handlers {
            let body: Option<&mut dyn Read> = match header.kind {
                EntryKind::File => Some(content.as_mut()),
                _ => None,
            };
            if handler
                .handle(&self.target, &header, body)
                .map_err(Error::Handler)?
                == HandlerOutcome::Handled
            {
                debug!(path = %header.path.display(), "entry claimed by custom handler");
                self.report.handled += 1;
                return Ok(());
            }
        }

        debug!(
            path = %header.path.display(),
            kind = ?header.kind,
            destination = %destination.display(),
            "extracting entry"
        );

        match header.kind {
            EntryKind::Directory => self.create_directory(&header, &destination, owner),
            EntryKind::Symlink => self.create_symlink(&header, &destination, owner),
            EntryKind::Hardlink => self.create_hardlink(&header, &destination),
            EntryKind::File => self.create_file(&header, &destination, owner, content.as_mut()),
            EntryKind::CharDevice | EntryKind::BlockDevice | EntryKind::Fifo => {
                self.create_node(&header, &destination, owner)
            }
            EntryKind::Unknown(flag) => Err(Error::UnrecognizedEntryType {
                path: header.path.clone(),
                flag,
            }),
        }
    }

    /// Where `name` lands on disk: its parent resolved, its base name appended.
    fn destination(&mut self, name: &Path) -> Result<PathBuf> {
        let relative = clamp_relative(name);
        let Some(base) = relative.file_name() else {
            return Ok(self.target.clone());
        };
        let parent = self.target.join(relative.parent().unwrap_or(Path::new("")));
        Ok(self.resolve_dir(&parent)?.join(base))
    }

    /// Where an already extracted `name` lives, without creating anything.
    fn existing(&self, name: &Path) -> Result<PathBuf> {
        let relative = clamp_relative(name);
        let Some(base) = relative.file_name() else {
            return Ok(self.target.clone());
        };
        let parent = self.target.join(relative.parent().unwrap_or(Path::new("")));
        Ok(self.resolver.lookup(&parent)?.join(base))
    }

    fn resolve_dir(&mut self, dir: &Path) -> Result<PathBuf> {
        let Self {
            resolver,
            owners,
            implicit_owner,
            ..
        } = self;

        resolver.resolve(dir, &mut |created| {
            let owner = match *implicit_owner {
                Some(owner) => owner,
                None => *implicit_owner.insert(owners.implicit(created)?),
            };
            if let Err(e) = strata_fs::chown(created, owner) {
                warn!(
                    dir = %created.display(),
                    error = %e,
                    "failed to set owner of implicit directory"
                );
            }
            Ok(())
        })
    }

    /// Make room for an entry at `path`, keeping an existing directory for directory entries.
    fn clear(&mut self, path: &Path, kind: EntryKind) -> Result<()> {
        if kind == EntryKind::Directory {
            if strata_fs::remove_unless_dir(path)? {
                return Ok(());
            }
        } else {
            strata_fs::remove_all(path)?;
        }
        self.resolver.forget(path);
        Ok(())
    }

    fn permissions(&self, header: &EntryHeader, default: PermissionMode) -> PermissionMode {
        if self.options.preserve_permissions {
            PermissionMode::custom(header.permissions())
                .with_mask(self.options.included_permission_mask)
        } else {
            default
        }
    }
}

/// Extract a tar stream into `target` with the given options.
pub fn extract<R: Read>(
    reader: R,
    target: impl AsRef<Path>,
    options: &ExtractOptions,
) -> Result<ExtractReport> {
    Untar::new(target, options.clone())?.extract(reader)
}
