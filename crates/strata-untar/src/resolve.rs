//! Maps directories named by the archive onto real directories on disk.
//!
//! Symlinks met inside the extraction tree are followed, but their targets are
//! re-anchored under the target directory or the configured absolute root, so
//! that no resolved path ever leaves the sandbox. Resolutions are cached per
//! path component: consecutive entries that share a directory prefix only
//! resolve the components that differ.

use std::collections::VecDeque;
use std::ffi::OsString;
use std::fs::{self, Metadata};
use std::io;
use std::mem;
use std::path::{Component, Path, PathBuf};

use strata_fs::{Op, PermissionMode};
use tracing::trace;

use crate::error::{Error, Result, UnsafeReason};
use crate::sanitize::clamp_relative;

/// Symlinks followed while resolving one component before giving up.
pub const MAX_LINK_HOPS: usize = 40;

#[derive(Clone, Debug, PartialEq, Eq)]
struct ResolvedLink {
    source: OsString,
    destination: PathBuf,
}

#[derive(Debug)]
pub struct LinkResolver {
    target: PathBuf,
    absolute_root: PathBuf,
    links: Vec<ResolvedLink>,
}

impl LinkResolver {
    /// Both paths must be absolute and free of `.` and `..`.
    pub fn new(target: impl Into<PathBuf>, absolute_root: impl Into<PathBuf>) -> Self {
        Self {
            target: target.into(),
            absolute_root: absolute_root.into(),
            links: Vec::new(),
        }
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    pub fn absolute_root(&self) -> &Path {
        &self.absolute_root
    }

    /// Resolve `dir` to the directory the filesystem should actually use,
    /// creating missing directories on the way. `on_create` runs once for each
    /// directory created.
    pub fn resolve(
        &mut self,
        dir: &Path,
        on_create: &mut dyn FnMut(&Path) -> Result<()>,
    ) -> Result<PathBuf> {
        let parts = split_components(dir);

        let common = self.cached_prefix(&parts);
        if common > 0 {
            trace!(dir = %dir.display(), cached = common, "reusing resolved prefix");
        }
        self.links.truncate(common);

        let mut missing = Missing::Create(on_create);
        for part in &parts[common..] {
            let candidate = match self.links.last() {
                Some(link) => link.destination.join(part),
                None => PathBuf::from(part),
            };
            let destination = self.convert(candidate, &mut missing)?;
            self.links.push(ResolvedLink {
                source: part.clone(),
                destination,
            });
        }

        Ok(self
            .links
            .last()
            .map(|link| link.destination.clone())
            .unwrap_or_else(|| dir.to_path_buf()))
    }

    /// Resolve `dir` like [`LinkResolver::resolve`], but leave missing
    /// directories missing and the cache untouched.
    pub fn lookup(&self, dir: &Path) -> Result<PathBuf> {
        let parts = split_components(dir);
        let common = self.cached_prefix(&parts);

        let mut current = self.links[..common]
            .last()
            .map(|link| link.destination.clone());
        for part in &parts[common..] {
            let candidate = match &current {
                Some(resolved) => resolved.join(part),
                None => PathBuf::from(part),
            };
            current = Some(self.convert(candidate, &mut Missing::Keep)?);
        }

        Ok(current.unwrap_or_else(|| dir.to_path_buf()))
    }

    /// Drop cached resolutions at or below `path`, which is about to change.
    pub fn forget(&mut self, path: &Path) {
        if let Some(stale) = self
            .links
            .iter()
            .position(|link| link.destination.starts_with(path))
        {
            trace!(
                path = %path.display(),
                dropped = self.links.len() - stale,
                "invalidating resolved prefix"
            );
            self.links.truncate(stale);
        }
    }

    /// Whether `path` is the target or lies on the way from it to the
    /// absolute root. Only real directories may live there.
    pub fn is_root_path(&self, path: &Path) -> bool {
        path == self.target
            || (path.starts_with(&self.target) && self.absolute_root.starts_with(path))
    }

    fn cached_prefix(&self, parts: &[OsString]) -> usize {
        self.links
            .iter()
            .zip(parts)
            .take_while(|(link, part)| link.source == **part)
            .count()
    }

    fn is_sandboxed(&self, path: &Path) -> bool {
        strictly_inside(path, &self.target) || strictly_inside(path, &self.absolute_root)
    }

    /// Resolve one candidate path whose parent is already resolved.
    fn convert(&self, path: PathBuf, missing: &mut Missing<'_>) -> Result<PathBuf> {
        // the host prefix leading to the sandbox is taken as it is
        if !self.is_sandboxed(&path) || self.target.starts_with(&path) {
            return Ok(path);
        }

        if !self.is_symlink(&path, missing)? {
            return Ok(path);
        }

        let mut hops = 1;
        let (mut resolved, mut pending) = self.rewrite_link(&path)?;
        while let Some(part) = pending.pop_front() {
            let candidate = resolved.join(&part);
            if !self.is_symlink(&candidate, missing)? {
                resolved = candidate;
                continue;
            }

            hops += 1;
            if hops > MAX_LINK_HOPS {
                return Err(Error::SymlinkLoop { path });
            }
            let (anchor, parts) = self.rewrite_link(&candidate)?;
            resolved = anchor;
            pending = parts.into_iter().chain(pending).collect();
        }

        Ok(resolved)
    }

    /// Read the symlink at `link` and re-anchor its target inside the sandbox.
    ///
    /// Absolute targets hang off the absolute root. Relative targets are taken
    /// from the link's parent and may not climb above the root containing it.
    fn rewrite_link(&self, link: &Path) -> Result<(PathBuf, VecDeque<OsString>)> {
        let target = strata_fs::read_link(link)?;
        let parent = link.parent().unwrap_or(link);

        let (anchor, relative) = if target.has_root() {
            (&self.absolute_root, target.clone())
        } else if let Ok(base) = parent.strip_prefix(&self.absolute_root) {
            (&self.absolute_root, base.join(&target))
        } else if let Ok(base) = parent.strip_prefix(&self.target) {
            (&self.target, base.join(&target))
        } else {
            (&self.target, target.clone())
        };
        check_anchor(anchor)?;

        let parts: VecDeque<OsString> = clamp_relative(&relative)
            .components()
            .map(|component| component.as_os_str().to_os_string())
            .collect();
        trace!(
            link = %link.display(),
            target = %target.display(),
            anchor = %anchor.display(),
            "rewriting symlink"
        );

        Ok((anchor.clone(), parts))
    }

    /// lstat `path`, creating it first when it is missing and creation is allowed.
    fn is_symlink(&self, path: &Path, missing: &mut Missing<'_>) -> Result<bool> {
        if let Some(metadata) = lstat(path)? {
            return Ok(metadata.file_type().is_symlink());
        }

        match missing {
            Missing::Create(on_create) => {
                self.create_missing(path, &mut **on_create)?;
                let created = lstat(path)?;
                Ok(created.is_some_and(|meta| meta.file_type().is_symlink()))
            }
            Missing::Keep => Ok(false),
        }
    }

    fn create_missing(
        &self,
        path: &Path,
        on_create: &mut dyn FnMut(&Path) -> Result<()>,
    ) -> Result<()> {
        let mut missing = Vec::new();
        let mut current = path;
        while lstat(current)?.is_none() {
            missing.push(current);
            match current.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => current = parent,
                _ => break,
            }
        }

        for dir in missing.into_iter().rev() {
            if strata_fs::create_dir(dir, PermissionMode::Directory.bits())? {
                trace!(dir = %dir.display(), "created missing directory");
                on_create(dir)?;
            }
        }
        Ok(())
    }
}

/// What to do with a path component that does not exist yet.
enum Missing<'a> {
    Create(&'a mut dyn FnMut(&Path) -> Result<()>),
    Keep,
}

fn lstat(path: &Path) -> Result<Option<Metadata>> {
    match fs::symlink_metadata(path) {
        Ok(metadata) => Ok(Some(metadata)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(strata_fs::Error::io(Op::Stat, path, e).into()),
    }
}

/// A rewritten link is joined onto `anchor`, so the anchor itself must not
/// lead anywhere else. A missing anchor is created on demand like any other
/// directory.
fn check_anchor(anchor: &Path) -> Result<()> {
    match lstat(anchor)? {
        Some(metadata) if !metadata.is_dir() => {
            Err(Error::unsafe_path(anchor, UnsafeReason::RootNotDirectory))
        }
        _ => Ok(()),
    }
}

fn strictly_inside(path: &Path, root: &Path) -> bool {
    path != root && path.starts_with(root)
}

/// Split into components, keeping a volume prefix and the root together.
fn split_components(path: &Path) -> Vec<OsString> {
    let mut parts = Vec::new();
    let mut root = OsString::new();
    for component in path.components() {
        match component {
            Component::Prefix(prefix) => root.push(prefix.as_os_str()),
            Component::RootDir => {
                root.push(component.as_os_str());
                parts.push(mem::take(&mut root));
            }
            Component::CurDir => {}
            Component::ParentDir | Component::Normal(_) => {
                if !root.is_empty() {
                    parts.push(mem::take(&mut root));
                }
                parts.push(component.as_os_str().to_os_string());
            }
        }
    }
    if !root.is_empty() {
        parts.push(root);
    }
    parts
}

/// Absolute, lexically cleaned form of `path`.
pub fn absolutize(path: &Path) -> Result<PathBuf> {
    let absolute =
        std::path::absolute(path).map_err(|e| strata_fs::Error::io(Op::Absolutize, path, e))?;
    let mut cleaned = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::ParentDir => {
                if let Some(Component::Normal(_)) = cleaned.components().next_back() {
                    cleaned.pop();
                }
            }
            Component::CurDir => {}
            other => cleaned.push(other.as_os_str()),
        }
    }
    Ok(cleaned)
}
