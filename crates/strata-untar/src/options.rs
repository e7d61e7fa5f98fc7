use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use strata_fs::Owner;

use crate::entry::EntryHeader;
use crate::format::Compression;
use crate::handler::{EntryHandler, HandlerError, HandlerOutcome};
use crate::owner::{IdMapper, Identity, MappingError, OwnerMapper};
use crate::whitelist::PathWhitelist;

/// Settings for one extraction, fixed before the first entry is read.
#[derive(Clone)]
pub struct ExtractOptions {
    /// Anchor for absolute symlink targets. Defaults to the target directory.
    pub absolute_root: Option<PathBuf>,
    pub compression: Compression,
    pub preserve_permissions: bool,
    pub preserve_owners: bool,
    pub skip_special_devices: bool,
    pub default_owner: Owner,
    /// Bits OR-ed into every applied mode.
    pub included_permission_mask: u32,
    pub whitelist: PathWhitelist,
    pub owner_mapping: Arc<dyn IdMapper>,
    pub group_mapping: Arc<dyn IdMapper>,
    pub handlers: Vec<Arc<dyn EntryHandler>>,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            absolute_root: None,
            compression: Compression::Detect,
            preserve_permissions: true,
            preserve_owners: false,
            skip_special_devices: false,
            default_owner: Owner::current(),
            included_permission_mask: 0,
            whitelist: PathWhitelist::default(),
            owner_mapping: Arc::new(Identity),
            group_mapping: Arc::new(Identity),
            handlers: Vec::new(),
        }
    }
}

impl ExtractOptions {
    pub fn absolute_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.absolute_root = Some(root.into());
        self
    }

    pub fn compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    pub fn preserve_permissions(mut self, preserve: bool) -> Self {
        self.preserve_permissions = preserve;
        self
    }

    pub fn preserve_owners(mut self, preserve: bool) -> Self {
        self.preserve_owners = preserve;
        self
    }

    pub fn skip_special_devices(mut self, skip: bool) -> Self {
        self.skip_special_devices = skip;
        self
    }

    pub fn owner(mut self, uid: u32, gid: u32) -> Self {
        self.default_owner = Owner::new(uid, gid);
        self
    }

    pub fn included_permission_mask(mut self, mask: u32) -> Self {
        self.included_permission_mask = mask;
        self
    }

    pub fn whitelist(mut self, whitelist: PathWhitelist) -> Self {
        self.whitelist = whitelist;
        self
    }

    pub fn owner_mapping<F>(self, mapping: F) -> Self
    where
        F: Fn(u32) -> Result<u32, MappingError> + Send + Sync + 'static,
    {
        self.owner_mapper(Arc::new(mapping))
    }

    pub fn group_mapping<F>(self, mapping: F) -> Self
    where
        F: Fn(u32) -> Result<u32, MappingError> + Send + Sync + 'static,
    {
        self.group_mapper(Arc::new(mapping))
    }

    pub fn owner_mapper(mut self, mapper: Arc<dyn IdMapper>) -> Self {
        self.owner_mapping = mapper;
        self
    }

    pub fn group_mapper(mut self, mapper: Arc<dyn IdMapper>) -> Self {
        self.group_mapping = mapper;
        self
    }

    /// Append a handler closure to the chain; handlers run in insertion order.
    pub fn handler<F>(self, handler: F) -> Self
    where
        F: Fn(&Path, &EntryHeader, Option<&mut dyn Read>) -> Result<HandlerOutcome, HandlerError>
            + Send
            + Sync
            + 'static,
    {
        self.handler_object(Arc::new(handler))
    }

    pub fn handler_object(mut self, handler: Arc<dyn EntryHandler>) -> Self {
        self.handlers.push(handler);
        self
    }

    pub(crate) fn owner_mapper_for_session(&self) -> OwnerMapper {
        OwnerMapper::new(
            self.preserve_owners,
            self.default_owner,
            self.owner_mapping.clone(),
            self.group_mapping.clone(),
        )
    }
}

impl fmt::Debug for ExtractOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractOptions")
            .field("absolute_root", &self.absolute_root)
            .field("compression", &self.compression)
            .field("preserve_permissions", &self.preserve_permissions)
            .field("preserve_owners", &self.preserve_owners)
            .field("skip_special_devices", &self.skip_special_devices)
            .field("default_owner", &self.default_owner)
            .field(
                "included_permission_mask",
                &format_args!("{:#o}", self.included_permission_mask),
            )
            .field("whitelist", &self.whitelist)
            .field("handlers", &self.handlers.len())
            .finish_non_exhaustive()
    }
}
