use std::error::Error as StdError;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use strata_fs::Owner;

use crate::error::{Error, Result};

/// Error returned by a caller-supplied id mapping.
pub type MappingError = Box<dyn StdError + Send + Sync>;

/// Translates an archive id into a host id.
pub trait IdMapper: Send + Sync {
    fn map_id(&self, id: u32) -> std::result::Result<u32, MappingError>;
}

impl<F> IdMapper for F
where
    F: Fn(u32) -> std::result::Result<u32, MappingError> + Send + Sync,
{
    fn map_id(&self, id: u32) -> std::result::Result<u32, MappingError> {
        self(id)
    }
}

/// Keeps archive ids as they are.
#[derive(Clone, Copy, Debug, Default)]
pub struct Identity;

impl IdMapper for Identity {
    fn map_id(&self, id: u32) -> std::result::Result<u32, MappingError> {
        Ok(id)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IdKind {
    Uid,
    Gid,
}

impl fmt::Display for IdKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Uid => "uid",
            Self::Gid => "gid",
        })
    }
}

/// Contiguous id range, written `inside:outside:count` as in user namespace maps.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IdRange {
    pub inside: u32,
    pub outside: u32,
    pub count: u32,
}

impl IdRange {
    fn map(&self, id: u32) -> Option<u32> {
        let offset = id.checked_sub(self.inside)?;
        if offset < self.count {
            self.outside.checked_add(offset)
        } else {
            None
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("invalid id range '{0}': expected inside:outside:count")]
pub struct ParseIdRangeError(String);

impl FromStr for IdRange {
    type Err = ParseIdRangeError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let invalid = || ParseIdRangeError(s.to_string());
        let mut parts = s.split(':').map(|part| part.trim().parse::<u32>());
        let (Some(Ok(inside)), Some(Ok(outside)), Some(Ok(count)), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(invalid());
        };
        if count == 0 {
            return Err(invalid());
        }
        Ok(Self {
            inside,
            outside,
            count,
        })
    }
}

#[derive(Debug, thiserror::Error)]
#[error("id {0} is not covered by any mapping range")]
pub struct UnmappedId(pub u32);

/// Range based mapper; ids outside every range are an error.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IdMap {
    ranges: Vec<IdRange>,
}

impl IdMap {
    pub fn new(ranges: impl IntoIterator<Item = IdRange>) -> Self {
        Self {
            ranges: ranges.into_iter().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }
}

impl IdMapper for IdMap {
    fn map_id(&self, id: u32) -> std::result::Result<u32, MappingError> {
        self.ranges
            .iter()
            .find_map(|range| range.map(id))
            .ok_or_else(|| UnmappedId(id).into())
    }
}

/// Decides the host owner of every object an extraction creates.
#[derive(Clone)]
pub struct OwnerMapper {
    preserve: bool,
    default: Owner,
    owner_mapping: Arc<dyn IdMapper>,
    group_mapping: Arc<dyn IdMapper>,
}

impl OwnerMapper {
    pub fn new(
        preserve: bool,
        default: Owner,
        owner_mapping: Arc<dyn IdMapper>,
        group_mapping: Arc<dyn IdMapper>,
    ) -> Self {
        Self {
            preserve,
            default,
            owner_mapping,
            group_mapping,
        }
    }

    /// Host owner for an entry carrying the archive ids `uid` and `gid`.
    ///
    /// Each mapping is consulted exactly once; without owner preservation the
    /// fixed default pair is returned and no mapping runs.
    pub fn map(&self, path: &Path, uid: u32, gid: u32) -> Result<Owner> {
        if !self.preserve {
            return Ok(self.default);
        }

        let uid = self
            .owner_mapping
            .map_id(uid)
            .map_err(|source| Error::OwnerMappingFailed {
                path: path.to_path_buf(),
                kind: IdKind::Uid,
                id: uid,
                source,
            })?;
        let gid = self
            .group_mapping
            .map_id(gid)
            .map_err(|source| Error::OwnerMappingFailed {
                path: path.to_path_buf(),
                kind: IdKind::Gid,
                id: gid,
                source,
            })?;

        Ok(Owner::new(uid, gid))
    }

    /// Owner for directories created on demand, which carry no header.
    pub fn implicit(&self, path: &Path) -> Result<Owner> {
        self.map(path, self.default.uid, self.default.gid)
    }
}

impl fmt::Debug for OwnerMapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OwnerMapper")
            .field("preserve", &self.preserve)
            .field("default", &self.default)
            .finish_non_exhaustive()
    }
}
