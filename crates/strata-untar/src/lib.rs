//! Tar extraction into an isolated root.
//!
//! Entries are validated before they touch the filesystem, directories are
//! resolved through already extracted symlinks without ever leaving the
//! target, and ownership is remapped for deployment into a container layer.
//!
//! # Architecture
//!
//! - `sanitize.rs` - Entry name and link target validation
//! - `whitelist.rs` - Optional allow-list of archive paths
//! - `resolve.rs` - Symlink-aware destination resolution with a prefix cache
//! - `owner.rs` - Archive to host id mapping
//! - `handler.rs` - Custom entry handlers
//! - `extract/` - Session state and per-type entry processing
//! - `format.rs` - Compression selection and detection
//! - `source.rs` - Entry streams over the `tar` crate

pub use entry::{EntryHeader, EntryKind};
pub use error::{Error, Result, UnsafeReason};
pub use extract::{ExtractReport, Untar, extract};
pub use format::{Compression, detect_compression};
pub use handler::{EntryHandler, HandlerError, HandlerOutcome};
pub use options::ExtractOptions;
pub use owner::{IdKind, IdMap, IdMapper, IdRange, Identity, MappingError, OwnerMapper};
pub use source::{EntrySource, RawEntry, TarSource};
pub use strata_fs::Owner;
pub use whitelist::PathWhitelist;

pub mod entry;
mod error;
pub mod extract;
pub mod format;
pub mod handler;
pub mod options;
pub mod owner;
pub mod resolve;
pub mod sanitize;
pub mod source;
pub mod whitelist;
