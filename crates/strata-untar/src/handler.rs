use std::error::Error as StdError;
use std::io::Read;
use std::path::Path;

use crate::entry::EntryHeader;

/// Error raised by a custom handler; surfaced to the caller unchanged.
pub type HandlerError = Box<dyn StdError + Send + Sync>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HandlerOutcome {
    /// The handler took care of the entry; default processing is skipped.
    Handled,
    /// Let the next handler, or the default processing, deal with it.
    Defer,
}

/// Caller-supplied interceptor consulted before the default processing of an entry.
///
/// `root` is the extraction target. `content` is only present for regular
/// files; a handler that defers must leave it unread.
pub trait EntryHandler: Send + Sync {
    fn handle(
        &self,
        root: &Path,
        header: &EntryHeader,
        content: Option<&mut dyn Read>,
    ) -> Result<HandlerOutcome, HandlerError>;
}

impl<F> EntryHandler for F
where
    F: Fn(&Path, &EntryHeader, Option<&mut dyn Read>) -> Result<HandlerOutcome, HandlerError>
        + Send
        + Sync,
{
    fn handle(
        &self,
        root: &Path,
        header: &EntryHeader,
        content: Option<&mut dyn Read>,
    ) -> Result<HandlerOutcome, HandlerError> {
        self(root, header, content)
    }
}
