//! Filesystem primitives for sandboxed archive extraction.
//!
//! Every fallible operation reports the [`Op`] that failed together with the
//! path it was applied to.

mod error;
pub mod ownership;
pub mod permissions;
pub mod primitives;

pub use error::{Error, Op, Result};
pub use ownership::{Owner, SpecialBits, chown, lchown};
pub use permissions::PermissionMode;
pub use primitives::*;
