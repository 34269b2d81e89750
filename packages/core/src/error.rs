//! Error types for river declarations.

use thiserror::Error;

use crate::path::{Path, PathError};

/// Integer code for a malformed path.
pub const ERR_INVALID: i32 = 1;
/// Integer code for a path that must exist but doesn't.
pub const ERR_NOTFOUND: i32 = 2;
/// Integer code for a re-declared channel or an overlapping lock.
pub const ERR_DUPE: i32 = 3;
/// Integer code for `build()` called on a sub-builder.
pub const ERR_NOTROOT: i32 = 4;

/// Errors returned by the builder.
///
/// None of these are fatal: every failing call leaves the declaration tree in
/// the state it was in before the call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The path failed tokenization or character validation.
    #[error("invalid path: {0}")]
    Invalid(#[from] PathError),

    /// The path must already be declared for this operation.
    #[error("path not found: {path}")]
    NotFound { path: Path },

    /// A channel is already declared at this path.
    #[error("channel already declared at {path}")]
    DuplicateChannel { path: Path },

    /// The subtree at this path, or one of its ancestors, already has a lock.
    #[error("lock already covers {path}")]
    LockConflict { path: Path },

    /// Only the root builder can build a river.
    #[error("build called on a sub-builder")]
    NotRoot,
}

impl Error {
    /// The integer error code for this error.
    ///
    /// Zero is reserved for success and never returned.
    pub fn code(&self) -> i32 {
        match self {
            Error::Invalid(_) => ERR_INVALID,
            Error::NotFound { .. } => ERR_NOTFOUND,
            Error::DuplicateChannel { .. } | Error::LockConflict { .. } => ERR_DUPE,
            Error::NotRoot => ERR_NOTROOT,
        }
    }
}

/// Result type alias for builder operations.
pub type Result<T> = std::result::Result<T, Error>;
