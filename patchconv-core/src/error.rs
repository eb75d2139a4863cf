use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Fatal conditions that abort converting a descriptor or a derive run.
///
/// Recoverable conditions met while encoding (an offset outside every
/// section, a `number` entry) are reported through [`crate::Warning`]
/// instead, so one bad entry never discards the rest of a conversion.
#[derive(Debug, Error)]
pub enum PatchError {
    /// No target binary could be located for a descriptor.
    #[error("target file \"{}\" does not exist", .0.display())]
    MissingTarget(PathBuf),

    /// Differ inputs have different lengths.
    #[error("original and modified binaries must be the same size ({original} != {modified})")]
    SizeMismatch { original: usize, modified: usize },

    /// Differ inputs are byte-for-byte identical.
    #[error("no differences found")]
    NoDifferences,

    /// Descriptor or entry with a missing or wrongly shaped field.
    #[error("malformed entry \"{entry}\": {reason}")]
    MalformedEntry { entry: String, reason: String },

    /// Input is not a PE image goblin can read.
    #[error("invalid PE image: {0}")]
    InvalidImage(String),

    /// Diff position that does not fit a 32-bit file offset.
    #[error("offset {0:#x} exceeds the 32-bit PE range")]
    OffsetOverflow(usize),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl PatchError {
    pub(crate) fn malformed(entry: impl Into<String>, reason: impl Into<String>) -> Self {
        PatchError::MalformedEntry {
            entry: entry.into(),
            reason: reason.into(),
        }
    }
}

impl From<goblin::error::Error> for PatchError {
    fn from(err: goblin::error::Error) -> Self {
        PatchError::InvalidImage(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PatchError>;
