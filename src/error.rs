//! Crate-level error taxonomy.
//!
//! Only whole-extraction failures live here. Damage inside an individual
//! sub-structure (one section slice, one resource leaf, one import entry)
//! is never an error at this level: the offending entry is excluded from
//! the aggregates and extraction continues.

use std::path::PathBuf;

use thiserror::Error;

use crate::pe::PeError;

/// Errors that fail an extraction as a unit.
#[derive(Debug, Error)]
pub enum Error {
    /// The input path does not resolve to a readable file (missing,
    /// permission denied, or rejected by the I/O limits).
    #[error("cannot read {path}: {source}")]
    NotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The PE header chain could not be established.
    #[error("malformed PE image: {0}")]
    Malformed(#[from] PeError),

    /// Anything not anticipated above, preserved with context.
    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;
