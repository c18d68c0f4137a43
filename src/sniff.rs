//! Validity prechecker: the cheap MZ magic gate in front of full parsing.
//!
//! A negative answer is a classification ("not PE"), not an error: missing
//! files, permission errors and empty files all map to `false`.

use std::path::Path;

use crate::io::read_prefix;

/// The DOS "MZ" magic, the first two bytes of every PE image.
pub const MZ_MAGIC: [u8; 2] = *b"MZ";

/// True iff the buffer starts with the MZ magic.
#[inline]
pub fn is_pe_bytes(data: &[u8]) -> bool {
    data.len() >= 2 && data[..2] == MZ_MAGIC
}

/// True iff the file at `path` starts with the MZ magic.
///
/// Reads at most two bytes. Any read failure is `false`.
pub fn is_pe_path<P: AsRef<Path>>(path: P) -> bool {
    read_prefix(path, MZ_MAGIC.len())
        .map(|prefix| is_pe_bytes(&prefix))
        .unwrap_or(false)
}
