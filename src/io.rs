//! Bounded file loading.
//!
//! Every path-based entry point goes through [`load_file`], which rejects
//! files larger than the configured cap before reading and caps the read
//! itself, so a file growing between the size check and the read cannot
//! blow the memory bound.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Resource limits for file loading.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IoLimits {
    /// Hard cap on input file size in bytes.
    pub max_file_size: u64,
}

impl Default for IoLimits {
    fn default() -> Self {
        Self {
            max_file_size: 100 * 1024 * 1024, // 100MB
        }
    }
}

/// A reader that stops returning data after `limit` bytes.
struct BoundedReader<R> {
    inner: R,
    bytes_read: u64,
    limit: u64,
}

impl<R: Read> BoundedReader<R> {
    fn new(reader: R, limit: u64) -> Self {
        Self {
            inner: reader,
            bytes_read: 0,
            limit,
        }
    }
}

impl<R: Read> Read for BoundedReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.bytes_read >= self.limit {
            return Ok(0);
        }

        let remaining = self.limit - self.bytes_read;
        let max_to_read = std::cmp::min(buf.len() as u64, remaining) as usize;
        let n = self.inner.read(&mut buf[..max_to_read])?;
        self.bytes_read += n as u64;
        Ok(n)
    }
}

/// Load an entire file under the given limits.
pub fn load_file<P: AsRef<Path>>(path: P, limits: &IoLimits) -> io::Result<Vec<u8>> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let size = file.metadata()?.len();

    if size > limits.max_file_size {
        warn!(
            path = %path.display(),
            size,
            limit = limits.max_file_size,
            "rejecting oversized file"
        );
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!(
                "file too large: {} bytes (limit: {})",
                size, limits.max_file_size
            ),
        ));
    }

    debug!(path = %path.display(), size, "loading file");

    let mut reader = BoundedReader::new(file, limits.max_file_size);
    let mut data = Vec::with_capacity(size as usize);
    reader.read_to_end(&mut data)?;
    Ok(data)
}

/// Read up to `len` bytes from the start of a file.
///
/// Used by the prechecker; never reads more than `len` even when the file
/// is larger.
pub fn read_prefix<P: AsRef<Path>>(path: P, len: usize) -> io::Result<Vec<u8>> {
    let file = File::open(path)?;
    let mut reader = BoundedReader::new(file, len as u64);
    let mut data = Vec::with_capacity(len);
    reader.read_to_end(&mut data)?;
    Ok(data)
}
