//! Configuration types.
//!
//! All caps an extraction or scan runs under, serde-serializable so an
//! embedding service can load them from its own config file.

use serde::{Deserialize, Serialize};

use crate::io::IoLimits;
use crate::pe::ParseOptions;

/// Configuration for a single-file extraction.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractorConfig {
    /// File loading limits.
    pub io: IoLimits,
    /// PE parsing caps.
    pub pe: ParseOptions,
}

impl ExtractorConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.io.max_file_size == 0 {
            return Err("io.max_file_size must be nonzero".to_string());
        }
        if self.pe.max_imports == 0 {
            return Err("pe.max_imports must be nonzero".to_string());
        }
        if self.pe.max_exports == 0 {
            return Err("pe.max_exports must be nonzero".to_string());
        }
        if self.pe.max_resources == 0 {
            return Err("pe.max_resources must be nonzero".to_string());
        }
        if self.pe.max_resource_depth == 0 {
            return Err("pe.max_resource_depth must be nonzero".to_string());
        }
        Ok(())
    }
}

/// Configuration for a batch scan.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Follow symlinks during directory traversal.
    pub follow_symlinks: bool,
    /// Worker count hint; None uses the default thread pool.
    pub threads: Option<usize>,
    /// Per-file extraction configuration.
    pub extractor: ExtractorConfig,
}

impl ScanConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.threads == Some(0) {
            return Err("threads must be nonzero when set".to_string());
        }
        self.extractor.validate()
    }
}
