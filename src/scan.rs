//! Batch scanner.
//!
//! Walks directories, gates each file through the MZ prechecker, extracts
//! features in parallel, and optionally consults a classifier handle.
//! Per-file failures are captured in the record and never abort the batch;
//! record order follows collection order so reports are deterministic.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use chrono::Utc;
use rayon::prelude::*;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::classify::ClassifierHandle;
use crate::config::ScanConfig;
use crate::error::{Error, Result};
use crate::features::Extractor;
use crate::io::load_file;
use crate::report::{ScanOutcome, ScanRecord, ScanReport};
use crate::sniff::is_pe_bytes;

/// Atomic progress counters shared with the caller. No locks: a UI thread
/// polls these while workers update them.
#[derive(Debug, Default)]
pub struct ScanProgress {
    pub total_files: AtomicUsize,
    pub scanned_files: AtomicUsize,
    pub not_pe_count: AtomicUsize,
    pub failed_count: AtomicUsize,
    /// Set by the caller to stop the scan between files.
    pub cancel: AtomicBool,
}

impl ScanProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }
}

/// Collect candidate files under the given roots, in walk order.
///
/// Unreadable entries are skipped with a warning rather than failing the
/// collection.
pub fn collect_files(roots: &[PathBuf], config: &ScanConfig) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for root in roots {
        if root.is_file() {
            files.push(root.clone());
            continue;
        }

        for entry in WalkDir::new(root)
            .follow_links(config.follow_symlinks)
            .sort_by_file_name()
        {
            match entry {
                Ok(entry) => {
                    if entry.file_type().is_file() {
                        files.push(entry.into_path());
                    }
                }
                Err(e) => {
                    warn!(root = %root.display(), error = %e, "skipping unreadable entry");
                }
            }
        }
    }

    files
}

/// Scan one file: load, precheck, extract, optionally classify.
fn scan_file(
    path: &Path,
    extractor: &Extractor,
    classifier: Option<&ClassifierHandle>,
) -> ScanRecord {
    let data = match load_file(path, &extractor.config().io) {
        Ok(data) => data,
        Err(e) => {
            return ScanRecord {
                path: path.to_path_buf(),
                sha256: None,
                outcome: ScanOutcome::Failed {
                    error: Error::NotFound {
                        path: path.to_path_buf(),
                        source: e,
                    }
                    .to_string(),
                },
            }
        }
    };

    let sha256 = Some(hex::encode(Sha256::digest(&data)));

    if !is_pe_bytes(&data) {
        debug!(path = %path.display(), "prechecker rejected file");
        return ScanRecord {
            path: path.to_path_buf(),
            sha256,
            outcome: ScanOutcome::NotPe,
        };
    }

    let features = match extractor.extract_bytes(&data) {
        Ok(features) => features,
        Err(e) => {
            return ScanRecord {
                path: path.to_path_buf(),
                sha256,
                outcome: ScanOutcome::Failed {
                    error: e.to_string(),
                },
            }
        }
    };

    let outcome = match classifier {
        Some(handle) => match handle.predict(&features) {
            Ok(label) => ScanOutcome::Labeled { label, features },
            Err(e) => ScanOutcome::Failed {
                error: e.to_string(),
            },
        },
        None => ScanOutcome::Features { features },
    };

    ScanRecord {
        path: path.to_path_buf(),
        sha256,
        outcome,
    }
}

/// Run a batch scan over the given roots. Blocking; call from a worker
/// thread when driving a UI.
pub fn run_scan(
    roots: &[PathBuf],
    config: &ScanConfig,
    classifier: Option<&ClassifierHandle>,
    progress: &ScanProgress,
) -> Result<ScanReport> {
    config.validate().map_err(Error::Internal)?;
    let started_at = Utc::now();

    let extractor = Extractor::new(config.extractor.clone());
    let files = collect_files(roots, config);
    progress.total_files.store(files.len(), Ordering::Relaxed);

    let process = |path: &PathBuf| -> Option<ScanRecord> {
        if progress.cancel.load(Ordering::Relaxed) {
            return None;
        }

        let record = scan_file(path, &extractor, classifier);
        match record.outcome {
            ScanOutcome::NotPe => {
                progress.not_pe_count.fetch_add(1, Ordering::Relaxed);
            }
            ScanOutcome::Failed { .. } => {
                progress.failed_count.fetch_add(1, Ordering::Relaxed);
            }
            _ => {}
        }
        progress.scanned_files.fetch_add(1, Ordering::Relaxed);
        Some(record)
    };

    // Indexed filter_map keeps records in collection order regardless of
    // which worker finishes first.
    let records: Vec<ScanRecord> = match config.threads {
        Some(threads) => {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .build()
                .map_err(|e| Error::Internal(e.to_string()))?;
            pool.install(|| files.par_iter().filter_map(process).collect())
        }
        None => files.par_iter().filter_map(process).collect(),
    };

    Ok(ScanReport::new(records, started_at))
}
