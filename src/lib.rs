//! Structural PE parsing and feature extraction for malware triage.
//!
//! The crate parses Windows Portable Executable files without loading them,
//! treating every input as potentially adversarial: all reads are
//! bounds-checked, header damage fails fast, and directory damage degrades
//! to partial results instead of aborting.
//!
//! The main entry point is [`features::Extractor`], which turns PE bytes
//! into a fixed 20-field [`features::FeatureVector`] combining optional
//! header fields, Shannon-entropy statistics over sections and resources,
//! and import/export/resource counts. [`scan`] runs the extractor over
//! directory trees in parallel, and [`classify`] hosts a lazily loaded
//! predictor that maps feature vectors to labels.

pub mod classify;
pub mod config;
pub mod entropy;
pub mod error;
pub mod features;
pub mod io;
pub mod logging;
pub mod pe;
pub mod report;
pub mod scan;
pub mod sniff;

pub use config::{ExtractorConfig, ScanConfig};
pub use error::{Error, Result};
pub use features::{Extractor, FeatureVector, FEATURE_NAMES};
pub use pe::PeImage;
pub use sniff::{is_pe_bytes, is_pe_path};
