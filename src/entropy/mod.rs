//! Shannon entropy calculation and aggregation.
//!
//! This module provides the entropy primitives behind the
//! `Sections*Entropy` and `Resources*Entropy` features:
//!
//! - Core Shannon entropy over a byte region (base-2, 256-symbol alphabet)
//! - Mean/min/max summaries over lists of entropy values
//!
//! Entropy of an empty region is defined as 0.0, and the summary of an
//! empty list is all zeros; both cases occur routinely on sparse PEs and
//! are not errors.

pub mod core;
pub mod stats;

pub use self::core::{entropy_range, shannon_entropy};
pub use self::stats::Stats;
