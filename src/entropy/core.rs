//! Core entropy calculation primitives.
//!
//! Shannon entropy over raw byte regions is the basis for the per-section
//! and per-resource statistics in the feature vector.

use std::ops::Range;

/// Calculates the Shannon entropy of a byte slice, in bits.
///
/// Returns a value between 0.0 and 8.0, where:
/// - 0.0 represents no randomness (all bytes equal, or an empty slice)
/// - 8.0 represents maximum randomness (uniform distribution)
///
/// The computation is a single pass over the data: a 256-bucket histogram
/// followed by `-sum(p * log2(p))` over the nonzero buckets.
#[inline]
pub fn shannon_entropy(data: &[u8]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }

    let mut histogram = [0usize; 256];
    for &byte in data {
        histogram[byte as usize] += 1;
    }

    let len = data.len() as f64;
    let mut entropy = 0.0;

    for &count in &histogram {
        if count == 0 {
            continue;
        }
        let p = (count as f64) / len;
        entropy -= p * p.log2();
    }

    entropy
}

/// Calculates entropy for a byte range within a slice.
///
/// The range is clamped to the slice bounds; a range that clamps to nothing
/// yields 0.0.
#[inline]
pub fn entropy_range(data: &[u8], range: Range<usize>) -> f64 {
    let start = range.start.min(data.len());
    let end = range.end.min(data.len());
    if start >= end {
        return 0.0;
    }
    shannon_entropy(&data[start..end])
}
