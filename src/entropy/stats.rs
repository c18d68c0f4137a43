//! Statistical summaries over entropy values.

/// Mean/min/max summary of a list of entropy values.
///
/// The default value (all zeros) is the summary of an empty list, which is
/// what the feature vector reports when a PE has no sections or no valid
/// resources.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Stats {
    pub mean: f64,
    pub min: f64,
    pub max: f64,
}

impl Stats {
    /// Computes the summary from a list of values.
    ///
    /// Returns None if the input is empty.
    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }

        let len = values.len() as f64;
        let sum: f64 = values.iter().sum();
        let mean = sum / len;

        let min = values.iter().copied().reduce(f64::min).unwrap_or(0.0);
        let max = values.iter().copied().reduce(f64::max).unwrap_or(0.0);

        Some(Stats { mean, min, max })
    }

    /// Computes the summary, substituting zeros for an empty input.
    pub fn from_values_or_zero(values: &[f64]) -> Self {
        Self::from_values(values).unwrap_or_default()
    }
}
