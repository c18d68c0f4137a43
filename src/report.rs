//! Scan report types and rendering.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::classify::Label;
use crate::features::FeatureVector;

/// Outcome of scanning one file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ScanOutcome {
    /// Features extracted; no classifier was supplied.
    Features { features: FeatureVector },
    /// Features extracted and labeled by the classifier.
    Labeled {
        label: Label,
        features: FeatureVector,
    },
    /// The prechecker rejected the file; it was never parsed.
    NotPe,
    /// Extraction or prediction failed; the cause, captured as text.
    Failed { error: String },
}

/// One file's scan record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanRecord {
    pub path: PathBuf,
    /// SHA-256 of the file content; absent when the file was unreadable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
    #[serde(flatten)]
    pub outcome: ScanOutcome,
}

/// A full batch scan report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanReport {
    pub started_at: DateTime<Utc>,
    pub records: Vec<ScanRecord>,
}

impl ScanReport {
    pub fn new(records: Vec<ScanRecord>, started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            records,
        }
    }

    pub fn malicious_count(&self) -> usize {
        self.records
            .iter()
            .filter(|r| matches!(r.outcome, ScanOutcome::Labeled { label: Label::Malicious, .. }))
            .count()
    }

    pub fn not_pe_count(&self) -> usize {
        self.records
            .iter()
            .filter(|r| matches!(r.outcome, ScanOutcome::NotPe))
            .count()
    }

    pub fn failed_count(&self) -> usize {
        self.records
            .iter()
            .filter(|r| matches!(r.outcome, ScanOutcome::Failed { .. }))
            .count()
    }

    /// Render the per-file lines plus the summary block.
    pub fn render_text(&self) -> String {
        let mut out = String::new();

        for record in &self.records {
            let line = match &record.outcome {
                ScanOutcome::Features { .. } => format!("[ok    ] {}", record.path.display()),
                ScanOutcome::Labeled { label, .. } => {
                    format!("[{:<6}] {}", label.to_string(), record.path.display())
                }
                ScanOutcome::NotPe => format!("[not pe] {}", record.path.display()),
                ScanOutcome::Failed { error } => {
                    format!("[failed] {} -- {}", record.path.display(), error)
                }
            };
            out.push_str(&line);
            out.push('\n');
        }

        out.push_str(&"=".repeat(60));
        out.push('\n');
        out.push_str("SUMMARY\n");
        out.push_str(&format!("  Started:   {}\n", self.started_at.to_rfc3339()));
        out.push_str(&format!("  Total:     {}\n", self.records.len()));
        out.push_str(&format!("  Malicious: {}\n", self.malicious_count()));
        out.push_str(&format!("  Not PE:    {}\n", self.not_pe_count()));
        out.push_str(&format!("  Failed:    {}\n", self.failed_count()));
        out.push_str(&"=".repeat(60));
        out.push('\n');

        out
    }

    pub fn render_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Report output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("unknown format: {s}. Use 'text' or 'json'.")),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}
