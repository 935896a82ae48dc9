//! Quality-control result types produced by the Sample QC stage worker
//! (spec.md §4.3) and persisted on the `Sample QC` `ProcessingStep` row.

use serde::{Deserialize, Serialize};
use typeshare::typeshare;

/// Severity of a single QC issue, used only for display/triage — scoring
/// itself is a flat point deduction per spec.md §4.3's table.
#[typeshare]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QcSeverity {
    Critical,
    High,
    Medium,
    Low,
}

/// A single QC finding.
#[typeshare]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QcIssue {
    pub severity: QcSeverity,
    pub field: String,
    pub message: String,
}

/// Numeric inputs the QC score is derived from.
#[typeshare]
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct QcMetrics {
    pub concentration_ng_per_ul: Option<f64>,
    pub volume_ul: Option<f64>,
    pub total_amount_ng: Option<f64>,
}

/// Outcome of the Sample QC stage worker.
#[typeshare]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QcResult {
    pub passed: bool,
    /// 0-100, clamped.
    pub score: u8,
    pub metrics: QcMetrics,
    pub issues: Vec<QcIssue>,
    pub recommendations: Vec<String>,
}

impl QcResult {
    /// Human-readable summary of `issues`, suitable for a step's
    /// `qc_notes`/failure reason. Empty if there are none.
    #[must_use]
    pub fn notes(&self) -> String {
        self.issues
            .iter()
            .map(|issue| format!("{:?}: {}", issue.severity, issue.message))
            .collect::<Vec<_>>()
            .join("; ")
    }
}
