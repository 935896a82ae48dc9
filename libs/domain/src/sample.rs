//! The `Sample` entity (spec.md §3).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use typeshare::typeshare;

use crate::enums::{Priority, SampleStatus, SampleType, WorkflowStage};
use crate::ids::{SampleId, SubmissionId};

/// QC input fields captured at intake; all optional since not every
/// extractor provides every field (spec.md §3).
#[typeshare]
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
pub struct SampleQcInputs {
    pub concentration_ng_per_ul: Option<f64>,
    pub volume_ul: Option<f64>,
    pub qubit_concentration: Option<f64>,
    pub nanodrop_concentration: Option<f64>,
    pub a260_280: Option<f64>,
    pub a260_230: Option<f64>,
}

impl SampleQcInputs {
    /// `concentration * volume`, the `total_amount` referenced by the QC
    /// scoring table in spec.md §4.3. `None` if either input is missing.
    #[must_use]
    pub fn total_amount_ng(&self) -> Option<f64> {
        Some(self.concentration_ng_per_ul? * self.volume_ul?)
    }
}

/// An individual biological item tracked through the eight stages.
#[typeshare]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sample {
    pub sample_id: SampleId,
    pub submission_id: SubmissionId,
    /// Unique within the submission (spec.md §6 `UNIQUE(submission_id, sample_number)`).
    pub sample_number: i32,
    pub sample_name: String,
    pub sample_type: SampleType,
    pub qc_inputs: SampleQcInputs,
    pub workflow_stage: WorkflowStage,
    pub status: SampleStatus,
    pub priority: Priority,
    pub assignee: Option<String>,
    pub chart_field: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_amount_requires_both_inputs() {
        let inputs = SampleQcInputs {
            concentration_ng_per_ul: Some(50.0),
            volume_ul: Some(20.0),
            ..Default::default()
        };
        assert_eq!(inputs.total_amount_ng(), Some(1000.0));

        let missing_volume = SampleQcInputs {
            concentration_ng_per_ul: Some(50.0),
            ..Default::default()
        };
        assert_eq!(missing_volume.total_amount_ng(), None);
    }
}
