//! Enum types for the nanopore workflow platform.
//!
//! These mirror the SQL enum types in the relational schema (`CHECK(... IN
//! ...)` constraints, see §6) and must be kept in sync with them.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use typeshare::typeshare;

/// Sample/submission priority class.
///
/// Ordered so that `Urgent > High > Normal > Low`; used as the primary
/// ranking key in the per-stage priority queues (§4.5).
#[typeshare]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Normal,
    High,
    Urgent,
}

impl Priority {
    /// Rank used for ordering: higher is more urgent.
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            Self::Low => 0,
            Self::Normal => 1,
            Self::High => 2,
            Self::Urgent => 3,
        }
    }
}

impl PartialOrd for Priority {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Priority {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank().cmp(&other.rank())
    }
}

impl Default for Priority {
    fn default() -> Self {
        Self::Normal
    }
}

/// Submission-level status (invariant 6 in spec.md §3).
#[typeshare]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

/// Sample material type.
#[typeshare]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleType {
    Dna,
    Rna,
    Protein,
    Other,
}

/// Sample-level status.
#[typeshare]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleStatus {
    Submitted,
    Prep,
    Sequencing,
    Analysis,
    Completed,
    Distributed,
    Archived,
    Failed,
}

/// The eight canonical processing stages, in pipeline order.
///
/// This is the single source of truth for stage order and naming; the
/// dependency graph (§4.4) and the static `StageConfig` table (§3) are both
/// keyed by this enum so a stage can never be named inconsistently.
#[typeshare]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStage {
    SampleQc,
    LibraryPrep,
    LibraryQc,
    SequencingSetup,
    SequencingRun,
    Basecalling,
    QualityAssessment,
    DataDelivery,
}

impl WorkflowStage {
    /// All eight stages in canonical pipeline order.
    pub const ALL: [WorkflowStage; 8] = [
        Self::SampleQc,
        Self::LibraryPrep,
        Self::LibraryQc,
        Self::SequencingSetup,
        Self::SequencingRun,
        Self::Basecalling,
        Self::QualityAssessment,
        Self::DataDelivery,
    ];

    /// 1-based position in the canonical pipeline (`step_order`, 1..8).
    #[must_use]
    pub const fn order(self) -> u8 {
        match self {
            Self::SampleQc => 1,
            Self::LibraryPrep => 2,
            Self::LibraryQc => 3,
            Self::SequencingSetup => 4,
            Self::SequencingRun => 5,
            Self::Basecalling => 6,
            Self::QualityAssessment => 7,
            Self::DataDelivery => 8,
        }
    }

    /// Stable lowercase-snake-case name, used as a DB column value and NATS
    /// subject token.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SampleQc => "sample_qc",
            Self::LibraryPrep => "library_prep",
            Self::LibraryQc => "library_qc",
            Self::SequencingSetup => "sequencing_setup",
            Self::SequencingRun => "sequencing_run",
            Self::Basecalling => "basecalling",
            Self::QualityAssessment => "quality_assessment",
            Self::DataDelivery => "data_delivery",
        }
    }

    /// Parse from the stable name. Returns `None` for anything else.
    #[must_use]
    pub fn from_str_opt(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|stage| stage.as_str() == s)
    }

    /// The stage that follows this one in the canonical pipeline, if any.
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::SampleQc => Some(Self::LibraryPrep),
            Self::LibraryPrep => Some(Self::LibraryQc),
            Self::LibraryQc => Some(Self::SequencingSetup),
            Self::SequencingSetup => Some(Self::SequencingRun),
            Self::SequencingRun => Some(Self::Basecalling),
            Self::Basecalling => Some(Self::QualityAssessment),
            Self::QualityAssessment => Some(Self::DataDelivery),
            Self::DataDelivery => None,
        }
    }
}

impl std::fmt::Display for WorkflowStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of an individual `ProcessingStep` (the step state machine, §4.6).
#[typeshare]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
    Skipped,
}

impl StepStatus {
    /// Stable lowercase-snake-case name, used as a DB column value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        }
    }

    #[must_use]
    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "in_progress" => Some(Self::InProgress),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            "skipped" => Some(Self::Skipped),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_ordering() {
        assert!(Priority::Urgent > Priority::High);
        assert!(Priority::High > Priority::Normal);
        assert!(Priority::Normal > Priority::Low);
    }

    #[test]
    fn stage_order_is_one_based_and_monotonic() {
        let orders: Vec<u8> = WorkflowStage::ALL.iter().map(|s| s.order()).collect();
        assert_eq!(orders, vec![1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn stage_next_chains_to_data_delivery() {
        let mut stage = WorkflowStage::SampleQc;
        let mut count = 1;
        while let Some(next) = stage.next() {
            stage = next;
            count += 1;
        }
        assert_eq!(stage, WorkflowStage::DataDelivery);
        assert_eq!(count, 8);
    }

    #[test]
    fn stage_name_roundtrip() {
        for stage in WorkflowStage::ALL {
            assert_eq!(WorkflowStage::from_str_opt(stage.as_str()), Some(stage));
        }
    }

    #[test]
    fn step_status_name_roundtrip() {
        for status in [
            StepStatus::Pending,
            StepStatus::InProgress,
            StepStatus::Completed,
            StepStatus::Failed,
            StepStatus::Skipped,
        ] {
            assert_eq!(StepStatus::from_str_opt(status.as_str()), Some(status));
        }
    }
}
