//! Orchestrator configuration (spec.md §6's configuration table).

use std::time::Duration;

/// Tunables for the scheduler, reconciler and retry policy. Loaded by
/// `nanopore-common::config::Settings` and passed down by value — every
/// stage task gets its own clone, so none of this needs interior mutability.
#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    /// Period of the per-stage reconciler scan.
    pub reconcile_interval: Duration,
    /// Worker pool size per stage.
    pub max_in_flight_per_stage: usize,
    /// Lease TTL as a multiple of a step's `estimated_duration_hours`.
    pub lease_ttl_multiplier: f64,
    /// If true, stage-queue ties break on `(submission_date, sample_number)`
    /// only; if false, fairness jitter may be introduced (not implemented —
    /// stable ordering is the only mode this engine offers today).
    pub queue_ordering_stable: bool,
    /// Persistence retries for transient errors.
    pub retry_attempts: u8,
    /// Initial backoff before persistence retries, doubling each attempt.
    pub retry_base_delay: Duration,
    /// How long graceful shutdown waits for in-flight workers before
    /// revoking their leases unconditionally.
    pub shutdown_grace_period: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            reconcile_interval: Duration::from_secs(5),
            max_in_flight_per_stage: 4,
            lease_ttl_multiplier: 2.0,
            queue_ordering_stable: true,
            retry_attempts: 3,
            retry_base_delay: Duration::from_secs(1),
            shutdown_grace_period: Duration::from_secs(30),
        }
    }
}

impl EngineConfig {
    /// Lease TTL for a step, given its estimated duration.
    #[must_use]
    pub fn lease_ttl_for(&self, estimated_duration_hours: f64) -> Duration {
        let seconds = estimated_duration_hours * 3600.0 * self.lease_ttl_multiplier;
        Duration::from_secs_f64(seconds.max(1.0))
    }

    /// A worker's deadline, per spec.md §5: 2x `estimated_duration_hours`.
    #[must_use]
    pub fn worker_deadline_for(estimated_duration_hours: f64) -> Duration {
        Duration::from_secs_f64((estimated_duration_hours * 3600.0 * 2.0).max(1.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_table() {
        let config = EngineConfig::default();
        assert_eq!(config.reconcile_interval, Duration::from_secs(5));
        assert_eq!(config.max_in_flight_per_stage, 4);
        assert!((config.lease_ttl_multiplier - 2.0).abs() < f64::EPSILON);
        assert_eq!(config.retry_attempts, 3);
        assert_eq!(config.retry_base_delay, Duration::from_secs(1));
    }

    #[test]
    fn lease_ttl_scales_with_duration_and_multiplier() {
        let config = EngineConfig::default();
        assert_eq!(config.lease_ttl_for(1.0), Duration::from_secs(7200));
    }

    #[test]
    fn worker_deadline_is_double_estimate() {
        assert_eq!(
            EngineConfig::worker_deadline_for(4.0),
            Duration::from_secs(28_800)
        );
    }
}
