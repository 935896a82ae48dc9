//! Retry policy for transient Postgres errors (connection resets, pool
//! exhaustion, serialization failures under concurrent writers).
//!
//! Three attempts, doubling backoff starting at one second, matching the
//! `TransientBackend` retry budget in the orchestration error taxonomy.
//! Non-transient errors (constraint violations, not-found) are returned
//! immediately without retrying.

use std::time::Duration;

use backoff::backoff::Backoff;
use backoff::ExponentialBackoffBuilder;

/// Build the exponential backoff used by [`retry_transient`].
fn backoff_policy() -> backoff::ExponentialBackoff {
    ExponentialBackoffBuilder::new()
        .with_initial_interval(Duration::from_secs(1))
        .with_multiplier(2.0)
        .with_max_elapsed_time(Some(Duration::from_secs(7)))
        .build()
}

/// Whether a `sqlx::Error` represents a transient failure worth retrying.
#[must_use]
pub fn is_transient(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed
    ) || err
        .as_database_error()
        .and_then(sqlx::error::DatabaseError::code)
        .is_some_and(|code| code == "40001" || code == "40P01")
}

/// Run `op` up to three times, retrying only on [`is_transient`] errors.
pub async fn retry_transient<T, F, Fut>(mut op: F) -> Result<T, sqlx::Error>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, sqlx::Error>>,
{
    let mut backoff = backoff_policy();
    let mut attempt = 0u8;

    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt < 2 && is_transient(&err) => {
                attempt += 1;
                let Some(delay) = backoff.next_backoff() else {
                    return Err(err);
                };
                tracing::warn!(attempt, "retrying transient database error: {err}");
                tokio::time::sleep(delay).await;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn succeeds_without_retry() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, sqlx::Error> = retry_transient(|| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok(7) }
        })
        .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_transient_then_succeeds() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, sqlx::Error> = retry_transient(|| {
            let attempt = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt == 0 {
                    Err(sqlx::Error::PoolTimedOut)
                } else {
                    Ok(42)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn does_not_retry_non_transient() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, sqlx::Error> = retry_transient(|| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(sqlx::Error::RowNotFound) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
