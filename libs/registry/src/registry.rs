//! Redis-backed step lease registry (spec.md §4.1).
//!
//! A lease is `SET key holder NX EX ttl`: the first worker to set the key
//! wins, everyone else's `SET ... NX` fails and the key is read back so the
//! caller can tell "I already hold this" from "someone else holds this".
//! Renewal and release are compare-and-swap, implemented as Lua scripts so
//! the check-then-act is atomic against other workers racing the same key.

use std::time::Duration;

use async_trait::async_trait;
use deadpool_redis::redis::{self, AsyncCommands};
use deadpool_redis::Pool;
use serde::{de::DeserializeOwned, Serialize};

use nanopore_domain::StepId;

use crate::error::RegistryError;

fn lease_key(step_id: &StepId) -> String {
    format!("lease:step:{step_id}")
}

fn record_key(step_id: &StepId) -> String {
    format!("step:{step_id}")
}

/// Lease coordination, abstracted so the Orchestrator can be tested against
/// an in-memory fake instead of a real Redis instance.
#[async_trait]
pub trait LeaseRegistry: Send + Sync {
    async fn acquire_lease(
        &self,
        step_id: &StepId,
        holder: &str,
        ttl: Duration,
    ) -> Result<Lease, RegistryError>;

    async fn renew_lease(
        &self,
        step_id: &StepId,
        holder: &str,
        ttl: Duration,
    ) -> Result<Lease, RegistryError>;

    async fn release_lease(&self, step_id: &StepId, holder: &str) -> Result<(), RegistryError>;

    async fn get_lease_holder(&self, step_id: &StepId) -> Result<Option<String>, RegistryError>;
}

/// Outcome of attempting to acquire or renew a lease.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lease {
    /// The caller now holds the lease (freshly acquired or renewed).
    Held,
    /// Someone else holds the lease.
    HeldByOther(String),
}

const RENEW_SCRIPT: &str = r"
if redis.call('GET', KEYS[1]) == ARGV[1] then
    redis.call('EXPIRE', KEYS[1], ARGV[2])
    return 1
else
    return 0
end
";

const RELEASE_SCRIPT: &str = r"
if redis.call('GET', KEYS[1]) == ARGV[1] then
    return redis.call('DEL', KEYS[1])
else
    return 0
end
";

/// Redis-backed registry of which worker currently owns a processing step.
pub struct StepRegistry {
    pool: Pool,
}

impl StepRegistry {
    #[must_use]
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Attempt to acquire the lease for `step_id` on behalf of `holder`.
    pub async fn acquire_lease(
        &self,
        step_id: &StepId,
        holder: &str,
        ttl: Duration,
    ) -> Result<Lease, RegistryError> {
        let mut conn = self.pool.get().await?;
        let key = lease_key(step_id);

        let set: Option<String> = redis::cmd("SET")
            .arg(&key)
            .arg(holder)
            .arg("NX")
            .arg("EX")
            .arg(ttl.as_secs().max(1))
            .query_async(&mut conn)
            .await?;

        if set.is_some() {
            return Ok(Lease::Held);
        }

        let current: Option<String> = conn.get(&key).await?;
        match current {
            Some(owner) if owner == holder => Ok(Lease::Held),
            Some(owner) => Ok(Lease::HeldByOther(owner)),
            None => Ok(Lease::Held), // key expired between SET NX and GET; treat as acquired
        }
    }

    /// Extend an already-held lease. Fails (`HeldByOther`) if `holder` is
    /// not the current owner, e.g. because the lease already expired and
    /// another worker took it.
    pub async fn renew_lease(
        &self,
        step_id: &StepId,
        holder: &str,
        ttl: Duration,
    ) -> Result<Lease, RegistryError> {
        let mut conn = self.pool.get().await?;
        let key = lease_key(step_id);

        let renewed: i32 = redis::Script::new(RENEW_SCRIPT)
            .key(&key)
            .arg(holder)
            .arg(ttl.as_secs().max(1))
            .invoke_async(&mut conn)
            .await?;

        if renewed == 1 {
            return Ok(Lease::Held);
        }

        let current: Option<String> = conn.get(&key).await?;
        Ok(current.map_or(Lease::Held, Lease::HeldByOther))
    }

    /// Release a held lease. A no-op (returns `Ok(())`) if `holder` does not
    /// currently hold it.
    pub async fn release_lease(&self, step_id: &StepId, holder: &str) -> Result<(), RegistryError> {
        let mut conn = self.pool.get().await?;
        let key = lease_key(step_id);

        let _: i32 = redis::Script::new(RELEASE_SCRIPT)
            .key(&key)
            .arg(holder)
            .invoke_async(&mut conn)
            .await?;

        Ok(())
    }

    /// Look up the current lease holder, if any.
    pub async fn get_lease_holder(&self, step_id: &StepId) -> Result<Option<String>, RegistryError> {
        let mut conn = self.pool.get().await?;
        let key = lease_key(step_id);
        let holder: Option<String> = conn.get(&key).await?;
        Ok(holder)
    }

    /// Cache a step record (spec.md §4.1), distinct from the lease key space —
    /// this is a plain `SET key value EX ttl` with no ownership semantics, used
    /// to let readers (e.g. the status HTTP endpoint) avoid a database round
    /// trip for a step that was just written.
    pub async fn put<T: Serialize + Send + Sync>(
        &self,
        step_id: &StepId,
        record: &T,
        ttl: Duration,
    ) -> Result<(), RegistryError> {
        let mut conn = self.pool.get().await?;
        let value = serde_json::to_string(record).map_err(RegistryError::Serialization)?;
        let _: () = redis::cmd("SET")
            .arg(record_key(step_id))
            .arg(value)
            .arg("EX")
            .arg(ttl.as_secs().max(1))
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    /// Fetch a cached step record, if present and not yet expired.
    pub async fn get<T: DeserializeOwned>(&self, step_id: &StepId) -> Result<Option<T>, RegistryError> {
        let mut conn = self.pool.get().await?;
        let raw: Option<String> = conn.get(record_key(step_id)).await?;
        match raw {
            Some(raw) => {
                let record = serde_json::from_str(&raw).map_err(RegistryError::Serialization)?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    /// Evict a cached step record, e.g. after it transitions to a terminal
    /// status and the cached copy would otherwise go stale until its TTL.
    pub async fn delete(&self, step_id: &StepId) -> Result<(), RegistryError> {
        let mut conn = self.pool.get().await?;
        let _: i32 = conn.del(record_key(step_id)).await?;
        Ok(())
    }
}

#[async_trait]
impl LeaseRegistry for StepRegistry {
    async fn acquire_lease(
        &self,
        step_id: &StepId,
        holder: &str,
        ttl: Duration,
    ) -> Result<Lease, RegistryError> {
        StepRegistry::acquire_lease(self, step_id, holder, ttl).await
    }

    async fn renew_lease(
        &self,
        step_id: &StepId,
        holder: &str,
        ttl: Duration,
    ) -> Result<Lease, RegistryError> {
        StepRegistry::renew_lease(self, step_id, holder, ttl).await
    }

    async fn release_lease(&self, step_id: &StepId, holder: &str) -> Result<(), RegistryError> {
        StepRegistry::release_lease(self, step_id, holder).await
    }

    async fn get_lease_holder(&self, step_id: &StepId) -> Result<Option<String>, RegistryError> {
        StepRegistry::get_lease_holder(self, step_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lease_key_is_namespaced() {
        let id = StepId::new();
        let key = lease_key(&id);
        assert!(key.starts_with("lease:step:step_"));
    }

    #[test]
    fn record_key_is_distinct_from_lease_key() {
        let id = StepId::new();
        assert_ne!(record_key(&id), lease_key(&id));
        assert!(record_key(&id).starts_with("step:step_"));
    }
}
