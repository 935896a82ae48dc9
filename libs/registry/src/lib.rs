//! Step Registry — a Redis-backed lease mechanism so that multiple worker
//! processes can coordinate over which process currently owns a processing
//! step, without a central scheduler holding that state in memory.
//!
//! This is a best-effort cache, not a system of record: Postgres
//! (`nanopore-db`) remains authoritative for step state. Losing the Redis
//! instance loses in-flight leases, not data — a worker simply re-acquires
//! the lease on its next poll.

pub mod cache;
pub mod error;
pub mod registry;

pub use cache::{create_redis_pool, RedisConfig};
pub use error::RegistryError;
pub use registry::{Lease, LeaseRegistry, StepRegistry};
