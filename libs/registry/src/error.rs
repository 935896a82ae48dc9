//! Errors from Step Registry operations.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("failed to connect to Redis: {0}")]
    ConnectionError(#[from] deadpool_redis::CreatePoolError),

    #[error("Redis operation failed: {0}")]
    OperationError(#[from] deadpool_redis::redis::RedisError),

    #[error("pool error: {0}")]
    PoolError(#[from] deadpool_redis::PoolError),

    #[error("failed to (de)serialize cached record: {0}")]
    Serialization(serde_json::Error),
}
