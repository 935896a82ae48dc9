//! Redis connection pool management.

use deadpool_redis::{Config, Pool, Runtime};

use crate::error::RegistryError;

/// Configuration for the Redis connection pool backing the Step Registry.
#[derive(Debug, Clone)]
pub struct RedisConfig {
    pub url: String,
    pub max_connections: usize,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: String::from("redis://localhost:6379"),
            max_connections: 16,
        }
    }
}

/// Create a new Redis connection pool.
pub fn create_redis_pool(config: &RedisConfig) -> Result<Pool, RegistryError> {
    let cfg = Config::from_url(&config.url);
    let pool = cfg.create_pool(Some(Runtime::Tokio1))?;
    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RedisConfig::default();
        assert_eq!(config.url, "redis://localhost:6379");
        assert_eq!(config.max_connections, 16);
    }
}
