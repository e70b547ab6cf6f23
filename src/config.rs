//! Runtime configuration loaded from the environment.
//!
//! The runtime is deployed one-per-app by the surrounding engine, so
//! configuration mirrors the deployment environment: the owning app's name,
//! the bind address, and the shared store connection.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Environment configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set and non-empty")]
    MissingVar(&'static str),

    #[error("invalid {name}: {value}")]
    InvalidVar { name: &'static str, value: String },
}

/// Top-level runtime configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Name of the app this runtime serves
    pub app_name: String,

    /// Address the HTTP listener binds to
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Shared key/set store configuration
    #[serde(default)]
    pub store: StoreConfig,
}

/// Shared store backend type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Redis-backed store shared by every runtime process (default)
    Redis,
    /// Process-local in-memory store, for tests and single-node use
    Memory,
}

impl Default for StoreBackend {
    fn default() -> Self {
        Self::Redis
    }
}

/// Shared store configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,

    #[serde(default)]
    pub redis: RedisConfig,
}

/// Redis connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    /// Connection URL
    #[serde(default = "default_redis_url")]
    pub url: String,

    /// Connection pool size
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: default_redis_url(),
            pool_size: default_pool_size(),
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from environment variables.
    ///
    /// `APP_NAME` is required; everything else has a default. Recognized
    /// variables: `BIND_ADDR`, `STORE_BACKEND` (`redis` or `memory`),
    /// `REDIS_URL`, `REDIS_POOL_SIZE`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let app_name = lookup("APP_NAME")
            .filter(|name| !name.is_empty())
            .ok_or(ConfigError::MissingVar("APP_NAME"))?;

        let bind_addr = lookup("BIND_ADDR").unwrap_or_else(default_bind_addr);

        let backend = match lookup("STORE_BACKEND") {
            Some(value) => match value.as_str() {
                "redis" => StoreBackend::Redis,
                "memory" => StoreBackend::Memory,
                _ => {
                    return Err(ConfigError::InvalidVar {
                        name: "STORE_BACKEND",
                        value,
                    })
                }
            },
            None => StoreBackend::default(),
        };

        let url = lookup("REDIS_URL").unwrap_or_else(default_redis_url);
        let pool_size = match lookup("REDIS_POOL_SIZE") {
            Some(value) => value.parse::<usize>().map_err(|_| ConfigError::InvalidVar {
                name: "REDIS_POOL_SIZE",
                value,
            })?,
            None => default_pool_size(),
        };

        Ok(Self {
            app_name,
            bind_addr,
            store: StoreConfig {
                backend,
                redis: RedisConfig { url, pool_size },
            },
        })
    }
}

fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}

fn default_pool_size() -> usize {
    16
}
