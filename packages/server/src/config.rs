//! Server configuration (command line flags and environment variables).

use std::time::Duration;

use clap::{Parser, ValueEnum};

use crate::{domain::DEFAULT_HISTORY_LIMIT, usecase::BroadcastSettings};

/// Configuration errors
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("redis url must not be empty")]
    EmptyRedisUrl,
    #[error("redis url must start with redis:// or rediss://: {0}")]
    InvalidRedisScheme(String),
    #[error("history limit must be greater than zero")]
    ZeroHistoryLimit,
    #[error("ready timeout must be greater than zero")]
    ZeroReadyTimeout,
}

/// Pub/sub bus and history store backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    /// Redis pub/sub and lists (shared between processes)
    Redis,
    /// In-process broadcast channels and deques (single process only)
    Memory,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "tsudoi-server")]
#[command(about = "Multi-process WebSocket chat relay", long_about = None)]
pub struct ServerConfig {
    /// Host address to bind the server to
    #[arg(short = 'H', long, env = "TSUDOI_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, env = "TSUDOI_PORT", default_value_t = 8080)]
    pub port: u16,

    /// Backend for the message bus and history store
    #[arg(long, env = "TSUDOI_BACKEND", value_enum, default_value_t = Backend::Redis)]
    pub backend: Backend,

    /// Redis connection URL
    #[arg(long, env = "REDIS_URL", default_value = "redis://localhost:6379")]
    pub redis_url: String,

    /// Number of messages kept per room
    #[arg(long, env = "TSUDOI_HISTORY_LIMIT", default_value_t = DEFAULT_HISTORY_LIMIT)]
    pub history_limit: usize,

    /// Upper bound for waiting on a new room listener's subscription (milliseconds)
    #[arg(long, env = "TSUDOI_READY_TIMEOUT_MS", default_value_t = 2000)]
    pub ready_timeout_ms: u64,
}

impl ServerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.backend == Backend::Redis {
            if self.redis_url.trim().is_empty() {
                return Err(ConfigError::EmptyRedisUrl);
            }
            if !self.redis_url.starts_with("redis://") && !self.redis_url.starts_with("rediss://")
            {
                return Err(ConfigError::InvalidRedisScheme(self.redis_url.clone()));
            }
        }
        if self.history_limit == 0 {
            return Err(ConfigError::ZeroHistoryLimit);
        }
        if self.ready_timeout_ms == 0 {
            return Err(ConfigError::ZeroReadyTimeout);
        }
        Ok(())
    }

    pub fn broadcast_settings(&self) -> BroadcastSettings {
        BroadcastSettings {
            ready_timeout: Duration::from_millis(self.ready_timeout_ms),
        }
    }
}
