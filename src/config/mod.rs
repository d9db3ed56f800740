//! # Repository Configuration
//!
//! Layered configuration for the table repository, typed queue and write
//! parallelism. Values come from YAML files with per-environment overlays and
//! `TABLE_REPOSITORY__*` environment variables; see [`ConfigManager`].
//!
//! ```yaml
//! storage:
//!   connection_string: "UseDevelopmentStorage=true"
//!   table_name: "readings"
//!   use_nagle: false
//!   server_timeout_ms: 2000
//! parallelism:
//!   partition_concurrency: 4
//!   batch_concurrency: 2
//! queue:
//!   queue_name: "reading-events"
//!   visibility_timeout_seconds: 30
//! ```

pub mod error;
pub mod loader;

use crate::constants::queue::{DEFAULT_VISIBILITY_TIMEOUT, MAX_VISIBILITY_TIMEOUT};
use crate::constants::{DEFAULT_SERVER_TIMEOUT, DEFAULT_USE_NAGLE};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub use error::{ConfigResult, ConfigurationError};
pub use loader::ConfigManager;

/// Root configuration structure mirroring repository.yaml
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RepositoryConfig {
    /// Table connection settings
    pub storage: StorageConfig,

    /// Default parallelism for bulk writes
    pub parallelism: ParallelismConfig,

    /// Typed queue settings
    pub queue: QueueConfig,
}

/// Table connection settings
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    pub connection_string: String,
    pub table_name: String,
    pub use_nagle: bool,
    pub server_timeout_ms: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            connection_string: "UseDevelopmentStorage=true".to_string(),
            table_name: "entities".to_string(),
            use_nagle: DEFAULT_USE_NAGLE,
            server_timeout_ms: DEFAULT_SERVER_TIMEOUT.as_millis() as u64,
        }
    }
}

impl StorageConfig {
    pub fn server_timeout(&self) -> Duration {
        Duration::from_millis(self.server_timeout_ms)
    }
}

/// Parallelism used by bulk writes that do not pass their own policy
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ParallelismConfig {
    pub partition_concurrency: usize,
    pub batch_concurrency: usize,
}

impl Default for ParallelismConfig {
    fn default() -> Self {
        Self {
            partition_concurrency: 1,
            batch_concurrency: 1,
        }
    }
}

/// Typed queue settings
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct QueueConfig {
    pub connection_string: Option<String>,
    pub queue_name: String,
    pub visibility_timeout_seconds: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            connection_string: None,
            queue_name: "messages".to_string(),
            visibility_timeout_seconds: DEFAULT_VISIBILITY_TIMEOUT.as_secs(),
        }
    }
}

impl QueueConfig {
    pub fn visibility_timeout(&self) -> Duration {
        Duration::from_secs(self.visibility_timeout_seconds)
    }
}

impl RepositoryConfig {
    /// Connection string for the queue, falling back to the table's
    pub fn queue_connection_string(&self) -> &str {
        self.queue
            .connection_string
            .as_deref()
            .unwrap_or(&self.storage.connection_string)
    }

    /// Validate configuration values
    pub fn validate(&self) -> ConfigResult<()> {
        if self.storage.connection_string.trim().is_empty() {
            return Err(ConfigurationError::missing_required_field(
                "storage.connection_string",
                "storage configuration",
            ));
        }

        if self.storage.table_name.trim().is_empty() {
            return Err(ConfigurationError::missing_required_field(
                "storage.table_name",
                "storage configuration",
            ));
        }

        if self.storage.server_timeout_ms == 0 {
            return Err(ConfigurationError::invalid_value(
                "storage.server_timeout_ms",
                0,
                "server timeout must be greater than 0",
            ));
        }

        if self.parallelism.partition_concurrency == 0 {
            return Err(ConfigurationError::invalid_value(
                "parallelism.partition_concurrency",
                0,
                "partition concurrency must be at least 1",
            ));
        }

        if self.parallelism.batch_concurrency == 0 {
            return Err(ConfigurationError::invalid_value(
                "parallelism.batch_concurrency",
                0,
                "batch concurrency must be at least 1",
            ));
        }

        if self.queue.queue_name.trim().is_empty() {
            return Err(ConfigurationError::missing_required_field(
                "queue.queue_name",
                "queue configuration",
            ));
        }

        if self.queue.visibility_timeout() > MAX_VISIBILITY_TIMEOUT {
            return Err(ConfigurationError::invalid_value(
                "queue.visibility_timeout_seconds",
                self.queue.visibility_timeout_seconds,
                "visibility timeout cannot exceed 7 days",
            ));
        }

        Ok(())
    }
}
