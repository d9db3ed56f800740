//! # Service Constants
//!
//! Hard limits imposed by the table and queue services, plus the defaults the
//! repository applies when the caller does not override them.

use std::time::Duration;

/// Maximum number of operations the table service accepts in one atomic batch.
pub const MAX_BATCH_SIZE: usize = 100;

/// Server-side timeout applied to every table operation.
pub const DEFAULT_SERVER_TIMEOUT: Duration = Duration::from_secs(2);

/// Small-write coalescing is enabled unless the caller turns it off.
pub const DEFAULT_USE_NAGLE: bool = true;

/// Queue service limits
pub mod queue {
    use std::time::Duration;

    /// Most messages a single dequeue may return.
    pub const MAX_DEQUEUE_COUNT: usize = 32;

    /// Longest a dequeued message may stay hidden.
    pub const MAX_VISIBILITY_TIMEOUT: Duration = Duration::from_secs(7 * 24 * 60 * 60);

    /// Visibility timeout used when configuration does not name one.
    pub const DEFAULT_VISIBILITY_TIMEOUT: Duration = Duration::from_secs(30);
}

/// Well-known entity property names
pub mod properties {
    pub const PARTITION_KEY: &str = "PartitionKey";
    pub const ROW_KEY: &str = "RowKey";
}

/// Environment variables consulted at startup
pub mod env {
    pub const ENVIRONMENT: &str = "TABLE_REPOSITORY_ENV";
    pub const ENVIRONMENT_FALLBACK: &str = "APP_ENV";
    pub const CONFIG_DIR: &str = "TABLE_REPOSITORY_CONFIG_DIR";
    pub const CONFIG_PREFIX: &str = "TABLE_REPOSITORY";
}
