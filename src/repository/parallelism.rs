//! # Parallelism Policy
//!
//! How many partition groups, and how many batches within one partition
//! group, a bulk write may run at the same time, plus the cancellation signal
//! that stops new work from starting.

use crate::config::{ConfigResult, ConfigurationError, ParallelismConfig};
use std::num::NonZeroUsize;
use tokio_util::sync::CancellationToken;

/// Immutable concurrency limits for one bulk write
#[derive(Debug, Clone)]
pub struct ParallelismPolicy {
    partition_concurrency: NonZeroUsize,
    batch_concurrency: NonZeroUsize,
    cancellation: CancellationToken,
}

impl ParallelismPolicy {
    /// Create a policy with its own, never-cancelled token
    pub fn new(partition_concurrency: usize, batch_concurrency: usize) -> ConfigResult<Self> {
        Self::with_cancellation(
            partition_concurrency,
            batch_concurrency,
            CancellationToken::new(),
        )
    }

    /// Create a policy observing the caller's cancellation token
    pub fn with_cancellation(
        partition_concurrency: usize,
        batch_concurrency: usize,
        cancellation: CancellationToken,
    ) -> ConfigResult<Self> {
        let partition_concurrency = NonZeroUsize::new(partition_concurrency).ok_or_else(|| {
            ConfigurationError::invalid_value(
                "partition_concurrency",
                partition_concurrency,
                "partition concurrency must be at least 1",
            )
        })?;
        let batch_concurrency = NonZeroUsize::new(batch_concurrency).ok_or_else(|| {
            ConfigurationError::invalid_value(
                "batch_concurrency",
                batch_concurrency,
                "batch concurrency must be at least 1",
            )
        })?;

        Ok(Self {
            partition_concurrency,
            batch_concurrency,
            cancellation,
        })
    }

    /// One partition at a time, one batch at a time
    pub fn sequential() -> Self {
        Self {
            partition_concurrency: NonZeroUsize::MIN,
            batch_concurrency: NonZeroUsize::MIN,
            cancellation: CancellationToken::new(),
        }
    }

    pub fn partition_concurrency(&self) -> usize {
        self.partition_concurrency.get()
    }

    pub fn batch_concurrency(&self) -> usize {
        self.batch_concurrency.get()
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Both levels limited to one unit in flight
    pub fn is_sequential(&self) -> bool {
        self.partition_concurrency() == 1 && self.batch_concurrency() == 1
    }
}

impl Default for ParallelismPolicy {
    fn default() -> Self {
        Self::sequential()
    }
}

impl TryFrom<&ParallelismConfig> for ParallelismPolicy {
    type Error = ConfigurationError;

    fn try_from(config: &ParallelismConfig) -> ConfigResult<Self> {
        Self::new(config.partition_concurrency, config.batch_concurrency)
    }
}
