//! # Repository
//!
//! Partition-aware bulk writes and the typed table surface built on them.
//!
//! - [`BatchPlan`] - groups entities by partition key and chunks them into
//!   batches of at most [`MAX_BATCH_SIZE`](crate::constants::MAX_BATCH_SIZE)
//! - [`PartitionedBatchWriter`] - runs a plan with bounded concurrency across
//!   and within partitions
//! - [`BatchLedger`] / [`WriteReport`] - per-batch outcome tracking
//! - [`TableRepository`] - single writes, manual batches, lookups and queries

pub mod errors;
pub mod parallelism;
pub mod plan;
pub mod report;
pub mod table_repository;
pub mod writer;

pub use errors::{WriteError, WriteResult};
pub use parallelism::ParallelismPolicy;
pub use plan::{BatchPlan, PartitionGroup, PlannedBatch};
pub use report::{BatchId, BatchLedger, BatchOutcome, BatchState, WriteReport};
pub use table_repository::{TableRepository, TableSettings};
pub use writer::PartitionedBatchWriter;
