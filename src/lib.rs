#![allow(clippy::doc_markdown)] // Allow technical terms like PartitionKey, OData in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Table Repository
//!
//! Partition-aware client for partitioned, eventually-consistent key-value
//! table services.
//!
//! ## Overview
//!
//! The table service accepts atomic batches of at most
//! [`MAX_BATCH_SIZE`](constants::MAX_BATCH_SIZE) operations, all sharing one
//! partition key. This crate turns an arbitrary collection of entities into
//! valid batches and executes them with independently bounded, cancellable
//! concurrency across partitions and within each partition. Transport,
//! authentication and retries belong to the [`TableClient`] implementation.
//!
//! ## Module Organization
//!
//! - [`storage`] - the table client seam, operations, queries and an in-memory client
//! - [`repository`] - batch planning, the parallel writer and [`TableRepository`]
//! - [`messaging`] - the queue client seam and [`TypedQueue`]
//! - [`connection`] - connection strings and per-request options
//! - [`config`] - layered YAML and environment configuration
//! - [`logging`] - structured logging setup
//! - [`error`] - top-level error type
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use serde::{Deserialize, Serialize};
//! use table_repository::{
//!     InMemoryTableClient, ParallelismPolicy, PartitionIdentity, TableRepository, TableSettings,
//! };
//!
//! #[derive(Debug, Clone, Serialize, Deserialize)]
//! struct Reading {
//!     sensor: String,
//!     at: String,
//!     value: f64,
//! }
//!
//! impl PartitionIdentity for Reading {
//!     fn partition_key(&self) -> &str {
//!         &self.sensor
//!     }
//!     fn row_key(&self) -> &str {
//!         &self.at
//!     }
//! }
//!
//! # tokio_test::block_on(async {
//! let settings = TableSettings::new("UseDevelopmentStorage=true", "readings");
//! let repository = TableRepository::connect(&settings, Arc::new(InMemoryTableClient::new())).await?;
//!
//! let readings = (0..250).map(|i| Reading {
//!     sensor: format!("sensor-{}", i % 3),
//!     at: format!("{i:06}"),
//!     value: i as f64,
//! });
//! let report = repository
//!     .insert_or_replace_parallel(readings, &ParallelismPolicy::new(3, 2)?)
//!     .await?;
//! assert_eq!(report.written_entity_count(), 250);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! # }).unwrap();
//! ```

pub mod config;
pub mod connection;
pub mod constants;
pub mod error;
pub mod logging;
pub mod messaging;
pub mod repository;
pub mod storage;

pub use config::{ConfigManager, ConfigurationError, RepositoryConfig};
pub use connection::{ConnectionStringError, RequestOptions, StorageAccount};
pub use constants::MAX_BATCH_SIZE;
pub use error::{RepositoryError, Result};
pub use messaging::{
    InMemoryQueueClient, MessageHandle, MessagingError, QueueClient, QueueMessage,
    ReceivedMessages, TypedQueue, UndecodableMessage,
};
pub use repository::{
    BatchId, BatchOutcome, BatchState, ParallelismPolicy, PartitionedBatchWriter, TableRepository,
    TableSettings, WriteError, WriteReport,
};
pub use storage::{
    InMemoryTableClient, PartitionIdentity, StorageError, TableClient, TableEntity, TableQuery,
};
