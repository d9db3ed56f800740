//! # Table Storage
//!
//! The seam between the repository and the external table service.
//!
//! - [`PartitionIdentity`] - capability every stored entity implements
//! - [`TableClient`] - the operations the repository consumes from the service
//! - [`TableOperation`] / [`TableBatch`] - single and atomic batch operations
//! - [`TableQuery`] / [`Filter`] - structured filters rendered to the service's filter syntax
//! - [`InMemoryTableClient`] - in-process implementation with the service's batch semantics

pub mod client;
pub mod entity;
pub mod errors;
pub mod memory;
pub mod operation;
pub mod query;

pub use client::{EntityStream, TableClient};
pub use entity::{EntityKey, PartitionIdentity, TableEntity};
pub use errors::{StorageError, StorageResult};
pub use memory::InMemoryTableClient;
pub use operation::{TableBatch, TableOperation, TableResult};
pub use query::{Comparison, Filter, TableQuery};
