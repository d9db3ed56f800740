//! # Table Client Seam
//!
//! The operations the repository consumes from the external table service.
//! Transport, authentication, retries and the wire format all live behind
//! this trait; implementations are shared across tasks as `Arc<C>` and must
//! be safe for concurrent use.

use super::entity::TableEntity;
use super::errors::StorageResult;
use super::operation::{TableBatch, TableOperation, TableResult};
use super::query::TableQuery;
use crate::connection::RequestOptions;
use async_trait::async_trait;
use futures::stream::BoxStream;

/// Lazily produced query results
pub type EntityStream<E> = BoxStream<'static, StorageResult<E>>;

#[async_trait]
pub trait TableClient<E: TableEntity>: Send + Sync + 'static {
    /// Create the table; returns `true` when it did not exist before
    async fn create_if_not_exists(&self, table: &str) -> StorageResult<bool>;

    /// Execute one operation
    async fn execute(
        &self,
        table: &str,
        operation: TableOperation<E>,
        options: &RequestOptions,
    ) -> StorageResult<TableResult<E>>;

    /// Execute a batch atomically: either every operation applies or none does
    async fn execute_batch(
        &self,
        table: &str,
        batch: TableBatch<E>,
        options: &RequestOptions,
    ) -> StorageResult<Vec<TableResult<E>>>;

    /// Stream the entities matching `query`, ordered by partition key then row key
    fn execute_query(
        &self,
        table: &str,
        query: &TableQuery,
        options: &RequestOptions,
    ) -> EntityStream<E>;
}
