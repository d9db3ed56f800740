//! Recording Table Client for Testing
//!
//! Wraps the in-memory client, recording every batch call and how many calls
//! were in flight at once, with optional delay, failure injection and
//! cancellation on the first batch.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use table_repository::storage::{
    EntityStream, StorageError, StorageResult, TableBatch, TableOperation, TableResult,
};
use table_repository::{InMemoryTableClient, RequestOptions, TableClient, TableEntity, TableQuery};
use tokio_util::sync::CancellationToken;

type FailurePredicate = dyn Fn(&str, usize) -> bool + Send + Sync;

/// One `execute_batch` call as observed by the client
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedBatch {
    pub partition_key: String,
    pub first_row_key: String,
    pub size: usize,
    pub options: RequestOptions,
}

#[derive(Debug, Default)]
pub struct RecordingState {
    pub batches: Vec<RecordedBatch>,
    pub single_operations: usize,
    in_flight: usize,
    in_flight_by_partition: HashMap<String, usize>,
    pub max_in_flight: usize,
    pub max_partitions_in_flight: usize,
    pub max_in_flight_by_partition: HashMap<String, usize>,
}

impl RecordingState {
    fn begin(&mut self, partition_key: &str) {
        self.in_flight += 1;
        self.max_in_flight = self.max_in_flight.max(self.in_flight);

        let count = self
            .in_flight_by_partition
            .entry(partition_key.to_string())
            .or_default();
        *count += 1;
        let count = *count;
        let max = self
            .max_in_flight_by_partition
            .entry(partition_key.to_string())
            .or_default();
        *max = (*max).max(count);

        let partitions = self.in_flight_by_partition.values().filter(|c| **c > 0).count();
        self.max_partitions_in_flight = self.max_partitions_in_flight.max(partitions);
    }

    fn end(&mut self, partition_key: &str) {
        self.in_flight -= 1;
        if let Some(count) = self.in_flight_by_partition.get_mut(partition_key) {
            *count -= 1;
        }
    }
}

pub struct RecordingTableClient {
    inner: InMemoryTableClient,
    state: Arc<Mutex<RecordingState>>,
    execution_delay: Option<Duration>,
    fail_when: Option<Arc<FailurePredicate>>,
    cancel_on_first_batch: Option<CancellationToken>,
}

impl RecordingTableClient {
    pub fn new() -> Self {
        Self {
            inner: InMemoryTableClient::new(),
            state: Arc::new(Mutex::new(RecordingState::default())),
            execution_delay: None,
            fail_when: None,
            cancel_on_first_batch: None,
        }
    }

    /// Hold every batch call for `delay` before applying it
    pub fn with_execution_delay(mut self, delay: Duration) -> Self {
        self.execution_delay = Some(delay);
        self
    }

    /// Fail batches for which `predicate(partition_key, call_number)` holds.
    /// Call numbers start at 0 and count every batch call.
    pub fn with_failure(
        mut self,
        predicate: impl Fn(&str, usize) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.fail_when = Some(Arc::new(predicate));
        self
    }

    /// Cancel `token` while the first batch call is in progress
    pub fn cancelling_on_first_batch(mut self, token: CancellationToken) -> Self {
        self.cancel_on_first_batch = Some(token);
        self
    }

    pub fn inner(&self) -> &InMemoryTableClient {
        &self.inner
    }

    pub fn batches(&self) -> Vec<RecordedBatch> {
        self.state.lock().unwrap().batches.clone()
    }

    pub fn batch_calls(&self) -> usize {
        self.state.lock().unwrap().batches.len()
    }

    pub fn single_operations(&self) -> usize {
        self.state.lock().unwrap().single_operations
    }

    pub fn max_in_flight(&self) -> usize {
        self.state.lock().unwrap().max_in_flight
    }

    pub fn max_partitions_in_flight(&self) -> usize {
        self.state.lock().unwrap().max_partitions_in_flight
    }

    /// Highest number of concurrent batch calls seen for any single partition
    pub fn max_in_flight_within_partition(&self) -> usize {
        self.state
            .lock()
            .unwrap()
            .max_in_flight_by_partition
            .values()
            .copied()
            .max()
            .unwrap_or(0)
    }
}

impl Default for RecordingTableClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<E: TableEntity> TableClient<E> for RecordingTableClient {
    async fn create_if_not_exists(&self, table: &str) -> StorageResult<bool> {
        <InMemoryTableClient as TableClient<E>>::create_if_not_exists(&self.inner, table).await
    }

    async fn execute(
        &self,
        table: &str,
        operation: TableOperation<E>,
        options: &RequestOptions,
    ) -> StorageResult<TableResult<E>> {
        self.state.lock().unwrap().single_operations += 1;
        <InMemoryTableClient as TableClient<E>>::execute(&self.inner, table, operation, options).await
    }

    async fn execute_batch(
        &self,
        table: &str,
        batch: TableBatch<E>,
        options: &RequestOptions,
    ) -> StorageResult<Vec<TableResult<E>>> {
        let partition_key = batch.partition_key().unwrap_or_default().to_string();
        let call_number = {
            let mut state = self.state.lock().unwrap();
            state.batches.push(RecordedBatch {
                partition_key: partition_key.clone(),
                first_row_key: batch
                    .operations()
                    .first()
                    .map(|op| op.row_key().to_string())
                    .unwrap_or_default(),
                size: batch.len(),
                options: *options,
            });
            state.begin(&partition_key);
            state.batches.len() - 1
        };

        if call_number == 0 {
            if let Some(token) = &self.cancel_on_first_batch {
                token.cancel();
            }
        }
        if let Some(delay) = self.execution_delay {
            tokio::time::sleep(delay).await;
        }

        let fail = self
            .fail_when
            .as_ref()
            .is_some_and(|predicate| predicate(&partition_key, call_number));
        let result = if fail {
            Err(StorageError::transport(format!(
                "injected failure for partition {partition_key}"
            )))
        } else {
            <InMemoryTableClient as TableClient<E>>::execute_batch(&self.inner, table, batch, options)
                .await
        };

        self.state.lock().unwrap().end(&partition_key);
        result
    }

    fn execute_query(
        &self,
        table: &str,
        query: &TableQuery,
        options: &RequestOptions,
    ) -> EntityStream<E> {
        <InMemoryTableClient as TableClient<E>>::execute_query(&self.inner, table, query, options)
    }
}
