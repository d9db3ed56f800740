//! # Partitioned Batch Writer
//!
//! Bulk insert-or-replace with two levels of bounded concurrency:
//!
//! - an outer semaphore limits how many partition groups run at once
//! - a per-group semaphore limits how many batches of that group run at once
//!
//! Permits are acquired by the dispatching loop before a unit is spawned, so a
//! `(1, 1)` policy executes batches exactly in plan order. Cancellation is
//! raced against every permit wait and checked again when a batch starts; a
//! batch already handed to the client always runs to completion.

use super::errors::{WriteError, WriteResult};
use super::parallelism::ParallelismPolicy;
use super::plan::{BatchPlan, PartitionGroup, PlannedBatch};
use super::report::{BatchLedger, WriteReport};
use crate::connection::RequestOptions;
use crate::logging::log_write_summary;
use crate::storage::{TableBatch, TableClient, TableEntity};
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

/// Writes entities to one table through a shared [`TableClient`]
pub struct PartitionedBatchWriter<E, C> {
    client: Arc<C>,
    table: Arc<str>,
    options: RequestOptions,
    _entity: PhantomData<fn() -> E>,
}

impl<E, C> Clone for PartitionedBatchWriter<E, C> {
    fn clone(&self) -> Self {
        Self {
            client: Arc::clone(&self.client),
            table: Arc::clone(&self.table),
            options: self.options,
            _entity: PhantomData,
        }
    }
}

impl<E, C> std::fmt::Debug for PartitionedBatchWriter<E, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PartitionedBatchWriter")
            .field("table", &self.table)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl<E, C> PartitionedBatchWriter<E, C>
where
    E: TableEntity,
    C: TableClient<E>,
{
    pub fn new(client: Arc<C>, table: impl Into<Arc<str>>, options: RequestOptions) -> Self {
        Self {
            client,
            table: table.into(),
            options,
            _entity: PhantomData,
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn options(&self) -> &RequestOptions {
        &self.options
    }

    pub fn client(&self) -> &Arc<C> {
        &self.client
    }

    /// Insert-or-replace every entity.
    ///
    /// Returns the report when every batch succeeded. A duplicate row key
    /// within one batch fails before anything is dispatched. Otherwise every
    /// dispatched batch is awaited; any failure yields
    /// [`WriteError::BatchesFailed`], and skipped batches without failures
    /// yield [`WriteError::Cancelled`].
    #[instrument(
        skip_all,
        fields(
            table = %self.table,
            partition_concurrency = policy.partition_concurrency(),
            batch_concurrency = policy.batch_concurrency(),
        )
    )]
    pub async fn write_all(
        &self,
        entities: impl IntoIterator<Item = E>,
        policy: &ParallelismPolicy,
    ) -> WriteResult<WriteReport> {
        let started = Instant::now();
        let plan = BatchPlan::build(entities)?;

        if plan.is_empty() {
            debug!("Nothing to write");
            return Ok(WriteReport::empty());
        }

        debug!(
            partitions = plan.partition_count(),
            batches = plan.batch_count(),
            entities = plan.entity_count(),
            "Planned bulk write"
        );

        let ledger = Arc::new(BatchLedger::new(plan.groups().iter().flat_map(|group| {
            group
                .batches
                .iter()
                .map(|batch| (batch.id.clone(), batch.entities.len()))
        })));
        let dispatch = BatchDispatch {
            client: Arc::clone(&self.client),
            table: Arc::clone(&self.table),
            options: self.options,
            ledger: Arc::clone(&ledger),
            cancellation: policy.cancellation().clone(),
            _entity: PhantomData,
        };

        let partitions = Arc::new(Semaphore::new(permit_limit(policy.partition_concurrency())));
        let batch_concurrency = permit_limit(policy.batch_concurrency());
        let mut groups = JoinSet::new();

        for group in plan.into_groups() {
            let Some(permit) = acquire_permit(&partitions, &dispatch.cancellation).await else {
                dispatch.skip_group(&group);
                continue;
            };
            let dispatch = dispatch.clone();
            groups.spawn(async move {
                let _permit = permit;
                dispatch.write_group(group, batch_concurrency).await;
            });
        }

        while let Some(joined) = groups.join_next().await {
            if let Err(err) = joined {
                warn!(error = %err, "Partition group task ended abnormally");
            }
        }

        let report = ledger.report(started.elapsed());
        log_write_summary(&self.table, &report);
        aggregate(report)
    }

    /// Write a single entity with the sequential policy
    pub async fn write_one(&self, entity: E) -> WriteResult<WriteReport> {
        self.write_all(std::iter::once(entity), &ParallelismPolicy::sequential())
            .await
    }
}

/// Everything a spawned unit needs, owned
struct BatchDispatch<E, C> {
    client: Arc<C>,
    table: Arc<str>,
    options: RequestOptions,
    ledger: Arc<BatchLedger>,
    cancellation: CancellationToken,
    _entity: PhantomData<fn() -> E>,
}

impl<E, C> Clone for BatchDispatch<E, C> {
    fn clone(&self) -> Self {
        Self {
            client: Arc::clone(&self.client),
            table: Arc::clone(&self.table),
            options: self.options,
            ledger: Arc::clone(&self.ledger),
            cancellation: self.cancellation.clone(),
            _entity: PhantomData,
        }
    }
}

impl<E, C> BatchDispatch<E, C>
where
    E: TableEntity,
    C: TableClient<E>,
{
    async fn write_group(self, group: PartitionGroup<E>, batch_concurrency: usize) {
        debug!(
            partition_key = %group.partition_key,
            batches = group.batches.len(),
            "Starting partition group"
        );

        let slots = Arc::new(Semaphore::new(batch_concurrency));
        let mut batches = JoinSet::new();

        for batch in group.batches {
            let Some(permit) = acquire_permit(&slots, &self.cancellation).await else {
                self.skip_batch(&batch);
                continue;
            };
            let dispatch = self.clone();
            batches.spawn(async move {
                let _permit = permit;
                dispatch.write_batch(batch).await;
            });
        }

        while let Some(joined) = batches.join_next().await {
            if let Err(err) = joined {
                warn!(
                    partition_key = %group.partition_key,
                    error = %err,
                    "Batch task ended abnormally"
                );
            }
        }
    }

    async fn write_batch(&self, batch: PlannedBatch<E>) {
        if self.cancellation.is_cancelled() {
            self.skip_batch(&batch);
            return;
        }
        if !self.ledger.start(&batch.id) {
            return;
        }

        let size = batch.entities.len();
        debug!(batch = %batch.id, size, "Dispatching batch");

        let result = self
            .client
            .execute_batch(
                &self.table,
                TableBatch::insert_or_replace_all(batch.entities),
                &self.options,
            )
            .await
            .map(|_| ());

        match &result {
            Ok(()) => debug!(batch = %batch.id, size, "Batch succeeded"),
            Err(err) => warn!(batch = %batch.id, size, error = %err, "Batch failed"),
        }
        self.ledger.finish(&batch.id, result);
    }

    fn skip_group(&self, group: &PartitionGroup<E>) {
        for batch in &group.batches {
            self.skip_batch(batch);
        }
    }

    fn skip_batch(&self, batch: &PlannedBatch<E>) {
        if self.ledger.skip(&batch.id) {
            debug!(batch = %batch.id, "Batch skipped after cancellation");
        }
    }
}

/// Semaphores cannot hold more than `MAX_PERMITS`; any larger limit is
/// already unbounded in practice
fn permit_limit(concurrency: usize) -> usize {
    concurrency.min(Semaphore::MAX_PERMITS)
}

/// Wait for a permit unless cancellation wins first
async fn acquire_permit(
    semaphore: &Arc<Semaphore>,
    cancellation: &CancellationToken,
) -> Option<OwnedSemaphorePermit> {
    if cancellation.is_cancelled() {
        return None;
    }
    tokio::select! {
        biased;
        _ = cancellation.cancelled() => None,
        permit = Arc::clone(semaphore).acquire_owned() => permit.ok(),
    }
}

fn aggregate(report: WriteReport) -> WriteResult<WriteReport> {
    if report.failed_count() > 0 {
        Err(WriteError::BatchesFailed { report })
    } else if report.skipped_count() > 0 {
        Err(WriteError::Cancelled { report })
    } else {
        Ok(report)
    }
}
