//! # Table Repository
//!
//! Typed access to one table: single writes, the manual batch path, the
//! parallel bulk writer, lookups, queries and deletes. Every remote call
//! carries the repository's [`RequestOptions`].

use super::errors::WriteError;
use super::parallelism::ParallelismPolicy;
use super::report::WriteReport;
use super::writer::PartitionedBatchWriter;
use crate::config::StorageConfig;
use crate::connection::{RequestOptions, StorageAccount};
use crate::constants::MAX_BATCH_SIZE;
use crate::error::{RepositoryError, Result};
use crate::storage::{EntityKey, TableBatch, TableClient, TableEntity, TableOperation, TableQuery};
use futures::stream::{BoxStream, StreamExt};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Where and how to reach the table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSettings {
    pub connection_string: String,
    pub table_name: String,
    pub use_nagle: bool,
    pub server_timeout: Duration,
}

impl TableSettings {
    pub fn new(connection_string: impl Into<String>, table_name: impl Into<String>) -> Self {
        let defaults = RequestOptions::default();
        Self {
            connection_string: connection_string.into(),
            table_name: table_name.into(),
            use_nagle: defaults.use_nagle,
            server_timeout: defaults.server_timeout,
        }
    }

    pub fn with_nagle(mut self, use_nagle: bool) -> Self {
        self.use_nagle = use_nagle;
        self
    }
}

impl From<&StorageConfig> for TableSettings {
    fn from(config: &StorageConfig) -> Self {
        Self {
            connection_string: config.connection_string.clone(),
            table_name: config.table_name.clone(),
            use_nagle: config.use_nagle,
            server_timeout: config.server_timeout(),
        }
    }
}

pub struct TableRepository<E, C> {
    account: StorageAccount,
    writer: PartitionedBatchWriter<E, C>,
}

impl<E, C> std::fmt::Debug for TableRepository<E, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableRepository")
            .field("account", &self.account)
            .field("writer", &self.writer)
            .finish()
    }
}

impl<E, C> TableRepository<E, C>
where
    E: TableEntity,
    C: TableClient<E>,
{
    /// Parse the connection string and make sure the table exists
    #[instrument(skip_all, fields(table = %settings.table_name))]
    pub async fn connect(settings: &TableSettings, client: Arc<C>) -> Result<Self> {
        let account = StorageAccount::parse(&settings.connection_string)?;
        let options = RequestOptions::default()
            .with_nagle(settings.use_nagle)
            .with_server_timeout(settings.server_timeout);

        let created = client
            .create_if_not_exists(&settings.table_name)
            .await
            .map_err(|e| RepositoryError::remote("create_table", None, None, e))?;

        info!(
            table = %settings.table_name,
            endpoint = %account.table_endpoint(),
            created,
            use_nagle = options.use_nagle,
            "📦 Connected to table"
        );

        Ok(Self {
            account,
            writer: PartitionedBatchWriter::new(client, settings.table_name.as_str(), options),
        })
    }

    pub fn table_name(&self) -> &str {
        self.writer.table()
    }

    pub fn account(&self) -> &StorageAccount {
        &self.account
    }

    pub fn options(&self) -> &RequestOptions {
        self.writer.options()
    }

    pub fn writer(&self) -> &PartitionedBatchWriter<E, C> {
        &self.writer
    }

    fn client(&self) -> &C {
        self.writer.client()
    }

    pub async fn insert_or_replace(&self, entity: E) -> Result<()> {
        let key = entity.entity_key();
        self.client()
            .execute(
                self.table_name(),
                TableOperation::InsertOrReplace(entity),
                self.options(),
            )
            .await
            .map_err(|e| remote_for_key("insert_or_replace", &key, e))?;
        debug!(entity = %key, "Entity written");
        Ok(())
    }

    /// Manual batch path: at most [`MAX_BATCH_SIZE`] entities, unique
    /// `(PartitionKey, RowKey)` pairs, one atomic batch per partition executed
    /// in first-seen order. Stops at the first failing partition.
    pub async fn insert_or_replace_batch(&self, entities: Vec<E>) -> Result<()> {
        if entities.len() > MAX_BATCH_SIZE {
            return Err(RepositoryError::batch_size(entities.len(), MAX_BATCH_SIZE));
        }

        let mut seen: HashSet<EntityKey> = HashSet::with_capacity(entities.len());
        for entity in &entities {
            if !seen.insert(entity.entity_key()) {
                return Err(
                    WriteError::duplicate_key(entity.partition_key(), entity.row_key(), 0).into(),
                );
            }
        }

        let mut positions: HashMap<String, usize> = HashMap::new();
        let mut batches: Vec<TableBatch<E>> = Vec::new();
        for entity in entities {
            let position = match positions.get(entity.partition_key()) {
                Some(&position) => position,
                None => {
                    positions.insert(entity.partition_key().to_string(), batches.len());
                    batches.push(TableBatch::new());
                    batches.len() - 1
                }
            };
            batches[position].push(TableOperation::InsertOrReplace(entity));
        }

        for batch in batches {
            let partition_key = batch.partition_key().unwrap_or_default().to_string();
            let size = batch.len();
            self.client()
                .execute_batch(self.table_name(), batch, self.options())
                .await
                .map_err(|e| {
                    RepositoryError::remote("execute_batch", Some(&partition_key), None, e)
                })?;
            debug!(partition_key = %partition_key, size, "Manual batch written");
        }
        Ok(())
    }

    /// Bulk write with the given parallelism
    pub async fn insert_or_replace_parallel(
        &self,
        entities: impl IntoIterator<Item = E>,
        policy: &ParallelismPolicy,
    ) -> Result<WriteReport> {
        Ok(self.writer.write_all(entities, policy).await?)
    }

    /// Bulk write, one batch at a time in plan order
    pub async fn insert_or_replace_all(
        &self,
        entities: impl IntoIterator<Item = E>,
    ) -> Result<WriteReport> {
        self.insert_or_replace_parallel(entities, &ParallelismPolicy::sequential())
            .await
    }

    pub async fn write_one(&self, entity: E) -> Result<WriteReport> {
        Ok(self.writer.write_one(entity).await?)
    }

    pub async fn find(&self, partition_key: &str, row_key: &str) -> Result<Option<E>> {
        let key = EntityKey::new(partition_key, row_key);
        let result = self
            .client()
            .execute(
                self.table_name(),
                TableOperation::Retrieve(key.clone()),
                self.options(),
            )
            .await
            .map_err(|e| remote_for_key("retrieve", &key, e))?;
        Ok(result.entity)
    }

    /// Lazily stream every entity of one partition
    pub fn find_partition(&self, partition_key: &str) -> BoxStream<'static, Result<E>> {
        let owned = partition_key.to_string();
        self.client()
            .execute_query(
                self.table_name(),
                &TableQuery::partition(partition_key),
                self.options(),
            )
            .map(move |item| {
                item.map_err(|e| RepositoryError::remote("query", Some(&owned), None, e))
            })
            .boxed()
    }

    /// Lazily stream the entities matching `query`
    pub fn query(&self, query: &TableQuery) -> BoxStream<'static, Result<E>> {
        self.client()
            .execute_query(self.table_name(), query, self.options())
            .map(|item| item.map_err(|e| RepositoryError::remote("query", None, None, e)))
            .boxed()
    }

    pub async fn delete(&self, entity: E) -> Result<()> {
        let key = entity.entity_key();
        self.client()
            .execute(self.table_name(), TableOperation::Delete(entity), self.options())
            .await
            .map_err(|e| remote_for_key("delete", &key, e))?;
        debug!(entity = %key, "Entity deleted");
        Ok(())
    }

    /// Delete one at a time, stopping at the first failure; returns the
    /// number deleted
    pub async fn delete_many(&self, entities: impl IntoIterator<Item = E>) -> Result<usize> {
        let mut deleted = 0;
        for entity in entities {
            self.delete(entity).await?;
            deleted += 1;
        }
        Ok(deleted)
    }
}

fn remote_for_key(
    operation: &'static str,
    key: &EntityKey,
    source: crate::storage::StorageError,
) -> RepositoryError {
    RepositoryError::remote(
        operation,
        Some(&key.partition_key),
        Some(&key.row_key),
        source,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{InMemoryTableClient, PartitionIdentity, StorageError};
    use futures::TryStreamExt;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Account {
        region: String,
        id: String,
        balance: i64,
    }

    impl PartitionIdentity for Account {
        fn partition_key(&self) -> &str {
            &self.region
        }
        fn row_key(&self) -> &str {
            &self.id
        }
    }

    fn account(region: &str, id: &str, balance: i64) -> Account {
        Account {
            region: region.to_string(),
            id: id.to_string(),
            balance,
        }
    }

    async fn repository() -> TableRepository<Account, InMemoryTableClient> {
        let settings = TableSettings::new("UseDevelopmentStorage=true", "accounts");
        TableRepository::connect(&settings, Arc::new(InMemoryTableClient::new()))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_connect_creates_table_and_derives_options() {
        let settings =
            TableSettings::new("UseDevelopmentStorage=true", "accounts").with_nagle(false);
        let client = Arc::new(InMemoryTableClient::new());
        let repo: TableRepository<Account, _> =
            TableRepository::connect(&settings, Arc::clone(&client)).await.unwrap();

        assert!(client.table_exists("accounts"));
        assert!(!repo.options().use_nagle);
        assert_eq!(repo.options().server_timeout, Duration::from_secs(2));
        assert!(repo.account().is_development());
    }

    #[tokio::test]
    async fn test_connect_rejects_bad_connection_string() {
        let settings = TableSettings::new("AccountName=only", "accounts");
        let result: Result<TableRepository<Account, _>> =
            TableRepository::connect(&settings, Arc::new(InMemoryTableClient::new())).await;
        assert!(matches!(result, Err(RepositoryError::Connection(_))));
    }

    #[tokio::test]
    async fn test_insert_find_delete() {
        let repo = repository().await;
        repo.insert_or_replace(account("eu", "a1", 10)).await.unwrap();
        repo.insert_or_replace(account("eu", "a1", 25)).await.unwrap();

        let found = repo.find("eu", "a1").await.unwrap();
        assert_eq!(found.map(|a| a.balance), Some(25));
        assert_eq!(repo.find("eu", "missing").await.unwrap(), None);

        repo.delete(account("eu", "a1", 25)).await.unwrap();
        assert_eq!(repo.find("eu", "a1").await.unwrap(), None);

        let err = repo.delete(account("eu", "a1", 25)).await.unwrap_err();
        assert!(matches!(
            err,
            RepositoryError::RemoteOperation {
                operation: "delete",
                source: StorageError::NotFound { .. },
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_manual_batch_limits() {
        let repo = repository().await;

        let oversized: Vec<Account> = (0..=MAX_BATCH_SIZE)
            .map(|i| account("eu", &i.to_string(), 0))
            .collect();
        assert!(matches!(
            repo.insert_or_replace_batch(oversized).await,
            Err(RepositoryError::BatchSize { size: 101, limit: 100 })
        ));

        let duplicates = vec![account("eu", "a", 1), account("eu", "a", 2)];
        assert!(matches!(
            repo.insert_or_replace_batch(duplicates).await,
            Err(RepositoryError::Write(WriteError::DuplicateKey { .. }))
        ));
        assert_eq!(repo.client().entity_count("accounts"), Some(0));
    }

    #[tokio::test]
    async fn test_manual_batch_splits_by_partition() {
        let repo = repository().await;
        repo.insert_or_replace_batch(vec![
            account("eu", "a", 1),
            account("us", "a", 2),
            account("eu", "b", 3),
        ])
        .await
        .unwrap();

        let eu: Vec<Account> = repo.find_partition("eu").try_collect().await.unwrap();
        assert_eq!(eu.len(), 2);
        let us: Vec<Account> = repo.find_partition("us").try_collect().await.unwrap();
        assert_eq!(us, vec![account("us", "a", 2)]);
    }

    #[tokio::test]
    async fn test_query_and_delete_many() {
        let repo = repository().await;
        repo.insert_or_replace_all((0..5).map(|i| account("eu", &format!("a{i}"), i)))
            .await
            .unwrap();

        let rich: Vec<Account> = repo
            .query(&TableQuery::filtered(crate::storage::Filter::condition(
                "balance",
                crate::storage::Comparison::GreaterThanOrEqual,
                3,
            )))
            .try_collect()
            .await
            .unwrap();
        assert_eq!(rich.len(), 2);

        let deleted = repo.delete_many(rich).await.unwrap();
        assert_eq!(deleted, 2);
        assert_eq!(repo.client().entity_count("accounts"), Some(3));
    }
}
