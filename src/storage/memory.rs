//! # In-Memory Table Client
//!
//! In-process [`TableClient`] that mirrors the observable semantics of the
//! table service: entities are stored as property bags ordered by
//! `(PartitionKey, RowKey)`, batches are validated and applied atomically,
//! and inserts, replaces and deletes report conflicts and missing entities.

use super::client::{EntityStream, TableClient};
use super::entity::{EntityKey, TableEntity};
use super::errors::{StorageError, StorageResult};
use super::operation::{TableBatch, TableOperation, TableResult};
use super::query::TableQuery;
use crate::connection::RequestOptions;
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;
use uuid::Uuid;

type Table = BTreeMap<EntityKey, StoredEntity>;

#[derive(Debug, Clone)]
struct StoredEntity {
    properties: Value,
    etag: String,
}

impl StoredEntity {
    fn new(properties: Value) -> Self {
        Self {
            properties,
            etag: format!("W/\"{}\"", Uuid::new_v4()),
        }
    }
}

/// Shared in-process table store
#[derive(Debug, Default)]
pub struct InMemoryTableClient {
    tables: RwLock<HashMap<String, Table>>,
}

impl InMemoryTableClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entities stored in `table`, or `None` if it does not exist
    pub fn entity_count(&self, table: &str) -> Option<usize> {
        self.tables.read().get(table).map(BTreeMap::len)
    }

    pub fn table_exists(&self, table: &str) -> bool {
        self.tables.read().contains_key(table)
    }

    fn check(table: &Table, key: &EntityKey, operation: &str) -> StorageResult<()> {
        let exists = table.contains_key(key);
        match operation {
            "insert" if exists => Err(StorageError::Conflict { key: key.clone() }),
            "replace" | "delete" if !exists => Err(StorageError::NotFound { key: key.clone() }),
            _ => Ok(()),
        }
    }

    /// Apply an already checked write; `properties` is `None` for deletes
    fn apply_write(table: &mut Table, key: EntityKey, properties: Option<Value>) -> Option<String> {
        match properties {
            Some(properties) => {
                let stored = StoredEntity::new(properties);
                let etag = stored.etag.clone();
                table.insert(key, stored);
                Some(etag)
            }
            None => {
                table.remove(&key);
                None
            }
        }
    }
}

/// Serialized form of a write operation
fn prepare<E: TableEntity>(
    operation: &TableOperation<E>,
) -> StorageResult<(EntityKey, Option<Value>)> {
    let key = operation.key();
    let properties = match operation {
        TableOperation::Insert(e) | TableOperation::Replace(e) | TableOperation::InsertOrReplace(e) => {
            Some(serde_json::to_value(e)?)
        }
        TableOperation::Delete(_) | TableOperation::Retrieve(_) => None,
    };
    Ok((key, properties))
}

#[async_trait]
impl<E: TableEntity> TableClient<E> for InMemoryTableClient {
    async fn create_if_not_exists(&self, table: &str) -> StorageResult<bool> {
        let mut tables = self.tables.write();
        if tables.contains_key(table) {
            return Ok(false);
        }
        tables.insert(table.to_string(), Table::new());
        debug!(table = %table, "Created in-memory table");
        Ok(true)
    }

    async fn execute(
        &self,
        table: &str,
        operation: TableOperation<E>,
        _options: &RequestOptions,
    ) -> StorageResult<TableResult<E>> {
        if let TableOperation::Retrieve(key) = &operation {
            let tables = self.tables.read();
            let stored = tables
                .get(table)
                .ok_or_else(|| StorageError::table_not_found(table))?
                .get(key);
            return match stored {
                Some(stored) => Ok(TableResult {
                    entity: Some(serde_json::from_value(stored.properties.clone())?),
                    etag: Some(stored.etag.clone()),
                }),
                None => Ok(TableResult::empty()),
            };
        }

        let (key, properties) = prepare(&operation)?;
        let mut tables = self.tables.write();
        let entities = tables
            .get_mut(table)
            .ok_or_else(|| StorageError::table_not_found(table))?;
        Self::check(entities, &key, operation.name())?;
        let etag = Self::apply_write(entities, key, properties);
        Ok(TableResult { entity: None, etag })
    }

    async fn execute_batch(
        &self,
        table: &str,
        batch: TableBatch<E>,
        _options: &RequestOptions,
    ) -> StorageResult<Vec<TableResult<E>>> {
        batch.validate()?;

        let prepared = batch
            .operations()
            .iter()
            .map(|op| prepare(op).map(|(key, props)| (op.name(), key, props)))
            .collect::<StorageResult<Vec<_>>>()?;

        let mut tables = self.tables.write();
        let entities = tables
            .get_mut(table)
            .ok_or_else(|| StorageError::table_not_found(table))?;

        // Row keys are unique within a validated batch, so every precondition
        // can be checked against the pre-batch state before anything is applied.
        for (name, key, _) in &prepared {
            Self::check(entities, key, name)?;
        }

        let results = prepared
            .into_iter()
            .map(|(_, key, properties)| TableResult {
                entity: None,
                etag: Self::apply_write(entities, key, properties),
            })
            .collect();
        Ok(results)
    }

    fn execute_query(
        &self,
        table: &str,
        query: &TableQuery,
        _options: &RequestOptions,
    ) -> EntityStream<E> {
        let tables = self.tables.read();
        let Some(entities) = tables.get(table) else {
            return stream::iter(vec![Err(StorageError::table_not_found(table))]).boxed();
        };

        let limit = query.take.unwrap_or(usize::MAX);
        let matched: Vec<StorageResult<E>> = entities
            .iter()
            .filter(|(key, stored)| query.matches(key, &stored.properties))
            .take(limit)
            .map(|(_, stored)| {
                serde_json::from_value(stored.properties.clone()).map_err(StorageError::from)
            })
            .collect();

        stream::iter(matched).boxed()
    }
}
