//! # Table Operations
//!
//! Single-entity operations and the atomic batch that groups them.

use super::entity::{EntityKey, PartitionIdentity};
use super::errors::{StorageError, StorageResult};
use crate::constants::MAX_BATCH_SIZE;
use std::collections::HashSet;

/// One operation against one entity
#[derive(Debug, Clone, PartialEq)]
pub enum TableOperation<E> {
    /// Insert; fails with `Conflict` when the entity exists
    Insert(E),
    /// Replace; fails with `NotFound` when the entity is missing
    Replace(E),
    InsertOrReplace(E),
    /// Delete; fails with `NotFound` when the entity is missing
    Delete(E),
    Retrieve(EntityKey),
}

impl<E: PartitionIdentity> TableOperation<E> {
    pub fn key(&self) -> EntityKey {
        match self {
            Self::Insert(e) | Self::Replace(e) | Self::InsertOrReplace(e) | Self::Delete(e) => {
                e.entity_key()
            }
            Self::Retrieve(key) => key.clone(),
        }
    }

    pub fn partition_key(&self) -> &str {
        match self {
            Self::Insert(e) | Self::Replace(e) | Self::InsertOrReplace(e) | Self::Delete(e) => {
                e.partition_key()
            }
            Self::Retrieve(key) => &key.partition_key,
        }
    }

    pub fn row_key(&self) -> &str {
        match self {
            Self::Insert(e) | Self::Replace(e) | Self::InsertOrReplace(e) | Self::Delete(e) => {
                e.row_key()
            }
            Self::Retrieve(key) => &key.row_key,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Insert(_) => "insert",
            Self::Replace(_) => "replace",
            Self::InsertOrReplace(_) => "insert_or_replace",
            Self::Delete(_) => "delete",
            Self::Retrieve(_) => "retrieve",
        }
    }
}

/// Result of one executed operation
#[derive(Debug, Clone, PartialEq)]
pub struct TableResult<E> {
    /// Entity returned by a retrieve
    pub entity: Option<E>,
    /// Version tag assigned by the service after a write
    pub etag: Option<String>,
}

impl<E> TableResult<E> {
    pub fn empty() -> Self {
        Self {
            entity: None,
            etag: None,
        }
    }
}

/// Ordered group of operations the service executes atomically.
///
/// All operations must target one partition, row keys must be unique, and
/// the batch may hold at most [`MAX_BATCH_SIZE`] operations.
#[derive(Debug, Clone, PartialEq)]
pub struct TableBatch<E> {
    operations: Vec<TableOperation<E>>,
}

impl<E> Default for TableBatch<E> {
    fn default() -> Self {
        Self {
            operations: Vec::new(),
        }
    }
}

impl<E: PartitionIdentity> TableBatch<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Batch of insert-or-replace operations, one per entity
    pub fn insert_or_replace_all(entities: impl IntoIterator<Item = E>) -> Self {
        Self {
            operations: entities
                .into_iter()
                .map(TableOperation::InsertOrReplace)
                .collect(),
        }
    }

    pub fn push(&mut self, operation: TableOperation<E>) {
        self.operations.push(operation);
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn partition_key(&self) -> Option<&str> {
        self.operations.first().map(TableOperation::partition_key)
    }

    pub fn operations(&self) -> &[TableOperation<E>] {
        &self.operations
    }

    pub fn into_operations(self) -> Vec<TableOperation<E>> {
        self.operations
    }

    /// Check the constraints the service enforces on a batch
    pub fn validate(&self) -> StorageResult<()> {
        let Some(partition_key) = self.partition_key() else {
            return Err(StorageError::invalid_batch("batch is empty"));
        };

        if self.operations.len() > MAX_BATCH_SIZE {
            return Err(StorageError::invalid_batch(format!(
                "batch holds {} operations, limit is {MAX_BATCH_SIZE}",
                self.operations.len()
            )));
        }

        let mut row_keys = HashSet::with_capacity(self.operations.len());
        for operation in &self.operations {
            if operation.partition_key() != partition_key {
                return Err(StorageError::invalid_batch(format!(
                    "batch spans partitions '{partition_key}' and '{}'",
                    operation.partition_key()
                )));
            }
            if matches!(operation, TableOperation::Retrieve(_)) {
                return Err(StorageError::invalid_batch(
                    "retrieve operations cannot be batched",
                ));
            }
            if !row_keys.insert(operation.row_key()) {
                return Err(StorageError::invalid_batch(format!(
                    "row key '{}' appears more than once",
                    operation.row_key()
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Row(&'static str, String);

    impl PartitionIdentity for Row {
        fn partition_key(&self) -> &str {
            self.0
        }
        fn row_key(&self) -> &str {
            &self.1
        }
    }

    fn rows(pk: &'static str, n: usize) -> Vec<Row> {
        (0..n).map(|i| Row(pk, format!("R{i}"))).collect()
    }

    #[test]
    fn test_full_batch_is_valid() {
        let batch = TableBatch::insert_or_replace_all(rows("P1", MAX_BATCH_SIZE));
        assert_eq!(batch.len(), 100);
        assert_eq!(batch.partition_key(), Some("P1"));
        assert!(batch.validate().is_ok());
    }

    #[test]
    fn test_batch_constraints() {
        let empty: TableBatch<Row> = TableBatch::new();
        assert!(empty.validate().is_err());

        let oversized = TableBatch::insert_or_replace_all(rows("P1", MAX_BATCH_SIZE + 1));
        assert!(matches!(
            oversized.validate(),
            Err(StorageError::InvalidBatch { .. })
        ));

        let mut mixed = TableBatch::insert_or_replace_all(rows("P1", 2));
        mixed.push(TableOperation::Insert(Row("P2", "R9".to_string())));
        assert!(mixed.validate().is_err());

        let mut duplicate = TableBatch::insert_or_replace_all(rows("P1", 2));
        duplicate.push(TableOperation::Delete(Row("P1", "R1".to_string())));
        assert!(duplicate.validate().is_err());

        let mut retrieve = TableBatch::insert_or_replace_all(rows("P1", 1));
        retrieve.push(TableOperation::Retrieve(EntityKey::new("P1", "R5")));
        assert!(retrieve.validate().is_err());
    }

    #[test]
    fn test_operation_accessors() {
        let op = TableOperation::Replace(Row("P3", "R1".to_string()));
        assert_eq!(op.key(), EntityKey::new("P3", "R1"));
        assert_eq!(op.name(), "replace");
        let retrieve: TableOperation<Row> = TableOperation::Retrieve(EntityKey::new("P", "R"));
        assert_eq!(retrieve.partition_key(), "P");
        assert_eq!(retrieve.row_key(), "R");
    }
}
