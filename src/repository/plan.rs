//! # Batch Planning
//!
//! Turns an arbitrary-order collection of entities into partition groups and
//! size-limited batches. Groups keep the order in which their partition key
//! was first seen; within a group, batch `i` holds the entities at positions
//! `[i * MAX_BATCH_SIZE, (i + 1) * MAX_BATCH_SIZE)` of that partition's
//! entities as encountered.

use super::errors::{WriteError, WriteResult};
use super::report::BatchId;
use crate::constants::MAX_BATCH_SIZE;
use crate::storage::PartitionIdentity;
use std::collections::{HashMap, HashSet};

/// One batch ready for dispatch
#[derive(Debug, Clone)]
pub struct PlannedBatch<E> {
    pub id: BatchId,
    pub entities: Vec<E>,
}

/// All batches of one partition key
#[derive(Debug, Clone)]
pub struct PartitionGroup<E> {
    pub partition_key: String,
    pub batches: Vec<PlannedBatch<E>>,
}

impl<E> PartitionGroup<E> {
    pub fn entity_count(&self) -> usize {
        self.batches.iter().map(|b| b.entities.len()).sum()
    }
}

#[derive(Debug, Clone)]
pub struct BatchPlan<E> {
    groups: Vec<PartitionGroup<E>>,
}

impl<E: PartitionIdentity> BatchPlan<E> {
    /// Group, chunk and validate.
    ///
    /// Fails with [`WriteError::DuplicateKey`] when a row key appears twice in
    /// one batch. Row keys repeated across different batches are allowed.
    pub fn build(entities: impl IntoIterator<Item = E>) -> WriteResult<Self> {
        let mut positions: HashMap<String, usize> = HashMap::new();
        let mut grouped: Vec<(String, Vec<E>)> = Vec::new();

        for entity in entities {
            if let Some(&position) = positions.get(entity.partition_key()) {
                grouped[position].1.push(entity);
                continue;
            }
            let partition_key = entity.partition_key().to_string();
            positions.insert(partition_key.clone(), grouped.len());
            grouped.push((partition_key, vec![entity]));
        }

        let groups = grouped
            .into_iter()
            .map(|(partition_key, entities)| chunk_partition(partition_key, entities))
            .collect::<WriteResult<Vec<_>>>()?;

        Ok(Self { groups })
    }
}

impl<E> BatchPlan<E> {
    pub fn groups(&self) -> &[PartitionGroup<E>] {
        &self.groups
    }

    pub fn into_groups(self) -> Vec<PartitionGroup<E>> {
        self.groups
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn partition_count(&self) -> usize {
        self.groups.len()
    }

    pub fn batch_count(&self) -> usize {
        self.groups.iter().map(|g| g.batches.len()).sum()
    }

    pub fn entity_count(&self) -> usize {
        self.groups.iter().map(PartitionGroup::entity_count).sum()
    }

    /// Batch identities in plan order
    pub fn batch_ids(&self) -> Vec<BatchId> {
        self.groups
            .iter()
            .flat_map(|g| g.batches.iter().map(|b| b.id.clone()))
            .collect()
    }
}

fn chunk_partition<E: PartitionIdentity>(
    partition_key: String,
    entities: Vec<E>,
) -> WriteResult<PartitionGroup<E>> {
    let mut batches = Vec::with_capacity(entities.len().div_ceil(MAX_BATCH_SIZE));
    let mut remaining = entities.into_iter().peekable();

    while remaining.peek().is_some() {
        let index = batches.len();
        let chunk: Vec<E> = remaining.by_ref().take(MAX_BATCH_SIZE).collect();

        let mut row_keys = HashSet::with_capacity(chunk.len());
        for entity in &chunk {
            if !row_keys.insert(entity.row_key()) {
                return Err(WriteError::duplicate_key(
                    partition_key,
                    entity.row_key(),
                    index,
                ));
            }
        }

        batches.push(PlannedBatch {
            id: BatchId::new(partition_key.clone(), index),
            entities: chunk,
        });
    }

    Ok(PartitionGroup {
        partition_key,
        batches,
    })
}
